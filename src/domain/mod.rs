//! Storage-free order, cart and delivery rules shared by the services.

pub mod aggregate;
pub mod cart;
pub mod delivery;
pub mod legacy;
pub mod status;
pub mod workflow;
