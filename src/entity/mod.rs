pub mod admins;
pub mod cart_items;
pub mod orders;
pub mod products;
pub mod settings;
pub mod users;
pub mod wishlist_items;

pub use admins::Entity as Admins;
pub use cart_items::Entity as CartItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use settings::Entity as Settings;
pub use users::Entity as Users;
pub use wishlist_items::Entity as WishlistItems;
