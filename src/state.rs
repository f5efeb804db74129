use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub settings: Arc<Settings>,
}

/// Runtime knobs resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub jwt_secret: String,
    pub low_stock_threshold: i32,
    /// Flat shipping charge in paise.
    pub shipping_fee: i64,
    /// Subtotal in paise at which shipping becomes free.
    pub free_shipping_over: i64,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, settings: Settings) -> Self {
        Self {
            pool,
            orm,
            settings: Arc::new(settings),
        }
    }
}

impl From<&AppConfig> for Settings {
    fn from(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            low_stock_threshold: config.low_stock_threshold,
            shipping_fee: config.shipping_fee,
            free_shipping_over: config.free_shipping_over,
        }
    }
}
