use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub low_stock_threshold: i32,
    pub shipping_fee: i64,
    pub free_shipping_over: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let low_stock_threshold = env::var("LOW_STOCK_THRESHOLD")
            .ok()
            .and_then(|t| t.parse::<i32>().ok())
            .unwrap_or(5);
        let shipping_fee = env::var("SHIPPING_FEE")
            .ok()
            .and_then(|f| f.parse::<i64>().ok())
            .filter(|f| *f >= 0)
            .unwrap_or(10_000);
        let free_shipping_over = env::var("FREE_SHIPPING_THRESHOLD")
            .ok()
            .and_then(|t| t.parse::<i64>().ok())
            .unwrap_or(100_000);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            low_stock_threshold,
            shipping_fee,
            free_shipping_over,
        })
    }
}
