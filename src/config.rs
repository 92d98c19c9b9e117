use std::env;

use chrono::Duration;

/// Default waiting period between shipment and the buyer being allowed to
/// report that the parcel never arrived.
pub const DEFAULT_ISSUE_REPORT_DELAY_HOURS: i64 = 72;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub fulfillment: FulfillmentConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let delay_hours = env::var("ISSUE_REPORT_DELAY_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h >= 0)
            .unwrap_or(DEFAULT_ISSUE_REPORT_DELAY_HOURS);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            fulfillment: FulfillmentConfig::with_delay_hours(delay_hours),
        })
    }
}

/// Policy knobs of the order lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct FulfillmentConfig {
    pub issue_report_delay: Duration,
}

impl FulfillmentConfig {
    pub fn with_delay_hours(hours: i64) -> Self {
        Self {
            issue_report_delay: Duration::hours(hours),
        }
    }
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self::with_delay_hours(DEFAULT_ISSUE_REPORT_DELAY_HOURS)
    }
}
