use std::sync::Arc;

use crate::{config::FulfillmentConfig, db::OrmConn, notify::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub notifier: Arc<dyn Notifier>,
    pub fulfillment: FulfillmentConfig,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(
        orm: OrmConn,
        notifier: Arc<dyn Notifier>,
        fulfillment: FulfillmentConfig,
        jwt_secret: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            orm,
            notifier,
            fulfillment,
            jwt_secret: jwt_secret.into(),
        }
    }
}
