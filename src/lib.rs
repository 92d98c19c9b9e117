//! Order fulfillment backend for a multi-seller marketplace.
//!
//! Checkout splits a cart into one order per seller; every later status change
//! goes through the transition table in [`fulfillment`].

pub mod audit;
pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod fulfillment;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod notify;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, routing::get};

use crate::{routes::{create_api_router, doc::scalar_docs, health}, state::AppState};

/// Full application router with state bound, without transport layers.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(scalar_docs())
        .with_state(state)
}
