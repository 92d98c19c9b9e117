use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Duration;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{OrderStatus, ParseEnumError},
    response::{ApiResponse, Meta},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("cannot {action} order {order_id}: order is currently {current}")]
    InvalidState {
        order_id: Uuid,
        current: OrderStatus,
        action: &'static str,
    },

    #[error("too early to report an issue, please wait another {}", format_wait(.remaining))]
    TooEarly { remaining: Duration },

    #[error("could not complete {operation}, please retry")]
    Storage {
        operation: &'static str,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Names the operation a storage failure happened in, leaving every other
    /// kind untouched.
    pub fn during(self, operation: &'static str) -> Self {
        match self {
            AppError::Storage { source, .. } => AppError::Storage { operation, source },
            other => other,
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(source: sea_orm::DbErr) -> Self {
        AppError::Storage {
            operation: "request",
            source,
        }
    }
}

impl From<ParseEnumError> for AppError {
    fn from(err: ParseEnumError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidState { .. } => StatusCode::CONFLICT,
            AppError::TooEarly { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Storage { operation, source } => {
                tracing::error!(operation = %operation, error = %source, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Renders a wait as `"2 days 3 hours 15 minutes"`, rounding up to the minute.
pub fn format_wait(remaining: &Duration) -> String {
    let total_minutes = (remaining.num_seconds().max(0) + 59) / 60;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 || parts.is_empty() {
        parts.push(plural(minutes, "minute"));
    }
    parts.join(" ")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
