use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Validation(Vec<String>),
    NotFound(String),
    Forbidden(String),
    Unavailable(String),
    Db(sqlx::Error),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [String]>,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    /// Stable machine-readable code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Db(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to hand to the client. Infrastructure detail stays in the log.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(errors) => errors
                .first()
                .cloned()
                .unwrap_or_else(|| "Invalid request".to_string()),
            AppError::NotFound(what) => what.clone(),
            AppError::Forbidden(what) => what.clone(),
            AppError::Unavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::Db(_) | AppError::Internal(_) => "An unexpected error occurred".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(errors) => write!(f, "Validation failed: {}", errors.join("; ")),
            AppError::NotFound(what) => write!(f, "Not found: {what}"),
            AppError::Forbidden(what) => write!(f, "Forbidden: {what}"),
            AppError::Unavailable(e) => write!(f, "Datastore unavailable: {e}"),
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Internal(e) => write!(f, "Internal error: {e}"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Validation(_) | AppError::NotFound(_) => log::debug!("{self}"),
            AppError::Forbidden(_) => log::warn!("{self}"),
            _ => log::error!("{self}"),
        }

        let details = match self {
            AppError::Validation(errors) if errors.len() > 1 => Some(errors.as_slice()),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message: self.public_message(),
                details,
            },
        })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::Unavailable(e.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => AppError::Unavailable(e.to_string()),
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            other => AppError::Db(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("migration failed: {e}"))
    }
}
