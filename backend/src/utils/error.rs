// utils/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // Erreurs d'authentification
    #[error("Authentication failed")]
    Unauthorized,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access forbidden: {0}")]
    Forbidden(String),

    // Erreurs utilisateur
    #[error("User already exists")]
    UserAlreadyExists,

    // Erreurs de données
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    // Erreurs de ressources
    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests")]
    TooManyRequests,

    // Erreurs d'infrastructure
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Encryption error: {0}")]
    EncryptionError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Code court renvoyé au client avec le message
    fn code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "BAD_REQUEST",
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            StatusCode::FORBIDDEN => "FORBIDDEN",
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::CONFLICT => "CONFLICT",
            StatusCode::TOO_MANY_REQUESTS => "TOO_MANY_REQUESTS",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            // 400 - Bad Request
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,

            // 401 - Unauthorized
            AppError::Unauthorized
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,

            // 403 - Forbidden
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,

            // 404 - Not Found
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 - Conflict
            AppError::UserAlreadyExists => StatusCode::CONFLICT,

            // 429 - Too Many Requests
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,

            // 500 - Internal Server Error
            AppError::SerializeError(_)
            | AppError::Database(_)
            | AppError::Cache(_)
            | AppError::EncryptionError(_)
            | AppError::Configuration(_)
            | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Les détails des erreurs internes restent dans les logs
        let message = if status.is_server_error() {
            tracing::error!("Internal server error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({
            "error": message,
            "code": self.code()
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if is_user_unique_violation(
                db_err.code().as_deref(),
                db_err.table(),
                db_err.constraint(),
            ) {
                return AppError::UserAlreadyExists;
            }
        }
        AppError::Database(err.to_string())
    }
}

/// 23505 (unique_violation) levée par la table `users` : email ou username déjà pris
fn is_user_unique_violation(code: Option<&str>, table: Option<&str>, constraint: Option<&str>) -> bool {
    code == Some("23505")
        && (table == Some("users") || constraint.is_some_and(|name| name.starts_with("users_")))
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializeError(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Cache(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .field_errors()
            .iter()
            .map(|(field, errors)| {
                let error_messages: Vec<String> = errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect();
        messages.sort();

        AppError::Validation(messages.join("; "))
    }
}

// Type de résultat standard
pub type Result<T> = std::result::Result<T, AppError>;
