use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// User input that violates a card or proof invariant. Recoverable,
/// surfaced to the submitting user, mutates nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("the round is closed")]
    RoundClosed,

    #[error("match {match_id} needs exactly one pick")]
    MissingPick { match_id: i64 },

    #[error("exactly one double pick is required, got {count}")]
    InvalidDoubleCount { count: usize },

    #[error("the double pick must differ from the primary pick")]
    DoubleEqualsPrimary,

    #[error("the selected card does not belong to you")]
    NotYourCard,

    #[error("the card already has a processed proof")]
    AlreadyPaid,

    #[error("no file was uploaded")]
    MissingFile,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("authentication required")]
    Unauthorized,

    #[error("permission denied")]
    Permission,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("no eligible winners for this round")]
    NoEligibleWinners,

    #[error("the round has no prize pool configured")]
    NoPoolAmount,

    #[error("the prize pool was already sent")]
    PoolAlreadySent,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("mail delivery failed: {0}")]
    Mail(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Unauthorized => "unauthorized",
            AppError::Permission => "permission",
            AppError::NotFound(_) => "not_found",
            AppError::NoEligibleWinners => "no_eligible_winners",
            AppError::NoPoolAmount => "no_pool_amount",
            AppError::PoolAlreadySent => "pool_already_sent",
            AppError::Database(_) => "database",
            AppError::Io(_) => "io",
            AppError::Multipart(_) => "multipart",
            AppError::Mail(_) => "mail",
        }
    }

    fn is_unique_violation(&self) -> bool {
        matches!(self, AppError::Database(sqlx::Error::Database(e)) if e.is_unique_violation())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Permission => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NoEligibleWinners | AppError::NoPoolAmount | AppError::PoolAlreadySent => {
                StatusCode::CONFLICT
            }
            // Concurrent double-submit trips a uniqueness backstop; report
            // it as a conflict, not a server fault.
            AppError::Database(_) if self.is_unique_violation() => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Io(_) | AppError::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
