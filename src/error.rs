use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Business-rule failures surfaced to the HTTP layer.
///
/// Every handler returns `Result<_, AppError>`; the wire body is always
/// `{"error": "..."}` with the status chosen in `status_code`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("insufficient leave balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: f64, available: f64 },

    #[error("an overlapping leave request already exists for this period")]
    OverlappingRequest,

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    /// True when the underlying MySQL error is a uniqueness violation.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
            _ => false,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OverlappingRequest => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Database(e) = self {
            error!(error = %e, "Database failure");
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AppError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::unauthorized("no").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::NotFound("user").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::invalid_input("bad dates").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidState("already approved".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InsufficientBalance {
                requested: 2.0,
                available: 1.0
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::OverlappingRequest.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn insufficient_balance_message_names_both_sides() {
        let e = AppError::InsufficientBalance {
            requested: 2.0,
            available: 1.0,
        };
        assert_eq!(
            e.to_string(),
            "insufficient leave balance: requested 2, available 1"
        );
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(AppError::NotFound("leave request").to_string(), "leave request not found");
    }
}
