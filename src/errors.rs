use axum::http::StatusCode;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::HabitNotFound(_) | StoreError::EntryNotFound { .. } => {
                Self::not_found(err.to_string())
            }
            _ => Self::bad_request(err.to_string()),
        }
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Serialize(_) => Self::internal(err),
            _ => Self::bad_request(format!(
                "Error importing data. Please check the file format. ({err})"
            )),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Rejections produced by the habit store reducer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("habit not found: {0}")]
    HabitNotFound(String),

    #[error("no entry on {date} for habit {habit_id}")]
    EntryNotFound { habit_id: String, date: NaiveDate },

    #[error("levels must satisfy 0 < low < medium < high (got {low}, {medium}, {high})")]
    InvalidLevels { low: u64, medium: u64, high: u64 },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("timer has no elapsed time to log")]
    NothingToLog,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("expected a habit array or an object with a `habits` field")]
    UnrecognizedShape,

    #[error("failed to serialize export: {0}")]
    Serialize(#[source] serde_json::Error),
}
