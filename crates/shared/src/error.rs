use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Validation,
    DataFormat,
}

/// Failure of one forecasting operation. `Display` is the bare message so it can be
/// surfaced to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    DataFormat(String),
}

impl ForecastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::Transport(_) => ErrorKind::Transport,
            ForecastError::Validation(_) => ErrorKind::Validation,
            ForecastError::DataFormat(_) => ErrorKind::DataFormat,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ForecastError::Transport(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ForecastError::Validation(message.into())
    }

    pub fn data_format(message: impl Into<String>) -> Self {
        ForecastError::DataFormat(message.into())
    }
}

/// Error body returned by the forecasting backend on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let err = ForecastError::validation("unknown product");
        assert_eq!(err.to_string(), "unknown product");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn error_body_round_trips_backend_shape() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"product_id is required"}"#).expect("decode");
        assert_eq!(body.error, "product_id is required");
    }
}
