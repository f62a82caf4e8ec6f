use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid shop dataset: {0}")]
    Dataset(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Config(String),
}

/// Device geolocation failures. The presentation layer shows one distinct
/// message per variant; none of them ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("location access was denied; tap the map to pick a center instead")]
    PermissionDenied,
    #[error("current position is unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for the current position")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_errors_have_distinct_messages() {
        let messages = [
            LocateError::PermissionDenied.to_string(),
            LocateError::PositionUnavailable.to_string(),
            LocateError::Timeout.to_string(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }
}
