//! Error taxonomy shared by the weather fetcher, the task store and the binary.
//!
//! Each crate keeps its own error enum and converts into `AppError` at the
//! edge, so the binary reports one type. `user_message()` is what a person
//! sees; `Display` is what the logs get.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Weather service error: {0}")]
    Network(#[from] NetworkError),

    #[error("Task store error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Database(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "Could not read or write a local file.",
            AppError::Other(_) => "Something went wrong. Check the logs for details.",
        }
    }
}

/// Failures talking to the weather provider over HTTP.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No response at all (DNS, refused connection, TLS).
    #[error("Weather provider unreachable: {0}")]
    Unreachable(String),

    #[error("Weather provider did not answer in time")]
    Timeout,

    /// Any status other than 200.
    #[error("Weather provider answered {status}: {body}")]
    Rejected { status: u16, body: String },

    /// A 200 whose body is not a current-weather document.
    #[error("Weather provider sent an unreadable body: {0}")]
    Malformed(String),
}

impl NetworkError {
    /// HTTP status behind the failure, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::Unreachable(_) => {
                "The weather service is unreachable. Check your internet connection."
            }
            NetworkError::Timeout => "The weather service is slow to answer. Try again later.",
            NetworkError::Rejected { status: 401, .. } => {
                "The weather service rejected the API key. Check weather.api_key."
            }
            NetworkError::Rejected { status, .. } if *status >= 500 => {
                "The weather service is having problems. Try again later."
            }
            NetworkError::Rejected { .. } => "The weather service refused the request.",
            NetworkError::Malformed(_) => "The weather service sent data that could not be read.",
        }
    }
}

/// Task store failures (SQLite).
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Cannot open task database: {0}")]
    Unavailable(String),

    #[error("Task query failed: {0}")]
    QueryFailed(String),

    #[error("Task database is corrupt: {0}")]
    Corrupt(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::Unavailable(_) => {
                "The task database cannot be opened. Check storage.database_path."
            }
            DatabaseError::QueryFailed(_) => "Reading or saving tasks failed.",
            DatabaseError::Corrupt(_) => {
                "The task database is damaged. Restore it from a backup or remove it."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "The configuration is incomplete. Check the logged fields.",
            ConfigError::ParseError(_) => "The configuration file or a TODO_* variable is malformed.",
        }
    }
}

/// Map reqwest failures onto `NetworkError`.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            return NetworkError::Timeout;
        }
        if self.is_decode() {
            return NetworkError::Malformed(self.to_string());
        }
        match self.status() {
            Some(status) => NetworkError::Rejected {
                status: status.as_u16(),
                body: self.to_string(),
            },
            None => NetworkError::Unreachable(self.to_string()),
        }
    }
}

/// Map rusqlite failures onto `DatabaseError`.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        let code = self.sqlite_error_code();
        match code {
            Some(rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase) => {
                DatabaseError::Corrupt(self.to_string())
            }
            Some(rusqlite::ErrorCode::CannotOpen) => DatabaseError::Unavailable(self.to_string()),
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let app_err: AppError = ConfigError::Invalid("weather.api_key".into()).into();
        assert!(matches!(app_err, AppError::Config(ConfigError::Invalid(_))));
        assert_eq!(app_err.user_message(), ConfigError::Invalid(String::new()).user_message());
    }

    #[test]
    fn test_network_message_reaches_app_error() {
        let app_err = AppError::from(NetworkError::Timeout);
        assert_eq!(app_err.user_message(), NetworkError::Timeout.user_message());
    }

    #[test]
    fn test_rejected_status() {
        let bad_key = NetworkError::Rejected {
            status: 401,
            body: "Invalid API key".into(),
        };
        let outage = NetworkError::Rejected {
            status: 503,
            body: String::new(),
        };

        assert_eq!(bad_key.status(), Some(401));
        assert_eq!(NetworkError::Timeout.status(), None);
        assert!(bad_key.user_message().contains("API key"));
        assert_ne!(bad_key.user_message(), outage.user_message());
    }

    #[test]
    fn test_rusqlite_errors() {
        let err = rusqlite::Error::QueryReturnedNoRows.into_database_error();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));

        let err = rusqlite::Connection::open("/nonexistent-dir/sub/tasks.db")
            .map(|_| ())
            .map_err(RusqliteErrorExt::into_database_error);
        assert!(matches!(err, Err(DatabaseError::Unavailable(_))));
    }
}
