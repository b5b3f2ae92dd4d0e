//! Application-wide error types.

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::ConversionError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Telegram API error in {method}: {description}")]
    Telegram { method: String, description: String },

    #[error("Telegram API rate limited {method}, retry after {retry_after:?}")]
    RateLimited { method: String, retry_after: Duration },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn telegram(method: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Telegram {
            method: method.into(),
            description: description.into(),
        }
    }

    /// Whether the Bot API rejected an edit because the text did not change.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::Telegram { description, .. } if description.contains("message is not modified"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_modified_detection() {
        let err = Error::telegram(
            "editMessageText",
            "Bad Request: message is not modified: specified new message content is the same",
        );
        assert!(err.is_not_modified());
        assert!(!Error::telegram("editMessageText", "Bad Request: chat not found").is_not_modified());
        assert!(!Error::config("message is not modified").is_not_modified());
    }

    #[test]
    fn test_display() {
        let err = Error::telegram("sendMessage", "Forbidden: bot was blocked by the user");
        assert_eq!(
            err.to_string(),
            "Telegram API error in sendMessage: Forbidden: bot was blocked by the user"
        );
    }
}
