use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Discord API error: {0}")]
    #[diagnostic(code(kalenterivahti::discord_api))]
    DiscordApi(#[from] serenity::Error),

    #[error("Environment error: {0}")]
    #[diagnostic(code(kalenterivahti::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(kalenterivahti::config))]
    Config(String),

    /// Network, transport or parse failure while reading the calendar feed
    #[error("Calendar feed error: {0}")]
    #[diagnostic(code(kalenterivahti::calendar_feed))]
    Fetch(String),

    /// Notification could not be delivered
    #[error("Delivery error: {0}")]
    #[diagnostic(code(kalenterivahti::delivery))]
    Delivery(String),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(kalenterivahti::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(kalenterivahti::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Whether this error came from reading the calendar feed
    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch(_))
    }

    /// Whether this error came from delivering a notification
    pub fn is_delivery(&self) -> bool {
        matches!(self, Error::Delivery(_) | Error::DiscordApi(_))
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create calendar feed errors
pub fn fetch_error(message: &str) -> Error {
    Error::Fetch(message.to_string())
}

/// Helper to create delivery errors
pub fn delivery_error(message: &str) -> Error {
    Error::Delivery(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(fetch_error("timeout").is_fetch());
        assert!(!fetch_error("timeout").is_delivery());
        assert!(delivery_error("channel gone").is_delivery());
        assert!(!config_error("bad").is_fetch());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            env_error("ICAL_URL").to_string(),
            "Environment error: Missing environment variable: ICAL_URL"
        );
        assert_eq!(
            fetch_error("HTTP 500").to_string(),
            "Calendar feed error: HTTP 500"
        );
    }
}
