//! Core error types for upkeep-core.
//!
//! This module defines the error hierarchy using thiserror. Fetch errors
//! carry the platform they came from so the aggregator can report partial
//! failures per platform.

use thiserror::Error;

use crate::signal::Platform;

/// Core error type for upkeep-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Platform fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Credential store errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Assistant (summarize/search) errors
    #[error("Assistant error: {0}")]
    Assistant(#[from] AssistantError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from a single platform fetch.
///
/// The taxonomy matters: `AuthExpired` means the user has to reconnect,
/// `RateLimited` means skip this cycle, `ProviderUnavailable` means the
/// provider (or the network) is down. Unknown event shapes are never an
/// error; adapters degrade them to generic signals instead.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Provider rejected the credential (401/403)
    #[error("{platform}: credential expired or rejected, reconnect this platform")]
    AuthExpired { platform: Platform },

    /// Provider throttled us (429)
    #[error("{platform}: rate limited, skipping this cycle")]
    RateLimited { platform: Platform },

    /// Provider 5xx, network failure, or timeout
    #[error("{platform}: provider unavailable: {message}")]
    ProviderUnavailable { platform: Platform, message: String },

    /// Response arrived but could not be interpreted
    #[error("{platform}: unexpected payload: {message}")]
    Payload { platform: Platform, message: String },
}

impl FetchError {
    /// The platform this error came from.
    pub fn platform(&self) -> Platform {
        match self {
            FetchError::AuthExpired { platform }
            | FetchError::RateLimited { platform }
            | FetchError::ProviderUnavailable { platform, .. }
            | FetchError::Payload { platform, .. } => *platform,
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {message}")]
    OpenFailed { path: String, message: String },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Row could not be encoded for storage
    #[error("Failed to encode row: {0}")]
    EncodeFailed(String),

    /// Row lookup by id found nothing
    #[error("No {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read or write the config file
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(#[from] toml::de::Error),

    /// Failed to serialize configuration
    #[error("Failed to serialize configuration: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    /// Unknown key or unparsable value in a get/set operation
    #[error("Invalid config key or value: {0}")]
    Invalid(String),
}

/// Credential store errors.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// OS keyring operation failed
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Stored credential could not be parsed
    #[error("Stored credential is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// No credential stored for the platform
    #[error("Not connected to {platform}")]
    NotConnected { platform: Platform },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Contact name must be non-empty
    #[error("Contact name must not be empty")]
    EmptyName,

    /// Contact frequency must be a positive number of days
    #[error("Contact frequency must be at least one day")]
    NonPositiveFrequency,

    /// Archive requested before the contact lapsed far enough
    #[error("'{name}' is not eligible for archive: {days_overdue} days overdue, needs more than {required}")]
    NotArchiveEligible {
        name: String,
        days_overdue: i64,
        required: i64,
    },
}

/// Assistant (AI summarize/search) errors.
#[derive(Error, Debug)]
pub enum AssistantError {
    /// No API key available
    #[error("Assistant API key is missing; set OPENAI_API_KEY")]
    MissingApiKey,

    /// Configured base URL is not usable
    #[error("Invalid assistant base URL: {0}")]
    InvalidBaseUrl(String),

    /// Request failed at the transport or HTTP level
    #[error("Assistant request failed: {0}")]
    Communication(String),

    /// Assistant service throttled us
    #[error("Assistant rate limit exceeded")]
    RateLimited,

    /// Response arrived but had no usable content
    #[error("Unexpected assistant response: {0}")]
    InvalidResponse(String),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
