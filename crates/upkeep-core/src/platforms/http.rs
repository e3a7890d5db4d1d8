//! Shared HTTP plumbing for the platform adapters.

use reqwest::StatusCode;

use crate::error::FetchError;
use crate::signal::Platform;

pub(crate) const USER_AGENT: &str = concat!("upkeep/", env!("CARGO_PKG_VERSION"));

/// Classify a non-success HTTP status into the adapter error taxonomy.
pub(crate) fn ensure_success(platform: Platform, status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(FetchError::AuthExpired { platform })
        }
        StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited { platform }),
        s if s.is_server_error() => Err(FetchError::ProviderUnavailable {
            platform,
            message: format!("HTTP {}", s.as_u16()),
        }),
        s => Err(FetchError::Payload {
            platform,
            message: format!("HTTP {}", s.as_u16()),
        }),
    }
}

/// Classify a reqwest transport error. Decode failures mean the provider
/// answered with something we cannot read; everything else (timeouts,
/// DNS, connection resets) counts as the provider being unavailable.
pub(crate) fn transport_error(platform: Platform, err: reqwest::Error) -> FetchError {
    if err.is_decode() {
        FetchError::Payload {
            platform,
            message: err.to_string(),
        }
    } else {
        FetchError::ProviderUnavailable {
            platform,
            message: err.to_string(),
        }
    }
}
