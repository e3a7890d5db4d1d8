use async_trait::async_trait;

use crate::credentials::PlatformCredential;
use crate::error::FetchError;
use crate::signal::{Platform, Signal};

/// Every platform adapter implements this trait.
///
/// Adapters are stateless between calls. They hold a shared HTTP client
/// and an API base (swappable for tests); the credential arrives with
/// each fetch. An adapter returns everything it could normalize or a
/// single classified error, never a mix:
///
/// - 401/403 from the provider maps to [`FetchError::AuthExpired`]
/// - 429 maps to [`FetchError::RateLimited`]
/// - 5xx, timeouts and connection failures map to
///   [`FetchError::ProviderUnavailable`]
/// - undecodable bodies map to [`FetchError::Payload`]
///
/// Unknown but well-formed items never error: adapters degrade them to
/// a generic activity signal instead of dropping them.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Which platform this adapter serves.
    fn platform(&self) -> Platform;

    /// Human-readable platform name for display surfaces.
    fn display_name(&self) -> &'static str {
        self.platform().display_name()
    }

    /// Fetch recent activity and normalize it into signals.
    ///
    /// Order of the returned signals is the provider's; the feed layer
    /// re-sorts after merging.
    async fn fetch_signals(
        &self,
        credential: &PlatformCredential,
    ) -> Result<Vec<Signal>, FetchError>;
}
