//! # Upkeep Core Library
//!
//! This library provides the core logic for Upkeep, a personal dashboard
//! that aggregates activity from the platforms your friends are active on
//! and nudges you to stay in touch with the people who matter. All
//! operations are available through a standalone CLI binary; any GUI is a
//! thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Platform Adapters**: Per-platform fetchers (YouTube, GitHub, Twitch)
//!   that normalize provider payloads into canonical [`Signal`]s
//! - **Signal Feed**: Concurrent aggregator that merges adapter output into
//!   one deduplicated, newest-first feed with per-platform failures
//! - **Nudges**: Pure urgency math over the contact roster, deciding who is
//!   overdue and how strongly to surface them
//! - **Storage**: SQLite contact roster and signal cache plus TOML-based
//!   configuration
//! - **Assistant**: OpenAI-backed summarize, search, and outreach
//!   suggestions over the collected signals
//!
//! ## Key Components
//!
//! - [`SignalFeed`]: Concurrent multi-platform aggregator
//! - [`Database`]: Contact and signal persistence
//! - [`Config`]: Application configuration management
//! - [`PlatformAdapter`]: Trait implemented by every platform fetcher
//! - [`CredentialStore`]: Trait over the OS keyring for platform tokens

pub mod assistant;
pub mod contact;
pub mod credentials;
pub mod error;
pub mod feed;
pub mod nudge;
pub mod platforms;
pub mod signal;
pub mod storage;

pub use assistant::{Assistant, OpenAiAssistant};
pub use contact::{Contact, PlatformLink, Tier};
pub use credentials::{CredentialStore, KeyringCredentials, MemoryCredentials, PlatformCredential};
pub use error::{
    AssistantError, ConfigError, CoreError, CredentialError, DatabaseError, FetchError,
    ValidationError,
};
pub use feed::{FeedOutcome, PlatformFailure, SignalFeed};
pub use nudge::{ContactHealth, Nudge, Urgency};
pub use platforms::{GitHubAdapter, PlatformAdapter, TwitchAdapter, YouTubeAdapter};
pub use signal::{Platform, Signal, SignalKind};
pub use storage::{Config, ContactRepository, Database, SignalRepository};
