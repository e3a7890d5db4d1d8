pub mod github;
pub(crate) mod http;
pub mod traits;
pub mod twitch;
pub mod youtube;

pub use github::GitHubAdapter;
pub use traits::PlatformAdapter;
pub use twitch::TwitchAdapter;
pub use youtube::YouTubeAdapter;
