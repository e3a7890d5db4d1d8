use chrono::{Duration, Utc};
use clap::Subcommand;
use upkeep_core::{CredentialStore, KeyringCredentials, Platform, PlatformCredential};

#[derive(Subcommand)]
pub enum AuthAction {
    /// YouTube: login / logout / status
    Youtube {
        #[command(subcommand)]
        action: AuthOp,
    },
    /// GitHub: login / logout / status
    Github {
        #[command(subcommand)]
        action: AuthOp,
    },
    /// Twitch: login / logout / status
    Twitch {
        #[command(subcommand)]
        action: AuthOp,
    },
    /// Connection status for every platform
    Status,
}

#[derive(Subcommand)]
pub enum AuthOp {
    /// Store a credential for the platform
    Login {
        /// OAuth access token
        #[arg(long)]
        token: Option<String>,
        /// OAuth refresh token, if the provider issued one
        #[arg(long)]
        refresh_token: Option<String>,
        /// Token lifetime in seconds from now
        #[arg(long)]
        expires_in: Option<i64>,
        /// Application client ID (required for Twitch)
        #[arg(long)]
        client_id: Option<String>,
        /// Your numeric user id on the platform (required for Twitch)
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Remove the stored credential
    Logout,
    /// Check connection status
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Youtube { action: op } => handle_token_platform(Platform::Youtube, op),
        AuthAction::Github { action: op } => handle_token_platform(Platform::Github, op),
        AuthAction::Twitch { action: op } => handle_twitch(op),
        AuthAction::Status => handle_status_all(),
    }
}

/// YouTube and GitHub need nothing beyond the tokens.
fn handle_token_platform(
    platform: Platform,
    op: AuthOp,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = KeyringCredentials;
    match op {
        AuthOp::Login {
            token,
            refresh_token,
            expires_in,
            ..
        } => {
            let token = token.ok_or("--token required")?;
            store.store(&build_credential(platform, token, refresh_token, expires_in))?;
            println!("{platform} connected");
        }
        AuthOp::Logout => {
            store.delete(platform)?;
            println!("{platform} disconnected");
        }
        AuthOp::Status => print_status(&store, platform)?,
    }
    Ok(())
}

fn handle_twitch(op: AuthOp) -> Result<(), Box<dyn std::error::Error>> {
    let store = KeyringCredentials;
    match op {
        AuthOp::Login {
            token,
            refresh_token,
            expires_in,
            client_id,
            user_id,
        } => {
            let token = token.ok_or("--token required for Twitch")?;
            let client_id = client_id.ok_or("--client-id required for Twitch")?;
            let user_id = user_id.ok_or("--user-id required for Twitch")?;
            let mut credential =
                build_credential(Platform::Twitch, token, refresh_token, expires_in);
            credential.client_id = Some(client_id);
            credential.remote_user_id = Some(user_id);
            store.store(&credential)?;
            println!("twitch connected");
        }
        AuthOp::Logout => {
            store.delete(Platform::Twitch)?;
            println!("twitch disconnected");
        }
        AuthOp::Status => print_status(&store, Platform::Twitch)?,
    }
    Ok(())
}

fn build_credential(
    platform: Platform,
    token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
) -> PlatformCredential {
    let mut credential = PlatformCredential::new(platform, token);
    credential.refresh_token = refresh_token;
    credential.expires_at = expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
    credential
}

fn print_status(
    store: &KeyringCredentials,
    platform: Platform,
) -> Result<(), Box<dyn std::error::Error>> {
    match store.load(platform)? {
        Some(credential) if credential.is_valid(Utc::now()) => println!(
            "connected since {}",
            credential.connected_at.format("%Y-%m-%d")
        ),
        Some(_) => println!("expired"),
        None => println!("not connected"),
    }
    Ok(())
}

fn handle_status_all() -> Result<(), Box<dyn std::error::Error>> {
    let store = KeyringCredentials;
    let now = Utc::now();
    for platform in Platform::ALL {
        let state = match store.load(platform)? {
            Some(credential) if credential.is_valid(now) => "connected",
            Some(_) => "expired",
            None => "not connected",
        };
        println!("{platform}: {state}");
    }
    Ok(())
}
