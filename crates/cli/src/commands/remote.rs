//! Remote collection commands.
//!
//! # Environment Variables
//!
//! - `CARRYOVER_REMOTE_URL` - Base URL of the remote persistence API
//! - `CARRYOVER_REMOTE_TOKEN` - Bearer token for the remote persistence API

use carryover_core::{CollectionKind, UserId};
use carryover_sync::config::RemoteConfig;
use carryover_sync::remote::{HttpRemoteStore, RemoteStore};
use tracing::info;

use super::describe;

fn connect() -> Result<HttpRemoteStore, Box<dyn std::error::Error>> {
    let config = RemoteConfig::from_env()?;
    info!(base_url = %config.base_url, "Using remote persistence API");
    Ok(HttpRemoteStore::new(&config)?)
}

/// Log every record of an account's collection.
///
/// # Errors
///
/// Returns an error if configuration is missing or the request fails.
pub async fn list(user: UserId, kind: CollectionKind) -> Result<(), Box<dyn std::error::Error>> {
    let remote = connect()?;
    let records = remote.list(kind, user).await?;

    info!("{kind} for user {user}: {} item(s)", records.len());
    for record in &records {
        info!("  {}", describe(record));
    }

    Ok(())
}

/// Delete every record of an account's collection.
///
/// # Errors
///
/// Returns an error if configuration is missing or the request fails.
pub async fn clear(user: UserId, kind: CollectionKind) -> Result<(), Box<dyn std::error::Error>> {
    let remote = connect()?;
    remote.clear(kind, user).await?;

    info!("Cleared {kind} for user {user}");
    Ok(())
}
