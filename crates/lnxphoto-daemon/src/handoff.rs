//! Completion handoff adapter
//!
//! Receives the frozen sync configuration when onboarding completes and
//! makes it durable: the application config records the completion and is
//! written back to disk, where the sync service picks it up.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use lnxphoto_core::config::Config;
use lnxphoto_core::domain::SyncConfig;
use lnxphoto_core::ports::ISyncEngine;

/// T093: Sync-engine port backed by the persisted configuration
///
/// The daemon does not run the sync engine in-process. Completing
/// onboarding hands the frozen configuration over by marking the
/// application config completed and persisting it.
pub struct SyncHandoff {
    path: PathBuf,
    config: Mutex<Config>,
}

impl SyncHandoff {
    /// Creates a new SyncHandoff writing to the given config path
    pub fn new(path: PathBuf, config: Config) -> Self {
        Self {
            path,
            config: Mutex::new(config),
        }
    }
}

#[async_trait]
impl ISyncEngine for SyncHandoff {
    async fn begin_first_sync(&self, config: SyncConfig) -> Result<()> {
        let completed = {
            let mut stored = self
                .config
                .lock()
                .map_err(|_| anyhow::anyhow!("Configuration lock poisoned"))?;
            stored.record_completion(config);
            stored.clone()
        };

        completed
            .save(&self.path)
            .context("Failed to persist the completed onboarding configuration")?;

        info!(
            path = %self.path.display(),
            start_date = ?config.start_date,
            dry_run = config.dry_run,
            "Recorded onboarding completion"
        );
        Ok(())
    }
}
