//! Sync engine handoff port (driving/primary boundary)
//!
//! This module defines the single point of contact between onboarding and
//! the synchronization engine. The engine itself (scanning, diffing,
//! uploading) lives outside this crate; onboarding only delivers the
//! completed configuration to it, exactly once.
//!
//! ## Design Notes
//!
//! - The configuration is passed by value; after handoff the flow's copy
//!   is frozen and the engine owns its own.
//! - Implementations may start the engine directly or persist the
//!   configuration for the engine's first run.

use crate::domain::SyncConfig;

// ============================================================================
// T042: ISyncEngine trait
// ============================================================================

/// Port trait for delivering the onboarding result to the sync engine
#[async_trait::async_trait]
pub trait ISyncEngine: Send + Sync {
    /// Hands the frozen configuration to the engine for its first run
    ///
    /// Called once, when onboarding completes. `config.dry_run = true`
    /// means scan and log only; `config.start_date = Some(t)` excludes
    /// assets captured before `t`.
    async fn begin_first_sync(&self, config: SyncConfig) -> anyhow::Result<()>;
}
