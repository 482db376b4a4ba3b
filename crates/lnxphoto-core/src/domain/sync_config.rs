//! Initial synchronization configuration
//!
//! This module defines the SyncConfig value handed to the sync engine when
//! onboarding completes, and the SyncConfigBuilder that holds it in mutable
//! form during the flow.
//!
//! The builder maintains one invariant after every mutation, not only at
//! read time: `start_date` is `Some` exactly while the date filter is
//! enabled. "Filter enabled" is never stored separately; it is always
//! derived from the presence of the date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// T024: Configuration consumed by the sync engine on its first run
///
/// Handed by value at the end of onboarding and immutable afterwards from
/// this crate's perspective. `dry_run = true` means scan and log, perform
/// no network writes; `start_date = Some(t)` excludes assets captured
/// before `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Exclude assets captured before this instant (None = sync everything)
    pub start_date: Option<DateTime<Utc>>,
    /// Perform analysis and logging only, no uploads
    pub dry_run: bool,
}

impl SyncConfig {
    /// Returns true if the start-date filter is active
    pub fn is_date_filter_enabled(&self) -> bool {
        self.start_date.is_some()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            // Safe default: a first run performs no uploads
            dry_run: true,
        }
    }
}

/// Mutable holder for the onboarding-time configuration
///
/// All mutations go through the setters below; each one leaves the
/// date-filter invariant intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfigBuilder {
    start_date: Option<DateTime<Utc>>,
    dry_run: bool,
}

impl SyncConfigBuilder {
    /// Creates a builder with the default configuration
    pub fn new() -> Self {
        let defaults = SyncConfig::default();
        Self {
            start_date: defaults.start_date,
            dry_run: defaults.dry_run,
        }
    }

    /// Recreates a builder from a previously taken snapshot
    /// (for reconstitution of a completed flow)
    pub fn from_snapshot(config: SyncConfig) -> Self {
        Self {
            start_date: config.start_date,
            dry_run: config.dry_run,
        }
    }

    // --- Getters ---

    /// Returns the configured start date, if the filter is enabled
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    /// Returns whether dry-run mode is selected
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Derived query: the filter is enabled exactly while a date is present
    pub fn is_date_filter_enabled(&self) -> bool {
        self.start_date.is_some()
    }

    // --- Mutations ---

    /// Enables or disables the start-date filter
    ///
    /// Disabling clears the date unconditionally. Enabling populates it
    /// with the current time only when no date exists yet; a date chosen
    /// earlier in the session is kept, never re-stamped.
    pub fn set_date_filter_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.start_date = None;
        } else if self.start_date.is_none() {
            self.start_date = Some(Utc::now());
        }
    }

    /// Sets an explicit start date while the filter is enabled
    ///
    /// Calling this while the filter is disabled is a caller error (the
    /// control is not shown in that state); the call is ignored and
    /// `false` is returned. No invariant is violated by the no-op.
    pub fn set_start_date(&mut self, date: DateTime<Utc>) -> bool {
        if self.start_date.is_some() {
            self.start_date = Some(date);
            true
        } else {
            false
        }
    }

    /// Selects or deselects dry-run mode; independent of the date filter
    pub fn set_dry_run(&mut self, enabled: bool) {
        self.dry_run = enabled;
    }

    /// Returns an immutable copy for handoff to the sync engine
    pub fn snapshot(&self) -> SyncConfig {
        SyncConfig {
            start_date: self.start_date,
            dry_run: self.dry_run,
        }
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
