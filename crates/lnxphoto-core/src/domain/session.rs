//! Onboarding session entity
//!
//! This module defines the OnboardingSession entity: the single owner of
//! the photo-library grant and the in-progress sync configuration for one
//! run of the first-launch flow.
//!
//! The flow step is never stored; it derives from the grant and the
//! completion mark, so it cannot fall out of sync with either.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    access::PhotoLibraryAccess,
    errors::DomainError,
    newtypes::SessionId,
    sync_config::{SyncConfig, SyncConfigBuilder},
};

/// T027: The screen the flow currently offers
///
/// `Start → Photos{not_requested} → Photos{granted} → Settings → Complete`,
/// with `Photos{denied|restricted}` a blocked dead end the user can only
/// leave by acting outside the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    /// Waiting for a photo-library permission decision
    Photos,
    /// Access granted; collecting the initial sync configuration
    Settings,
    /// Flow finished; configuration handed off
    Complete,
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OnboardingStep::Photos => write!(f, "photos"),
            OnboardingStep::Settings => write!(f, "settings"),
            OnboardingStep::Complete => write!(f, "complete"),
        }
    }
}

/// T026: One run of the first-launch onboarding flow
///
/// Owns the aggregated `PhotoLibraryAccess` value and the mutable
/// `SyncConfigBuilder`. Completion freezes the configuration: the frozen
/// snapshot is what the sync engine receives, and later mutation attempts
/// are refused as presentation-layer bugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingSession {
    /// Unique identifier for this session (used in logs and state payloads)
    id: SessionId,
    /// When the session started
    started_at: DateTime<Utc>,
    /// Last known photo-library grant
    access: PhotoLibraryAccess,
    /// In-progress configuration
    config: SyncConfigBuilder,
    /// Snapshot taken at completion; None while the flow is running
    frozen: Option<SyncConfig>,
    /// When the flow completed (None if still running)
    completed_at: Option<DateTime<Utc>>,
}

impl OnboardingSession {
    /// Creates a new session starting from the operating system's current grant
    pub fn new(initial_access: PhotoLibraryAccess) -> Self {
        Self {
            id: SessionId::new(),
            started_at: Utc::now(),
            access: initial_access,
            config: SyncConfigBuilder::new(),
            frozen: None,
            completed_at: None,
        }
    }

    /// Reconstitutes a completed session from persisted state
    ///
    /// Used when the service starts after onboarding already finished: the
    /// flow is not restarted, the frozen configuration and completion time
    /// are restored as-is.
    pub fn resume(
        access: PhotoLibraryAccess,
        config: SyncConfig,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            started_at: completed_at,
            access,
            config: SyncConfigBuilder::from_snapshot(config),
            frozen: Some(config),
            completed_at: Some(completed_at),
        }
    }

    // --- Getters ---

    /// Returns the session's unique identifier
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns when the session started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the last known photo-library grant
    pub fn access(&self) -> PhotoLibraryAccess {
        self.access
    }

    /// Returns the in-progress configuration
    pub fn config(&self) -> &SyncConfigBuilder {
        &self.config
    }

    /// Returns when the flow completed, if it has
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns true once the flow has completed
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Returns true while a blocked grant prevents the flow from advancing
    pub fn is_blocked(&self) -> bool {
        !self.is_complete() && self.access.is_blocked()
    }

    /// Derived query: the step the flow currently offers
    pub fn step(&self) -> OnboardingStep {
        if self.is_complete() {
            OnboardingStep::Complete
        } else if self.access.is_granted() {
            OnboardingStep::Settings
        } else {
            OnboardingStep::Photos
        }
    }

    // --- State mutations ---

    /// Records the outcome of a permission request
    ///
    /// The gate always delivers a terminal variant (an unavailable
    /// permission subsystem is coerced to denied before this point), so a
    /// non-terminal decision is rejected rather than recorded.
    pub fn record_decision(&mut self, decision: PhotoLibraryAccess) -> Result<(), DomainError> {
        if !decision.is_terminal() || !self.access.can_transition_to(decision) {
            return Err(DomainError::InvalidAccessTransition {
                from: self.access.to_string(),
                to: decision.to_string(),
            });
        }
        self.access = decision;
        Ok(())
    }

    /// Folds a re-read of the system grant into the session
    ///
    /// Re-reads happen on explicit re-entry only. A terminal grant follows
    /// external changes but never reverts to not-requested.
    pub fn refresh_access(&mut self, observed: PhotoLibraryAccess) {
        self.access = self.access.reconcile(observed);
    }

    /// Enables or disables the start-date filter
    ///
    /// # Errors
    /// Returns `DomainError::AlreadyCompleted` once the flow has finished.
    pub fn set_date_filter_enabled(&mut self, enabled: bool) -> Result<(), DomainError> {
        self.config_for_update()?.set_date_filter_enabled(enabled);
        Ok(())
    }

    /// Sets an explicit start date; reports whether the value was applied
    ///
    /// # Errors
    /// Returns `DomainError::AlreadyCompleted` once the flow has finished.
    pub fn set_start_date(&mut self, date: DateTime<Utc>) -> Result<bool, DomainError> {
        Ok(self.config_for_update()?.set_start_date(date))
    }

    /// Selects or deselects dry-run mode
    ///
    /// # Errors
    /// Returns `DomainError::AlreadyCompleted` once the flow has finished.
    pub fn set_dry_run(&mut self, enabled: bool) -> Result<(), DomainError> {
        self.config_for_update()?.set_dry_run(enabled);
        Ok(())
    }

    /// Completes the flow and freezes the configuration
    ///
    /// Callable only while access is granted (authorized or limited); any
    /// other grant is a precondition violation and no configuration is
    /// returned. A second call returns the already-frozen snapshot.
    pub fn complete(&mut self) -> Result<SyncConfig, DomainError> {
        if let Some(frozen) = self.frozen {
            return Ok(frozen);
        }
        if !self.access.is_granted() {
            return Err(DomainError::PreconditionViolation {
                status: self.access.to_string(),
            });
        }

        let snapshot = self.config.snapshot();
        self.frozen = Some(snapshot);
        self.completed_at = Some(Utc::now());
        Ok(snapshot)
    }

    fn config_for_update(&mut self) -> Result<&mut SyncConfigBuilder, DomainError> {
        if self.is_complete() {
            return Err(DomainError::AlreadyCompleted);
        }
        Ok(&mut self.config)
    }
}
