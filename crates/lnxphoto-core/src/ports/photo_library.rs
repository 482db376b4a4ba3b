//! Photo library permission port (driven/secondary port)
//!
//! This module defines the interface to the operating system's photo-library
//! permission subsystem. On Linux the implementation talks to the desktop
//! portal (permission store + access dialog); other platforms map onto their
//! native permission primitives.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because failure details are adapter-specific;
//!   adapters attach `DomainError::PermissionUnavailable` as context when
//!   the subsystem itself is missing.
//! - `request_access` may show a one-time system dialog and suspends until
//!   the decision resolves. The platform enforces single-prompt semantics;
//!   implementations must not try to force a second prompt.
//! - Callers (the gate) coerce a failed request to a denied grant so the
//!   state machine always reaches a decision; errors from this port never
//!   reach the presentation layer.

use crate::domain::PhotoLibraryAccess;

// ============================================================================
// T041: IPhotoLibrary trait
// ============================================================================

/// Port trait for querying and requesting photo-library access
#[async_trait::async_trait]
pub trait IPhotoLibrary: Send + Sync {
    /// Reads the current grant without side effects
    ///
    /// Never blocks on user interaction and never triggers a prompt.
    async fn current_status(&self) -> anyhow::Result<PhotoLibraryAccess>;

    /// Requests photo-library access from the operating system
    ///
    /// Suspends while the system permission dialog (if any) is open and
    /// resolves to the decided grant. If a decision already exists the
    /// platform returns it without prompting again.
    async fn request_access(&self) -> anyhow::Result<PhotoLibraryAccess>;
}
