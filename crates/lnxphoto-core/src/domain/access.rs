//! Photo library access state
//!
//! This module defines the PhotoLibraryAccess state machine that tracks
//! the operating system's permission grant for reading the photo library,
//! and the remediation guidance shown when access is blocked.

use serde::{Deserialize, Serialize};

/// T021: The operating system's photo-library permission grant
///
/// Starts at `NotRequested` and reaches a terminal variant through exactly
/// one permission request. Terminal variants may change between each other
/// when the grant is re-read (the user can edit system settings externally)
/// but never revert to `NotRequested` within a process lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoLibraryAccess {
    /// No permission request has been made yet
    #[default]
    NotRequested,
    /// Full read access to the photo library
    Authorized,
    /// Read access to a user-selected subset of the library
    Limited,
    /// The user refused access
    Denied,
    /// Access is blocked by system policy (e.g. administrator lock)
    Restricted,
}

impl PhotoLibraryAccess {
    /// Returns true if the grant allows reading the library (fully or partially)
    pub fn is_granted(&self) -> bool {
        matches!(
            self,
            PhotoLibraryAccess::Authorized | PhotoLibraryAccess::Limited
        )
    }

    /// Returns true if a permission decision has been reached
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PhotoLibraryAccess::NotRequested)
    }

    /// Returns true if the grant blocks onboarding and requires the user
    /// to act outside the application
    pub fn is_blocked(&self) -> bool {
        matches!(
            self,
            PhotoLibraryAccess::Denied | PhotoLibraryAccess::Restricted
        )
    }

    /// Returns true if `next` is a permitted transition target
    ///
    /// Any state may move to a terminal variant; nothing moves back to
    /// `NotRequested` once a decision exists.
    pub fn can_transition_to(&self, next: PhotoLibraryAccess) -> bool {
        next.is_terminal() || !self.is_terminal()
    }

    /// Folds a re-read of the operating system's grant into this state
    ///
    /// Terminal variants track whatever the system reports, except that an
    /// observation of `NotRequested` never replaces a reached decision.
    #[must_use]
    pub fn reconcile(&self, observed: PhotoLibraryAccess) -> PhotoLibraryAccess {
        if self.can_transition_to(observed) {
            observed
        } else {
            *self
        }
    }

    /// T022: Remediation guidance for blocked grants
    ///
    /// Returns `None` for states that need no user-facing explanation.
    pub fn guidance(&self) -> Option<AccessGuidance> {
        match self {
            PhotoLibraryAccess::Denied => Some(AccessGuidance {
                message: "LNXPhoto cannot read your photo library because access was declined."
                    .to_string(),
                suggestions: vec![
                    "Open your system privacy settings and allow photo library access for LNXPhoto."
                        .to_string(),
                    "Return to this screen afterwards; the grant is re-checked automatically."
                        .to_string(),
                ],
            }),
            PhotoLibraryAccess::Restricted => Some(AccessGuidance {
                message: "Photo library access is blocked by a system policy.".to_string(),
                suggestions: vec![
                    "Ask your administrator to unlock photo library access for this device."
                        .to_string(),
                ],
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for PhotoLibraryAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhotoLibraryAccess::NotRequested => write!(f, "not_requested"),
            PhotoLibraryAccess::Authorized => write!(f, "authorized"),
            PhotoLibraryAccess::Limited => write!(f, "limited"),
            PhotoLibraryAccess::Denied => write!(f, "denied"),
            PhotoLibraryAccess::Restricted => write!(f, "restricted"),
        }
    }
}

/// Textual guidance shown when access is denied or restricted
///
/// Rendered verbatim by the presentation layer; the flow itself offers no
/// in-app recovery for blocked grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGuidance {
    /// Human-readable explanation of the blocked state
    pub message: String,
    /// Actionable steps the user can take outside the application
    pub suggestions: Vec<String>,
}
