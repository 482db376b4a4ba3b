//! Domain error types
//!
//! This module defines the closed error taxonomy for onboarding operations:
//! permission-subsystem unavailability, completion precondition violations,
//! and invalid access-state transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The operating system cannot service a permission query or request
    /// (e.g. no photo library backing store, portal service missing).
    /// Recovered locally by coercing the grant to denied; never shown
    /// to the presentation layer as an error.
    #[error("Permission subsystem unavailable: {0}")]
    PermissionUnavailable(String),

    /// Onboarding completion was requested while access is not granted.
    /// Indicates a presentation-layer bug; reported, never retried.
    #[error("Onboarding cannot complete while photo library access is {status}")]
    PreconditionViolation {
        /// The access status that blocked completion
        status: String,
    },

    /// A configuration mutation arrived after the flow completed and the
    /// configuration was frozen.
    #[error("Onboarding already completed; configuration is frozen")]
    AlreadyCompleted,

    /// Invalid access state transition attempt
    #[error("Invalid access transition from {from} to {to}")]
    InvalidAccessTransition {
        /// The current access state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}
