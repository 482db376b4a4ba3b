//! Domain entities and business logic
//!
//! This module contains the core domain types for LNXPhoto onboarding:
//! - Photo-library access states and remediation guidance
//! - The sync configuration value and its builder
//! - The onboarding session entity and derived flow step
//! - Newtypes for type-safe identifiers
//! - Domain-specific error types

pub mod access;
pub mod errors;
pub mod newtypes;
pub mod session;
pub mod sync_config;

// Re-export commonly used types
pub use access::{AccessGuidance, PhotoLibraryAccess};
pub use errors::DomainError;
pub use newtypes::SessionId;
pub use session::{OnboardingSession, OnboardingStep};
pub use sync_config::{SyncConfig, SyncConfigBuilder};
