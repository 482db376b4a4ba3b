//! Use cases (interactors) for LNXPhoto onboarding
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`OnboardingUseCase`] - Permission request, configuration edits,
//!   completion handoff, and snapshot publication

pub mod onboarding;

pub use onboarding::{OnboardingSnapshot, OnboardingUseCase};
