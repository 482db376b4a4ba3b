//! LNXPhoto Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `PhotoLibraryAccess`, `SyncConfig`, `OnboardingSession`
//! - **Use cases** - `OnboardingUseCase` (the onboarding composition root)
//! - **Port definitions** - Traits for adapters: `IPhotoLibrary`, `ISyncEngine`
//! - **State machine** - Photo-library authorization and flow-step states
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
