//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IPhotoLibrary`] - The operating system's photo-library permission
//!   subsystem (desktop portal on Linux)
//! - [`ISyncEngine`] - Handoff boundary to the external sync engine

pub mod photo_library;
pub mod sync_engine;

pub use photo_library::IPhotoLibrary;
pub use sync_engine::ISyncEngine;
