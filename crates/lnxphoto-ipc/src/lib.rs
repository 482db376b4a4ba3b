//! LNXPhoto IPC - D-Bus communication library
//!
//! Provides the D-Bus service that onboarding UI clients use to
//! communicate with the running LNXPhoto daemon via the session bus.
//!
//! # Interfaces
//! - `com.enigmora.LNXPhoto.Onboarding` - First-launch onboarding flow

pub mod service;
