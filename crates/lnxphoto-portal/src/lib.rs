//! LNXPhoto Portal - desktop permission adapter
//!
//! Implements the photo-library port against the XDG desktop portal
//! services on the session bus:
//! - permission store lookups and writes (grant persistence)
//! - the access dialog (the one-time permission prompt)
//!
//! ## Modules
//!
//! - [`proxies`] - zbus proxy definitions for the portal interfaces
//! - [`library`] - [`PortalPhotoLibrary`], the photo-library port implementation

pub mod library;
pub mod proxies;

pub use library::PortalPhotoLibrary;
