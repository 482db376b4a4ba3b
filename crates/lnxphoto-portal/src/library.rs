//! PortalPhotoLibrary - photo-library port implementation for the desktop portal
//!
//! Reads the recorded photo-library grant from the portal permission store
//! and raises the one-time permission dialog through the portal access
//! backend, recording the outcome back into the store.
//!
//! ## Design Notes
//!
//! - Grant strings in the store (`full`, `limited`, `no`, `disabled`) map
//!   one-to-one onto `PhotoLibraryAccess`. `disabled` is written by
//!   administrative tooling, never by the dialog.
//! - A missing table or id in the store means no decision was ever
//!   recorded, not an error.
//! - Portal failures surface as `DomainError::PermissionUnavailable`
//!   context on the anyhow chain; the caller decides how to degrade.
//! - The daemon runs as a trusted session service and talks to the portal
//!   backend (`org.freedesktop.impl.portal.desktop.gtk`) directly rather
//!   than through the sandbox frontend.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zbus::zvariant::ObjectPath;
use zbus::Connection;

use lnxphoto_core::domain::{DomainError, PhotoLibraryAccess};
use lnxphoto_core::ports::IPhotoLibrary;

use crate::proxies::{
    AccessDialogOptions, AccessDialogResults, AccessProxy, PermissionStoreProxy,
    ACCESS_BACKEND_NAME,
};

/// Permission-store table holding photo grants
const PERMISSION_TABLE: &str = "photos";

/// Resource id of the device photo library within the table
const PERMISSION_ID: &str = "library";

/// Application id the grants are recorded under
const APP_ID: &str = "com.enigmora.LNXPhoto";

/// Error name the permission store replies with for unwritten tables/ids
const NOT_FOUND_ERROR: &str = "org.freedesktop.portal.Error.NotFound";

// Grant strings as stored in the permission store
const GRANT_FULL: &str = "full";
const GRANT_LIMITED: &str = "limited";
const GRANT_DENIED: &str = "no";
const GRANT_DISABLED: &str = "disabled";

// Dialog text and the scope choice group
const DIALOG_TITLE: &str = "Allow LNXPhoto to access your photo library?";
const DIALOG_SUBTITLE: &str = "LNXPhoto backs up your photos to your media server.";
const DIALOG_BODY: &str = "Access can cover the entire library or only albums you select. \
     You can change this later in your system privacy settings.";
const SCOPE_CHOICE_ID: &str = "scope";
const SCOPE_FULL: &str = "full";
const SCOPE_ALBUMS: &str = "albums";

/// Wraps a portal transport error as a permission-subsystem failure
fn unavailable(error: impl std::fmt::Display) -> anyhow::Error {
    anyhow::Error::new(DomainError::PermissionUnavailable(error.to_string()))
}

/// Maps a stored grant string onto a domain access state
fn parse_grant(grant: &str) -> Option<PhotoLibraryAccess> {
    match grant {
        GRANT_FULL => Some(PhotoLibraryAccess::Authorized),
        GRANT_LIMITED => Some(PhotoLibraryAccess::Limited),
        GRANT_DENIED => Some(PhotoLibraryAccess::Denied),
        GRANT_DISABLED => Some(PhotoLibraryAccess::Restricted),
        _ => None,
    }
}

/// Grant string recorded for a decision
///
/// `NotRequested` yields `None`: there is no decision to record.
fn grant_string(access: PhotoLibraryAccess) -> Option<&'static str> {
    match access {
        PhotoLibraryAccess::Authorized => Some(GRANT_FULL),
        PhotoLibraryAccess::Limited => Some(GRANT_LIMITED),
        PhotoLibraryAccess::Denied => Some(GRANT_DENIED),
        PhotoLibraryAccess::Restricted => Some(GRANT_DISABLED),
        PhotoLibraryAccess::NotRequested => None,
    }
}

/// Maps a dialog outcome onto the access decision
///
/// Response 0 means granted; the selected scope narrows it to full or
/// album-limited access. Any other response (declined, cancelled,
/// dismissed) is a denial.
fn dialog_decision(response: u32, scope: Option<&str>) -> PhotoLibraryAccess {
    if response != 0 {
        return PhotoLibraryAccess::Denied;
    }
    match scope {
        Some(SCOPE_ALBUMS) => PhotoLibraryAccess::Limited,
        _ => PhotoLibraryAccess::Authorized,
    }
}

/// Extracts the selected scope option from the dialog results
fn selected_scope(results: &AccessDialogResults) -> Option<String> {
    results.choices.as_ref().and_then(|choices| {
        choices
            .iter()
            .find(|(group, _)| group.as_str() == SCOPE_CHOICE_ID)
            .map(|(_, option)| option.clone())
    })
}

// ============================================================================
// T071: PortalPhotoLibrary
// ============================================================================

/// Photo-library adapter backed by the desktop portal services
pub struct PortalPhotoLibrary {
    permission_store: PermissionStoreProxy<'static>,
    access: AccessProxy<'static>,
}

impl PortalPhotoLibrary {
    /// Connects to the session bus and binds both portal proxies
    pub async fn connect() -> Result<Self> {
        let connection = Connection::session()
            .await
            .map_err(unavailable)
            .context("Failed to connect to the session bus")?;
        Self::with_connection(&connection).await
    }

    /// Binds the portal proxies on an existing connection
    pub async fn with_connection(connection: &Connection) -> Result<Self> {
        let permission_store = PermissionStoreProxy::new(connection)
            .await
            .map_err(unavailable)
            .context("Failed to bind the permission store proxy")?;

        let access = AccessProxy::builder(connection)
            .destination(ACCESS_BACKEND_NAME)
            .map_err(unavailable)
            .context("Invalid access portal destination")?
            .build()
            .await
            .map_err(unavailable)
            .context("Failed to bind the access portal proxy")?;

        Ok(Self {
            permission_store,
            access,
        })
    }

    /// Writes the decision into the permission store so later reads agree
    /// with it
    ///
    /// Failures are logged, not propagated: the decision stands for this
    /// process either way, and the next run re-prompts at worst.
    async fn record_decision(&self, decision: PhotoLibraryAccess) {
        let Some(grant) = grant_string(decision) else {
            return;
        };
        if let Err(e) = self
            .permission_store
            .set_permission(PERMISSION_TABLE, true, PERMISSION_ID, APP_ID, &[grant])
            .await
        {
            warn!(error = %e, "Failed to record photo library decision in the permission store");
        }
    }
}

#[async_trait::async_trait]
impl IPhotoLibrary for PortalPhotoLibrary {
    /// Reads the recorded grant without any user interaction
    async fn current_status(&self) -> Result<PhotoLibraryAccess> {
        debug!("PortalPhotoLibrary::current_status");
        let (permissions, _data) = match self
            .permission_store
            .lookup(PERMISSION_TABLE, PERMISSION_ID)
            .await
        {
            Ok(reply) => reply,
            // The table or id does not exist until something writes it;
            // no decision was ever recorded.
            Err(zbus::Error::MethodError(ref name, _, _)) if name.as_str() == NOT_FOUND_ERROR => {
                return Ok(PhotoLibraryAccess::NotRequested);
            }
            Err(e) => {
                return Err(unavailable(e)).context("Failed to read the photo permission store");
            }
        };

        let access = match permissions.get(APP_ID).and_then(|grants| grants.first()) {
            Some(grant) => parse_grant(grant).unwrap_or_else(|| {
                warn!(grant = %grant, "Unrecognized grant string in permission store");
                PhotoLibraryAccess::NotRequested
            }),
            None => PhotoLibraryAccess::NotRequested,
        };

        debug!(access = %access, "Read photo library grant");
        Ok(access)
    }

    /// Shows the permission dialog and records the outcome
    ///
    /// The prompt is skipped entirely under an administrative lock: the
    /// dialog cannot override policy, so offering it would mislead.
    async fn request_access(&self) -> Result<PhotoLibraryAccess> {
        let current = self.current_status().await?;
        if current == PhotoLibraryAccess::Restricted {
            debug!("Photo library access restricted by policy, skipping dialog");
            return Ok(PhotoLibraryAccess::Restricted);
        }

        let token = Uuid::new_v4().simple().to_string();
        let handle = ObjectPath::try_from(format!("/com/enigmora/LNXPhoto/request/{token}"))
            .context("Failed to build request handle")?;

        let options = AccessDialogOptions {
            grant_label: Some("Allow".to_string()),
            deny_label: Some("Don't Allow".to_string()),
            icon: Some("com.enigmora.LNXPhoto".to_string()),
            choices: Some(vec![(
                SCOPE_CHOICE_ID.to_string(),
                "Which photos can LNXPhoto read?".to_string(),
                vec![
                    (SCOPE_FULL.to_string(), "Entire photo library".to_string()),
                    (SCOPE_ALBUMS.to_string(), "Selected albums only".to_string()),
                ],
                SCOPE_FULL.to_string(),
            )]),
        };

        debug!(handle = %handle, "Presenting photo library access dialog");
        let (response, results) = self
            .access
            .access_dialog(
                &handle,
                APP_ID,
                "",
                DIALOG_TITLE,
                DIALOG_SUBTITLE,
                DIALOG_BODY,
                &options,
            )
            .await
            .map_err(unavailable)
            .context("Failed to present the photo library access dialog")?;

        let scope = selected_scope(&results);
        let decision = dialog_decision(response, scope.as_deref());
        info!(response, scope = ?scope, decision = %decision, "Access dialog resolved");

        self.record_decision(decision).await;
        Ok(decision)
    }
}
