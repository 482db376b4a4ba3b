//! zbus proxy definitions for the XDG portal interfaces
//!
//! Only the methods LNXPhoto calls are declared; the portal interfaces
//! carry more surface than the onboarding flow needs.

use std::collections::HashMap;

use zbus::zvariant::{DeserializeDict, ObjectPath, OwnedValue, SerializeDict, Type};

/// Session-bus name of the desktop portal backend providing the access dialog.
///
/// Backends export their interfaces under their own name, all at the same
/// object path.
pub const ACCESS_BACKEND_NAME: &str = "org.freedesktop.impl.portal.desktop.gtk";

/// One multiple-choice group in the access dialog:
/// (group id, group label, options as (id, label), default option id).
pub type AccessChoice = (String, String, Vec<(String, String)>, String);

/// Options for [`AccessProxy::access_dialog`].
#[derive(Debug, Default, SerializeDict, Type)]
#[zvariant(signature = "dict")]
pub struct AccessDialogOptions {
    /// Label for the affirmative button
    pub grant_label: Option<String>,
    /// Label for the refusing button
    pub deny_label: Option<String>,
    /// Icon name shown next to the dialog text
    pub icon: Option<String>,
    /// Multiple-choice groups rendered inside the dialog
    pub choices: Option<Vec<AccessChoice>>,
}

/// Results returned by [`AccessProxy::access_dialog`].
#[derive(Debug, Default, DeserializeDict, Type)]
#[zvariant(signature = "dict")]
pub struct AccessDialogResults {
    /// Selected choice ids, paired as (group id, option id)
    pub choices: Option<Vec<(String, String)>>,
}

/// Persistent per-application permission grants, keyed by table and resource id.
#[zbus::proxy(
    interface = "org.freedesktop.impl.portal.PermissionStore",
    default_service = "org.freedesktop.impl.portal.PermissionStore",
    default_path = "/org/freedesktop/impl/portal/PermissionStore"
)]
pub trait PermissionStore {
    /// Returns the per-application grants and auxiliary data for one resource.
    ///
    /// Fails with `org.freedesktop.portal.Error.NotFound` when the table or
    /// id was never written.
    fn lookup(
        &self,
        table: &str,
        id: &str,
    ) -> zbus::Result<(HashMap<String, Vec<String>>, OwnedValue)>;

    /// Writes the grant strings for one application, creating the table
    /// and id as needed.
    fn set_permission(
        &self,
        table: &str,
        create: bool,
        id: &str,
        app: &str,
        permissions: &[&str],
    ) -> zbus::Result<()>;
}

/// Modal permission dialog presented by the desktop shell.
#[zbus::proxy(
    interface = "org.freedesktop.impl.portal.Access",
    default_path = "/org/freedesktop/portal/desktop"
)]
pub trait Access {
    /// Presents the dialog and blocks until the user resolves it.
    ///
    /// Returns the response code (0 granted, 1 cancelled, 2 aborted) and
    /// the selected choice options.
    #[allow(clippy::too_many_arguments)]
    fn access_dialog(
        &self,
        handle: &ObjectPath<'_>,
        app_id: &str,
        parent_window: &str,
        title: &str,
        subtitle: &str,
        body: &str,
        options: &AccessDialogOptions,
    ) -> zbus::Result<(u32, AccessDialogResults)>;
}
