//! D-Bus service implementation for LNXPhoto
//!
//! Provides the D-Bus interface that the onboarding UI uses to drive the
//! first-launch flow in the running LNXPhoto daemon:
//!
//! - `com.enigmora.LNXPhoto.Onboarding` - Permission request, sync
//!   configuration, and completion
//!
//! Signals are emitted on every state change, on access transitions, and
//! once when the flow completes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lnxphoto_core::usecases::{OnboardingSnapshot, OnboardingUseCase};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// D-Bus well-known name for the LNXPhoto daemon
pub const DBUS_NAME: &str = "com.enigmora.LNXPhoto";

/// D-Bus object path for the service
pub const DBUS_PATH: &str = "/com/enigmora/LNXPhoto";

// ============================================================================
// T081: Onboarding interface
// ============================================================================

/// D-Bus interface driving the first-launch onboarding flow
///
/// Thin JSON-over-D-Bus shell around `OnboardingUseCase`; every rule about
/// ordering, permission decisions, and configuration lives in the use case.
pub struct OnboardingInterface {
    usecase: Arc<OnboardingUseCase>,
}

impl OnboardingInterface {
    /// Creates a new OnboardingInterface around the shared use case
    pub fn new(usecase: Arc<OnboardingUseCase>) -> Self {
        Self { usecase }
    }

    fn to_json(snapshot: &OnboardingSnapshot) -> String {
        serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string())
    }
}

#[zbus::interface(name = "com.enigmora.LNXPhoto.Onboarding")]
impl OnboardingInterface {
    /// Returns the current onboarding state as a JSON string
    ///
    /// The returned JSON contains:
    /// - `session_id`: Identifier of the running onboarding session
    /// - `access`: Photo-library grant (not_requested, authorized, limited,
    ///   denied, restricted)
    /// - `config`: Sync configuration values (`start_date`, `dry_run`)
    /// - `step`: Screen the flow currently offers (photos, settings, complete)
    /// - `blocked`: Whether a blocked grant prevents advancing
    /// - `guidance`: Remediation guidance, present only while blocked
    async fn get_state(&self) -> String {
        Self::to_json(&self.usecase.state().await)
    }

    /// Requests photo-library access, showing the system dialog if needed
    ///
    /// An existing decision is returned without prompting again.
    ///
    /// # Returns
    /// The resulting access status string
    async fn request_photos_access(&self) -> String {
        info!("RequestPhotosAccess called");
        match self.usecase.request_photos_access().await {
            Ok(snapshot) => snapshot.access.to_string(),
            Err(e) => {
                warn!(error = %e, "Photo library access request failed");
                self.usecase.state().await.access.to_string()
            }
        }
    }

    /// Re-reads the photo-library grant from the operating system
    ///
    /// A grant that cannot be read leaves the state unchanged.
    ///
    /// # Returns
    /// The access status after the re-read
    async fn refresh_access(&self) -> String {
        debug!("RefreshAccess called");
        match self.usecase.refresh_access().await {
            Ok(snapshot) => snapshot.access.to_string(),
            Err(e) => {
                warn!(error = %e, "Photo library grant re-read failed");
                self.usecase.state().await.access.to_string()
            }
        }
    }

    /// Enables or disables the sync start-date filter
    ///
    /// # Returns
    /// `true` if the change was applied, `false` if the flow refused it
    /// (already completed)
    async fn set_date_filter_enabled(&self, enabled: bool) -> bool {
        match self.usecase.set_date_filter_enabled(enabled).await {
            Ok(_) => true,
            Err(e) => {
                warn!(enabled, error = %e, "SetDateFilterEnabled refused");
                false
            }
        }
    }

    /// Sets an explicit sync start date
    ///
    /// # Arguments
    /// * `date` - RFC 3339 timestamp, e.g. "2024-03-15T12:00:00Z"
    ///
    /// # Returns
    /// `true` if the date was applied; `false` if the timestamp was
    /// malformed, the date filter is disabled, or the flow already
    /// completed
    async fn set_start_date(&self, date: String) -> bool {
        let parsed = match DateTime::parse_from_rfc3339(&date) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(e) => {
                warn!(date = %date, error = %e, "SetStartDate received a malformed timestamp");
                return false;
            }
        };

        match self.usecase.set_start_date(parsed).await {
            Ok(snapshot) => snapshot.config.start_date == Some(parsed),
            Err(e) => {
                warn!(date = %date, error = %e, "SetStartDate refused");
                false
            }
        }
    }

    /// Selects or deselects dry-run mode for the first sync
    ///
    /// # Returns
    /// `true` if the change was applied
    async fn set_dry_run(&self, enabled: bool) -> bool {
        match self.usecase.set_dry_run(enabled).await {
            Ok(_) => true,
            Err(e) => {
                warn!(enabled, error = %e, "SetDryRun refused");
                false
            }
        }
    }

    /// Completes onboarding and hands the configuration to the sync engine
    ///
    /// # Returns
    /// On success, the frozen sync configuration as JSON. On refusal, a
    /// JSON object with an `error` field describing why.
    async fn complete(&self) -> String {
        info!("Complete called");
        match self.usecase.complete_onboarding().await {
            Ok(snapshot) => {
                serde_json::to_string(&snapshot.config).unwrap_or_else(|_| "{}".to_string())
            }
            Err(e) => {
                warn!(error = %e, "Onboarding completion refused");
                serde_json::json!({ "error": e.to_string() }).to_string()
            }
        }
    }

    // T083: D-Bus signals

    /// Emitted on every onboarding state change with the full state JSON
    #[zbus(signal)]
    async fn state_changed(signal_ctxt: &zbus::SignalContext<'_>, state: &str) -> zbus::Result<()>;

    /// Emitted when the photo-library access status changes
    #[zbus(signal)]
    async fn access_changed(
        signal_ctxt: &zbus::SignalContext<'_>,
        status: &str,
    ) -> zbus::Result<()>;

    /// Emitted once when the flow completes, with the frozen config JSON
    #[zbus(signal)]
    async fn onboarding_completed(
        signal_ctxt: &zbus::SignalContext<'_>,
        config: &str,
    ) -> zbus::Result<()>;
}

// ============================================================================
// T082: Signal forwarder
// ============================================================================

/// Forwards snapshot updates from the watch channel to D-Bus signals
///
/// Emits `StateChanged` for every update, `AccessChanged` when the grant
/// moved, and `OnboardingCompleted` exactly once when the flow finishes.
/// Runs until the snapshot channel closes.
fn spawn_signal_forwarder(
    connection: zbus::Connection,
    mut events: watch::Receiver<OnboardingSnapshot>,
) {
    tokio::spawn(async move {
        let ctxt = match zbus::SignalContext::new(&connection, DBUS_PATH) {
            Ok(ctxt) => ctxt,
            Err(e) => {
                warn!(error = %e, "Failed to create signal context, state signals disabled");
                return;
            }
        };

        let mut last = events.borrow_and_update().clone();
        while events.changed().await.is_ok() {
            let snapshot = events.borrow_and_update().clone();

            let state_json = serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string());
            if let Err(e) = OnboardingInterface::state_changed(&ctxt, &state_json).await {
                debug!(error = %e, "Failed to emit StateChanged signal");
            }

            if snapshot.access != last.access {
                let status = snapshot.access.to_string();
                if let Err(e) = OnboardingInterface::access_changed(&ctxt, &status).await {
                    debug!(error = %e, "Failed to emit AccessChanged signal");
                }
            }

            if snapshot.completed_at.is_some() && last.completed_at.is_none() {
                let config_json =
                    serde_json::to_string(&snapshot.config).unwrap_or_else(|_| "{}".to_string());
                if let Err(e) = OnboardingInterface::onboarding_completed(&ctxt, &config_json).await
                {
                    debug!(error = %e, "Failed to emit OnboardingCompleted signal");
                }
            }

            last = snapshot;
        }

        debug!("Snapshot channel closed, signal forwarder exiting");
    });
}

// ============================================================================
// DbusService - high-level service orchestrator
// ============================================================================

/// High-level D-Bus service for the onboarding interface
///
/// Creates a `zbus::Connection` on the session bus, registers the
/// onboarding interface at the well-known path, requests the well-known
/// name `com.enigmora.LNXPhoto`, and starts the signal forwarder.
pub struct DbusService {
    usecase: Arc<OnboardingUseCase>,
}

impl DbusService {
    /// Creates a new DbusService around the shared use case
    pub fn new(usecase: Arc<OnboardingUseCase>) -> Self {
        Self { usecase }
    }

    /// Starts the D-Bus service on the session bus
    ///
    /// Registers the interface and requests the well-known name. Returns
    /// the connection which must be kept alive for the service to remain
    /// active.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The session bus is not available
    /// - The well-known name is already owned (another instance running)
    /// - Interface registration fails
    pub async fn start(&self) -> anyhow::Result<zbus::Connection> {
        info!("Starting D-Bus service on session bus");

        let onboarding = OnboardingInterface::new(Arc::clone(&self.usecase));

        let connection = zbus::connection::Builder::session()?
            .name(DBUS_NAME)?
            .serve_at(DBUS_PATH, onboarding)?
            .build()
            .await?;

        spawn_signal_forwarder(connection.clone(), self.usecase.subscribe());

        info!(
            name = DBUS_NAME,
            path = DBUS_PATH,
            "D-Bus service started successfully"
        );

        Ok(connection)
    }

    /// Attempts to acquire the D-Bus well-known name to act as a single-instance lock
    ///
    /// If the name is already owned by another process, returns `false`.
    /// This is used by the daemon to ensure only one instance runs at a time.
    pub async fn try_acquire_name() -> anyhow::Result<bool> {
        let connection = zbus::Connection::session().await?;
        let dbus_proxy = zbus::fdo::DBusProxy::new(&connection).await?;

        // Check if the name has an owner
        match dbus_proxy.get_name_owner(DBUS_NAME.try_into()?).await {
            Ok(_owner) => {
                // Name is already owned by another process
                Ok(false)
            }
            Err(_) => {
                // Name is not owned, the daemon can claim it
                Ok(true)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use lnxphoto_core::domain::{OnboardingSession, PhotoLibraryAccess, SyncConfig};
    use lnxphoto_core::ports::{IPhotoLibrary, ISyncEngine};

    /// Photo library scripted to resolve every prompt the same way
    struct ScriptedLibrary {
        decision: PhotoLibraryAccess,
    }

    #[async_trait]
    impl IPhotoLibrary for ScriptedLibrary {
        async fn current_status(&self) -> anyhow::Result<PhotoLibraryAccess> {
            Ok(self.decision)
        }

        async fn request_access(&self) -> anyhow::Result<PhotoLibraryAccess> {
            Ok(self.decision)
        }
    }

    /// Sync engine stub that accepts every handoff
    struct AcceptingEngine;

    #[async_trait]
    impl ISyncEngine for AcceptingEngine {
        async fn begin_first_sync(&self, _config: SyncConfig) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn make_interface(decision: PhotoLibraryAccess) -> OnboardingInterface {
        let usecase = Arc::new(OnboardingUseCase::new(
            Arc::new(ScriptedLibrary { decision }),
            Arc::new(AcceptingEngine),
            OnboardingSession::new(PhotoLibraryAccess::NotRequested),
        ));
        OnboardingInterface::new(usecase)
    }

    #[test]
    fn test_dbus_constants() {
        assert_eq!(DBUS_NAME, "com.enigmora.LNXPhoto");
        assert_eq!(DBUS_PATH, "/com/enigmora/LNXPhoto");
    }

    #[tokio::test]
    async fn test_get_state_serializes_snapshot() {
        let iface = make_interface(PhotoLibraryAccess::Authorized);

        let state_json = iface.get_state().await;
        let state: serde_json::Value = serde_json::from_str(&state_json).unwrap();

        assert_eq!(state["access"], "not_requested");
        assert_eq!(state["step"], "photos");
        assert_eq!(state["blocked"], false);
        assert_eq!(state["config"]["dry_run"], true);
        assert!(state["config"]["start_date"].is_null());
        assert!(state["guidance"].is_null());
        assert!(state["session_id"].is_string());
    }

    #[tokio::test]
    async fn test_request_photos_access_returns_status() {
        let iface = make_interface(PhotoLibraryAccess::Authorized);

        let status = iface.request_photos_access().await;
        assert_eq!(status, "authorized");

        let state: serde_json::Value =
            serde_json::from_str(&iface.get_state().await).unwrap();
        assert_eq!(state["step"], "settings");
    }

    #[tokio::test]
    async fn test_denied_state_carries_guidance() {
        let iface = make_interface(PhotoLibraryAccess::Denied);

        let status = iface.request_photos_access().await;
        assert_eq!(status, "denied");

        let state: serde_json::Value =
            serde_json::from_str(&iface.get_state().await).unwrap();
        assert_eq!(state["blocked"], true);
        assert!(state["guidance"]["message"].is_string());
        assert!(state["guidance"]["suggestions"].is_array());
    }

    #[tokio::test]
    async fn test_set_start_date_requires_rfc3339() {
        let iface = make_interface(PhotoLibraryAccess::Authorized);
        iface.request_photos_access().await;
        assert!(iface.set_date_filter_enabled(true).await);

        assert!(!iface.set_start_date("not-a-date".to_string()).await);
        assert!(!iface.set_start_date("2024-03-15".to_string()).await);
        assert!(
            iface
                .set_start_date("2024-03-15T12:00:00Z".to_string())
                .await
        );
    }

    #[tokio::test]
    async fn test_set_start_date_not_applied_while_filter_disabled() {
        let iface = make_interface(PhotoLibraryAccess::Authorized);
        iface.request_photos_access().await;

        assert!(
            !iface
                .set_start_date("2024-03-15T12:00:00Z".to_string())
                .await
        );
    }

    #[tokio::test]
    async fn test_settings_refused_after_completion() {
        let iface = make_interface(PhotoLibraryAccess::Authorized);
        iface.request_photos_access().await;
        iface.complete().await;

        assert!(!iface.set_dry_run(false).await);
        assert!(!iface.set_date_filter_enabled(true).await);
    }

    #[tokio::test]
    async fn test_complete_returns_frozen_config() {
        let iface = make_interface(PhotoLibraryAccess::Limited);
        iface.request_photos_access().await;
        assert!(iface.set_dry_run(false).await);

        let config_json = iface.complete().await;
        let config: serde_json::Value = serde_json::from_str(&config_json).unwrap();

        assert_eq!(config["dry_run"], false);
        assert!(config["start_date"].is_null());
        assert!(config["error"].is_null());
    }

    #[tokio::test]
    async fn test_complete_refused_without_grant() {
        let iface = make_interface(PhotoLibraryAccess::Denied);
        iface.request_photos_access().await;

        let reply: serde_json::Value =
            serde_json::from_str(&iface.complete().await).unwrap();
        assert!(reply["error"].is_string());

        let state: serde_json::Value =
            serde_json::from_str(&iface.get_state().await).unwrap();
        assert_eq!(state["step"], "photos");
    }

    #[test]
    fn test_dbus_service_constructs() {
        let usecase = Arc::new(OnboardingUseCase::new(
            Arc::new(ScriptedLibrary {
                decision: PhotoLibraryAccess::Authorized,
            }),
            Arc::new(AcceptingEngine),
            OnboardingSession::new(PhotoLibraryAccess::NotRequested),
        ));
        let _service = DbusService::new(usecase);
    }
}
