//! Onboarding use case
//!
//! Orchestrates the first-launch flow: one awaited photo-library permission
//! request, sync configuration edits, and the completion handoff to the
//! sync engine. Delegates state rules to the `OnboardingSession` entity and
//! I/O to the photo library and sync engine ports.
//!
//! ## Concurrency
//!
//! The session lives behind an async mutex that is never held across a
//! port call. Permission prompts are additionally serialized by a request
//! gate, so concurrent callers share one prompt: the second caller waits,
//! then observes the decision the first caller obtained. Every state
//! change is published on a watch channel; subscribers always observe the
//! latest snapshot and never a partially applied mutation.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use crate::{
    domain::{
        AccessGuidance, OnboardingSession, OnboardingStep, PhotoLibraryAccess, SessionId,
        SyncConfig,
    },
    ports::{IPhotoLibrary, ISyncEngine},
};

/// T051: Point-in-time view of the onboarding flow
///
/// Everything the presentation layer needs to render one screen. Built
/// fresh from the session on every read; nothing in it is cached between
/// reads, so it can never disagree with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingSnapshot {
    /// Session this snapshot was taken from
    pub session_id: SessionId,
    /// Last known photo-library grant
    pub access: PhotoLibraryAccess,
    /// Sync configuration values currently in effect
    pub config: SyncConfig,
    /// The screen the flow currently offers
    pub step: OnboardingStep,
    /// True while a blocked grant prevents the flow from advancing
    pub blocked: bool,
    /// Remediation guidance, present only while blocked
    pub guidance: Option<AccessGuidance>,
    /// When the flow completed, if it has
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnboardingSnapshot {
    fn of(session: &OnboardingSession) -> Self {
        Self {
            session_id: *session.id(),
            access: session.access(),
            config: session.config().snapshot(),
            step: session.step(),
            blocked: session.is_blocked(),
            guidance: if session.is_blocked() {
                session.access().guidance()
            } else {
                None
            },
            completed_at: session.completed_at(),
        }
    }
}

/// T052: Use case driving the first-launch onboarding flow
///
/// Coordinates the permission request, configuration edits, and the
/// one-time handoff of the frozen configuration to the sync engine.
pub struct OnboardingUseCase {
    photo_library: Arc<dyn IPhotoLibrary + Send + Sync>,
    sync_engine: Arc<dyn ISyncEngine + Send + Sync>,
    session: Mutex<OnboardingSession>,
    request_gate: Mutex<()>,
    events: watch::Sender<OnboardingSnapshot>,
}

impl OnboardingUseCase {
    /// Creates a new OnboardingUseCase around an existing session
    ///
    /// # Arguments
    ///
    /// * `photo_library` - Operating system photo-library permission port
    /// * `sync_engine` - Receiver of the frozen configuration on completion
    /// * `session` - Fresh or resumed session to drive
    pub fn new(
        photo_library: Arc<dyn IPhotoLibrary + Send + Sync>,
        sync_engine: Arc<dyn ISyncEngine + Send + Sync>,
        session: OnboardingSession,
    ) -> Self {
        let (events, _) = watch::channel(OnboardingSnapshot::of(&session));
        Self {
            photo_library,
            sync_engine,
            session: Mutex::new(session),
            request_gate: Mutex::new(()),
            events,
        }
    }

    /// Returns the current snapshot of the flow
    pub async fn state(&self) -> OnboardingSnapshot {
        OnboardingSnapshot::of(&*self.session.lock().await)
    }

    /// Subscribes to snapshot updates
    ///
    /// The receiver starts at the snapshot current at subscription time;
    /// every later state change replaces it.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OnboardingSnapshot> {
        self.events.subscribe()
    }

    /// Requests photo-library access from the operating system
    ///
    /// This method:
    /// 1. Returns the existing decision without prompting if one was reached
    /// 2. Otherwise awaits a single permission prompt via the port
    /// 3. Coerces an unavailable permission subsystem to a denied decision
    /// 4. Records the decision and publishes the updated snapshot
    ///
    /// The session lock is not held while the prompt is open, so state
    /// queries stay responsive during the dialog.
    pub async fn request_photos_access(&self) -> Result<OnboardingSnapshot> {
        let _gate = self.request_gate.lock().await;

        {
            let session = self.session.lock().await;
            if session.access().is_terminal() {
                return Ok(OnboardingSnapshot::of(&session));
            }
        }

        // A prompt that cannot be shown, or that resolves without a
        // decision, counts as a denial; the flow never dead-ends waiting.
        let decision = match self.photo_library.request_access().await {
            Ok(observed) if observed.is_terminal() => observed,
            Ok(_) | Err(_) => PhotoLibraryAccess::Denied,
        };

        let mut session = self.session.lock().await;
        session.record_decision(decision)?;
        Ok(self.publish(&session))
    }

    /// Re-reads the operating system grant and folds it into the session
    ///
    /// Called on explicit re-entry to the permission screen. External
    /// changes to a terminal grant are followed; an observation of
    /// `NotRequested` never reverts a reached decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant cannot be read; the session is left
    /// untouched in that case.
    pub async fn refresh_access(&self) -> Result<OnboardingSnapshot> {
        let observed = self
            .photo_library
            .current_status()
            .await
            .context("Failed to re-read photo library access")?;

        let mut session = self.session.lock().await;
        session.refresh_access(observed);
        Ok(self.publish(&session))
    }

    /// Enables or disables the start-date filter
    ///
    /// Enabling stamps the current instant as the default start date unless
    /// an explicit date is already present; disabling clears the date.
    pub async fn set_date_filter_enabled(&self, enabled: bool) -> Result<OnboardingSnapshot> {
        let mut session = self.session.lock().await;
        session.set_date_filter_enabled(enabled)?;
        Ok(self.publish(&session))
    }

    /// Sets an explicit sync start date
    ///
    /// Ignored without error while the date filter is disabled; no event
    /// is published in that case since nothing changed.
    pub async fn set_start_date(&self, date: DateTime<Utc>) -> Result<OnboardingSnapshot> {
        let mut session = self.session.lock().await;
        let applied = session.set_start_date(date)?;
        if applied {
            Ok(self.publish(&session))
        } else {
            Ok(OnboardingSnapshot::of(&session))
        }
    }

    /// Selects or deselects dry-run mode for the first sync
    pub async fn set_dry_run(&self, enabled: bool) -> Result<OnboardingSnapshot> {
        let mut session = self.session.lock().await;
        session.set_dry_run(enabled)?;
        Ok(self.publish(&session))
    }

    /// Completes the flow and hands the frozen configuration to the sync engine
    ///
    /// This method:
    /// 1. Verifies access is granted and freezes the configuration
    /// 2. Publishes the completed snapshot
    /// 3. Hands the frozen configuration to the sync engine, exactly once
    ///
    /// A repeat call returns the completed snapshot without touching the
    /// sync engine again. If the handoff itself fails the session stays
    /// completed and the error is surfaced to the caller.
    pub async fn complete_onboarding(&self) -> Result<OnboardingSnapshot> {
        let mut session = self.session.lock().await;
        if session.is_complete() {
            return Ok(OnboardingSnapshot::of(&session));
        }

        let config = session.complete()?;
        let snapshot = self.publish(&session);
        drop(session);

        self.sync_engine
            .begin_first_sync(config)
            .await
            .context("Failed to hand the frozen configuration to the sync engine")?;

        Ok(snapshot)
    }

    fn publish(&self, session: &OnboardingSession) -> OnboardingSnapshot {
        let snapshot = OnboardingSnapshot::of(session);
        // send_replace stores the value even with no live subscribers, so
        // late subscribers always start from the current state.
        self.events.send_replace(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex as StdMutex,
    };

    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::domain::DomainError;

    /// Scripted photo library that records how many prompts were shown
    ///
    /// A `None` status or decision makes the corresponding call fail.
    struct MockPhotoLibrary {
        status: StdMutex<Option<PhotoLibraryAccess>>,
        decision: Option<PhotoLibraryAccess>,
        requests: AtomicUsize,
    }

    impl MockPhotoLibrary {
        fn granting(decision: PhotoLibraryAccess) -> Self {
            Self {
                status: StdMutex::new(Some(PhotoLibraryAccess::NotRequested)),
                decision: Some(decision),
                requests: AtomicUsize::new(0),
            }
        }

        fn unavailable() -> Self {
            Self {
                status: StdMutex::new(None),
                decision: None,
                requests: AtomicUsize::new(0),
            }
        }

        fn set_status(&self, status: PhotoLibraryAccess) {
            *self.status.lock().unwrap() = Some(status);
        }

        fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IPhotoLibrary for MockPhotoLibrary {
        async fn current_status(&self) -> anyhow::Result<PhotoLibraryAccess> {
            self.status
                .lock()
                .unwrap()
                .ok_or_else(|| anyhow::anyhow!("permission store unreachable"))
        }

        async fn request_access(&self) -> anyhow::Result<PhotoLibraryAccess> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.decision
                .ok_or_else(|| anyhow::anyhow!("permission dialog unreachable"))
        }
    }

    /// Sync engine stub that records every handed-off configuration
    struct MockSyncEngine {
        handoffs: StdMutex<Vec<SyncConfig>>,
        fail: bool,
    }

    impl MockSyncEngine {
        fn new() -> Self {
            Self {
                handoffs: StdMutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                handoffs: StdMutex::new(Vec::new()),
                fail: true,
            }
        }

        fn handoffs(&self) -> Vec<SyncConfig> {
            self.handoffs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ISyncEngine for MockSyncEngine {
        async fn begin_first_sync(&self, config: SyncConfig) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("sync engine rejected the configuration");
            }
            self.handoffs.lock().unwrap().push(config);
            Ok(())
        }
    }

    fn create_test_usecase(
        library: MockPhotoLibrary,
        engine: MockSyncEngine,
    ) -> (OnboardingUseCase, Arc<MockPhotoLibrary>, Arc<MockSyncEngine>) {
        let library = Arc::new(library);
        let engine = Arc::new(engine);
        let session = OnboardingSession::new(PhotoLibraryAccess::NotRequested);
        let usecase = OnboardingUseCase::new(library.clone(), engine.clone(), session);
        (usecase, library, engine)
    }

    fn fixed_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    mod request_tests {
        use super::*;

        #[tokio::test]
        async fn test_request_records_granted_decision() {
            let (usecase, library, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Authorized),
                MockSyncEngine::new(),
            );

            let snapshot = usecase.request_photos_access().await.unwrap();

            assert_eq!(snapshot.access, PhotoLibraryAccess::Authorized);
            assert_eq!(snapshot.step, OnboardingStep::Settings);
            assert!(!snapshot.blocked);
            assert_eq!(library.request_count(), 1);
        }

        #[tokio::test]
        async fn test_request_is_not_repeated_after_decision() {
            let (usecase, library, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Authorized),
                MockSyncEngine::new(),
            );

            let first = usecase.request_photos_access().await.unwrap();
            let second = usecase.request_photos_access().await.unwrap();

            assert_eq!(first, second);
            assert_eq!(library.request_count(), 1);
        }

        #[tokio::test]
        async fn test_request_is_not_repeated_after_denial() {
            // A blocked decision is just as final as a granted one; the
            // user recovers through system settings, not a second prompt.
            let (usecase, library, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Denied),
                MockSyncEngine::new(),
            );

            usecase.request_photos_access().await.unwrap();
            usecase.request_photos_access().await.unwrap();

            assert_eq!(library.request_count(), 1);
        }

        #[tokio::test]
        async fn test_unavailable_subsystem_is_coerced_to_denied() {
            let (usecase, library, _) =
                create_test_usecase(MockPhotoLibrary::unavailable(), MockSyncEngine::new());

            let snapshot = usecase.request_photos_access().await.unwrap();

            assert_eq!(snapshot.access, PhotoLibraryAccess::Denied);
            assert!(snapshot.blocked);
            assert!(snapshot.guidance.is_some());
            assert_eq!(snapshot.step, OnboardingStep::Photos);
            assert_eq!(library.request_count(), 1);
        }

        #[tokio::test]
        async fn test_non_terminal_prompt_result_is_coerced_to_denied() {
            let (usecase, _, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::NotRequested),
                MockSyncEngine::new(),
            );

            let snapshot = usecase.request_photos_access().await.unwrap();
            assert_eq!(snapshot.access, PhotoLibraryAccess::Denied);
        }
    }

    mod settings_tests {
        use super::*;

        async fn granted_usecase() -> OnboardingUseCase {
            let (usecase, _, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Authorized),
                MockSyncEngine::new(),
            );
            usecase.request_photos_access().await.unwrap();
            usecase
        }

        #[tokio::test]
        async fn test_enable_date_filter_stamps_default_date() {
            let usecase = granted_usecase().await;

            let before = Utc::now();
            let snapshot = usecase.set_date_filter_enabled(true).await.unwrap();
            let after = Utc::now();

            let stamped = snapshot.config.start_date.unwrap();
            assert!(stamped >= before && stamped <= after);
        }

        #[tokio::test]
        async fn test_set_start_date_is_ignored_while_disabled() {
            let usecase = granted_usecase().await;
            let mut rx = usecase.subscribe();

            let snapshot = usecase.set_start_date(fixed_date()).await.unwrap();

            assert_eq!(snapshot.config.start_date, None);
            // Nothing changed, so nothing was published
            assert!(!rx.has_changed().unwrap());
        }

        #[tokio::test]
        async fn test_set_start_date_overrides_default() {
            let usecase = granted_usecase().await;

            usecase.set_date_filter_enabled(true).await.unwrap();
            let snapshot = usecase.set_start_date(fixed_date()).await.unwrap();

            assert_eq!(snapshot.config.start_date, Some(fixed_date()));
        }

        #[tokio::test]
        async fn test_dry_run_toggles_leave_start_date_untouched() {
            let usecase = granted_usecase().await;
            usecase.set_date_filter_enabled(true).await.unwrap();
            usecase.set_start_date(fixed_date()).await.unwrap();

            usecase.set_dry_run(false).await.unwrap();
            let snapshot = usecase.set_dry_run(true).await.unwrap();

            assert_eq!(snapshot.config.start_date, Some(fixed_date()));
            assert!(snapshot.config.dry_run);
        }

        #[tokio::test]
        async fn test_settings_are_refused_after_completion() {
            let usecase = granted_usecase().await;
            usecase.complete_onboarding().await.unwrap();

            let error = usecase.set_dry_run(false).await.unwrap_err();
            assert_eq!(
                error.downcast_ref::<DomainError>(),
                Some(&DomainError::AlreadyCompleted)
            );
        }
    }

    mod completion_tests {
        use super::*;

        #[tokio::test]
        async fn test_complete_hands_config_to_sync_engine_once() {
            let (usecase, _, engine) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Limited),
                MockSyncEngine::new(),
            );
            usecase.request_photos_access().await.unwrap();
            usecase.set_dry_run(false).await.unwrap();

            let first = usecase.complete_onboarding().await.unwrap();
            let second = usecase.complete_onboarding().await.unwrap();

            assert_eq!(first.step, OnboardingStep::Complete);
            assert_eq!(first, second);
            let handoffs = engine.handoffs();
            assert_eq!(handoffs.len(), 1);
            assert!(!handoffs[0].dry_run);
        }

        #[tokio::test]
        async fn test_complete_requires_granted_access() {
            let (usecase, _, engine) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Denied),
                MockSyncEngine::new(),
            );

            // Never requested
            let error = usecase.complete_onboarding().await.unwrap_err();
            assert!(matches!(
                error.downcast_ref::<DomainError>(),
                Some(DomainError::PreconditionViolation { .. })
            ));

            // Denied
            usecase.request_photos_access().await.unwrap();
            let error = usecase.complete_onboarding().await.unwrap_err();
            assert!(matches!(
                error.downcast_ref::<DomainError>(),
                Some(DomainError::PreconditionViolation { .. })
            ));

            assert!(engine.handoffs().is_empty());
        }

        #[tokio::test]
        async fn test_failed_handoff_surfaces_error_but_completes() {
            let (usecase, _, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Authorized),
                MockSyncEngine::failing(),
            );
            usecase.request_photos_access().await.unwrap();

            assert!(usecase.complete_onboarding().await.is_err());

            let state = usecase.state().await;
            assert_eq!(state.step, OnboardingStep::Complete);
        }
    }

    mod refresh_tests {
        use super::*;

        #[tokio::test]
        async fn test_refresh_follows_external_downgrade() {
            let (usecase, library, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Limited),
                MockSyncEngine::new(),
            );
            usecase.request_photos_access().await.unwrap();

            library.set_status(PhotoLibraryAccess::Denied);
            let snapshot = usecase.refresh_access().await.unwrap();

            assert_eq!(snapshot.access, PhotoLibraryAccess::Denied);
            assert!(snapshot.blocked);
        }

        #[tokio::test]
        async fn test_refresh_never_reverts_to_not_requested() {
            let (usecase, library, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Authorized),
                MockSyncEngine::new(),
            );
            usecase.request_photos_access().await.unwrap();

            library.set_status(PhotoLibraryAccess::NotRequested);
            let snapshot = usecase.refresh_access().await.unwrap();

            assert_eq!(snapshot.access, PhotoLibraryAccess::Authorized);
        }

        #[tokio::test]
        async fn test_refresh_error_leaves_state_untouched() {
            let (usecase, _, _) =
                create_test_usecase(MockPhotoLibrary::unavailable(), MockSyncEngine::new());

            assert!(usecase.refresh_access().await.is_err());

            let state = usecase.state().await;
            assert_eq!(state.access, PhotoLibraryAccess::NotRequested);
        }
    }

    mod observer_tests {
        use super::*;

        #[tokio::test]
        async fn test_subscriber_sees_each_transition() {
            let (usecase, _, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Authorized),
                MockSyncEngine::new(),
            );
            let mut rx = usecase.subscribe();
            assert_eq!(rx.borrow().step, OnboardingStep::Photos);

            usecase.request_photos_access().await.unwrap();
            rx.changed().await.unwrap();
            assert_eq!(rx.borrow_and_update().step, OnboardingStep::Settings);

            usecase.set_dry_run(false).await.unwrap();
            rx.changed().await.unwrap();
            assert!(!rx.borrow_and_update().config.dry_run);

            usecase.complete_onboarding().await.unwrap();
            rx.changed().await.unwrap();
            assert_eq!(rx.borrow_and_update().step, OnboardingStep::Complete);
        }

        #[tokio::test]
        async fn test_late_subscriber_starts_from_current_state() {
            let (usecase, _, _) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Authorized),
                MockSyncEngine::new(),
            );
            usecase.request_photos_access().await.unwrap();

            let rx = usecase.subscribe();
            assert_eq!(rx.borrow().access, PhotoLibraryAccess::Authorized);
        }
    }

    mod flow_tests {
        use super::*;

        #[tokio::test]
        async fn test_full_flow_with_date_filter() {
            let (usecase, _, engine) = create_test_usecase(
                MockPhotoLibrary::granting(PhotoLibraryAccess::Authorized),
                MockSyncEngine::new(),
            );

            usecase.request_photos_access().await.unwrap();
            usecase.set_date_filter_enabled(true).await.unwrap();
            usecase.set_start_date(fixed_date()).await.unwrap();
            usecase.set_dry_run(false).await.unwrap();
            let snapshot = usecase.complete_onboarding().await.unwrap();

            assert_eq!(snapshot.step, OnboardingStep::Complete);
            assert_eq!(snapshot.config.start_date, Some(fixed_date()));
            assert!(!snapshot.config.dry_run);
            assert_eq!(engine.handoffs(), vec![snapshot.config]);
        }

        #[tokio::test]
        async fn test_denied_flow_stays_blocked_with_guidance() {
            let (usecase, _, engine) =
                create_test_usecase(MockPhotoLibrary::unavailable(), MockSyncEngine::new());

            let snapshot = usecase.request_photos_access().await.unwrap();
            assert!(snapshot.blocked);
            let guidance = snapshot.guidance.unwrap();
            assert!(!guidance.suggestions.is_empty());

            assert!(usecase.complete_onboarding().await.is_err());
            assert!(engine.handoffs().is_empty());
        }
    }
}
