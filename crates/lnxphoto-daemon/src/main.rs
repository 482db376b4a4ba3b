//! LNXPhoto Daemon - First-launch onboarding service
//!
//! This binary runs as a session service and handles:
//! - The first-launch onboarding flow (photo permission, sync settings)
//! - D-Bus interface for UI clients
//! - Persisting the frozen configuration on completion
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon wires the desktop-portal adapter and the completion handoff
//! into the onboarding use case, exposes the use case over D-Bus, then
//! parks until a shutdown signal arrives. The flow itself is driven
//! entirely by UI calls; after completion the daemon keeps serving state
//! so the UI can render the finished flow.

mod handoff;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use lnxphoto_core::config::{Config, LoggingConfig};
use lnxphoto_core::domain::{OnboardingSession, PhotoLibraryAccess};
use lnxphoto_core::ports::IPhotoLibrary;
use lnxphoto_core::usecases::OnboardingUseCase;
use lnxphoto_ipc::service::{DbusService, DBUS_NAME};
use lnxphoto_portal::PortalPhotoLibrary;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handoff::SyncHandoff;

// ============================================================================
// T091: Command-line interface
// ============================================================================

/// Command-line arguments for lnxphotod
#[derive(Debug, Parser)]
#[command(name = "lnxphotod", about = "LNXPhoto onboarding daemon", version)]
struct Cli {
    /// Path to the configuration file (defaults to the XDG location)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines regardless of the configured format
    #[arg(long)]
    log_json: bool,
}

/// Initializes tracing from the logging configuration
///
/// `RUST_LOG` overrides the configured level when set.
fn init_tracing(logging: &LoggingConfig, force_json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if force_json || logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

// ============================================================================
// T092: DaemonService struct
// ============================================================================

/// Main daemon service that wires the onboarding flow together
///
/// Holds the configuration, its on-disk location, and a cancellation
/// token for graceful shutdown.
struct DaemonService {
    /// Where the configuration is persisted on completion
    config_path: PathBuf,
    /// Application configuration loaded from YAML
    config: Config,
    /// Token for signalling graceful shutdown
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a new DaemonService
    fn new(config_path: PathBuf, config: Config, shutdown: CancellationToken) -> Self {
        Self {
            config_path,
            config,
            shutdown,
        }
    }

    /// Runs the daemon
    ///
    /// 1. Connects the portal adapter and reads the initial grant
    /// 2. Builds a fresh or resumed onboarding session
    /// 3. Starts the D-Bus service
    /// 4. Parks until a shutdown signal arrives
    async fn run(&self) -> Result<()> {
        // Without a session bus the daemon can serve nothing
        let photo_library = PortalPhotoLibrary::connect()
            .await
            .context("Failed to connect to the desktop portal")?;

        // An unreadable permission store degrades to a fresh start; a
        // decision is still only reached through the permission request.
        let initial_access = match photo_library.current_status().await {
            Ok(access) => access,
            Err(e) => {
                warn!(error = %e, "Could not read the initial photo library grant");
                PhotoLibraryAccess::NotRequested
            }
        };
        info!(access = %initial_access, "Read initial photo library grant");

        let session = match self.config.resume_state() {
            Some((sync_config, completed_at)) => {
                info!(completed_at = %completed_at, "Resuming completed onboarding");
                OnboardingSession::resume(initial_access, sync_config, completed_at)
            }
            None => OnboardingSession::new(initial_access),
        };

        let usecase = Arc::new(OnboardingUseCase::new(
            Arc::new(photo_library),
            Arc::new(SyncHandoff::new(
                self.config_path.clone(),
                self.config.clone(),
            )),
            session,
        ));

        // Start D-Bus service (this also acquires the well-known name)
        let dbus_service = DbusService::new(Arc::clone(&usecase));
        let _dbus_connection = match dbus_service.start().await {
            Ok(conn) => {
                info!("D-Bus service started, acquired name {}", DBUS_NAME);
                conn
            }
            Err(e) => {
                let err_str = format!("{e:#}");
                if err_str.contains("already taken")
                    || err_str.contains("already owned")
                    || err_str.contains("NameTaken")
                    || err_str.contains("name already")
                {
                    error!(
                        "Another instance of lnxphotod is already running (D-Bus name {} is taken)",
                        DBUS_NAME
                    );
                    anyhow::bail!(
                        "Another instance of lnxphotod is already running. \
                         Stop it before starting a new one."
                    );
                }
                return Err(e).context("Failed to start D-Bus service");
            }
        };

        // The flow is driven entirely over D-Bus; park until shutdown.
        self.shutdown.cancelled().await;
        info!("Shutdown signal received");

        Ok(())
    }
}

// ============================================================================
// T094: Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
///
/// This function is spawned as a task that listens for OS signals and
/// cancels the provided token when a shutdown signal is received.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration must load before tracing init so the configured
    // level and format can take effect.
    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    init_tracing(&config.logging, cli.log_json);

    info!("LNXPhoto daemon starting (lnxphotod)");
    info!(config_path = %config_path.display(), "Loaded configuration");

    for issue in config.validate() {
        warn!(field = %issue.field, message = %issue.message, "Configuration issue");
    }

    // Create cancellation token for propagation to all tasks
    let shutdown_token = CancellationToken::new();

    // Spawn signal handler task
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    // Create and run the daemon service
    let service = DaemonService::new(config_path, config, shutdown_token.clone());

    let result = service.run().await;

    match &result {
        Ok(()) => info!("LNXPhoto daemon shut down gracefully"),
        Err(e) => error!(error = %e, "LNXPhoto daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
