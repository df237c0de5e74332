//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::bootstrap;
use crate::config::{DaemonConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::files::FileStore;
use crate::scheduler::ReminderScheduler;
use crate::storage::{InMemoryStorage, PostgresStorage, Storage};
use gea_workflow::FeeCalculator;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// GEA Portal daemon server
pub struct Server {
    config: DaemonConfig,
    storage: Arc<dyn Storage>,
    files: Arc<FileStore>,
    fees: FeeCalculator,
    scheduler: Arc<ReminderScheduler>,
    trigger_rx: mpsc::Receiver<()>,
}

impl Server {
    /// Create a new server with the given configuration
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let storage: Arc<dyn Storage> = match &config.storage {
            StorageConfig::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Arc::new(InMemoryStorage::new())
            }
            StorageConfig::Postgres {
                url,
                max_connections,
                connect_timeout_secs,
            } => Arc::new(
                PostgresStorage::new(url, *max_connections, *connect_timeout_secs).await?,
            ),
        };

        bootstrap::ensure_admin(storage.as_ref(), &config.bootstrap).await?;

        let files = Arc::new(FileStore::new(
            config.files.upload_dir.clone(),
            config.files.template_dir.clone(),
        ));
        files.ensure_dirs().await?;

        let fees = FeeCalculator::new(config.finance.gea_fee_bps)
            .map_err(|e| DaemonError::Config(e.to_string()))?;

        let (scheduler, trigger_rx) =
            ReminderScheduler::new(config.reminders.clone(), storage.clone());

        Ok(Self {
            config,
            storage,
            files,
            fees,
            scheduler,
            trigger_rx,
        })
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        // Create app state
        let state = AppState::new(
            self.storage.clone(),
            self.files.clone(),
            self.fees,
            self.scheduler.clone(),
        )
        .with_max_upload_bytes(self.config.server.max_upload_bytes)
        .with_session_ttl_hours(self.config.server.session_ttl_hours)
        .with_cors(self.config.server.enable_cors);

        // Create router
        let app = create_router(state);

        // Create listener
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("GEA portal listening on {}", addr);
        tracing::info!(
            upload_dir = %self.config.files.upload_dir.display(),
            gea_fee_bps = self.config.finance.gea_fee_bps,
            "Portal configured"
        );

        // Start reminder scheduler in background
        let scheduler = self.scheduler.clone();
        let trigger_rx = self.trigger_rx;
        tokio::spawn(async move {
            scheduler.start(trigger_rx).await;
        });

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("GEA portal shutting down");

        // Stop scheduler
        self.scheduler.stop().await;

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
