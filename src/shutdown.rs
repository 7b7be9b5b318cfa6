use anyhow::Result;
use tracing::{info, warn};

#[cfg(feature = "database")]
use crate::database::DatabaseManager;
#[cfg(feature = "database")]
use std::time::Duration;
#[cfg(feature = "database")]
use tokio::time::timeout;

/// Graceful shutdown coordinator for the tracker server
#[derive(Default)]
pub struct ShutdownCoordinator {
    #[cfg(feature = "database")]
    database: Option<DatabaseManager>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close this database's pool once the server has drained
    #[cfg(feature = "database")]
    pub fn with_database(mut self, database: DatabaseManager) -> Self {
        self.database = Some(database);
        self
    }

    /// Resolve on SIGINT or SIGTERM.
    pub async fn wait_for_signal() {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
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
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
            _ = terminate => info!("Received SIGTERM, shutting down"),
        }
    }

    /// Release resources held past the last request
    pub async fn shutdown_all_services(self) -> Result<()> {
        info!("Initiating graceful shutdown of all services...");

        #[cfg(feature = "database")]
        if let Some(database) = self.database {
            timeout(Duration::from_secs(10), database.shutdown())
                .await
                .map_err(|_| anyhow::anyhow!("Timeout waiting for database connections to close"))?;
        }

        info!("Graceful shutdown completed successfully");
        Ok(())
    }
}
