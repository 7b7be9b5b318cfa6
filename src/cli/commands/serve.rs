use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::HistopathConfig;
use crate::http;
use crate::service::TrackingService;
use crate::shutdown::ShutdownCoordinator;

pub struct ServeCommand {
    pub bind: String,
}

impl ServeCommand {
    pub fn new(config: &HistopathConfig) -> Self {
        Self {
            bind: config.server.bind.clone(),
        }
    }

    pub fn with_bind(mut self, bind: Option<String>) -> Self {
        if let Some(bind) = bind {
            self.bind = bind;
        }
        self
    }

    pub async fn execute(&self, service: TrackingService) -> Result<()> {
        let service = Arc::new(service);
        let listener = TcpListener::bind(&self.bind).await?;

        http::serve(
            listener,
            service.clone(),
            ShutdownCoordinator::wait_for_signal(),
        )
        .await?;

        #[allow(unused_mut)]
        let mut coordinator = ShutdownCoordinator::new();
        #[cfg(feature = "database")]
        if let Some(database) = service.database() {
            coordinator = coordinator.with_database(database.clone());
        }
        coordinator.shutdown_all_services().await
    }
}
