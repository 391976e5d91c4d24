use crate::config::Settings;
use crate::gateway::{GatewayConfig, GatewayService};
use crate::Result;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    gateway: GatewayConfig,
}

impl Application {
    /// Load settings from the default sources
    pub fn new() -> Result<Self> {
        Self::from_settings(Settings::new()?)
    }

    #[instrument(skip(settings), fields(environment = %settings.application.environment))]
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let gateway = GatewayConfig::from_settings(&settings)?;

        info!(
            backend = %gateway.backend_url,
            proxy_backend = ?gateway.proxy_backend_url.as_ref().map(ToString::to_string),
            "Gateway configured"
        );

        Ok(Self { settings, gateway })
    }

    /// Route table with the full middleware stack
    pub fn router(&self) -> Router {
        let mut service =
            GatewayService::from_config(self.gateway.clone()).with_cors(self.settings.server.cors);

        if let Some(dir) = &self.settings.server.static_files {
            if dir.is_dir() {
                service = service.with_static_files(dir);
            } else {
                warn!(path = %dir.display(), "Static file directory not found; not serving files");
            }
        }

        service.into_router()
    }

    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        let address = self.settings.bind_address();
        let listener = TcpListener::bind(&address).await?;

        info!(
            address = %listener.local_addr()?,
            "Starting Parsony gateway"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Parsony gateway stopped");
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn gateway_config(&self) -> &GatewayConfig {
        &self.gateway
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
