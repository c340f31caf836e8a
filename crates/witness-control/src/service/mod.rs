//! Service lifecycle management.
//!
//! Provisioning runs to completion before the listener binds. Any
//! provisioning failure is returned and the binary exits non-zero.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use witness_ledger::{HttpLedgerGateway, LedgerGateway, MockLedger};

use crate::api;
use crate::config::{ControlConfig, GatewayConfig, GatewayKind};
use crate::dispatch::{CallbackDispatcher, CallbackWorker, HttpCallbackSink};
use crate::error::{ControlError, ControlResult};
use crate::provision::{ProvisionContext, ProvisionManager};
use crate::store::{SqliteStore, StateStore};
use crate::types::{FixedConfig, PipelineState};

/// The control service.
///
/// Manages the lifecycle of the witness control plane:
/// - Loading provisioning inputs
/// - Running the provisioning pipeline
/// - The callback worker
/// - HTTP intake server
/// - Signal handling and graceful shutdown
pub struct ControlService {
    config: ControlConfig,
    cancel: CancellationToken,
}

impl ControlService {
    /// Create a new control service with the given configuration.
    #[must_use]
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Run the control service until shutdown.
    pub async fn run(&self) -> ControlResult<()> {
        let pipeline = self.provision().await?;

        let (dispatcher, rx) = CallbackDispatcher::channel(
            self.config.dispatcher.capacity,
            self.config.dispatcher.backpressure,
        );
        let sink = HttpCallbackSink::new(
            Duration::from_secs(self.config.dispatcher.timeout_secs),
            self.config.dispatcher.accept_invalid_certs,
        )?;
        let worker = CallbackWorker::new(rx, Arc::new(sink), &self.config.dispatcher).spawn();
        info!(
            capacity = self.config.dispatcher.capacity,
            backpressure = ?self.config.dispatcher.backpressure,
            "callback dispatcher started"
        );

        let state = api::AppState {
            dispatcher,
            intake: self.config.intake.clone(),
            max_body_bytes: self.config.server.max_body_bytes,
            pipeline,
        };
        let app = api::router(state);

        let listener = tokio::net::TcpListener::bind(self.config.server.listen_addr)
            .await
            .map_err(|e| ControlError::Config(format!("failed to bind TCP: {e}")))?;
        info!(listen_addr = %self.config.server.listen_addr, "control service listening");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(self.cancel.clone()))
            .await
            .map_err(|e| ControlError::Config(format!("server error: {e}")));

        worker.abort();
        served?;

        info!("control service shutdown complete");
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn provision(&self) -> ControlResult<PipelineState> {
        let ctx = Arc::new(ProvisionContext::load(&self.config).await?);
        let gateway = create_gateway(&self.config.gateway, &ctx.fixed)?;

        let db_path = self.config.paths.state_db_path();
        let sqlite = SqliteStore::open(&db_path).await?;
        info!(path = %db_path.display(), "state store opened");
        let store: Arc<dyn StateStore> = Arc::new(sqlite.clone());

        let result = ProvisionManager::new(ctx, gateway, store).resume().await;
        sqlite.close().await;

        let pipeline = result?;
        info!(
            stage = %pipeline.stage,
            address = %pipeline.contract_address,
            "provisioning complete"
        );
        Ok(pipeline)
    }
}

/// Create a ledger gateway from configuration.
///
/// The HTTP gateway uses the configured URL, falling back to the node named
/// in the fixed configuration.
pub fn create_gateway(
    config: &GatewayConfig,
    fixed: &FixedConfig,
) -> ControlResult<Arc<dyn LedgerGateway>> {
    match config.kind {
        GatewayKind::Http => {
            let url = config.url.as_deref().unwrap_or(&fixed.ledger_node);
            if url.is_empty() {
                return Err(ControlError::config("no ledger gateway URL configured"));
            }
            let gateway = HttpLedgerGateway::new(url, Duration::from_secs(config.timeout_secs))?;
            info!(url = %gateway.base_url(), "ledger gateway configured");
            Ok(Arc::new(gateway))
        }
        GatewayKind::Mock => {
            info!("using in-memory mock ledger");
            Ok(Arc::new(MockLedger::new()))
        }
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("received SIGTERM, initiating shutdown");
        }
        () = cancel.cancelled() => {
            info!("shutdown requested");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn service_shutdown() {
        let service = ControlService::new(ControlConfig::default());
        assert!(!service.cancel.is_cancelled());
        service.shutdown();
        assert!(service.cancel.is_cancelled());
    }

    #[test]
    fn http_gateway_falls_back_to_ledger_node() {
        let fixed = FixedConfig {
            ledger_node: "http://127.0.0.1:20336".to_owned(),
            ..FixedConfig::default()
        };
        create_gateway(&GatewayConfig::default(), &fixed).unwrap();
    }

    #[test]
    fn http_gateway_needs_a_url() {
        let err = create_gateway(&GatewayConfig::default(), &FixedConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ControlError::Config(_)));
    }

    #[test]
    fn mock_gateway_needs_nothing() {
        let config = GatewayConfig {
            kind: GatewayKind::Mock,
            ..GatewayConfig::default()
        };
        create_gateway(&config, &FixedConfig::default()).unwrap();
    }

    #[tokio::test]
    async fn missing_inputs_fail_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ControlConfig::default();
        config.paths.run_dir = dir.path().to_path_buf();
        config.paths.config_dir = dir.path().to_path_buf();
        config.paths.contract_dir = dir.path().to_path_buf();
        config.paths.fixed_config = dir.path().join("config.fixed.json");

        let err = ControlService::new(config).run().await.unwrap_err();
        assert!(matches!(err, ControlError::Config(_)));
    }
}
