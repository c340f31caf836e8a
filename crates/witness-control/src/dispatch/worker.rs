//! Callback delivery worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::DispatcherConfig;
use crate::error::{ControlError, ControlResult};
use crate::types::IntakeRequest;

/// Body of an owner-change callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    /// Tenant identifier.
    pub tenant_id: String,
    /// First submitted public key.
    pub owner: String,
    /// Network name.
    pub net: String,
}

impl CallbackPayload {
    /// Build the payload for a queued request.
    ///
    /// Returns `None` if the request carries no keys.
    #[must_use]
    pub fn from_request(request: &IntakeRequest) -> Option<Self> {
        Some(Self {
            tenant_id: request.tenant_id.clone(),
            owner: request.owner()?.to_owned(),
            net: request.net.clone(),
        })
    }
}

/// Destination for callback payloads.
#[async_trait]
pub trait CallbackSink: Send + Sync {
    /// Deliver one payload to `url`.
    async fn deliver(&self, url: &str, payload: &CallbackPayload) -> ControlResult<()>;
}

/// Delivers callbacks as JSON POSTs.
#[derive(Debug, Clone)]
pub struct HttpCallbackSink {
    client: Client,
}

impl HttpCallbackSink {
    /// Create a sink with the given request timeout.
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> ControlResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(ControlError::Http)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackSink for HttpCallbackSink {
    async fn deliver(&self, url: &str, payload: &CallbackPayload) -> ControlResult<()> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(ControlError::Http)?;

        if !response.status().is_success() {
            return Err(ControlError::Delivery(format!(
                "callback returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Drains the callback queue, one delivery at a time.
///
/// Delivery is at most once: an unknown product or a failed delivery is
/// logged and the request dropped.
pub struct CallbackWorker {
    rx: mpsc::Receiver<IntakeRequest>,
    sink: Arc<dyn CallbackSink>,
    callbacks: HashMap<String, String>,
    delay: Duration,
}

impl CallbackWorker {
    /// Create a worker for the receiving end of a dispatcher queue.
    pub fn new(
        rx: mpsc::Receiver<IntakeRequest>,
        sink: Arc<dyn CallbackSink>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            rx,
            sink,
            callbacks: config.callbacks.clone(),
            delay: config.delay(),
        }
    }

    /// Process requests until every producer handle is dropped.
    pub async fn run(mut self) {
        info!(targets = self.callbacks.len(), "callback worker started");

        while let Some(request) = self.rx.recv().await {
            tokio::time::sleep(self.delay).await;
            self.process(&request).await;
        }

        info!("callback queue closed, worker stopping");
    }

    /// Run on a background task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn process(&self, request: &IntakeRequest) {
        let Some(url) = self.callbacks.get(&request.product) else {
            warn!(
                tenant_id = %request.tenant_id,
                product = %request.product,
                "no callback target for product, dropping"
            );
            return;
        };

        let Some(payload) = CallbackPayload::from_request(request) else {
            warn!(tenant_id = %request.tenant_id, "request has no keys, dropping");
            return;
        };

        match self.sink.deliver(url, &payload).await {
            Ok(()) => info!(tenant_id = %payload.tenant_id, url = %url, "callback delivered"),
            Err(e) => warn!(
                tenant_id = %payload.tenant_id,
                url = %url,
                error = %e,
                "callback delivery failed, dropping"
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::dispatch::{BackpressurePolicy, CallbackDispatcher};

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<(String, CallbackPayload)>>,
        fail_tenant: Option<String>,
    }

    #[async_trait]
    impl CallbackSink for RecordingSink {
        async fn deliver(&self, url: &str, payload: &CallbackPayload) -> ControlResult<()> {
            if self.fail_tenant.as_deref() == Some(payload.tenant_id.as_str()) {
                return Err(ControlError::Delivery("503".to_owned()));
            }
            self.delivered
                .lock()
                .push((url.to_owned(), payload.clone()));
            Ok(())
        }
    }

    fn request(tenant: &str, product: &str) -> IntakeRequest {
        IntakeRequest {
            auth_pub_keys: vec!["02aa".to_owned(), "03bb".to_owned()],
            addon_id: "addon".to_owned(),
            tenant_id: tenant.to_owned(),
            net: "main".to_owned(),
            product: product.to_owned(),
        }
    }

    fn config() -> DispatcherConfig {
        DispatcherConfig {
            delay_ms: 0,
            callbacks: HashMap::from([
                ("test".to_owned(), "http://callback.test/owner".to_owned()),
                ("main".to_owned(), "http://callback.main/owner".to_owned()),
            ]),
            ..DispatcherConfig::default()
        }
    }

    #[test]
    fn payload_is_camel_case() {
        let payload = CallbackPayload::from_request(&request("t1", "test")).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"tenantId": "t1", "owner": "02aa", "net": "main"})
        );
    }

    #[tokio::test]
    async fn delivers_in_order_and_drops_failures() {
        let sink = Arc::new(RecordingSink {
            fail_tenant: Some("t3".to_owned()),
            ..RecordingSink::default()
        });
        let (dispatcher, rx) = CallbackDispatcher::channel(8, BackpressurePolicy::Reject);
        let worker = CallbackWorker::new(rx, sink.clone(), &config()).spawn();

        dispatcher.enqueue(request("t1", "test")).await.unwrap();
        dispatcher.enqueue(request("t2", "unknown")).await.unwrap();
        dispatcher.enqueue(request("t3", "main")).await.unwrap();
        dispatcher.enqueue(request("t4", "main")).await.unwrap();
        drop(dispatcher);
        worker.await.unwrap();

        let delivered = sink.delivered.lock().clone();
        let tenants: Vec<&str> = delivered.iter().map(|(_, p)| p.tenant_id.as_str()).collect();
        assert_eq!(tenants, vec!["t1", "t4"]);
        assert_eq!(delivered[0].0, "http://callback.test/owner");
        assert_eq!(delivered[1].0, "http://callback.main/owner");
        assert_eq!(delivered[1].1.owner, "02aa");
    }

    #[tokio::test]
    async fn http_sink_reports_unreachable_target() {
        let sink = HttpCallbackSink::new(Duration::from_secs(2), false).unwrap();
        let payload = CallbackPayload::from_request(&request("t1", "test")).unwrap();
        let err = sink
            .deliver("http://127.0.0.1:9/owner", &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Http(_)));
    }
}
