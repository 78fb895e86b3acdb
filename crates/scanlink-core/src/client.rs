//! The scan client facade.
//!
//! [`ScanClient`] is the single entry point for the capture UI. It
//! composes mode detection, device identity, the connection monitor, and
//! the offline queue so that every scan request resolves to a definitive
//! [`ScanOutcome`] — never an error, never an indefinite hang.
//!
//! Standalone instances skip the entire network subsystem: no monitor is
//! spawned and no request is ever issued, not even a failing one.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::OrchestratorApi;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::identity::DeviceId;
use crate::mode::{DeploymentContext, Mode};
use crate::monitor::ConnectionMonitor;
use crate::queue::OfflineQueue;
use crate::store::{keys, StateStore};
use crate::types::{
    ClientEvent, ConnectionState, Liveness, QueuedTransaction, ScanOutcome, ScanRecord,
    StatusSnapshot,
};

/// Everything a Networked instance runs that a Standalone one does not.
struct NetContext {
    api: Arc<OrchestratorApi>,
    monitor: ConnectionMonitor,
    flusher_cancel: CancellationToken,
    flusher: Option<JoinHandle<()>>,
}

struct ClientInner {
    config: ClientConfig,
    mode: Mode,
    device_id: DeviceId,
    store: Arc<dyn StateStore>,
    queue: Mutex<OfflineQueue>,
    events_tx: broadcast::Sender<ClientEvent>,
    net: RwLock<Option<NetContext>>,
}

/// Resilient client for reporting scans to the orchestrator.
#[derive(Clone)]
pub struct ScanClient {
    inner: Arc<ClientInner>,
}

impl ScanClient {
    /// Construct a client from configuration and a state store.
    ///
    /// Mode is detected once here and never re-evaluated: a persisted
    /// `orchestrator_url` (or the configured `base_url`) selects
    /// Networked, otherwise the instance runs Standalone. Networked
    /// instances start probing immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built for a
    /// Networked deployment.
    pub async fn new(config: ClientConfig, store: Arc<dyn StateStore>) -> Result<Self> {
        let base_url = resolve_base_url(&config, store.as_ref());
        let context = base_url.map_or_else(
            DeploymentContext::standalone,
            DeploymentContext::networked,
        );
        let mode = Mode::detect(&context);
        let device_id = DeviceId::get_or_create(store.as_ref());
        let queue = OfflineQueue::load(Arc::clone(&store), config.queue_capacity);
        let (events_tx, _) = broadcast::channel(16);

        let inner = Arc::new(ClientInner {
            config,
            mode,
            device_id,
            store,
            queue: Mutex::new(queue),
            events_tx,
            net: RwLock::new(None),
        });

        if let Some(url) = context.orchestrator_url {
            let net = spawn_net(&inner, url)?;
            *inner.net.write().await = Some(net);
        }

        info!(mode = ?mode, device_id = %inner.device_id, "scan client ready");
        Ok(Self { inner })
    }

    /// Report a scan. Always resolves to a typed outcome.
    pub async fn scan(&self, token_id: &str, team_id: Option<&str>) -> ScanOutcome {
        if self.inner.mode.is_standalone() {
            debug!(token_id, "standalone scan, logged locally");
            return ScanOutcome::Standalone { logged: true };
        }

        let net_guard = self.inner.net.read().await;
        let Some(net) = net_guard.as_ref() else {
            // Destroyed mid-session; keep the no-loss guarantee anyway.
            self.enqueue(token_id, team_id).await;
            return ScanOutcome::Offline { queued: true };
        };

        if !net.monitor.liveness().is_online() {
            self.enqueue(token_id, team_id).await;
            return ScanOutcome::Offline { queued: true };
        }

        let record = ScanRecord {
            token_id: token_id.to_string(),
            team_id: team_id.map(ToString::to_string),
            device_id: self.inner.device_id.to_string(),
            timestamp: Utc::now(),
        };
        match net.api.send_scan(&record).await {
            Ok(payload) => ScanOutcome::Success {
                server_payload: payload,
            },
            Err(err) => {
                warn!(token_id, error = %err, "live scan failed, queueing as fallback");
                self.enqueue(token_id, team_id).await;
                ScanOutcome::Error {
                    queued: true,
                    message: err.to_string(),
                }
            }
        }
    }

    /// Read-only snapshot for the UI.
    pub async fn status(&self) -> StatusSnapshot {
        let (liveness, last_probe_at, base_url) = {
            let net = self.inner.net.read().await;
            net.as_ref().map_or((Liveness::Unknown, None, None), |net| {
                let state = net.monitor.connection_state();
                (
                    state.liveness,
                    state.last_probe_at,
                    Some(net.api.base_url().to_string()),
                )
            })
        };
        let queue = self.inner.queue.lock().await;
        StatusSnapshot {
            queue_length: queue.len(),
            capacity: queue.capacity(),
            device_id: self.inner.device_id.to_string(),
            liveness,
            last_probe_at,
            base_url,
        }
    }

    /// Empty the offline queue. User-initiated reset; persists immediately.
    pub async fn clear_queue(&self) {
        self.inner.queue.lock().await.clear();
        info!("offline queue cleared");
    }

    /// Persist a new orchestrator base address and probe it immediately.
    ///
    /// On a Standalone instance the address is persisted only; mode is
    /// fixed for the instance lifetime and the new address takes effect
    /// at the next construction.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be persisted or the new
    /// HTTP client cannot be built.
    pub async fn update_base_url(&self, url: Url) -> Result<()> {
        self.inner
            .store
            .set(keys::ORCHESTRATOR_URL, url.as_str())?;

        if self.inner.mode.is_standalone() {
            info!(%url, "orchestrator url persisted, effective on next start");
            return Ok(());
        }

        let mut net_guard = self.inner.net.write().await;
        if let Some(old) = net_guard.take() {
            teardown(old).await;
        }
        // The fresh monitor's first probe runs immediately.
        *net_guard = Some(spawn_net(&self.inner, url)?);
        Ok(())
    }

    /// Subscribe to edge-triggered connect/disconnect events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Block until the first probe has resolved liveness, so a caller can
    /// gate on a definite Online/Offline instead of Unknown. Returns
    /// immediately on Standalone or destroyed instances.
    pub async fn await_first_probe(&self) {
        let rx = {
            let net = self.inner.net.read().await;
            net.as_ref().map(|net| net.monitor.state_receiver())
        };
        if let Some(mut rx) = rx {
            let _ = rx
                .wait_for(|state| state.liveness != Liveness::Unknown)
                .await;
        }
    }

    /// Tear down the monitor and flusher. After this returns, no probe or
    /// flush callback fires and no further state mutation occurs.
    /// Idempotent.
    pub async fn destroy(&self) {
        let ctx = self.inner.net.write().await.take();
        if let Some(ctx) = ctx {
            teardown(ctx).await;
        }
        debug!("scan client destroyed");
    }

    /// This instance's deployment mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    /// This installation's stable device identity.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.inner.device_id
    }

    async fn enqueue(&self, token_id: &str, team_id: Option<&str>) {
        self.inner.queue.lock().await.enqueue(token_id, team_id);
    }
}

/// Persisted orchestrator address wins over the configured default.
fn resolve_base_url(config: &ClientConfig, store: &dyn StateStore) -> Option<Url> {
    match store.get(keys::ORCHESTRATOR_URL) {
        Ok(Some(raw)) => match Url::parse(raw.trim()) {
            Ok(url) => return Some(url),
            Err(err) => {
                warn!(error = %err, "persisted orchestrator url is invalid, ignoring");
            }
        },
        Ok(None) => {}
        Err(err) => {
            warn!(error = %err, "failed to read persisted orchestrator url");
        }
    }
    config.base_url.clone()
}

fn spawn_net(inner: &Arc<ClientInner>, url: Url) -> Result<NetContext> {
    let api = Arc::new(OrchestratorApi::new(
        url,
        inner.config.request_timeout(),
        inner.config.probe_timeout(),
    )?);
    let monitor = ConnectionMonitor::start(
        Arc::clone(&api),
        inner.config.probe_interval(),
        inner.events_tx.clone(),
    );

    let flusher_cancel = CancellationToken::new();
    let flusher = tokio::spawn(run_flusher(
        Arc::clone(inner),
        Arc::clone(&api),
        monitor.state_receiver(),
        inner.events_tx.subscribe(),
        flusher_cancel.clone(),
    ));

    Ok(NetContext {
        api,
        monitor,
        flusher_cancel,
        flusher: Some(flusher),
    })
}

async fn teardown(mut ctx: NetContext) {
    ctx.monitor.stop().await;
    ctx.flusher_cancel.cancel();
    if let Some(handle) = ctx.flusher.take() {
        let _ = handle.await;
    }
}

/// Reacts to reconnect edges by draining the offline queue in batches.
async fn run_flusher(
    inner: Arc<ClientInner>,
    api: Arc<OrchestratorApi>,
    state_rx: watch::Receiver<ConnectionState>,
    mut events_rx: broadcast::Receiver<ClientEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            event = events_rx.recv() => match event {
                Ok(ClientEvent::Connected) => {
                    drain_queue(&inner, &api, &state_rx, &cancel).await;
                }
                Ok(ClientEvent::Disconnected) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "flusher lagged behind event stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

async fn drain_queue(
    inner: &Arc<ClientInner>,
    api: &Arc<OrchestratorApi>,
    state_rx: &watch::Receiver<ConnectionState>,
    cancel: &CancellationToken,
) {
    loop {
        if cancel.is_cancelled() || !state_rx.borrow().liveness.is_online() {
            return;
        }

        // Remove the batch before sending: a transaction never rides in
        // two in-flight batches.
        let batch = {
            let mut queue = inner.queue.lock().await;
            queue.take_batch(inner.config.batch_size)
        };
        if batch.is_empty() {
            return;
        }

        let records = batch
            .iter()
            .map(|tx| wire_record(tx, &inner.device_id))
            .collect();
        match api.send_batch(records).await {
            Ok(()) => {
                info!(delivered = batch.len(), "offline batch delivered");
                let remaining = inner.queue.lock().await.len();
                if remaining == 0 {
                    return;
                }
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(inner.config.reflush_delay()) => {}
                }
            }
            Err(err) => {
                warn!(error = %err, requeued = batch.len(), "batch delivery failed, requeueing as a unit");
                inner.queue.lock().await.restore_batch(batch);
                return;
            }
        }
    }
}

fn wire_record(tx: &QueuedTransaction, device_id: &DeviceId) -> ScanRecord {
    ScanRecord {
        token_id: tx.token_id.clone(),
        team_id: tx.team_id.clone(),
        device_id: device_id.to_string(),
        timestamp: tx.enqueued_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn standalone_client_parts() -> (ClientConfig, Arc<dyn StateStore>) {
        (ClientConfig::default(), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_standalone_scan_is_local_only() {
        let (config, store) = standalone_client_parts();
        let client = ScanClient::new(config, store).await.unwrap();

        assert_eq!(client.mode(), Mode::Standalone);
        for _ in 0..5 {
            let outcome = client.scan("abc", Some("teamA")).await;
            assert_eq!(outcome, ScanOutcome::Standalone { logged: true });
        }

        let status = client.status().await;
        assert_eq!(status.queue_length, 0);
        assert_eq!(status.liveness, Liveness::Unknown);
        assert!(status.base_url.is_none());
    }

    #[tokio::test]
    async fn test_standalone_destroy_is_idempotent() {
        let (config, store) = standalone_client_parts();
        let client = ScanClient::new(config, store).await.unwrap();
        client.destroy().await;
        client.destroy().await;
    }

    #[tokio::test]
    async fn test_device_id_stable_across_instances() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());

        let first = ScanClient::new(ClientConfig::default(), Arc::clone(&store))
            .await
            .unwrap();
        let first_id = first.device_id().clone();
        first.destroy().await;

        let second = ScanClient::new(ClientConfig::default(), store).await.unwrap();
        assert_eq!(second.device_id(), &first_id);
    }

    #[tokio::test]
    async fn test_persisted_url_overrides_config_default() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        store
            .set(keys::ORCHESTRATOR_URL, "http://10.0.0.9:3000")
            .unwrap();

        let mut config = ClientConfig::default();
        config.base_url = Some(Url::parse("http://fallback.local").unwrap());

        let resolved = resolve_base_url(&config, store.as_ref()).unwrap();
        assert_eq!(resolved.as_str(), "http://10.0.0.9:3000/");
    }

    #[tokio::test]
    async fn test_invalid_persisted_url_falls_back_to_config() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        store.set(keys::ORCHESTRATOR_URL, "not a url").unwrap();

        let mut config = ClientConfig::default();
        config.base_url = Some(Url::parse("http://fallback.local").unwrap());

        let resolved = resolve_base_url(&config, store.as_ref()).unwrap();
        assert_eq!(resolved.as_str(), "http://fallback.local/");
    }

    #[tokio::test]
    async fn test_standalone_update_base_url_persists_only() {
        let (config, store) = standalone_client_parts();
        let client = ScanClient::new(config, Arc::clone(&store)).await.unwrap();

        client
            .update_base_url(Url::parse("http://orchestrator.local:3000").unwrap())
            .await
            .unwrap();

        // Mode stays Standalone for this instance, but the address is saved.
        assert_eq!(client.mode(), Mode::Standalone);
        assert_eq!(
            store.get(keys::ORCHESTRATOR_URL).unwrap().as_deref(),
            Some("http://orchestrator.local:3000/")
        );
    }
}
