//! Connection-health monitoring.
//!
//! A background task probes `GET {base}/health` on a fixed interval (first
//! probe immediately on start) and maintains the three-valued liveness
//! state. Callers read the current state through a watch channel;
//! subscribers receive edge-triggered [`ClientEvent`]s only — repeated
//! Online→Online or Offline→Offline probe results are silent.
//!
//! Standalone-mode clients never construct a monitor, which is how the
//! zero-network-attempts guarantee is kept.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::OrchestratorApi;
use crate::types::{ClientEvent, ConnectionState, Liveness};

/// Default interval between health probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(10_000);

/// Default client-side bound on a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Periodic health prober with edge-triggered notifications.
pub struct ConnectionMonitor {
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionMonitor {
    /// Spawn the probe loop against `api`, emitting edges on `events`.
    #[must_use]
    pub fn start(
        api: Arc<OrchestratorApi>,
        interval: Duration,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::unknown());
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run_probe_loop(api, interval, &state_tx, &events, task_cancel).await;
        });

        Self {
            state_rx,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// The monitor's current state snapshot.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Current liveness belief.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        self.state_rx.borrow().liveness
    }

    /// A watch receiver for callers that need to await state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Stop probing. Cancels the schedule and awaits the loop task, so an
    /// in-flight probe completes (its result discarded) and no event
    /// fires after this returns.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_probe_loop(
    api: Arc<OrchestratorApi>,
    interval: Duration,
    state_tx: &watch::Sender<ConnectionState>,
    events: &broadcast::Sender<ClientEvent>,
    cancel: CancellationToken,
) {
    loop {
        let previous = state_tx.borrow().liveness;
        let next = match api.probe_health().await {
            Ok(()) => Liveness::Online,
            Err(err) => {
                debug!(error = %err, "health probe failed");
                Liveness::Offline
            }
        };

        if cancel.is_cancelled() {
            // Torn down while the probe was in flight; discard its result.
            break;
        }

        let _ = state_tx.send(ConnectionState {
            liveness: next,
            last_probe_at: Some(Utc::now()),
        });

        if let Some(event) = edge_event(previous, next) {
            info!(?event, "connection state changed");
            let _ = events.send(event);
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
}

/// Transition function for the edge-triggered notifications. Non-edge
/// transitions return `None` and stay silent.
const fn edge_event(previous: Liveness, next: Liveness) -> Option<ClientEvent> {
    match (previous, next) {
        (Liveness::Unknown | Liveness::Offline, Liveness::Online) => Some(ClientEvent::Connected),
        (Liveness::Online, Liveness::Offline) => Some(ClientEvent::Disconnected),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_edge_transitions_fire_events() {
        assert_eq!(
            edge_event(Liveness::Unknown, Liveness::Online),
            Some(ClientEvent::Connected)
        );
        assert_eq!(
            edge_event(Liveness::Offline, Liveness::Online),
            Some(ClientEvent::Connected)
        );
        assert_eq!(
            edge_event(Liveness::Online, Liveness::Offline),
            Some(ClientEvent::Disconnected)
        );
    }

    #[test]
    fn test_non_edge_transitions_stay_silent() {
        assert_eq!(edge_event(Liveness::Online, Liveness::Online), None);
        assert_eq!(edge_event(Liveness::Offline, Liveness::Offline), None);
        // First probe failing is not a disconnect: there was no connection.
        assert_eq!(edge_event(Liveness::Unknown, Liveness::Offline), None);
    }

    async fn test_api(server: &MockServer) -> Arc<OrchestratorApi> {
        Arc::new(
            OrchestratorApi::new(
                url::Url::parse(&server.uri()).unwrap(),
                Duration::from_secs(2),
                Duration::from_millis(500),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_recovery_fires_single_connected_edge() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (events_tx, mut events_rx) = broadcast::channel(8);
        let api = test_api(&server).await;
        let monitor = ConnectionMonitor::start(api, Duration::from_millis(20), events_tx);

        let event = tokio::time::timeout(Duration::from_secs(2), events_rx.recv())
            .await
            .expect("expected an edge event")
            .unwrap();
        assert_eq!(event, ClientEvent::Connected);
        assert!(monitor.liveness().is_online());

        // Further Online probes are non-edges; no second event arrives.
        let quiet =
            tokio::time::timeout(Duration::from_millis(100), events_rx.recv()).await;
        assert!(quiet.is_err());

        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_stop_halts_probing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (events_tx, _events_rx) = broadcast::channel(8);
        let api = test_api(&server).await;
        let monitor = ConnectionMonitor::start(api, Duration::from_millis(20), events_tx);

        let mut state_rx = monitor.state_receiver();
        let _ = tokio::time::timeout(
            Duration::from_secs(2),
            state_rx.wait_for(|s| s.liveness != Liveness::Unknown),
        )
        .await
        .expect("first probe should complete");

        monitor.stop().await;
        let requests_after_stop = server.received_requests().await.unwrap().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            requests_after_stop
        );
    }
}
