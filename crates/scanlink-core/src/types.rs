//! Shared domain and wire types.
//!
//! Wire-facing structs serialize in camelCase to match the orchestrator's
//! JSON contract. `team_id` is omitted from wire bodies when absent rather
//! than sent as an explicit null; queued transactions keep the `Option`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The monitor's current belief about orchestrator reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    /// No probe has completed yet. Gated like [`Liveness::Offline`].
    Unknown,
    /// The last health probe succeeded.
    Online,
    /// The last health probe failed or timed out.
    Offline,
}

impl Liveness {
    /// Returns `true` only for [`Liveness::Online`]; `Unknown` counts as
    /// not connected for gating decisions.
    #[inline]
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Snapshot of the connection monitor's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    /// Current liveness belief.
    pub liveness: Liveness,
    /// When the most recent probe completed, if any.
    pub last_probe_at: Option<DateTime<Utc>>,
}

impl ConnectionState {
    /// The pre-first-probe state.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            liveness: Liveness::Unknown,
            last_probe_at: None,
        }
    }
}

/// A scan waiting in the offline queue for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedTransaction {
    /// Token that was scanned.
    pub token_id: String,

    /// Team attribution, if the scan carried one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub team_id: Option<String>,

    /// When the scan entered the queue (UTC).
    pub enqueued_at: DateTime<Utc>,

    /// Number of failed delivery attempts this entry has survived.
    #[serde(default)]
    pub retry_count: u32,
}

/// A single scan in orchestrator wire form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// Token that was scanned.
    pub token_id: String,

    /// Team attribution; absent from the wire when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,

    /// Stable per-installation device identifier.
    pub device_id: String,

    /// Send-time timestamp (ISO-8601 on the wire).
    pub timestamp: DateTime<Utc>,
}

/// Body for `POST /api/scan/batch`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest {
    /// Oldest-first slice of the offline queue.
    pub transactions: Vec<ScanRecord>,
}

/// The definitive result of a scan attempt.
///
/// Every call to [`ScanClient::scan`] resolves to exactly one of these;
/// no scan path surfaces an error to the caller.
///
/// [`ScanClient::scan`]: crate::client::ScanClient::scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScanOutcome {
    /// Standalone mode: acknowledged locally, no network or queue touched.
    Standalone {
        /// Always `true`; the scan was logged locally.
        logged: bool,
    },
    /// Networked mode but not currently online; transaction enqueued.
    Offline {
        /// Always `true`; the scan is waiting in the offline queue.
        queued: bool,
    },
    /// Delivered live; carries the orchestrator's response verbatim.
    Success {
        /// Raw JSON body returned by the orchestrator.
        server_payload: serde_json::Value,
    },
    /// The live attempt failed; transaction enqueued as a fallback.
    Error {
        /// Always `true`; the scan is waiting in the offline queue.
        queued: bool,
        /// Failure reason, for diagnostics.
        message: String,
    },
}

/// Edge-triggered connectivity events raised to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// Liveness transitioned Offline/Unknown to Online.
    Connected,
    /// Liveness transitioned Online to Offline.
    Disconnected,
}

/// Read-only status snapshot for the caller's UI.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Current offline queue length.
    pub queue_length: usize,
    /// Offline queue capacity bound.
    pub capacity: usize,
    /// Stable per-installation device identifier.
    pub device_id: String,
    /// Current liveness belief.
    pub liveness: Liveness,
    /// When the most recent probe completed, if any.
    pub last_probe_at: Option<DateTime<Utc>>,
    /// Configured orchestrator base address, if networked.
    pub base_url: Option<String>,
}
