//! # scanlink-core
//!
//! Core client logic for scanlink: resilient scan reporting from field
//! devices to a central orchestrator over an unreliable network.
//!
//! The crate guarantees that no scan is silently lost and that callers
//! always receive a definitive, typed result:
//!
//! - Standalone deployments acknowledge scans locally and never touch the
//!   network.
//! - Networked deployments send live when the orchestrator is reachable,
//!   queue to a bounded persisted FIFO when it is not, and drain the
//!   queue in batches on reconnect.
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`client`] - The [`ScanClient`] facade the UI calls into
//! - [`monitor`] - Periodic health probing and the liveness state machine
//! - [`queue`] - Bounded, persisted offline queue with batch flush
//! - [`api`] - HTTP client for the orchestrator's scan API
//! - [`identity`] - Stable per-installation device identity
//! - [`mode`] - Standalone/Networked deployment detection
//! - [`store`] - Injectable persistence port (file-backed and in-memory)
//! - [`config`] - Client configuration and tuning knobs
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared domain and wire types

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod mode;
pub mod monitor;
pub mod queue;
pub mod store;
pub mod types;

// Re-export primary types for convenience
pub use api::OrchestratorApi;
pub use client::ScanClient;
pub use config::ClientConfig;
pub use error::{Result, ScanlinkError};
pub use identity::DeviceId;
pub use mode::{DeploymentContext, Mode};
pub use monitor::ConnectionMonitor;
pub use queue::{OfflineQueue, DEFAULT_BATCH_SIZE, DEFAULT_CAPACITY};
pub use store::{FileStore, MemoryStore, StateStore};
pub use types::{
    ClientEvent, ConnectionState, Liveness, QueuedTransaction, ScanOutcome, StatusSnapshot,
};
