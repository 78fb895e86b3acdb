//! HTTP client for the orchestrator's scan API.
//!
//! Three endpoints: single scan submit, batch submit, and the health
//! probe used by the connection monitor. All failures map into
//! [`ScanlinkError`]; non-2xx responses carry a best-effort parse of the
//! orchestrator's `{ "message": ... }` body for diagnostics.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Result, ScanlinkError};
use crate::types::{BatchRequest, ScanRecord};

/// Error body shape the orchestrator returns on non-2xx.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client bound to one orchestrator base address.
#[derive(Debug, Clone)]
pub struct OrchestratorApi {
    http: reqwest::Client,
    base: Url,
    probe_timeout: Duration,
}

impl OrchestratorApi {
    /// Build a client for `base` with the given request and probe timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(mut base: Url, request_timeout: Duration, probe_timeout: Duration) -> Result<Self> {
        // Joining relative endpoint paths requires a trailing slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| ScanlinkError::Network(err.to_string()))?;

        Ok(Self {
            http,
            base,
            probe_timeout,
        })
    }

    /// The base address this client reports to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Submit a single scan. Returns the orchestrator's JSON body verbatim.
    pub async fn send_scan(&self, record: &ScanRecord) -> Result<Value> {
        let url = self.base.join("api/scan")?;
        debug!(token_id = %record.token_id, %url, "submitting scan");

        let resp = self.http.post(url).json(record).send().await?;
        if resp.status().is_success() {
            // A 2xx with a non-JSON body still counts as delivered.
            Ok(resp.json::<Value>().await.unwrap_or(Value::Null))
        } else {
            Err(Self::status_error(resp).await)
        }
    }

    /// Submit a batch of queued scans. The response body is ignored; any
    /// 2xx means the whole batch was accepted.
    pub async fn send_batch(&self, records: Vec<ScanRecord>) -> Result<()> {
        let url = self.base.join("api/scan/batch")?;
        debug!(batch_size = records.len(), %url, "submitting batch");

        let body = BatchRequest {
            transactions: records,
        };
        let resp = self.http.post(url).json(&body).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(resp).await)
        }
    }

    /// Issue a health probe, bounded by the probe timeout regardless of
    /// the client-wide request timeout.
    pub async fn probe_health(&self) -> Result<()> {
        let url = self.base.join("health")?;

        let resp = self
            .http
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ScanlinkError::Server {
                status: resp.status().as_u16(),
                message: "health probe returned non-success status".into(),
            })
        }
    }

    async fn status_error(resp: reqwest::Response) -> ScanlinkError {
        let status = resp.status().as_u16();
        let message = resp
            .json::<ErrorBody>()
            .await
            .map_or_else(
                |_| format!("orchestrator returned status {status}"),
                |body| body.message,
            );
        ScanlinkError::Server { status, message }
    }
}
