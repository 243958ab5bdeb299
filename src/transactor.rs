//! Downstream coordinator connection: an HTTP handle to the elected node's
//! transactor service plus the connector seam used to open/close it.
//!
//! The core never retries a failed transact/query; those errors surface to
//! the request caller. Only the connection manager decides when a handle is
//! replaced.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const OPEN_TIMEOUT_SECS: u64 = 5;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub enum ConnectError {
    /// The elected coordinator could not be reached. Transient; the next
    /// maintenance tick retries.
    Unavailable { address: String, reason: String },
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::Unavailable { address, reason } => {
                write!(f, "coordinator {} unavailable: {}", address, reason)
            }
        }
    }
}

impl std::error::Error for ConnectError {}

#[derive(Debug)]
pub enum TransactorError {
    /// Transport or application failure against an established connection.
    /// Surfaced to the request caller, never retried by the core.
    RemoteOperationFailed(String),
}

impl fmt::Display for TransactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactorError::RemoteOperationFailed(reason) => {
                write!(f, "remote operation failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for TransactorError {}

impl From<reqwest::Error> for TransactorError {
    fn from(e: reqwest::Error) -> Self {
        TransactorError::RemoteOperationFailed(e.to_string())
    }
}

/// One datom-style edit submitted through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edit {
    pub entity: String,
    pub attribute: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<serde_json::Value>,
}

/// Live handle to the elected coordinator's transactor service.
#[derive(Debug, Clone)]
pub struct TransactorHandle {
    base: String,
    http: reqwest::Client,
}

impl TransactorHandle {
    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub async fn transact(&self, edits: &[Edit]) -> Result<TxReceipt, TransactorError> {
        let url = format!("{}/transact", self.base);
        let resp = self.http.post(&url).json(edits).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn query(&self, query: &str) -> Result<QueryResult, TransactorError> {
        let url = format!("{}/query", self.base);
        let body = serde_json::json!({ "query": query });
        let resp = self.http.post(&url).json(&body).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

/// Seam between the connection manager and the network. Production code uses
/// [`HttpConnector`]; tests count opens and closes through a stub.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, host: &str, port: u16) -> Result<TransactorHandle, ConnectError>;
    async fn close(&self, handle: TransactorHandle) -> Result<(), ConnectError>;
}

pub struct HttpConnector;

#[async_trait]
impl Connector for HttpConnector {
    async fn open(&self, host: &str, port: u16) -> Result<TransactorHandle, ConnectError> {
        let base = format!("http://{}:{}", host, port);
        let unavailable = |reason: String| ConnectError::Unavailable { address: base.clone(), reason };
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(OPEN_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| unavailable(e.to_string()))?;
        // Probe the service so a dead coordinator fails the open, not the
        // first user request.
        http.get(format!("{}/health", base))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| unavailable(e.to_string()))?;
        Ok(TransactorHandle { base, http })
    }

    async fn close(&self, handle: TransactorHandle) -> Result<(), ConnectError> {
        // HTTP keep-alive pools drain when the last clone of the client is
        // dropped; nothing to flush beyond that.
        drop(handle);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_handle(base: impl Into<String>) -> TransactorHandle {
    TransactorHandle { base: base.into(), http: reqwest::Client::new() }
}
