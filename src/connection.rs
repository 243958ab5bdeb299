//! Connection manager: owns the single downstream connection to the elected
//! coordinator and swaps it only when the election outcome changes.
//!
//! All state lives behind one async mutex so concurrent callers (the
//! maintenance loop plus request handlers) serialize their check-and-swap;
//! two callers can never both decide to replace the connection and leak a
//! handle.

use crate::election::{self, Election, Snapshot};
use crate::metrics;
use crate::transactor::{ConnectError, Connector, TransactorHandle};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug)]
pub enum ConnectionError {
    Election(election::ElectionError),
    Connect(ConnectError),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Election(e) => write!(f, "{}", e),
            ConnectionError::Connect(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl From<election::ElectionError> for ConnectionError {
    fn from(e: election::ElectionError) -> Self {
        ConnectionError::Election(e)
    }
}

#[derive(Default)]
struct ConnState {
    target: Option<String>,
    handle: Option<TransactorHandle>,
}

pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    port: u16,
    state: Mutex<ConnState>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, port: u16) -> Self {
        Self { connector, port, state: Mutex::new(ConnState::default()) }
    }

    /// Run the election for `snapshot` and make sure the open connection
    /// points at the winner. Unchanged winner: the existing handle is
    /// returned untouched. Changed winner (or no handle yet): the old handle
    /// is closed best-effort, a new one is opened on the fixed coordinator
    /// port. A failed open leaves target and handle unset so the next call
    /// retries from scratch; there is no retry inside this call.
    pub async fn ensure_connected(&self, snapshot: &Snapshot) -> Result<TransactorHandle, ConnectionError> {
        let mut st = self.state.lock().await;
        let winner: Election = election::select(snapshot)?;
        metrics::ELECTIONS_TOTAL.inc();

        let unchanged = st.target.as_deref() == Some(winner.address.as_str());
        if unchanged {
            if let Some(handle) = st.handle.clone() {
                return Ok(handle);
            }
        }

        if let Some(old) = st.handle.take() {
            let old_base = old.base_url().to_string();
            if let Err(e) = self.connector.close(old).await {
                eprintln!("⚠️  Failed to close connection to {}: {}", old_base, e);
            }
        }
        st.target = None;

        match self.connector.open(&winner.address, self.port).await {
            Ok(handle) => {
                println!("🔌 Coordinator is {} ({}); connection established", winner.address, winner.identity);
                metrics::CONNECTION_SWAPS_TOTAL.inc();
                st.target = Some(winner.address.clone());
                st.handle = Some(handle.clone());
                Ok(handle)
            }
            Err(e) => {
                metrics::CONNECT_FAILURES_TOTAL.inc();
                Err(ConnectionError::Connect(e))
            }
        }
    }

    /// Last-known handle without re-running the election. Stale by at most
    /// one maintenance interval; request handlers fall back to this when a
    /// fresh snapshot cannot be fetched.
    pub async fn current(&self) -> Option<TransactorHandle> {
        self.state.lock().await.handle.clone()
    }

    /// Address the open connection targets, for the status surface.
    pub async fn current_target(&self) -> Option<String> {
        self.state.lock().await.target.clone()
    }

    /// Close and forget the connection. Called on process shutdown.
    pub async fn shutdown(&self) {
        let mut st = self.state.lock().await;
        st.target = None;
        if let Some(handle) = st.handle.take() {
            let base = handle.base_url().to_string();
            if let Err(e) = self.connector.close(handle).await {
                eprintln!("⚠️  Failed to close connection to {} on shutdown: {}", base, e);
            }
        }
    }
}
