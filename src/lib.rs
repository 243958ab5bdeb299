// Library interface for the coordgate election gateway
// This allows tests and external consumers to use the election machinery

pub mod config;
pub mod distance;
pub mod election;
pub mod snapshot;
pub mod transactor;
pub mod connection;
pub mod maintenance;
pub mod gateway;
pub mod metrics;

pub use distance::{xor_distance, Distance, DIGEST_LEN};
pub use election::{select, Election, PeerRecord, PeerStatus, Snapshot, SELF_ADDRESS};
pub use connection::ConnectionManager;
pub use snapshot::{RpcSnapshotProvider, SnapshotSource};
pub use transactor::{Connector, HttpConnector, TransactorHandle};
