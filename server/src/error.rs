use crate::server::session::ConnectionId;
use crate::store::StoreError;

pub type PresenceResult<T> = Result<T, PresenceError>;

/// Failures surfaced by the presence coordinator. Each one is scoped to the
/// request that produced it; other connections are never affected.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Empty or malformed join payload. Nothing was changed.
    #[error("invalid join request: {0}")]
    Validation(String),
    /// The connection is unknown or already disconnected.
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),
}
