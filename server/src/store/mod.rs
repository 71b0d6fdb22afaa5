//! Membership persistence.
//!
//! The presence layer talks to lobby and membership rows only through the
//! [`MembershipStore`] trait. Two backends exist: [`MemoryStore`] (process
//! local, the default) and [`SqliteStore`] (durable, file backed).
//!
//! Invariants every backend upholds:
//! - exactly one [`LobbyId`] is ever handed out per lobby name, even when
//!   `ensure_lobby` races with itself;
//! - at most one membership row exists per `(LobbyId, MemberId)` pair.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{StoreBackend, StoreConfig};

mod memory;
pub mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Opaque lobby identity assigned by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LobbyId(pub i64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a member. Derived from the owning connection, never
/// from the display name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One membership row as seen by callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    /// Display name presented to the other lobby members.
    pub username: String,
}

impl Member {
    pub fn new(id: MemberId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing store unreachable or a query failed.
    #[error("membership store unavailable: {0}")]
    Unavailable(String),
    #[error("unknown lobby id {0}")]
    UnknownLobby(LobbyId),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Unavailable(value.to_string())
    }
}

/// Durable lobby/membership mapping used by the presence coordinator.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Return the id of the lobby called `name`, creating it if absent.
    async fn ensure_lobby(&self, name: &str) -> StoreResult<LobbyId>;

    /// Look up a lobby without creating it.
    async fn find_lobby(&self, name: &str) -> StoreResult<Option<LobbyId>>;

    /// Insert the membership row if absent. Re-adding is a no-op.
    async fn add_member(&self, lobby: LobbyId, member: &Member) -> StoreResult<()>;

    /// Current membership snapshot, in join order.
    async fn list_members(&self, lobby: LobbyId) -> StoreResult<Vec<Member>>;

    /// Remove every row for `member` across all lobbies. Returns the number
    /// of rows removed.
    async fn remove_member(&self, member: &MemberId) -> StoreResult<usize>;

    /// Drop all membership rows. Lobbies themselves are kept.
    async fn purge_members(&self) -> StoreResult<usize>;
}

/// Build the backend selected by `cfg`.
pub fn open_store(cfg: &StoreConfig) -> StoreResult<Arc<dyn MembershipStore>> {
    match cfg.backend {
        StoreBackend::Memory => {
            tracing::info!(backend = "memory", "membership store ready");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&cfg.path)?;
            tracing::info!(backend = "sqlite", path = %cfg.path.display(), "membership store ready");
            Ok(Arc::new(store))
        }
    }
}
