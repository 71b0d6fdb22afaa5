// Per-connection session records.
//
// Every live transport connection owns one `Session`. The table is the only
// place that knows which lobby a connection is in, so disconnect cleanup
// looks members up here by connection id instead of re-deriving identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lobby_shared::ServerMsg;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::store::{LobbyId, Member, MemberId};

/// Ordered outbound queue of one connection.
pub type Outbound = mpsc::UnboundedSender<ServerMsg>;

/// Generated transport-level identity of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ConnectionId> for MemberId {
    fn from(id: ConnectionId) -> Self {
        MemberId::new(id.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Handle exists, no lobby yet.
    Connected,
    /// In exactly one lobby.
    Joined {
        lobby: String,
        lobby_id: LobbyId,
        member: Member,
    },
    /// Terminal. Cleanup has been claimed by exactly one caller.
    Disconnected,
}

impl ConnectionPhase {
    pub fn lobby(&self) -> Option<&str> {
        match self {
            ConnectionPhase::Joined { lobby, .. } => Some(lobby),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub id: ConnectionId,
    pub phase: ConnectionPhase,
    pub outbound: Outbound,
}

/// Live connections keyed by id. Critical sections are short and never
/// span an await point.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: Mutex<HashMap<ConnectionId, Session>>,
}

impl SessionTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a fresh connection in the `Connected` phase.
    pub fn open(&self, outbound: Outbound) -> ConnectionId {
        let id = ConnectionId::new();
        self.lock().insert(
            id,
            Session {
                id,
                phase: ConnectionPhase::Connected,
                outbound,
            },
        );
        id
    }

    pub fn phase(&self, id: ConnectionId) -> Option<ConnectionPhase> {
        self.lock().get(&id).map(|s| s.phase.clone())
    }

    /// Move a still-live connection into `phase`, returning its outbound
    /// queue. `None` means the connection was closed in the meantime.
    pub fn transition(&self, id: ConnectionId, phase: ConnectionPhase) -> Option<Outbound> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id)?;
        session.phase = phase;
        Some(session.outbound.clone())
    }

    /// Remove the session, marking it `Disconnected`. Only the first caller
    /// gets it back.
    pub fn close(&self, id: ConnectionId) -> Option<(Session, ConnectionPhase)> {
        let mut session = self.lock().remove(&id)?;
        let previous = std::mem::replace(&mut session.phase, ConnectionPhase::Disconnected);
        Some((session, previous))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_runs_once() {
        let table = SessionTable::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = table.open(tx);
        assert_eq!(table.phase(id), Some(ConnectionPhase::Connected));

        let (session, previous) = table.close(id).unwrap();
        assert_eq!(session.phase, ConnectionPhase::Disconnected);
        assert_eq!(previous, ConnectionPhase::Connected);
        assert!(table.close(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn transition_after_close_is_refused() {
        let table = SessionTable::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = table.open(tx);
        table.close(id);
        assert!(table.transition(id, ConnectionPhase::Connected).is_none());
    }

    #[test]
    fn member_id_follows_connection_id() {
        let id = ConnectionId::new();
        assert_eq!(MemberId::from(id).as_str(), id.to_string());
    }
}
