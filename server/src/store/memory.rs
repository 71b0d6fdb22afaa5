use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{LobbyId, Member, MemberId, MembershipStore, StoreError, StoreResult};

/// Process-local store. State is lost on restart, which matches the
/// ephemeral nature of lobby membership.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    lobbies: HashMap<String, LobbyId>,
    members: HashMap<LobbyId, Vec<Member>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn ensure_lobby(&self, name: &str) -> StoreResult<LobbyId> {
        let mut inner = self.lock()?;
        if let Some(id) = inner.lobbies.get(name) {
            return Ok(*id);
        }
        inner.next_id += 1;
        let id = LobbyId(inner.next_id);
        inner.lobbies.insert(name.to_owned(), id);
        inner.members.insert(id, Vec::new());
        Ok(id)
    }

    async fn find_lobby(&self, name: &str) -> StoreResult<Option<LobbyId>> {
        Ok(self.lock()?.lobbies.get(name).copied())
    }

    async fn add_member(&self, lobby: LobbyId, member: &Member) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let rows = inner
            .members
            .get_mut(&lobby)
            .ok_or(StoreError::UnknownLobby(lobby))?;
        if !rows.iter().any(|m| m.id == member.id) {
            rows.push(member.clone());
        }
        Ok(())
    }

    async fn list_members(&self, lobby: LobbyId) -> StoreResult<Vec<Member>> {
        self.lock()?
            .members
            .get(&lobby)
            .cloned()
            .ok_or(StoreError::UnknownLobby(lobby))
    }

    async fn remove_member(&self, member: &MemberId) -> StoreResult<usize> {
        let mut inner = self.lock()?;
        let mut removed = 0;
        for rows in inner.members.values_mut() {
            let before = rows.len();
            rows.retain(|m| &m.id != member);
            removed += before - rows.len();
        }
        Ok(removed)
    }

    async fn purge_members(&self) -> StoreResult<usize> {
        let mut inner = self.lock()?;
        let mut removed = 0;
        for rows in inner.members.values_mut() {
            removed += rows.len();
            rows.clear();
        }
        Ok(removed)
    }
}
