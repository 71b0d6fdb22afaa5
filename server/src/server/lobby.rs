// Per-lobby broadcast channels.
//
// Each lobby name maps to one `LobbyChannel` holding its subscriber set and
// the gate that serializes "mutate store, read store, broadcast" for that
// lobby. Different lobbies never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lobby_shared::ServerMsg;

use super::session::{ConnectionId, Outbound};
use crate::store::MemberId;

#[derive(Debug)]
pub struct LobbyChannel {
    name: String,
    gate: tokio::sync::Mutex<()>,
    subscribers: Mutex<HashMap<ConnectionId, Outbound>>,
    // rows of closed connections whose removal failed
    deferred: Mutex<Vec<MemberId>>,
}

impl LobbyChannel {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            gate: tokio::sync::Mutex::new(()),
            subscribers: Mutex::new(HashMap::new()),
            deferred: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the lobby's serialization gate. Held across store calls.
    pub async fn serialize(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<ConnectionId, Outbound>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, id: ConnectionId, outbound: Outbound) {
        self.subscribers().insert(id, outbound);
    }

    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        self.subscribers().remove(&id).is_some()
    }

    pub fn is_subscribed(&self, id: ConnectionId) -> bool {
        self.subscribers().contains_key(&id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Park a membership row that still has to be removed.
    pub fn defer_removal(&self, member: MemberId) {
        let mut deferred = self.deferred.lock().unwrap_or_else(PoisonError::into_inner);
        if !deferred.contains(&member) {
            deferred.push(member);
        }
    }

    pub fn take_deferred(&self) -> Vec<MemberId> {
        std::mem::take(&mut *self.deferred.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Deliver `msg` to every subscriber. Subscribers whose queue is gone
    /// are dropped from the set. Returns the number of deliveries.
    pub fn broadcast(&self, msg: &ServerMsg) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|id, outbound| {
            let alive = outbound.send(msg.clone()).is_ok();
            if !alive {
                tracing::debug!(connection = %id, lobby = %self.name, "dropping closed subscriber");
            }
            alive
        });
        subscribers.len()
    }
}

/// All lobby channels known to this process, created on first use.
#[derive(Debug, Default)]
pub struct LobbyRegistry {
    channels: Mutex<HashMap<String, Arc<LobbyChannel>>>,
}

impl LobbyRegistry {
    fn channels(&self) -> MutexGuard<'_, HashMap<String, Arc<LobbyChannel>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Channel for `name`, creating it if needed.
    pub fn channel(&self, name: &str) -> Arc<LobbyChannel> {
        let mut channels = self.channels();
        if let Some(channel) = channels.get(name) {
            return Arc::clone(channel);
        }
        let channel = Arc::new(LobbyChannel::new(name));
        channels.insert(name.to_owned(), Arc::clone(&channel));
        channel
    }

    pub fn get(&self, name: &str) -> Option<Arc<LobbyChannel>> {
        self.channels().get(name).cloned()
    }

    pub fn count(&self) -> usize {
        self.channels().len()
    }
}
