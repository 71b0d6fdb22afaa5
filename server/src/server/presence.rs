//! Presence coordination: who is in which lobby, and who hears about it.
//!
//! The coordinator is the only writer of membership rows. For a given lobby
//! every "mutate store, read store, broadcast" sequence runs under that
//! lobby's gate, so subscribers observe snapshots in the same order the
//! mutations were applied. Lobbies never wait on each other.
//!
//! Connection lifecycle: `Connected` → `Joined` → `Disconnected`. A join that
//! finishes writing its row after the connection was closed removes the row
//! itself; a disconnect that sees `Joined` cleans up under the lobby gate.

use std::sync::Arc;

use lobby_shared::ServerMsg;

use super::lobby::{LobbyChannel, LobbyRegistry};
use super::session::{ConnectionId, ConnectionPhase, Outbound, SessionTable};
use crate::error::{PresenceError, PresenceResult};
use crate::store::{LobbyId, Member, MemberId, MembershipStore};

pub struct PresenceCoordinator {
    store: Arc<dyn MembershipStore>,
    sessions: SessionTable,
    lobbies: LobbyRegistry,
}

impl PresenceCoordinator {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self {
            store,
            sessions: SessionTable::default(),
            lobbies: LobbyRegistry::default(),
        }
    }

    /// Register a new connection. Lobby updates for it are pushed to
    /// `outbound` in broadcast order.
    pub fn connect(&self, outbound: Outbound) -> ConnectionId {
        let id = self.sessions.open(outbound);
        tracing::debug!(connection = %id, "connection registered");
        id
    }

    pub fn phase(&self, id: ConnectionId) -> Option<ConnectionPhase> {
        self.sessions.phase(id)
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Join `lobby` as `username`.
    ///
    /// Switching to a different lobby (or renaming inside the same one)
    /// leaves the current lobby first, and the connection is sent an empty
    /// update for it. If the join then fails in the store the connection is
    /// left `Connected`: it is no longer in the old lobby and not yet in the
    /// new one. On store failure no broadcast is made for the new lobby.
    pub async fn join(
        &self,
        id: ConnectionId,
        username: &str,
        lobby: &str,
    ) -> PresenceResult<LobbyId> {
        validate(username, lobby)?;

        let current = self
            .sessions
            .phase(id)
            .ok_or(PresenceError::ConnectionClosed(id))?;
        if let ConnectionPhase::Joined {
            lobby: ref current_lobby,
            member: ref current_member,
            ..
        } = current
        {
            if current_lobby != lobby || current_member.username != username {
                self.leave(id).await?;
            }
        }

        // Lobby rows are race-safe on their own; only membership changes
        // need the gate.
        let lobby_id = self.store.ensure_lobby(lobby).await.map_err(|e| {
            tracing::error!(connection = %id, lobby, error = %e, "ensure_lobby failed");
            e
        })?;

        let member = Member::new(MemberId::from(id), username);
        let channel = self.lobbies.channel(lobby);
        let _gate = channel.serialize().await;

        self.store
            .add_member(lobby_id, &member)
            .await
            .map_err(|e| {
                tracing::error!(connection = %id, lobby, error = %e, "add_member failed");
                e
            })?;

        let joined = ConnectionPhase::Joined {
            lobby: lobby.to_owned(),
            lobby_id,
            member: member.clone(),
        };
        let Some(outbound) = self.sessions.transition(id, joined) else {
            // Closed while we were writing; undo our own row.
            tracing::debug!(connection = %id, lobby, "connection closed mid-join, rolling back");
            if let Err(e) = self.store.remove_member(&member.id).await {
                tracing::error!(connection = %id, lobby, error = %e, "rollback of late join failed");
                channel.defer_removal(member.id);
            }
            return Err(PresenceError::ConnectionClosed(id));
        };

        channel.subscribe(id, outbound);
        tracing::info!(connection = %id, lobby, username, "joined lobby");
        self.publish(&channel, lobby_id).await;
        Ok(lobby_id)
    }

    /// Leave the current lobby and notify the remaining members. The leaver
    /// gets an empty update through its own queue, after any update already
    /// queued for it.
    ///
    /// Returns `Ok(false)` when the connection was not in a lobby.
    pub async fn leave(&self, id: ConnectionId) -> PresenceResult<bool> {
        let phase = self
            .sessions
            .phase(id)
            .ok_or(PresenceError::ConnectionClosed(id))?;
        let ConnectionPhase::Joined {
            lobby,
            lobby_id,
            member,
        } = phase
        else {
            return Ok(false);
        };

        let channel = self.lobbies.channel(&lobby);
        let _gate = channel.serialize().await;

        // Row goes first: if this fails the session stays `Joined`, so a
        // later leave or disconnect tries the removal again.
        self.store.remove_member(&member.id).await.map_err(|e| {
            tracing::error!(connection = %id, lobby = %lobby, error = %e, "remove_member failed");
            e
        })?;
        if let Some(outbound) = self.sessions.transition(id, ConnectionPhase::Connected) {
            let _ = outbound.send(ServerMsg::LobbyUpdate(Vec::new()));
        }
        channel.unsubscribe(id);
        tracing::info!(connection = %id, lobby = %lobby, "left lobby");

        self.publish(&channel, lobby_id).await;
        Ok(true)
    }

    /// Tear down a connection. Safe to call any number of times; cleanup
    /// runs only for the first call. Returns whether this call did it.
    ///
    /// A membership row that cannot be removed here is parked on the lobby
    /// channel and removed before the lobby's next update.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let Some((_session, previous)) = self.sessions.close(id) else {
            tracing::debug!(connection = %id, "disconnect already handled");
            return false;
        };

        if let ConnectionPhase::Joined {
            lobby,
            lobby_id,
            member,
        } = previous
        {
            let channel = self.lobbies.channel(&lobby);
            let _gate = channel.serialize().await;
            channel.unsubscribe(id);
            match self.store.remove_member(&member.id).await {
                Ok(removed) => {
                    tracing::debug!(connection = %id, lobby = %lobby, removed, "membership removed");
                    self.publish(&channel, lobby_id).await;
                }
                Err(e) => {
                    tracing::error!(
                        connection = %id,
                        lobby = %lobby,
                        error = %e,
                        "remove_member failed during disconnect, deferring"
                    );
                    channel.defer_removal(member.id);
                }
            }
        }
        true
    }

    /// Current usernames of `lobby`, or `None` if it was never created.
    pub async fn members(&self, lobby: &str) -> PresenceResult<Option<Vec<String>>> {
        let Some(lobby_id) = self.store.find_lobby(lobby).await? else {
            return Ok(None);
        };
        let members = self.store.list_members(lobby_id).await?;
        Ok(Some(usernames(members)))
    }

    /// Number of lobby channels this process has opened.
    pub fn lobby_count(&self) -> usize {
        self.lobbies.count()
    }

    /// Number of live connections subscribed to `lobby`.
    pub fn subscriber_count(&self, lobby: &str) -> usize {
        self.lobbies
            .get(lobby)
            .map_or(0, |channel| channel.subscriber_count())
    }

    /// Retry removals that failed during earlier disconnects. Gate held.
    async fn retry_deferred(&self, channel: &LobbyChannel) {
        for member in channel.take_deferred() {
            match self.store.remove_member(&member).await {
                Ok(removed) => {
                    tracing::info!(lobby = %channel.name(), member = %member, removed, "deferred removal done");
                }
                Err(e) => {
                    tracing::warn!(lobby = %channel.name(), member = %member, error = %e, "deferred removal failed again");
                    channel.defer_removal(member);
                }
            }
        }
    }

    /// Read the snapshot and fan it out. Must be called with the lobby gate
    /// held. A failed read skips the broadcast; subscribers keep their last
    /// view.
    async fn publish(&self, channel: &LobbyChannel, lobby_id: LobbyId) -> Option<Vec<String>> {
        self.retry_deferred(channel).await;
        match self.store.list_members(lobby_id).await {
            Ok(members) => {
                let names = usernames(members);
                let delivered = channel.broadcast(&ServerMsg::LobbyUpdate(names.clone()));
                tracing::info!(
                    lobby = %channel.name(),
                    members = names.len(),
                    delivered,
                    "lobby update"
                );
                Some(names)
            }
            Err(e) => {
                tracing::error!(
                    lobby = %channel.name(),
                    error = %e,
                    "snapshot unavailable, skipping lobby update"
                );
                None
            }
        }
    }
}

fn usernames(members: Vec<Member>) -> Vec<String> {
    members.into_iter().map(|m| m.username).collect()
}

fn validate(username: &str, lobby: &str) -> PresenceResult<()> {
    if username.trim().is_empty() {
        return Err(PresenceError::Validation("username must not be empty".into()));
    }
    if lobby.trim().is_empty() {
        return Err(PresenceError::Validation("lobby must not be empty".into()));
    }
    Ok(())
}
