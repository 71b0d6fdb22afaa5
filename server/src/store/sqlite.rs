//! SQLite-backed membership store.
//!
//! Lobby names carry a `UNIQUE` constraint; `ensure_lobby` inserts with
//! `OR IGNORE` and then reads the row back, so a losing racer simply picks
//! up the winner's id. All queries run on the blocking thread pool.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::migrations::apply_migrations;
use super::{LobbyId, Member, MemberId, MembershipStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path` and migrate it.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "creating database directory '{}': {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::bootstrap(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(mut conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".into()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("{op}: blocking task failed: {e}")))?
    }
}

#[async_trait]
impl MembershipStore for SqliteStore {
    async fn ensure_lobby(&self, name: &str) -> StoreResult<LobbyId> {
        let name = name.to_owned();
        self.with_conn("ensure_lobby", move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO lobbies (name) VALUES (?1)",
                params![name],
            )?;
            let id = conn.query_row(
                "SELECT id FROM lobbies WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )?;
            Ok(LobbyId(id))
        })
        .await
    }

    async fn find_lobby(&self, name: &str) -> StoreResult<Option<LobbyId>> {
        let name = name.to_owned();
        self.with_conn("find_lobby", move |conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM lobbies WHERE name = ?1",
                    params![name],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(id.map(LobbyId))
        })
        .await
    }

    async fn add_member(&self, lobby: LobbyId, member: &Member) -> StoreResult<()> {
        let member = member.clone();
        self.with_conn("add_member", move |conn| {
            let exists = conn
                .query_row("SELECT 1 FROM lobbies WHERE id = ?1", params![lobby.0], |_| {
                    Ok(())
                })
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::UnknownLobby(lobby));
            }
            conn.execute(
                "INSERT OR IGNORE INTO lobby_members (lobby_id, member_id, username)
                 VALUES (?1, ?2, ?3)",
                params![lobby.0, member.id.as_str(), member.username],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_members(&self, lobby: LobbyId) -> StoreResult<Vec<Member>> {
        self.with_conn("list_members", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT member_id, username FROM lobby_members
                 WHERE lobby_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![lobby.0], |row| {
                Ok(Member::new(
                    MemberId::new(row.get::<_, String>(0)?),
                    row.get::<_, String>(1)?,
                ))
            })?;
            let mut members = Vec::new();
            for row in rows {
                members.push(row?);
            }
            Ok(members)
        })
        .await
    }

    async fn remove_member(&self, member: &MemberId) -> StoreResult<usize> {
        let member = member.clone();
        self.with_conn("remove_member", move |conn| {
            let removed = conn.execute(
                "DELETE FROM lobby_members WHERE member_id = ?1",
                params![member.as_str()],
            )?;
            Ok(removed)
        })
        .await
    }

    async fn purge_members(&self) -> StoreResult<usize> {
        self.with_conn("purge_members", |conn| {
            Ok(conn.execute("DELETE FROM lobby_members", [])?)
        })
        .await
    }
}
