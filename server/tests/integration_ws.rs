use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures_util::{SinkExt, StreamExt};
use lobby_server::server::{build_router, AppState};
use lobby_shared::{ClientMsg, LobbySnapshot, ServerMsg};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start the router on an OS-assigned port.
async fn spawn_server() -> Result<(SocketAddr, AppState, tokio::task::JoinHandle<()>)> {
    let state = AppState::default();
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });
    Ok((addr, state, handle))
}

/// Connect and consume the welcome frame.
async fn connect(addr: SocketAddr) -> Result<Ws> {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr)).await?;
    match next_msg(&mut ws).await? {
        ServerMsg::Welcome { .. } => Ok(ws),
        other => Err(anyhow!("expected welcome, got {:?}", other)),
    }
}

async fn send(ws: &mut Ws, msg: &ClientMsg) -> Result<()> {
    ws.send(Message::Text(serde_json::to_string(msg)?)).await?;
    Ok(())
}

async fn join(ws: &mut Ws, username: &str, lobby: &str) -> Result<()> {
    send(
        ws,
        &ClientMsg::JoinLobby {
            username: username.into(),
            lobby: lobby.into(),
        },
    )
    .await
}

async fn next_msg(ws: &mut Ws) -> Result<ServerMsg> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(3), ws.next())
            .await
            .map_err(|_| anyhow!("timed out waiting for a server message"))?
            .ok_or_else(|| anyhow!("socket closed"))??;
        if let Message::Text(txt) = frame {
            return Ok(serde_json::from_str(&txt)?);
        }
    }
}

async fn next_members(ws: &mut Ws) -> Result<BTreeSet<String>> {
    match next_msg(ws).await? {
        ServerMsg::LobbyUpdate(members) => Ok(members.into_iter().collect()),
        other => Err(anyhow!("expected lobby-update, got {:?}", other)),
    }
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn lobby_updates_follow_joins_and_disconnects() -> Result<()> {
    let (addr, state, server) = spawn_server().await?;

    let mut x = connect(addr).await?;
    let mut y = connect(addr).await?;

    join(&mut x, "alice", "abc").await?;
    assert_eq!(next_members(&mut x).await?, names(&["alice"]));

    join(&mut y, "bob", "abc").await?;
    assert_eq!(next_members(&mut x).await?, names(&["alice", "bob"]));
    assert_eq!(next_members(&mut y).await?, names(&["alice", "bob"]));

    x.close(None).await?;
    assert_eq!(next_members(&mut y).await?, names(&["bob"]));
    assert_eq!(
        state.presence.members("abc").await?,
        Some(vec!["bob".to_string()])
    );

    server.abort();
    Ok(())
}

#[tokio::test]
async fn invalid_requests_get_an_error_reply() -> Result<()> {
    let (addr, _state, server) = spawn_server().await?;
    let mut ws = connect(addr).await?;

    ws.send(Message::Text("{not json".into())).await?;
    assert!(matches!(next_msg(&mut ws).await?, ServerMsg::Error(_)));

    join(&mut ws, "", "abc").await?;
    assert!(matches!(next_msg(&mut ws).await?, ServerMsg::Error(_)));

    send(&mut ws, &ClientMsg::Ping).await?;
    assert_eq!(next_msg(&mut ws).await?, ServerMsg::Pong);

    server.abort();
    Ok(())
}

#[tokio::test]
async fn leave_lobby_clears_the_leavers_view() -> Result<()> {
    let (addr, _state, server) = spawn_server().await?;
    let mut x = connect(addr).await?;
    let mut y = connect(addr).await?;

    join(&mut x, "alice", "abc").await?;
    next_members(&mut x).await?;
    join(&mut y, "bob", "abc").await?;
    next_members(&mut x).await?;
    next_members(&mut y).await?;

    send(&mut x, &ClientMsg::LeaveLobby).await?;
    assert_eq!(next_members(&mut x).await?, BTreeSet::new());
    assert_eq!(next_members(&mut y).await?, names(&["bob"]));

    server.abort();
    Ok(())
}

#[tokio::test]
async fn http_members_endpoint_reports_snapshot() -> Result<()> {
    let (addr, _state, server) = spawn_server().await?;
    let mut ws = connect(addr).await?;
    join(&mut ws, "alice", "abc").await?;
    next_members(&mut ws).await?;

    let snapshot: LobbySnapshot = reqwest::get(format!("http://{}/api/lobbies/abc", addr))
        .await?
        .error_for_status()?
        .json()
        .await?;
    assert_eq!(
        snapshot,
        LobbySnapshot {
            lobby: "abc".into(),
            members: vec!["alice".into()],
        }
    );

    let missing = reqwest::get(format!("http://{}/api/lobbies/nope", addr)).await?;
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    server.abort();
    Ok(())
}
