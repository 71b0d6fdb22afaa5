use std::time::Duration;

use anyhow::{anyhow, Context};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use lobby_shared::{ClientMsg, LobbySnapshot, ServerMsg};

use super::utils::MessagePrinter;

/// Build a websocket URL from a base string (like "localhost:5001" or "http://host:5001").
pub fn build_ws_url(base: &str) -> anyhow::Result<Url> {
    let mut url = parse_base(base)?;

    match url.scheme() {
        "http" => url.set_scheme("ws").ok(),
        "https" => url.set_scheme("wss").ok(),
        "ws" | "wss" => Some(()),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Unsupported URL scheme: {}", url.scheme()))?;

    if url.path() != "/ws" {
        url.set_path("/ws");
    }
    Ok(url)
}

/// Build an HTTP base URL from the same inputs accepted by `build_ws_url`.
pub fn build_http_url(base: &str) -> anyhow::Result<Url> {
    let mut url = parse_base(base)?;

    match url.scheme() {
        "ws" => url.set_scheme("http").ok(),
        "wss" => url.set_scheme("https").ok(),
        "http" | "https" => Some(()),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Unsupported URL scheme: {}", url.scheme()))?;

    url.set_path("/");
    Ok(url)
}

fn parse_base(base: &str) -> anyhow::Result<Url> {
    // "localhost:5001" parses as scheme "localhost", so require "://"
    if base.contains("://") {
        Url::parse(base).with_context(|| format!("parsing server address '{}'", base))
    } else {
        Url::parse(&format!("http://{}", base))
            .with_context(|| format!("parsing server address '{}'", base))
    }
}

/// Join `lobby` as `name` and print updates until Ctrl-C or the server closes.
/// Dropping the socket is what removes us from the lobby server-side.
pub async fn join_and_watch(
    server: &str,
    name: &str,
    lobby: &str,
    printer: &mut MessagePrinter,
) -> anyhow::Result<()> {
    let ws_url = build_ws_url(server)?;
    let (ws_stream, _resp) = tokio_tungstenite::connect_async(ws_url.as_str())
        .await
        .with_context(|| format!("connecting to {}", ws_url))?;
    let (mut write, mut read) = ws_stream.split();

    let join = ClientMsg::JoinLobby {
        username: name.to_string(),
        lobby: lobby.to_string(),
    };
    write.send(Message::Text(serde_json::to_string(&join)?)).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(txt))) => {
                    if let Ok(sm) = serde_json::from_str::<ServerMsg>(&txt) {
                        printer.handle(&sm);
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_other)) => { /* ignore non-text frames */ }
                Some(Err(e)) => {
                    eprintln!("WebSocket error: {}", e);
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Send a ping and wait up to `wait_ms` for the pong.
pub async fn ping_ws(server: &str, wait_ms: u64, printer: &mut MessagePrinter) -> anyhow::Result<bool> {
    let ws_url = build_ws_url(server)?;
    let (ws_stream, _resp) = tokio_tungstenite::connect_async(ws_url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    write
        .send(Message::Text(serde_json::to_string(&ClientMsg::Ping)?))
        .await?;

    loop {
        match tokio::time::timeout(Duration::from_millis(wait_ms), read.next()).await {
            Ok(Some(Ok(Message::Text(txt)))) => {
                if let Ok(sm) = serde_json::from_str::<ServerMsg>(&txt) {
                    printer.handle(&sm);
                    if sm == ServerMsg::Pong {
                        return Ok(true);
                    }
                }
            }
            Ok(Some(Ok(_other))) => { /* ignore */ }
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) | Err(_) => return Ok(false),
        }
    }
}

/// Fetch the member list of `lobby` over HTTP. `None` if the lobby does not exist.
pub async fn fetch_members(server: &str, lobby: &str) -> anyhow::Result<Option<LobbySnapshot>> {
    let mut url = build_http_url(server)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("server URL cannot carry a path"))?
        .clear()
        .extend(["api", "lobbies", lobby]);

    let response = reqwest::get(url.clone())
        .await
        .with_context(|| format!("requesting {}", url))?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let response = response.error_for_status()?;
    Ok(Some(response.json::<LobbySnapshot>().await?))
}
