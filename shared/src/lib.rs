//! Wire types shared between the lobby server and its clients.

pub mod messages;

pub use messages::{ClientMsg, LobbySnapshot, ServerMsg};
