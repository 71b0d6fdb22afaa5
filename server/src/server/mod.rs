pub mod http;
pub mod lobby;
pub mod presence;
pub mod run;
pub mod session;
pub mod state;
pub mod ws;

// Export commonly used types and functions
pub use presence::PresenceCoordinator;
pub use run::{build_router, run_server};
pub use session::{ConnectionId, ConnectionPhase};
pub use state::AppState;
