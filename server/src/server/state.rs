use std::sync::Arc;

use crate::store::{MembershipStore, MemoryStore};

use super::presence::PresenceCoordinator;

/// Shared application state exposed to handlers.
#[derive(Clone)]
pub struct AppState {
    pub presence: Arc<PresenceCoordinator>,
}

impl AppState {
    /// Create a new AppState around an already opened membership store.
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self {
            presence: Arc::new(PresenceCoordinator::new(store)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new(Arc::new(MemoryStore::new()))
    }
}
