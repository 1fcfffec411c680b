use crate::protocol::PlayerSnapshot;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared, read-mostly view of the player. The core is the only writer; the
/// UI clones the snapshot when a `StateUpdated` broadcast arrives.
#[derive(Clone, Default)]
pub struct StateManager {
    state: Arc<RwLock<PlayerSnapshot>>,
}

impl StateManager {
    pub fn new(initial: PlayerSnapshot) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn arc(&self) -> Arc<RwLock<PlayerSnapshot>> {
        Arc::clone(&self.state)
    }

    pub async fn get_state(&self) -> PlayerSnapshot {
        self.state.read().await.clone()
    }

    /// Replace the snapshot, bumping `rev` past the previous value.
    pub async fn publish(&self, mut snapshot: PlayerSnapshot) -> u64 {
        let mut state = self.state.write().await;
        snapshot.rev = state.rev + 1;
        *state = snapshot;
        state.rev
    }
}
