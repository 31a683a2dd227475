//! Save/Load
//!
//! The simulation hands snapshots to a [`SaveStore`] through a
//! [`SaveWorker`] so network exchanges never block the game loop.

pub mod client;
pub mod snapshot;
pub mod worker;

use std::sync::{Arc, Mutex};

pub use client::SaveClient;
pub use snapshot::{SaveSnapshot, TreeSnapshot};
pub use worker::{SaveEvent, SaveWorker};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    #[error("save failed: network error: {0}")]
    Network(String),
    #[error("save failed: not logged in")]
    Unauthorized,
    #[error("save failed: {0}")]
    Server(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("load failed: network error: {0}")]
    Network(String),
    #[error("load failed: not logged in")]
    Unauthorized,
    #[error("load failed: {0}")]
    Server(String),
    #[error("load failed: unreadable save: {0}")]
    Decode(String),
}

/// Wherever snapshots go. Implementations may block; callers run them off
/// the game loop.
pub trait SaveStore: Send {
    fn save(&self, snapshot: &SaveSnapshot) -> Result<(), SaveError>;

    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<SaveSnapshot>, LoadError>;
}

/// Process-local store, used for offline play and in tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<SaveSnapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<SaveSnapshot> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SaveStore for MemoryStore {
    fn save(&self, snapshot: &SaveSnapshot) -> Result<(), SaveError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SaveError::Server("save slot poisoned".to_string()))?;
        *slot = Some(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<SaveSnapshot>, LoadError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| LoadError::Server("save slot poisoned".to_string()))?;
        Ok(slot.clone())
    }
}
