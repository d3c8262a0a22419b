//! Change notification for UI subscribers

use std::path::PathBuf;

use crate::ids::MutationId;

/// One completed mutator phase
#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent {
    Began { id: MutationId, description: String },
    Updated { id: MutationId },
    Applied { id: MutationId, description: String },
    Undone { id: MutationId, description: String },
    Redone { id: MutationId, description: String },
    Cancelled { id: MutationId },
    Abandoned { id: MutationId },
    Persisted { path: PathBuf, hash: String },
    /// Document re-read from disk; history was cleared
    Reloaded { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&MutationEvent)>;

/// Explicit subscribe/unsubscribe event fan-out
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&MutationEvent) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: MutationEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
