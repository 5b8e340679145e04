//! Identity-level events produced by settle cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::indexer::DocumentIdentity;

/// A change to one document identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "identity", rename_all = "snake_case")]
pub enum WatchEvent {
    /// The identity appeared in the directory.
    Created(DocumentIdentity),

    /// The identity disappeared from the directory.
    Removed(DocumentIdentity),

    /// The identity still exists and its file was touched.
    Changed(DocumentIdentity),
}

impl WatchEvent {
    /// The identity this event refers to.
    pub fn identity(&self) -> &DocumentIdentity {
        match self {
            Self::Created(identity) | Self::Removed(identity) | Self::Changed(identity) => {
                identity
            }
        }
    }

    /// The kind of event.
    pub fn kind(&self) -> WatchEventKind {
        match self {
            Self::Created(_) => WatchEventKind::Created,
            Self::Removed(_) => WatchEventKind::Removed,
            Self::Changed(_) => WatchEventKind::Changed,
        }
    }
}

/// Kind of watch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventKind {
    /// Identity was created.
    Created,

    /// Identity was removed.
    Removed,

    /// Identity was changed.
    Changed,
}

impl std::fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Removed => "removed",
            Self::Changed => "changed",
        };
        f.write_str(name)
    }
}

/// The ordered events of one settle cycle.
///
/// Events are grouped created, removed, changed; each identity appears at
/// most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchBatch {
    /// Events in delivery order.
    pub events: Vec<WatchEvent>,

    /// Whether this is the replay a subscriber receives when it subscribes.
    pub initial: bool,

    /// When the batch was produced.
    pub settled_at: DateTime<Utc>,
}

impl WatchBatch {
    /// Create a batch from already-ordered events.
    pub fn new(events: Vec<WatchEvent>) -> Self {
        Self {
            events,
            initial: false,
            settled_at: Utc::now(),
        }
    }

    /// Create the replay batch for a new subscriber.
    pub fn initial(events: Vec<WatchEvent>) -> Self {
        Self {
            initial: true,
            ..Self::new(events)
        }
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get the number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Count the events of one kind.
    pub fn count(&self, kind: WatchEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    /// Iterate over the events in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = &WatchEvent> {
        self.events.iter()
    }
}

impl IntoIterator for WatchBatch {
    type Item = WatchEvent;
    type IntoIter = std::vec::IntoIter<WatchEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
