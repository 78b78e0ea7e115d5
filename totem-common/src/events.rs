//! Event types for the totem event system
//!
//! Provides the shared event definitions and the EventBus used to push
//! player changes to the display surface (via SSE) and background tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::playlist::MediaItem;
use crate::state::PlayerState;

/// Player event types
///
/// Events are broadcast via EventBus and serialized as-is for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Engine state changed (Loading → Playing, Playing → Empty, ...)
    StateChanged {
        device_id: Option<String>,
        old_state: PlayerState,
        new_state: PlayerState,
        /// Reason shown on the placeholder (Failed/Empty)
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A new snapshot replaced the previous one
    SnapshotLoaded {
        device_id: String,
        item_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The item on screen changed
    ///
    /// Emitted on every advance cycle, including single-item playlists.
    ItemChanged {
        device_id: String,
        index: usize,
        item: MediaItem,
        timestamp: DateTime<Utc>,
    },

    /// A refresh failed while playing; the previous snapshot keeps playing
    ReloadFailed {
        device_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::StateChanged { .. } => "StateChanged",
            PlayerEvent::SnapshotLoaded { .. } => "SnapshotLoaded",
            PlayerEvent::ItemChanged { .. } => "ItemChanged",
            PlayerEvent::ReloadFailed { .. } => "ReloadFailed",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally: publishing never blocks, slow
/// subscribers see `Lagged` instead of stalling the player.
///
/// # Examples
///
/// ```
/// use totem_common::events::{EventBus, PlayerEvent};
/// use totem_common::PlayerState;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PlayerEvent::StateChanged {
///     device_id: Some("lobby-tv".to_string()),
///     old_state: PlayerState::Loading,
///     new_state: PlayerState::Playing,
///     reason: None,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
