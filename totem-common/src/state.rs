//! Player state definitions shared between the player and its display surface

use serde::{Deserialize, Serialize};

use crate::playlist::MediaItem;

/// Playback engine state
///
/// `Empty` and `Failed` are terminal until the engine is started or reloaded
/// again from outside.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// Not started yet, or stopped
    Idle,
    /// Fetching the playlist snapshot
    Loading,
    /// Cycling through a non-empty snapshot
    Playing,
    /// Snapshot loaded but has no items
    Empty,
    /// Snapshot could not be fetched
    Failed,
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Idle => write!(f, "idle"),
            PlayerState::Loading => write!(f, "loading"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Empty => write!(f, "empty"),
            PlayerState::Failed => write!(f, "failed"),
        }
    }
}

/// Read-only view of the engine, as served to the display surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    /// Device whose playlist is loaded (None before the first start)
    pub device_id: Option<String>,
    pub state: PlayerState,
    /// Human readable reason for `Failed` (and optional detail for `Empty`)
    pub reason: Option<String>,
    pub current_index: usize,
    pub item_count: usize,
    /// Item on screen, None means "no content"
    pub current_item: Option<MediaItem>,
}

impl PlayerView {
    /// View of an engine that has never been started
    pub fn idle() -> Self {
        Self {
            device_id: None,
            state: PlayerState::Idle,
            reason: None,
            current_index: 0,
            item_count: 0,
            current_item: None,
        }
    }
}
