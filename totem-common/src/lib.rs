//! # Totem Common Library
//!
//! Shared code for the totem signage services including:
//! - Playlist data model (media items and snapshots)
//! - Player state and the read-only player view
//! - Event types (PlayerEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Database bootstrap (settings table)

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod playlist;
pub mod state;

pub use error::{Error, Result};
pub use playlist::{MediaItem, MediaKind, PlaylistSnapshot};
pub use state::{PlayerState, PlayerView};
