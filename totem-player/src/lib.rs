//! totem-player library
//!
//! Unattended signage player: fetches the playlist assigned to a device and
//! cycles through it, one item on screen at a time, resuming where it left
//! off after a restart.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod playback;
pub mod provider;

pub use api::{create_router, AppState};
pub use error::{Error, LoadError, Result};
pub use playback::PlaybackEngine;
pub use provider::{BackendClient, PlaylistProvider};
