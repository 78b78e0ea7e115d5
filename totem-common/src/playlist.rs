//! Playlist data model
//!
//! A [`PlaylistSnapshot`] is the playlist of one device as fetched at one
//! point in time. It is never edited in place: a reload replaces it wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// What kind of media an item is, which decides how it is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    /// Accepts `image` / `video` in any case, and MIME types such as
    /// `image/png` or `video/mp4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let major = lower.split('/').next().unwrap_or_default();
        match major {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            _ => Err(format!("unknown media type '{}'", s)),
        }
    }
}

/// Invalid display duration on a single media item
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Duration is zero, negative, NaN, infinite or too large for a timer
    #[error("invalid display duration: {0}")]
    InvalidDuration(f64),

    /// Item carries no duration at all
    #[error("missing display duration")]
    MissingDuration,
}

/// One entry of a playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Image or video
    pub kind: MediaKind,
    /// Fully resolved URL the display surface can load directly
    pub source_url: String,
    /// Seconds this item stays on screen before the player advances
    pub display_seconds: Option<f64>,
    /// Human readable name, used as alt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MediaItem {
    pub fn new(kind: MediaKind, source_url: impl Into<String>, display_seconds: f64) -> Self {
        Self {
            kind,
            source_url: source_url.into(),
            display_seconds: Some(display_seconds),
            name: None,
        }
    }

    /// How long the item stays on screen, as a timer delay
    ///
    /// Only strictly positive, finite durations that fit a [`Duration`] are
    /// accepted. Callers decide what to substitute on error.
    pub fn display_duration(&self) -> Result<Duration, ConfigError> {
        let secs = self.display_seconds.ok_or(ConfigError::MissingDuration)?;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::InvalidDuration(secs));
        }
        Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidDuration(secs))
    }
}

/// Immutable playlist for one device, in playback order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    items: Vec<MediaItem>,
    /// When the snapshot was fetched
    pub fetched_at: DateTime<Utc>,
}

impl PlaylistSnapshot {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items,
            fetched_at: Utc::now(),
        }
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    /// Index that follows `current`, wrapping after the last item
    pub fn next_index(&self, current: usize) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (current + 1) % self.items.len()
        }
    }

    /// Adopt a persisted index if it points into this snapshot, else start at 0
    pub fn resume_index(&self, persisted: Option<i64>) -> usize {
        match persisted {
            Some(i) if i >= 0 && (i as usize) < self.items.len() => i as usize,
            _ => 0,
        }
    }

    /// Keep `current` if still valid for this snapshot, else go back to 0
    pub fn clamp_index(&self, current: usize) -> usize {
        if current < self.items.len() {
            current
        } else {
            0
        }
    }

    /// Same items in the same order, regardless of fetch time
    pub fn same_items(&self, other: &PlaylistSnapshot) -> bool {
        self.items == other.items
    }
}
