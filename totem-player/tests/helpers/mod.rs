//! Shared fixtures for totem-player integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use totem_common::events::EventBus;
use totem_common::{MediaItem, MediaKind, PlaylistSnapshot};
use totem_player::playback::MemoryIndexStore;
use totem_player::{LoadError, PlaybackEngine, PlaylistProvider};

/// Provider returning whatever the test last configured
pub struct ScriptedProvider {
    response: Mutex<Result<Vec<MediaItem>, LoadError>>,
    fetches: AtomicUsize,
}

impl ScriptedProvider {
    pub fn with_items(items: Vec<MediaItem>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(items)),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: LoadError) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(error)),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn respond(&self, response: Result<Vec<MediaItem>, LoadError>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaylistProvider for ScriptedProvider {
    async fn fetch_playlist(&self, _device_id: &str) -> Result<PlaylistSnapshot, LoadError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.response
            .lock()
            .unwrap()
            .clone()
            .map(PlaylistSnapshot::new)
    }
}

pub fn image(name: &str, secs: f64) -> MediaItem {
    MediaItem::new(MediaKind::Image, format!("http://cdn.test/{}.png", name), secs)
}

pub fn video(name: &str, secs: f64) -> MediaItem {
    MediaItem::new(MediaKind::Video, format!("http://cdn.test/{}.mp4", name), secs)
}

/// Engine over a scripted provider and an in-memory index store
pub fn engine(provider: Arc<ScriptedProvider>, store: Arc<MemoryIndexStore>) -> PlaybackEngine {
    PlaybackEngine::new(provider, store, EventBus::new(64), Duration::from_secs(1))
}
