//! Background tasks that keep a running player in touch with the backend

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::engine::PlaybackEngine;
use crate::config::MAX_BACKGROUND_INTERVAL_S;
use crate::provider::{BackendClient, Heartbeat};
use totem_common::PlayerState;

/// Start background tasks
///
/// Either interval may be None to leave that task out. The returned handles
/// are aborted on shutdown.
pub fn start_monitoring(
    engine: PlaybackEngine,
    client: BackendClient,
    refresh_interval: Option<Duration>,
    heartbeat_interval: Option<Duration>,
) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();

    if let Some(period) = refresh_interval {
        tasks.push(tokio::spawn(playlist_refresh_task(engine.clone(), period)));
    }
    if let Some(period) = heartbeat_interval {
        tasks.push(tokio::spawn(heartbeat_task(engine, client, period)));
    }

    tasks
}

fn ticker(period: Duration) -> time::Interval {
    let period = period.min(Duration::from_secs(MAX_BACKGROUND_INTERVAL_S));
    // First tick after one full period; startup has just loaded the playlist
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Playlist refresh task
///
/// Only refreshes while playing. A failed or empty device is left for an
/// explicit start/reload.
pub(crate) async fn playlist_refresh_task(engine: PlaybackEngine, period: Duration) {
    let mut interval = ticker(period);

    info!("Playlist refresh task started ({}s interval)", period.as_secs());

    loop {
        interval.tick().await;

        if engine.state().await != PlayerState::Playing {
            debug!("Skipping playlist refresh: not playing");
            continue;
        }

        if let Err(e) = engine.reload().await {
            warn!("Playlist refresh failed: {}", e);
        }
    }
}

/// Heartbeat task
async fn heartbeat_task(engine: PlaybackEngine, client: BackendClient, period: Duration) {
    let mut interval = ticker(period);

    info!("Heartbeat task started ({}s interval)", period.as_secs());

    loop {
        interval.tick().await;

        let view = engine.view().await;
        let Some(device_id) = view.device_id else {
            continue;
        };

        let heartbeat = Heartbeat {
            status: "online",
            player_state: view.state,
            current_index: view.current_index,
            item_count: view.item_count,
        };

        match client.send_heartbeat(&device_id, &heartbeat).await {
            Ok(()) => debug!("Heartbeat sent for device {}", device_id),
            Err(e) => warn!("Heartbeat for device {} failed: {}", device_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::playback::store::MemoryIndexStore;
    use crate::provider::PlaylistProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use totem_common::events::EventBus;
    use totem_common::{MediaItem, MediaKind, PlaylistSnapshot};

    #[derive(Default)]
    struct CountingProvider {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl PlaylistProvider for CountingProvider {
        async fn fetch_playlist(
            &self,
            _device_id: &str,
        ) -> std::result::Result<PlaylistSnapshot, LoadError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(PlaylistSnapshot::new(vec![MediaItem::new(
                MediaKind::Image,
                "http://cdn/a.png",
                600.0,
            )]))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_task_reloads_each_period() {
        let provider = Arc::new(CountingProvider::default());
        let engine = PlaybackEngine::new(
            provider.clone(),
            Arc::new(MemoryIndexStore::new()),
            EventBus::new(16),
            Duration::from_secs(1),
        );
        engine.start("lobby").await.unwrap();
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);

        let task = tokio::spawn(playlist_refresh_task(engine.clone(), Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 3);

        engine.stop().await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 3);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_does_not_kill_task() {
        let engine = PlaybackEngine::new(
            Arc::new(CountingProvider::default()),
            Arc::new(MemoryIndexStore::new()),
            EventBus::new(16),
            Duration::from_secs(1),
        );
        let client =
            BackendClient::new("http://localhost:3001", None, Duration::from_secs(1)).unwrap();
        let tasks = start_monitoring(engine, client, Some(Duration::MAX), Some(Duration::MAX));
        assert_eq!(tasks.len(), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        for task in &tasks {
            assert!(!task.is_finished());
        }
        for task in tasks {
            task.abort();
        }
    }

    #[tokio::test]
    async fn test_disabled_intervals_spawn_nothing() {
        let engine = PlaybackEngine::new(
            Arc::new(CountingProvider::default()),
            Arc::new(MemoryIndexStore::new()),
            EventBus::new(16),
            Duration::from_secs(1),
        );
        let client =
            BackendClient::new("http://localhost:3001", None, Duration::from_secs(1)).unwrap();
        assert!(start_monitoring(engine, client, None, None).is_empty());
    }
}
