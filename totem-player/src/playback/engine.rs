//! Playback engine
//!
//! Cycles through a device's playlist snapshot, one item on screen at a time.
//!
//! The advance timer is a re-armed one-shot: each wait is computed from the
//! item currently on screen, read from engine state when the wait starts,
//! never captured when the timer was armed. At most one timer task exists;
//! arming or cancelling bumps `timer_epoch`, and a timer that wakes up with
//! a stale epoch exits without touching state.
//!
//! The index that will be shown next is persisted before the in-memory index
//! moves, so a restart resumes at the item that was about to play.

use crate::error::{Error, Result};
use crate::playback::store::IndexStore;
use crate::provider::PlaylistProvider;
use chrono::Utc;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use totem_common::events::{EventBus, PlayerEvent};
use totem_common::{MediaItem, PlayerState, PlayerView, PlaylistSnapshot};
use tracing::{debug, info, warn};

/// Handle to the playback engine
///
/// Cheap to clone; all clones drive the same engine. Dropping the last clone
/// cancels the pending timer.
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    provider: Arc<dyn PlaylistProvider>,
    store: Arc<dyn IndexStore>,
    events: EventBus,
    /// Substituted for invalid item durations
    min_display: Duration,
    state: Mutex<EngineState>,
    /// Pending advance timer; only ever touched while `state` is locked,
    /// except in Drop
    timer: StdMutex<Option<JoinHandle<()>>>,
}

struct EngineState {
    device_id: Option<String>,
    snapshot: Option<PlaylistSnapshot>,
    current_index: usize,
    status: PlayerState,
    reason: Option<String>,
    /// Bumped by start/stop; a load that finishes under an older session is discarded
    session: u64,
    /// Bumped whenever the timer is armed or cancelled
    timer_epoch: u64,
}

impl PlaybackEngine {
    pub fn new(
        provider: Arc<dyn PlaylistProvider>,
        store: Arc<dyn IndexStore>,
        events: EventBus,
        min_display: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                provider,
                store,
                events,
                min_display,
                state: Mutex::new(EngineState {
                    device_id: None,
                    snapshot: None,
                    current_index: 0,
                    status: PlayerState::Idle,
                    reason: None,
                    session: 0,
                    timer_epoch: 0,
                }),
                timer: StdMutex::new(None),
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Begin playing `device_id`'s playlist
    ///
    /// Cancels whatever was playing, fetches a fresh snapshot and resumes at
    /// the persisted index when it is still in range. A fetch failure leaves
    /// the engine in `Failed` and is returned; nothing is retried here.
    pub async fn start(&self, device_id: &str) -> Result<PlayerState> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(Error::BadRequest("device id must not be empty".to_string()));
        }

        let session = {
            let mut state = self.inner.state.lock().await;
            state.session += 1;
            self.inner.cancel_timer(&mut state);
            state.device_id = Some(device_id.to_string());
            state.snapshot = None;
            state.current_index = 0;
            self.inner.set_status(&mut state, PlayerState::Loading, None);
            state.session
        };

        info!("Loading playlist for device {}", device_id);
        let fetched = self.inner.provider.fetch_playlist(device_id).await;
        let persisted = match &fetched {
            Ok(_) => self.inner.load_persisted_index(device_id).await,
            Err(_) => None,
        };

        let mut state = self.inner.state.lock().await;
        if state.session != session {
            debug!("Discarding playlist load for {}: superseded", device_id);
            return Err(Error::InvalidState(format!(
                "load for device {} superseded by a newer start/stop",
                device_id
            )));
        }

        match fetched {
            Ok(snapshot) => {
                let index = snapshot.resume_index(persisted);
                if persisted.is_some_and(|p| p != index as i64) {
                    info!(
                        "Persisted index {:?} out of range for {} items, starting at 0",
                        persisted,
                        snapshot.len()
                    );
                    if let Err(e) = self.inner.store.save(device_id, index).await {
                        warn!("Failed to persist media index for {}: {}", device_id, e);
                    }
                }
                self.inner.install_snapshot(&mut state, snapshot, index);
                Ok(state.status)
            }
            Err(e) => {
                warn!("Failed to load playlist for device {}: {}", device_id, e);
                self.inner
                    .set_status(&mut state, PlayerState::Failed, Some(e.to_string()));
                Err(Error::Load(e))
            }
        }
    }

    /// Fetch the snapshot again for the current device
    ///
    /// While `Playing`, a failed fetch keeps the old snapshot on screen and
    /// emits `ReloadFailed`. From any other state this is a fresh `start`.
    pub async fn reload(&self) -> Result<PlayerState> {
        let (device_id, session) = {
            let state = self.inner.state.lock().await;
            let device_id = state
                .device_id
                .clone()
                .ok_or_else(|| Error::InvalidState("no device has been started".to_string()))?;
            if state.status != PlayerState::Playing {
                drop(state);
                return self.start(&device_id).await;
            }
            (device_id, state.session)
        };

        debug!("Refreshing playlist for device {}", device_id);
        let fetched = self.inner.provider.fetch_playlist(&device_id).await;

        let mut state = self.inner.state.lock().await;
        if state.session != session || state.status != PlayerState::Playing {
            return Err(Error::InvalidState(format!(
                "reload for device {} superseded",
                device_id
            )));
        }

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "Playlist refresh for device {} failed, keeping current playlist: {}",
                    device_id, e
                );
                self.inner.events.emit_lossy(PlayerEvent::ReloadFailed {
                    device_id,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(Error::Load(e));
            }
        };

        if state
            .snapshot
            .as_ref()
            .is_some_and(|current| current.same_items(&snapshot))
        {
            debug!("Playlist for device {} unchanged", device_id);
            state.snapshot = Some(snapshot);
            return Ok(state.status);
        }

        let index = snapshot.clamp_index(state.current_index);
        if index != state.current_index {
            info!(
                "Playlist for device {} shrank to {} items, restarting at 0",
                device_id,
                snapshot.len()
            );
            if let Err(e) = self.inner.store.save(&device_id, index).await {
                warn!("Failed to persist media index for {}: {}", device_id, e);
            }
        }
        self.inner.install_snapshot(&mut state, snapshot, index);
        Ok(state.status)
    }

    /// Show the next item now and restart the timer from it
    pub async fn advance(&self) -> Result<usize> {
        let mut state = self.inner.state.lock().await;
        if state.status != PlayerState::Playing {
            return Err(Error::InvalidState(format!(
                "cannot advance while {}",
                state.status
            )));
        }
        let index = self.inner.advance_locked(&mut state).await;
        self.inner.arm_timer(&mut state);
        Ok(index)
    }

    /// Cancel the advance timer and go back to `Idle`
    ///
    /// Safe from any state and idempotent. An in-flight load is discarded
    /// when it completes.
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        state.session += 1;
        self.inner.cancel_timer(&mut state);
        if state.status != PlayerState::Idle {
            info!("Playback stopped");
            self.inner.set_status(&mut state, PlayerState::Idle, None);
        }
    }

    /// Item at the current index, None means "no content"
    pub async fn current_item(&self) -> Option<MediaItem> {
        let state = self.inner.state.lock().await;
        state.current()
    }

    pub async fn state(&self) -> PlayerState {
        self.inner.state.lock().await.status
    }

    pub async fn device_id(&self) -> Option<String> {
        self.inner.state.lock().await.device_id.clone()
    }

    pub async fn view(&self) -> PlayerView {
        let state = self.inner.state.lock().await;
        PlayerView {
            device_id: state.device_id.clone(),
            state: state.status,
            reason: state.reason.clone(),
            current_index: state.current_index,
            item_count: state.snapshot.as_ref().map_or(0, PlaylistSnapshot::len),
            current_item: state.current(),
        }
    }

    /// Whether an advance timer is armed and has not finished
    pub fn has_pending_timer(&self) -> bool {
        self.inner
            .timer_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl EngineState {
    fn current(&self) -> Option<MediaItem> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.get(self.current_index))
            .cloned()
    }
}

impl EngineInner {
    fn timer_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel_timer(&self, state: &mut EngineState) {
        state.timer_epoch += 1;
        if let Some(handle) = self.timer_slot().take() {
            handle.abort();
        }
    }

    fn arm_timer(self: &Arc<Self>, state: &mut EngineState) {
        state.timer_epoch += 1;
        let handle = tokio::spawn(run_timer(Arc::downgrade(self), state.timer_epoch));
        if let Some(previous) = self.timer_slot().replace(handle) {
            previous.abort();
        }
    }

    async fn load_persisted_index(&self, device_id: &str) -> Option<i64> {
        match self.store.load(device_id).await {
            Ok(index) => index,
            Err(e) => {
                warn!("Failed to read persisted media index for {}: {}", device_id, e);
                None
            }
        }
    }

    fn set_status(&self, state: &mut EngineState, new_state: PlayerState, reason: Option<String>) {
        let old_state = state.status;
        state.status = new_state;
        state.reason = reason.clone();
        if old_state != new_state {
            debug!("Player state {} -> {}", old_state, new_state);
            self.events.emit_lossy(PlayerEvent::StateChanged {
                device_id: state.device_id.clone(),
                old_state,
                new_state,
                reason,
                timestamp: Utc::now(),
            });
        }
    }

    /// Replace the snapshot wholesale and enter `Playing` or `Empty`
    fn install_snapshot(
        self: &Arc<Self>,
        state: &mut EngineState,
        snapshot: PlaylistSnapshot,
        index: usize,
    ) {
        let device_id = state.device_id.clone().unwrap_or_default();
        let item_count = snapshot.len();
        info!("Loaded playlist for device {}: {} items", device_id, item_count);

        state.snapshot = Some(snapshot);
        state.current_index = index;
        self.events.emit_lossy(PlayerEvent::SnapshotLoaded {
            device_id: device_id.clone(),
            item_count,
            timestamp: Utc::now(),
        });

        if item_count == 0 {
            self.cancel_timer(state);
            self.set_status(state, PlayerState::Empty, None);
            return;
        }

        self.set_status(state, PlayerState::Playing, None);
        if let Some(item) = state.current() {
            self.events.emit_lossy(PlayerEvent::ItemChanged {
                device_id,
                index,
                item,
                timestamp: Utc::now(),
            });
        }
        self.arm_timer(state);
    }

    /// How long the current item stays on screen
    fn current_delay(&self, state: &EngineState) -> Duration {
        let Some(item) = state.current() else {
            return self.min_display;
        };
        match item.display_duration() {
            Ok(delay) => delay,
            Err(e) => {
                warn!(
                    "Item {} ({}) of device {}: {}; showing it for {:?}",
                    state.current_index,
                    item.source_url,
                    state.device_id.as_deref().unwrap_or("?"),
                    e,
                    self.min_display
                );
                self.min_display
            }
        }
    }

    /// One advance cycle: persist next index, then move to it and notify
    async fn advance_locked(&self, state: &mut EngineState) -> usize {
        let Some(snapshot) = state.snapshot.as_ref() else {
            return state.current_index;
        };
        let next = snapshot.next_index(state.current_index);
        let item = snapshot.get(next).cloned();
        let device_id = state.device_id.clone().unwrap_or_default();

        if let Err(e) = self.store.save(&device_id, next).await {
            // Playback continues; a restart may repeat this item
            warn!("Failed to persist media index for {}: {}", device_id, e);
        }

        state.current_index = next;
        if let Some(item) = item {
            debug!("Device {} advanced to item {}", device_id, next);
            self.events.emit_lossy(PlayerEvent::ItemChanged {
                device_id,
                index: next,
                item,
                timestamp: Utc::now(),
            });
        }
        next
    }

    /// Advance if the timer that woke up is still the armed one
    async fn advance_if_current(&self, epoch: u64) -> bool {
        let mut state = self.state.lock().await;
        if state.timer_epoch != epoch || state.status != PlayerState::Playing {
            return false;
        }
        self.advance_locked(&mut state).await;
        true
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        let slot = self.timer.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

/// Timer task: wait for the current item, advance, repeat
///
/// Holds only a weak reference so a dropped engine ends the loop.
async fn run_timer(engine: Weak<EngineInner>, epoch: u64) {
    loop {
        let delay = {
            let Some(inner) = engine.upgrade() else {
                return;
            };
            let state = inner.state.lock().await;
            if state.timer_epoch != epoch || state.status != PlayerState::Playing {
                return;
            }
            inner.current_delay(&state)
        };

        tokio::time::sleep(delay).await;

        let Some(inner) = engine.upgrade() else {
            return;
        };
        if !inner.advance_if_current(epoch).await {
            return;
        }
    }
}
