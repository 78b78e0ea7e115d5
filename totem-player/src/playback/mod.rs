//! Playback: the advance engine, its persisted position, and the
//! background tasks that keep it in touch with the backend

pub mod engine;
pub mod monitor;
pub mod store;

pub use engine::PlaybackEngine;
pub use monitor::start_monitoring;
pub use store::{IndexStore, MemoryIndexStore};
