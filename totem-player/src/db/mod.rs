//! Database access layer
//!
//! Settings table access and the durable per-device media index.

pub mod settings;

pub use settings::SqliteIndexStore;
