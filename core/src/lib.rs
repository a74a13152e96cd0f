/// Patitas Sync - Realtime synchronization engine
///
/// Polling-based synchronization for the pet-adoption marketplace chat and
/// notification surfaces: no duplicate rows, chronological message order,
/// accurate unread badges, and acknowledged notifications that stay
/// acknowledged across reloads.

pub mod cache;
pub mod client;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod poller;
pub mod router;
pub mod seen_store;
pub mod types;
pub mod unread;

pub use client::MarketplaceClient;
pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
