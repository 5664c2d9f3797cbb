pub mod analytics;
pub mod chart;
pub mod client;
pub mod config;
pub mod edit;
pub mod mirror;
pub mod model;
pub mod store;

// Re-export the client surface so main.rs can use liftsync::TrackerHandle directly.
pub use chart::ChartProjection;
pub use client::{SyncStatus, TrackerClient, TrackerHandle, TrackerView};
pub use config::TrackerConfig;
pub use store::memory::MemoryStore;
