//! Podcast Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod error;
pub mod media;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use error::{ServiceError, ServiceResult};
pub use media::{PodcastManager, SqlitePodcastStore};
pub use server::{run_server, RequestsLoggingLevel};
pub use user::{SqliteUserStore, UserManager};
