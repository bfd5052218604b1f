mod file_handler;
mod podcast_manager;
pub mod podcast_models;
mod podcast_store;
mod sqlite_podcast_store;

pub use file_handler::{FileHandlerError, MediaFileHandler, PendingMediaFile};
pub use podcast_manager::{MediaUpload, PodcastManager};
pub use podcast_models::{Podcast, PodcastDetails};
pub use podcast_store::PodcastStore;
pub use sqlite_podcast_store::SqlitePodcastStore;
