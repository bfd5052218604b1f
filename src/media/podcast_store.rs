use super::podcast_models::Podcast;
use anyhow::Result;

pub trait PodcastStore: Send + Sync {
    /// Inserts a new podcast record.
    /// Returns Err if the id or the stored filename is already taken.
    fn insert_podcast(&self, podcast: &Podcast) -> Result<()>;

    /// Returns Ok(None) if the podcast does not exist.
    fn get_podcast(&self, podcast_id: &str) -> Result<Option<Podcast>>;

    /// Returns every podcast, newest first.
    fn list_podcasts(&self) -> Result<Vec<Podcast>>;

    /// Deletes a podcast record.
    /// Returns Ok(false) if there was nothing to delete.
    fn delete_podcast(&self, podcast_id: &str) -> Result<bool>;
}
