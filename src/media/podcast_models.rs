//! Podcast data models

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Podcast {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Server-assigned name of the file inside the uploads directory.
    pub media: String,
    pub original_filename: String,
    pub content_type: String,
    pub size: u64,
    /// None when the uploader is unknown.
    pub creator_id: Option<usize>,
    pub created: DateTime<Utc>,
}

impl Podcast {
    /// Case-insensitive substring match over title and description.
    /// A blank term matches everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
    }
}

/// The user supplied part of an upload.
#[derive(Debug, Clone, Default)]
pub struct PodcastDetails {
    pub title: String,
    pub description: String,
}
