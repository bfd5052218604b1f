use super::file_handler::{
    generate_stored_name, is_media_content_type, MediaFileHandler, PendingMediaFile,
};
use super::podcast_models::{Podcast, PodcastDetails};
use super::podcast_store::PodcastStore;
use crate::error::{ServiceError, ServiceResult};
use chrono::{SubsecRound, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// An upload whose file has been validated up front and is being written to disk.
pub struct MediaUpload {
    pub file: PendingMediaFile,
    pub original_filename: String,
    pub content_type: String,
}

pub struct PodcastManager {
    podcast_store: Arc<dyn PodcastStore>,
    files: MediaFileHandler,
}

impl PodcastManager {
    pub fn new(podcast_store: Arc<dyn PodcastStore>, files: MediaFileHandler) -> Self {
        Self {
            podcast_store,
            files,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.files.max_file_size()
    }

    /// Validates the declared type of an incoming file and opens its
    /// temporary destination. Nothing touches the disk for non-media types.
    pub async fn begin_upload(
        &self,
        original_filename: Option<&str>,
        content_type: Option<&str>,
    ) -> ServiceResult<MediaUpload> {
        let content_type = content_type.unwrap_or_default();
        if !is_media_content_type(content_type) {
            return Err(ServiceError::InvalidMedia(
                "Only audio and video files are allowed.".to_string(),
            ));
        }
        let original_filename = original_filename.unwrap_or_default().to_string();
        let stored_name = generate_stored_name(&original_filename);
        let file = self.files.begin(&stored_name).await?;

        Ok(MediaUpload {
            file,
            original_filename,
            content_type: content_type.to_string(),
        })
    }

    /// Moves the uploaded file into place, then records it. A record that
    /// cannot be written takes the file down with it.
    pub async fn complete_upload(
        &self,
        creator_id: Option<usize>,
        details: PodcastDetails,
        upload: MediaUpload,
    ) -> ServiceResult<Podcast> {
        if details.title.trim().is_empty() {
            return Err(ServiceError::MissingFields("Title is required.".to_string()));
        }

        let stored_name = upload.file.stored_name().to_string();
        let size = upload.file.finish().await?;

        let podcast = Podcast {
            id: uuid::Uuid::new_v4().to_string(),
            title: details.title.trim().to_string(),
            description: details.description.trim().to_string(),
            media: stored_name,
            original_filename: upload.original_filename,
            content_type: upload.content_type,
            size,
            creator_id,
            // Stored with millisecond precision.
            created: Utc::now().trunc_subsecs(3),
        };

        if let Err(err) = self.podcast_store.insert_podcast(&podcast) {
            error!("Failed to record podcast {}: {:?}", podcast.id, err);
            if let Err(remove_err) = self.files.remove(&podcast.media).await {
                warn!(
                    "Failed to remove orphaned media file {}: {}",
                    podcast.media, remove_err
                );
            }
            return Err(ServiceError::Internal(err));
        }

        info!(
            "Uploaded podcast {} ({}, {} bytes)",
            podcast.id, podcast.media, podcast.size
        );
        Ok(podcast)
    }

    pub fn get_podcast(&self, podcast_id: &str) -> ServiceResult<Option<Podcast>> {
        Ok(self.podcast_store.get_podcast(podcast_id)?)
    }

    /// Newest first, optionally narrowed by a search term.
    pub fn list_podcasts(&self, query: Option<&str>) -> ServiceResult<Vec<Podcast>> {
        let podcasts = self.podcast_store.list_podcasts()?;
        Ok(match query {
            Some(term) => podcasts.into_iter().filter(|p| p.matches(term)).collect(),
            None => podcasts,
        })
    }

    /// Only the owner may delete a podcast; ownerless ones are fair game.
    pub async fn delete_podcast(&self, user_id: usize, podcast_id: &str) -> ServiceResult<()> {
        let podcast = self
            .podcast_store
            .get_podcast(podcast_id)?
            .ok_or(ServiceError::NotFound)?;

        if let Some(owner) = podcast.creator_id {
            if owner != user_id {
                return Err(ServiceError::Forbidden);
            }
        }

        if let Err(err) = self.files.remove(&podcast.media).await {
            warn!("Failed to remove media file {}: {}", podcast.media, err);
        }

        if !self.podcast_store.delete_podcast(podcast_id)? {
            return Err(ServiceError::NotFound);
        }
        info!("Deleted podcast {} by user {}", podcast_id, user_id);
        Ok(())
    }
}
