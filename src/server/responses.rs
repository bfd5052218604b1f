//! JSON bodies shared by the handlers.

use crate::error::ServiceError;
use crate::media::Podcast;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthenticated | ServiceError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServiceError::MissingFields(_)
            | ServiceError::Conflict(_)
            | ServiceError::InvalidMedia(_) => StatusCode::BAD_REQUEST,
            ServiceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ServiceError::Internal(err) => {
                error!("Internal error: {:?}", err);
                "Something went wrong.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(MessageResponse::new(message))).into_response()
    }
}

#[derive(Serialize, Debug)]
pub struct PodcastResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub media: String,
    pub media_url: String,
    pub original_filename: String,
    pub content_type: String,
    pub size: u64,
    pub creator: Option<usize>,
    pub created_at: String,
}

impl From<Podcast> for PodcastResponse {
    fn from(podcast: Podcast) -> Self {
        Self {
            media_url: format!("{}/{}", UPLOADS_ROUTE, podcast.media),
            id: podcast.id,
            title: podcast.title,
            description: podcast.description,
            media: podcast.media,
            original_filename: podcast.original_filename,
            content_type: podcast.content_type,
            size: podcast.size,
            creator: podcast.creator_id,
            created_at: podcast.created.to_rfc3339(),
        }
    }
}

pub fn podcasts_response(podcasts: Vec<Podcast>) -> Json<Vec<PodcastResponse>> {
    Json(podcasts.into_iter().map(PodcastResponse::from).collect())
}
