//! Errors surfaced at the HTTP boundary.
//!
//! Stores and managers work with `anyhow::Result` internally; anything that
//! has to reach the caller with a specific meaning is expressed as a
//! [`ServiceError`] variant, everything else ends up in `Internal`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing, malformed, forged or expired token.
    #[error("Invalid or expired token.")]
    Unauthenticated,

    /// Unknown email or wrong password, deliberately indistinguishable.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("{0}")]
    MissingFields(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidMedia(String),

    #[error("File exceeds the maximum upload size of {max} bytes.")]
    PayloadTooLarge { max: u64 },

    #[error("Podcast not found.")]
    NotFound,

    #[error("You can only delete your own podcasts.")]
    Forbidden,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
