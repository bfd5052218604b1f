use super::{
    auth::CredentialsHasher,
    token::TokenService,
    user_models::{normalize_email, NewUser, User},
    UserStore,
};
use crate::error::{ServiceError, ServiceResult};
use crate::media::{Podcast, PodcastStore};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Verified against when the email is unknown, so that login takes the same
/// time whether or not the account exists.
const DUMMY_PASSWORD: &str = "dummy-password-never-matches";

#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
    podcast_store: Arc<dyn PodcastStore>,
    token_service: TokenService,
    hasher: CredentialsHasher,
    dummy_hash: String,
}

fn required(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

impl UserManager {
    pub fn new(
        user_store: Arc<dyn UserStore>,
        podcast_store: Arc<dyn PodcastStore>,
        token_service: TokenService,
    ) -> anyhow::Result<Self> {
        let hasher = CredentialsHasher::Argon2;
        let dummy_hash = hasher
            .hash(DUMMY_PASSWORD)
            .context("Failed to compute dummy password hash")?;
        Ok(Self {
            user_store,
            podcast_store,
            token_service,
            hasher,
            dummy_hash,
        })
    }

    /// Creates an account. Returns the new user id.
    pub fn register(&self, name: &str, email: &str, password: &str) -> ServiceResult<usize> {
        let (Some(name), Some(email)) = (required(name), required(email)) else {
            return Err(ServiceError::MissingFields(
                "All fields are required.".to_string(),
            ));
        };
        if password.is_empty() {
            return Err(ServiceError::MissingFields(
                "All fields are required.".to_string(),
            ));
        }

        let new_user = NewUser {
            email: normalize_email(email),
            name: Some(name.to_string()),
            password_hash: self.hasher.hash(password)?,
            hasher: self.hasher,
        };

        match self.user_store.create_user(&new_user)? {
            Some(user_id) => {
                info!("Registered user {} ({})", user_id, new_user.email);
                Ok(user_id)
            }
            None => Err(ServiceError::Conflict(
                "Email already registered.".to_string(),
            )),
        }
    }

    pub fn login(&self, email: &str, password: &str) -> ServiceResult<LoginSession> {
        let (Some(email), false) = (required(email), password.is_empty()) else {
            return Err(ServiceError::MissingFields(
                "Email and password are required.".to_string(),
            ));
        };
        let email = normalize_email(email);

        let Some(credentials) = self.user_store.get_user_auth_credentials(&email)? else {
            // Result ignored, only the cost matters.
            let _ = self.hasher.verify(password, self.dummy_hash.as_str());
            debug!("Login attempt for unknown email {}", email);
            return Err(ServiceError::InvalidCredentials);
        };

        if !credentials.verify(password)? {
            debug!("Wrong password for user {}", credentials.user_id);
            return Err(ServiceError::InvalidCredentials);
        }

        let user = self
            .user_store
            .get_user(credentials.user_id)?
            .ok_or(ServiceError::InvalidCredentials)?;
        self.user_store
            .update_user_auth_credentials_last_used(user.id)?;

        let issued = self.token_service.issue(user.id)?;
        Ok(LoginSession {
            token: issued.value,
            expires_at: issued.expires_at,
            user,
        })
    }

    /// Resolves a bearer token to a user id.
    pub fn authenticate(&self, token: &str) -> ServiceResult<usize> {
        self.token_service.verify(token)
    }

    pub fn get_user(&self, user_id: usize) -> ServiceResult<Option<User>> {
        Ok(self.user_store.get_user(user_id)?)
    }

    /// Favourite podcasts in the order they were added. Entries whose podcast
    /// no longer exists are skipped.
    pub fn get_favourites(&self, user_id: usize) -> ServiceResult<Vec<Podcast>> {
        let ids = self.user_store.get_user_favourites(user_id)?;
        let mut podcasts = Vec::with_capacity(ids.len());
        for id in ids {
            match self.podcast_store.get_podcast(&id)? {
                Some(podcast) => podcasts.push(podcast),
                None => debug!("Skipping dangling favourite {} of user {}", id, user_id),
            }
        }
        Ok(podcasts)
    }

    pub fn add_favourite(&self, user_id: usize, podcast_id: &str) -> ServiceResult<bool> {
        Ok(self.user_store.add_user_favourite(user_id, podcast_id)?)
    }

    pub fn remove_favourite(&self, user_id: usize, podcast_id: &str) -> ServiceResult<bool> {
        Ok(self.user_store.remove_user_favourite(user_id, podcast_id)?)
    }
}
