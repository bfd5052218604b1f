use axum::extract::FromRef;

use crate::media::PodcastManager;
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedPodcastManager = Arc<PodcastManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_manager: GuardedUserManager,
    pub podcast_manager: GuardedPodcastManager,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        user_manager: UserManager,
        podcast_manager: PodcastManager,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            user_manager: Arc::new(user_manager),
            podcast_manager: Arc::new(podcast_manager),
        }
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedPodcastManager {
    fn from_ref(input: &ServerState) -> Self {
        input.podcast_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
