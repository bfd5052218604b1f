//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases and uploads directory.

use super::constants::*;
use podcast_server::media::{MediaFileHandler, PodcastManager, PodcastStore, SqlitePodcastStore};
use podcast_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use podcast_server::user::{SqliteUserStore, TokenService, UserManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Where uploaded media ends up
    pub uploads_dir: PathBuf,

    /// Where uploads in progress are written
    pub partial_dir: PathBuf,

    /// Podcast store for direct database access in tests
    #[allow(dead_code)]
    pub podcast_store: Arc<dyn PodcastStore>,

    /// Signs tokens the same way the server does
    #[allow(dead_code)]
    pub token_service: TokenService,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the stores cannot be created, the port cannot be bound or
    /// the server doesn't become ready within timeout.
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let uploads_dir = temp_dir.path().join("uploads");

        let user_store = Arc::new(
            SqliteUserStore::new(temp_dir.path().join("user.db"))
                .expect("Failed to open user store"),
        );
        let podcast_store: Arc<dyn PodcastStore> = Arc::new(
            SqlitePodcastStore::new(temp_dir.path().join("podcast.db"))
                .expect("Failed to open podcast store"),
        );

        let files = MediaFileHandler::new(&uploads_dir, TEST_MAX_UPLOAD_BYTES);
        files.init().await.expect("Failed to create uploads dir");
        let partial_dir = files.partial_dir().to_path_buf();

        let user_manager = UserManager::new(
            user_store,
            podcast_store.clone(),
            TokenService::new(TEST_JWT_SECRET, chrono::Duration::hours(2)),
        )
        .expect("Failed to create user manager");
        let podcast_manager = PodcastManager::new(podcast_store.clone(), files);

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            frontend_dir_path: None,
            uploads_dir: uploads_dir.clone(),
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
            cors_origins: vec![],
        };
        let app = make_app(config, user_manager, podcast_manager).expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            uploads_dir,
            partial_dir,
            podcast_store,
            token_service: TokenService::new(TEST_JWT_SECRET, chrono::Duration::hours(2)),
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Names of the files currently in the uploads directory
    pub fn uploaded_files(&self) -> Vec<String> {
        list_dir(&self.uploads_dir)
    }

    /// Names of the partial uploads left on disk
    #[allow(dead_code)]
    pub fn partial_files(&self) -> Vec<String> {
        list_dir(&self.partial_dir)
    }

    /// Waits for the server to become ready by polling the / endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|entry| {
            entry
                .expect("Failed to read dir entry")
                .file_name()
                .to_string_lossy()
                .to_string()
        })
        .collect();
    names.sort();
    names
}
