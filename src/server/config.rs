use super::RequestsLoggingLevel;
use std::path::PathBuf;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Any origin is allowed when empty.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 5000,
            frontend_dir_path: None,
            uploads_dir: PathBuf::from("uploads"),
            max_upload_bytes: 50 * 1024 * 1024,
            cors_origins: vec![],
        }
    }
}
