mod file_config;

pub use file_config::FileConfig;

use crate::server::RequestsLoggingLevel;
use crate::user::generate_secret;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_TOKEN_TTL_HOURS: u64 = 2;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;
/// One year.
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365;
pub const MAX_UPLOAD_MB: u64 = 10 * 1024;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub token_ttl_hours: u64,
    pub max_upload_mb: u64,
    /// Taken from the environment.
    pub jwt_secret: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            uploads_dir: None,
            port: 5000,
            logging_level: RequestsLoggingLevel::default(),
            frontend_dir_path: None,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            jwt_secret: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub token_ttl_hours: u64,
    pub max_upload_bytes: u64,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow::anyhow!("db_dir must be specified with --db-dir or db_dir"))?;

        match db_dir.metadata() {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => bail!("db_dir {:?} is not a directory", db_dir),
            Err(_) => bail!("db_dir {:?} does not exist", db_dir),
        }

        let uploads_dir = file
            .uploads_dir
            .map(PathBuf::from)
            .or_else(|| cli.uploads_dir.clone())
            .unwrap_or_else(|| db_dir.join("uploads"));

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let token_ttl_hours = file.token_ttl_hours.unwrap_or(cli.token_ttl_hours);
        if token_ttl_hours == 0 || token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            bail!(
                "token_ttl_hours must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_HOURS,
                token_ttl_hours
            );
        }

        let max_upload_mb = file.max_upload_mb.unwrap_or(cli.max_upload_mb);
        if max_upload_mb == 0 || max_upload_mb > MAX_UPLOAD_MB {
            bail!(
                "max_upload_mb must be between 1 and {}, got {}",
                MAX_UPLOAD_MB,
                max_upload_mb
            );
        }

        let jwt_secret = match file
            .jwt_secret
            .or_else(|| cli.jwt_secret.clone())
            .filter(|s| !s.is_empty())
        {
            Some(secret) => secret,
            None => {
                warn!("No JWT secret configured, generated a random one. Tokens will not survive a restart.");
                generate_secret()
            }
        };

        Ok(Self {
            db_dir,
            uploads_dir,
            port,
            logging_level,
            frontend_dir_path,
            token_ttl_hours,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            jwt_secret,
            cors_origins: file.cors_origins.unwrap_or_default(),
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn podcast_db_path(&self) -> PathBuf {
        self.db_dir.join("podcast.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
