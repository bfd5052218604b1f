use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use podcast_server::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_MAX_UPLOAD_MB, DEFAULT_TOKEN_TTL_HOURS,
};
use podcast_server::media::{MediaFileHandler, PodcastManager, SqlitePodcastStore};
use podcast_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use podcast_server::user::{SqliteUserStore, TokenService, UserManager};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding user.db and podcast.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory where uploaded media is stored. Defaults to <db-dir>/uploads.
    #[clap(long, value_parser = parse_path)]
    pub uploads_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// How long issued login tokens stay valid.
    #[clap(long, default_value_t = DEFAULT_TOKEN_TTL_HOURS)]
    pub token_ttl_hours: u64,

    /// Maximum size of an uploaded media file, in MiB.
    #[clap(long, default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        uploads_dir: cli_args.uploads_dir,
        port: cli_args.port,
        logging_level: cli_args.logging_level,
        frontend_dir_path: cli_args.frontend_dir_path,
        token_ttl_hours: cli_args.token_ttl_hours,
        max_upload_mb: cli_args.max_upload_mb,
        jwt_secret: std::env::var("JWT_SECRET").ok(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite user database at {:?}...", config.user_db_path());
    let user_store = Arc::new(SqliteUserStore::new(config.user_db_path())?);

    info!(
        "Opening SQLite podcast database at {:?}...",
        config.podcast_db_path()
    );
    let podcast_store = Arc::new(SqlitePodcastStore::new(config.podcast_db_path())?);

    let files = MediaFileHandler::new(&config.uploads_dir, config.max_upload_bytes);
    files
        .init()
        .await
        .with_context(|| format!("Failed to create uploads directory {:?}", config.uploads_dir))?;
    info!("Storing uploads in {:?}", config.uploads_dir);

    let token_ttl = i64::try_from(config.token_ttl_hours)
        .ok()
        .and_then(chrono::TimeDelta::try_hours)
        .context("Token TTL out of range")?;
    let token_service = TokenService::new(&config.jwt_secret, token_ttl);
    let user_manager = UserManager::new(user_store, podcast_store.clone(), token_service)?;
    let podcast_manager = PodcastManager::new(podcast_store, files);

    info!("Ready to serve at port {}!", config.port);
    run_server(
        ServerConfig {
            requests_logging_level: config.logging_level,
            port: config.port,
            frontend_dir_path: config.frontend_dir_path,
            uploads_dir: config.uploads_dir,
            max_upload_bytes: config.max_upload_bytes,
            cors_origins: config.cors_origins,
        },
        user_manager,
        podcast_manager,
    )
    .await
}
