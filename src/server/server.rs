use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::media::{MediaUpload, PodcastDetails, PodcastManager};
use crate::user::{User, UserManager};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
};

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::responses::{podcasts_response, MessageResponse, PodcastResponse, UPLOADS_ROUTE};
use super::{log_requests, state::*, ServerConfig};
use crate::server::session::Session;

/// Room for multipart boundaries and the text fields on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct SignupBody {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
    expires_at: String,
    user: User,
}

#[derive(Deserialize, Debug)]
struct ListPodcastsQuery {
    pub q: Option<String>,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ServiceResult<T> {
    body.map(|Json(body)| body)
        .map_err(|rejection| ServiceError::MissingFields(rejection.body_text()))
}

fn multipart_error(err: MultipartError, max: u64) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge { max }
    } else {
        ServiceError::InvalidMedia(format!("Malformed upload: {}", err.body_text()))
    }
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
    };
    Json(stats)
}

async fn signup(
    State(user_manager): State<GuardedUserManager>,
    body: Result<Json<SignupBody>, JsonRejection>,
) -> ServiceResult<Response> {
    let body = json_body(body)?;
    user_manager.register(&body.name, &body.email, &body.password)?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully.")),
    )
        .into_response())
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> ServiceResult<Json<LoginSuccessResponse>> {
    let body = json_body(body)?;
    let session = user_manager.login(&body.email, &body.password)?;
    debug!("User {} logged in", session.user.id);
    Ok(Json(LoginSuccessResponse {
        token: session.token,
        expires_at: session.expires_at.to_rfc3339(),
        user: session.user,
    }))
}

async fn list_podcasts(
    State(podcast_manager): State<GuardedPodcastManager>,
    Query(query): Query<ListPodcastsQuery>,
) -> ServiceResult<Json<Vec<PodcastResponse>>> {
    let podcasts = podcast_manager.list_podcasts(query.q.as_deref())?;
    Ok(podcasts_response(podcasts))
}

async fn upload_podcast(
    session: Session,
    State(podcast_manager): State<GuardedPodcastManager>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServiceResult<Response> {
    let mut multipart = multipart
        .map_err(|rejection| ServiceError::InvalidMedia(rejection.body_text()))?;
    let max = podcast_manager.max_file_size();

    let mut details = PodcastDetails::default();
    let mut upload: Option<MediaUpload> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, max))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "title" => {
                details.title = field.text().await.map_err(|err| multipart_error(err, max))?
            }
            "description" => {
                details.description =
                    field.text().await.map_err(|err| multipart_error(err, max))?
            }
            "media" => {
                if upload.is_some() {
                    return Err(ServiceError::InvalidMedia(
                        "Only one media file per upload.".to_string(),
                    ));
                }
                let mut media = podcast_manager
                    .begin_upload(field.file_name(), field.content_type())
                    .await?;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|err| multipart_error(err, max))?
                {
                    media.file.write_chunk(&chunk).await?;
                }
                upload = Some(media);
            }
            other => debug!("Ignoring multipart field {}", other),
        }
    }

    let (Some(upload), false) = (upload, details.title.trim().is_empty()) else {
        return Err(ServiceError::MissingFields(
            "Title and media file are required.".to_string(),
        ));
    };

    let podcast = podcast_manager
        .complete_upload(Some(session.user_id), details, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(PodcastResponse::from(podcast))).into_response())
}

async fn delete_podcast(
    session: Session,
    State(podcast_manager): State<GuardedPodcastManager>,
    Path(id): Path<String>,
) -> ServiceResult<Json<MessageResponse>> {
    podcast_manager.delete_podcast(session.user_id, &id).await?;
    Ok(Json(MessageResponse::new("Podcast deleted successfully.")))
}

async fn get_favourites(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> ServiceResult<Json<Vec<PodcastResponse>>> {
    let podcasts = user_manager.get_favourites(session.user_id)?;
    Ok(podcasts_response(podcasts))
}

async fn add_favourite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(podcast_id): Path<String>,
) -> ServiceResult<Json<MessageResponse>> {
    user_manager.add_favourite(session.user_id, &podcast_id)?;
    Ok(Json(MessageResponse::new("Added to favourites.")))
}

async fn remove_favourite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(podcast_id): Path<String>,
) -> ServiceResult<Json<MessageResponse>> {
    user_manager.remove_favourite(session.user_id, &podcast_id)?;
    Ok(Json(MessageResponse::new("Removed from favourites.")))
}

fn make_cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(60 * 60));

    if origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim())
                .with_context(|| format!("Invalid CORS origin {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

pub fn make_app(
    config: ServerConfig,
    user_manager: UserManager,
    podcast_manager: PodcastManager,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), user_manager, podcast_manager);
    let body_limit = (config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES) as usize;

    let auth_routes: Router = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .with_state(state.clone());

    let podcast_routes: Router = Router::new()
        .route("/", get(list_podcasts))
        .route(
            "/upload",
            post(upload_podcast).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/{id}", delete(delete_podcast))
        .with_state(state.clone());

    let favourite_routes: Router = Router::new()
        .route("/", get(get_favourites))
        .route(
            "/{podcast_id}",
            post(add_favourite).delete(remove_favourite),
        )
        .with_state(state.clone());

    let home_router: Router = match &config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/api/auth", auth_routes)
        .nest("/api/podcasts", podcast_routes)
        .nest("/api/favourites", favourite_routes)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&config.uploads_dir));

    app = app
        .layer(make_cors_layer(&config.cors_origins)?)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    user_manager: UserManager,
    podcast_manager: PodcastManager,
) -> Result<()> {
    let port = config.port;
    if config.cors_origins.is_empty() {
        warn!("CORS allows any origin");
    }
    let app = make_app(config, user_manager, podcast_manager)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
