//! notedeck-api - HTTP API for notes and their attachments.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use uuid::Uuid;

use notedeck_core::{Attachment, AttachmentRepository, NoteRepository, Result};
use notedeck_db::ObjectStoreGateway;

pub use auth::InitDataVerifier;
pub use config::{AppConfig, AuthMode, MissingNotePolicy, ServerConfig};
pub use error::ApiError;
pub use services::{AttachmentService, NoteService};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub notes: NoteService,
    pub attachments: AttachmentService,
    /// Present when mutating requests must carry signed init data.
    pub auth: Option<Arc<InitDataVerifier>>,
}

impl AppState {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        attachments: Arc<dyn AttachmentRepository>,
        store: ObjectStoreGateway,
        missing_note_policy: MissingNotePolicy,
    ) -> Self {
        let attachment_service = AttachmentService::new(attachments, notes.clone(), store);
        Self {
            notes: NoteService::new(notes, attachment_service.clone(), missing_note_policy),
            attachments: attachment_service,
            auth: None,
        }
    }

    /// Require init data signed for `bot_token` on mutating requests.
    pub fn with_auth(mut self, bot_token: &str) -> Result<Self> {
        self.auth = Some(Arc::new(InitDataVerifier::new(bot_token)?));
        Ok(self)
    }
}

/// OpenAPI document served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "notedeck API",
        description = "Notes with pinning and file attachments"
    ),
    paths(
        handlers::notes::list_notes,
        handlers::notes::get_note,
        handlers::notes::create_note,
        handlers::notes::update_note,
        handlers::notes::delete_note,
        handlers::notes::toggle_pin,
        handlers::attachments::upload_file,
        handlers::attachments::delete_file,
        handlers::health::health_check,
    ),
    components(schemas(
        notedeck_core::Note,
        Attachment,
        handlers::notes::CreateNoteBody,
        handlers::notes::UpdateNoteBody,
        handlers::notes::TogglePinBody,
        handlers::notes::CreatedNote,
        handlers::attachments::DeleteFileBody,
        handlers::attachments::UploadForm,
    )),
    tags(
        (name = "Notes", description = "Note CRUD and pinning"),
        (name = "Attachments", description = "Files stored in the object store"),
        (name = "System", description = "Health and metadata")
    )
)]
pub struct ApiDoc;

// =============================================================================
// ROUTER
// =============================================================================

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the application router.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/notes", get(handlers::list_notes).post(handlers::create_note))
        .route(
            "/notes/:id",
            get(handlers::get_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .route("/notes/:id/toggle-pin", put(handlers::toggle_pin))
        .route("/notes/:id/upload-file", post(handlers::upload_file))
        .route("/notes/:id/delete-file", delete(handlers::delete_file))
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(handlers::openapi_json))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_init_data,
        ))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes));

    let app = match &server.static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(TimeoutLayer::new(server.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer())
        .with_state(state)
}
