//! Web API module for the BWT emulator.
//!
//! This module exposes the emulated device over HTTP so a browser front end
//! (or a test harness) can press buttons, type glyphs, and drive recordings.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/buttons` - List buttons with their hold status
//! - `POST /api/buttons/{id}/down|up|hold` - Drive one button
//! - `POST /api/initialize` - Send the initialise code
//! - `GET /api/glyphs` - List glyphs
//! - `POST /api/glyphs/{id}` - Type a glyph into the target cell
//! - `GET|PUT|DELETE /api/target` - Target cell
//! - `GET|POST /api/recordings` - List or import recordings
//! - `POST /api/recordings/start`, `POST /api/recordings/stop?name=` - Capture
//! - `GET /api/recordings/{index}` - One recording with its entries
//! - `POST /api/recordings/{index}/play` - Replay a recording
//! - `POST /api/recordings/{index}/export` - Save a recording as a script
//! - `POST /api/playback/cancel` - Stop the running playback
//! - `GET /api/scripts` - List scripts
//! - `GET /api/scripts/{name}` - Compiled preview of a script
//! - `POST /api/scripts/{name}/run` - Run a script
//! - `GET /api/events?offset=&limit=` - Poll device events

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::device::{Emulator, EventPage};
use crate::error::EmulatorError;
use crate::models::recording::entries_from_raw;
use crate::models::{CellTarget, Glyph, RawRecordingEntry, Recording, RecordingEntry, ScriptAction};
use crate::services::{
    export_recording_text, ButtonInfo, DirectoryScriptSource, RecordingSummary, SaveOutcome,
    ScriptSource,
};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the web API.
#[derive(Clone)]
pub struct AppState {
    /// The emulated device
    emulator: Emulator,
    /// Application configuration
    config: Arc<Config>,
    /// Where scripts are read from and exported to
    scripts: Arc<dyn ScriptSource>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(emulator: Emulator, config: Config, scripts: Arc<dyn ScriptSource>) -> Self {
        Self {
            emulator,
            config: Arc::new(config),
            scripts,
        }
    }

    /// Returns the emulator.
    #[must_use]
    pub fn emulator(&self) -> &Emulator {
        &self.emulator
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Crate version
    pub version: String,
    /// Transport kind in use
    pub transport: String,
    /// Whether the scheduler is running
    pub scheduler_running: bool,
}

/// Button listing.
#[derive(Debug, Serialize)]
pub struct ButtonListResponse {
    /// Every registered button
    pub buttons: Vec<ButtonInfo>,
}

/// State of a button after an action.
#[derive(Debug, Serialize)]
pub struct ButtonActionResponse {
    /// Button id
    pub id: String,
    /// Whether the button is being refreshed
    pub held: bool,
}

/// Glyph listing.
#[derive(Debug, Serialize)]
pub struct GlyphListResponse {
    /// Glyph book language
    pub language: String,
    /// Glyphs in definition order
    pub glyphs: Vec<Glyph>,
}

/// A glyph run was started.
#[derive(Debug, Serialize)]
pub struct GlyphResponse {
    /// Glyph id
    pub glyph: String,
    /// Cell it is written into
    pub target: CellTarget,
}

/// Current target cell.
#[derive(Debug, Serialize)]
pub struct TargetResponse {
    /// The target, if one is selected
    pub target: Option<CellTarget>,
}

/// Target cell selection.
#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    /// "jumbo" or "slateN"
    pub target: String,
}

/// Catalog listing.
#[derive(Debug, Serialize)]
pub struct RecordingListResponse {
    /// Whether a capture session is active
    pub recording: bool,
    /// Saved recordings in insertion order
    pub recordings: Vec<RecordingSummary>,
}

/// Recording import.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// Name for the recording
    pub name: String,
    /// Entries in their external form
    pub entries: Vec<RawRecordingEntry>,
}

/// Capture session change.
#[derive(Debug, Serialize)]
pub struct RecordingStateResponse {
    /// Whether a capture session is active afterwards
    pub recording: bool,
    /// Whether the call changed anything
    pub changed: bool,
}

/// Optional name for a stopped session.
#[derive(Debug, Deserialize)]
pub struct StopQuery {
    /// Name to save the recording under
    pub name: Option<String>,
}

/// Result of stopping a capture session.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    /// Whether anything was saved
    pub saved: bool,
    /// Catalog index of the saved recording
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Name of the saved recording
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<SaveOutcome> for SaveResponse {
    fn from(outcome: SaveOutcome) -> Self {
        match outcome {
            SaveOutcome::Saved { index, name } => Self {
                saved: true,
                index: Some(index),
                name: Some(name),
            },
            SaveOutcome::Discarded => Self {
                saved: false,
                index: None,
                name: None,
            },
        }
    }
}

/// Catalog index of an imported recording.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// Catalog index
    pub index: usize,
}

/// Script export request.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    /// Script name to store the recording under
    pub script: String,
}

/// Script export result.
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    /// Stored script name
    pub script: String,
    /// Number of actions written
    pub actions: usize,
}

/// A playback run was started.
#[derive(Debug, Serialize)]
pub struct PlaybackResponse {
    /// Recording or script name
    pub name: String,
    /// Number of entries being replayed
    pub entries: usize,
}

/// Result of a cancel request.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Whether a run was cancelled
    pub cancelled: bool,
}

/// Script listing.
#[derive(Debug, Serialize)]
pub struct ScriptListResponse {
    /// Script names, sorted
    pub scripts: Vec<String>,
}

/// Compiled preview of a script.
#[derive(Debug, Serialize)]
pub struct ScriptPreviewResponse {
    /// Script name
    pub name: String,
    /// Parsed actions
    pub actions: Vec<ScriptAction>,
    /// Entries playback would replay
    pub entries: Vec<RecordingEntry>,
}

/// Event log position to poll from.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// First sequence number to return
    #[serde(default)]
    pub offset: u64,
    /// Maximum number of events
    #[serde(default = "default_event_limit")]
    pub limit: usize,
}

const fn default_event_limit() -> usize {
    100
}

const MAX_EVENT_LIMIT: usize = 1000;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Error message.
    pub error: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn reject(status: StatusCode, error: ApiError) -> (StatusCode, Json<ApiError>) {
    (status, Json(error))
}

/// Maps an engine error to its HTTP status.
fn engine_error(err: EmulatorError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        EmulatorError::UnknownButtonMapping(_)
        | EmulatorError::UnknownGlyph(_)
        | EmulatorError::NoRecordings
        | EmulatorError::NoSuchRecording { .. } => StatusCode::NOT_FOUND,
        EmulatorError::Script(compile) if compile.line == 0 => StatusCode::NOT_FOUND,
        EmulatorError::PlaybackConflict => StatusCode::CONFLICT,
        EmulatorError::TransportFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    reject(status, ApiError::new(err.to_string()))
}

/// Validates a filename to prevent path traversal attacks.
///
/// Returns the sanitized filename or an error if the filename is invalid.
fn validate_filename(filename: &str) -> Result<&str, ApiError> {
    // Reject empty filenames
    if filename.is_empty() {
        return Err(ApiError::new("Filename cannot be empty"));
    }

    // Reject path traversal attempts
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(ApiError::new(
            "Invalid filename: path traversal not allowed",
        ));
    }

    // Reject hidden files
    if filename.starts_with('.') {
        return Err(ApiError::new("Invalid filename: hidden files not allowed"));
    }

    Ok(filename)
}

fn script_name(name: &str) -> ApiResult<&str> {
    validate_filename(name).map_err(|e| reject(StatusCode::BAD_REQUEST, e))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /health - Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        transport: format!("{:?}", state.config.transport.kind).to_lowercase(),
        scheduler_running: state.emulator.is_running(),
    })
}

/// GET /api/buttons - List every button.
async fn list_buttons(State(state): State<AppState>) -> Json<ButtonListResponse> {
    Json(ButtonListResponse {
        buttons: state.emulator.buttons(),
    })
}

fn button_state(state: &AppState, id: String) -> Json<ButtonActionResponse> {
    let held = state.emulator.held_buttons().contains(&id);
    Json(ButtonActionResponse { id, held })
}

/// POST /api/buttons/{id}/down - Press a button.
async fn button_down(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ButtonActionResponse>> {
    state.emulator.press_down(&id).map_err(engine_error)?;
    Ok(button_state(&state, id))
}

/// POST /api/buttons/{id}/up - Release a button.
async fn button_up(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ButtonActionResponse>> {
    state.emulator.press_up(&id).map_err(engine_error)?;
    Ok(button_state(&state, id))
}

/// POST /api/buttons/{id}/hold - Shift-click: toggle the hold latch.
async fn button_hold(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ButtonActionResponse>> {
    state.emulator.hold_down(&id).map_err(engine_error)?;
    state.emulator.press_up(&id).map_err(engine_error)?;
    Ok(button_state(&state, id))
}

/// POST /api/initialize - Send the initialise code.
async fn initialize(State(state): State<AppState>) -> StatusCode {
    state.emulator.initialize();
    StatusCode::ACCEPTED
}

/// GET /api/glyphs - List glyphs.
async fn list_glyphs(State(state): State<AppState>) -> Json<GlyphListResponse> {
    let book = state.emulator.glyphs();
    Json(GlyphListResponse {
        language: book.language().to_string(),
        glyphs: book.iter().cloned().collect(),
    })
}

/// POST /api/glyphs/{id} - Type a glyph into the target cell.
async fn send_glyph(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<GlyphResponse>)> {
    let target = state.emulator.target();
    let handle = state.emulator.send_glyph(&id).map_err(engine_error)?;

    match (handle, target) {
        (Some(_), Some(target)) => Ok((
            StatusCode::ACCEPTED,
            Json(GlyphResponse { glyph: id, target }),
        )),
        _ => Err(reject(
            StatusCode::CONFLICT,
            ApiError::new("No target cell selected"),
        )),
    }
}

/// GET /api/target - Current target cell.
async fn get_target(State(state): State<AppState>) -> Json<TargetResponse> {
    Json(TargetResponse {
        target: state.emulator.target(),
    })
}

/// PUT /api/target - Select the target cell.
async fn set_target(
    State(state): State<AppState>,
    Json(request): Json<TargetRequest>,
) -> ApiResult<Json<TargetResponse>> {
    let target: CellTarget = request.target.parse().map_err(engine_error)?;
    state.emulator.set_target(target);
    Ok(Json(TargetResponse {
        target: Some(target),
    }))
}

/// DELETE /api/target - Clear the target cell.
async fn clear_target(State(state): State<AppState>) -> StatusCode {
    state.emulator.clear_target();
    StatusCode::NO_CONTENT
}

/// GET /api/recordings - List saved recordings.
async fn list_recordings(State(state): State<AppState>) -> Json<RecordingListResponse> {
    Json(RecordingListResponse {
        recording: state.emulator.is_recording(),
        recordings: state.emulator.recordings(),
    })
}

/// POST /api/recordings - Import a recording.
async fn import_recording(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<(StatusCode, Json<ImportResponse>)> {
    let entries = entries_from_raw(&request.name, request.entries).map_err(engine_error)?;
    let index = state
        .emulator
        .import_recording(&request.name, entries)
        .map_err(engine_error)?;
    Ok((StatusCode::CREATED, Json(ImportResponse { index })))
}

/// POST /api/recordings/start - Start a capture session.
async fn start_recording(State(state): State<AppState>) -> Json<RecordingStateResponse> {
    let changed = state.emulator.start_recording();
    Json(RecordingStateResponse {
        recording: true,
        changed,
    })
}

/// POST /api/recordings/stop - Stop and save the capture session.
async fn stop_recording(
    State(state): State<AppState>,
    Query(query): Query<StopQuery>,
) -> ApiResult<Json<SaveResponse>> {
    state
        .emulator
        .stop_recording(query.name.as_deref())
        .map(|outcome| Json(outcome.into()))
        .ok_or_else(|| reject(StatusCode::CONFLICT, ApiError::new("Not recording")))
}

/// GET /api/recordings/{index} - One recording with its entries.
async fn get_recording(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<Recording>> {
    state.emulator.recording(index).map(Json).map_err(engine_error)
}

/// POST /api/recordings/{index}/play - Replay a recording.
async fn play_recording(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<(StatusCode, Json<PlaybackResponse>)> {
    let recording = state.emulator.recording(index).map_err(engine_error)?;
    state.emulator.play(index).map_err(engine_error)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(PlaybackResponse {
            name: recording.name,
            entries: recording.entries.len(),
        }),
    ))
}

/// POST /api/recordings/{index}/export - Save a recording as a script.
async fn export_recording(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<(StatusCode, Json<ExportResponse>)> {
    let name = script_name(&request.script)?.to_string();
    let recording = state.emulator.recording(index).map_err(engine_error)?;

    state
        .scripts
        .store_script(&name, &export_recording_text(&recording))
        .map_err(|e| {
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("Failed to store script", format!("{e:#}")),
            )
        })?;

    info!("Exported recording {index} as script {name:?}");
    Ok((
        StatusCode::CREATED,
        Json(ExportResponse {
            script: name,
            actions: recording.entries.len(),
        }),
    ))
}

/// POST /api/playback/cancel - Stop the running playback.
async fn cancel_playback(State(state): State<AppState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.emulator.cancel_playback(),
    })
}

/// GET /api/scripts - List scripts.
async fn list_scripts(State(state): State<AppState>) -> ApiResult<Json<ScriptListResponse>> {
    let scripts = state.scripts.list_scripts().map_err(|e| {
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::with_details("Failed to list scripts", format!("{e:#}")),
        )
    })?;
    Ok(Json(ScriptListResponse { scripts }))
}

/// GET /api/scripts/{name} - Compile a script without running it.
async fn preview_script(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ScriptPreviewResponse>> {
    let name = script_name(&name)?;
    let actions = state
        .scripts
        .fetch_script(name)
        .map_err(|e| engine_error(e.into()))?;
    let entries = state.emulator.compile(&actions);

    Ok(Json(ScriptPreviewResponse {
        name: name.to_string(),
        actions,
        entries,
    }))
}

/// POST /api/scripts/{name}/run - Run a script.
async fn run_script(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<(StatusCode, Json<PlaybackResponse>)> {
    let name = script_name(&name)?;
    let actions = state
        .scripts
        .fetch_script(name)
        .map_err(|e| engine_error(e.into()))?;
    let entries = state.emulator.compile(&actions);
    let count = entries.len();

    state
        .emulator
        .play_entries(name, entries)
        .map_err(engine_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PlaybackResponse {
            name: name.to_string(),
            entries: count,
        }),
    ))
}

/// GET /api/events - Events emitted since `offset`.
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventPage> {
    let limit = query.limit.clamp(1, MAX_EVENT_LIMIT);
    Json(state.emulator.events_since(query.offset, limit))
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    // The server is meant to run next to a local front end.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Buttons
        .route("/api/buttons", get(list_buttons))
        .route("/api/buttons/{id}/down", post(button_down))
        .route("/api/buttons/{id}/up", post(button_up))
        .route("/api/buttons/{id}/hold", post(button_hold))
        .route("/api/initialize", post(initialize))
        // Glyphs and target cell
        .route("/api/glyphs", get(list_glyphs))
        .route("/api/glyphs/{id}", post(send_glyph))
        .route(
            "/api/target",
            get(get_target).put(set_target).delete(clear_target),
        )
        // Recordings
        .route(
            "/api/recordings",
            get(list_recordings).post(import_recording),
        )
        .route("/api/recordings/start", post(start_recording))
        .route("/api/recordings/stop", post(stop_recording))
        .route("/api/recordings/{index}", get(get_recording))
        .route("/api/recordings/{index}/play", post(play_recording))
        .route("/api/recordings/{index}/export", post(export_recording))
        .route("/api/playback/cancel", post(cancel_playback))
        // Scripts
        .route("/api/scripts", get(list_scripts))
        .route("/api/scripts/{name}", get(preview_script))
        .route("/api/scripts/{name}/run", post(run_script))
        // Events
        .route("/api/events", get(list_events))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the web server until Ctrl-C, then flushes pending codes.
///
/// # Errors
///
/// Returns an error if the emulator cannot be built or the server fails to start.
pub async fn run_server(config: Config, addr: SocketAddr) -> anyhow::Result<()> {
    let emulator = Emulator::from_config(&config)?;
    let scripts = DirectoryScriptSource::open(config.paths.scripts_dir()?)?;
    info!("Scripts directory: {}", scripts.dir().display());

    emulator.run();
    emulator.initialize();

    let state = AppState::new(emulator.clone(), config, Arc::new(scripts));
    let app = create_router(state);

    info!("Starting BWT emulator web server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    emulator.shutdown().await;
    Ok(())
}
