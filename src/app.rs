use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use handlebars::Handlebars;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::ServerConfig;
use crate::error::{VizError, VizResult};
use crate::figure::ChartSpec;
use crate::forms::{ChartType, FieldBindings, FormOutcome, form_for};
use crate::graph::ChartDispatcher;
use crate::loader::{UploadReport, UploadedFile};
use crate::palette::Palette;
use crate::session::SessionStore;
use crate::table::TabularData;

pub const SESSION_COOKIE: &str = "session";

pub struct AppState {
    pub config: ServerConfig,
    pub sessions: SessionStore,
    pub dispatcher: ChartDispatcher,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, handlebars::TemplateError> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);
        templates.register_template_string("dashboard", include_str!("./static/dashboard.hbs"))?;

        Ok(AppState {
            sessions: SessionStore::new(config.cache_decoded)
                .with_max_sessions(config.max_sessions),
            dispatcher: ChartDispatcher::new(config.palette_mode),
            config,
            templates,
        })
    }
}

#[derive(Serialize)]
struct OptionsResponse {
    chart_types: Vec<&'static str>,
    palettes: Vec<&'static str>,
    default_chart_type: ChartType,
    default_palette: Palette,
}

#[derive(Deserialize)]
struct FieldsQuery {
    #[serde(default)]
    chart_type: ChartType,
}

#[derive(Deserialize)]
struct ChartRequest {
    #[serde(default)]
    chart_type: ChartType,
    #[serde(default)]
    palette: Palette,
    #[serde(default)]
    bindings: FieldBindings,
}

#[derive(Serialize)]
struct ChartResponse {
    figure: ChartSpec,
    error: Option<String>,
}

/// Builds the dashboard router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let body_limit = state.config.body_limit;

    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/options", get(get_options))
        .route("/api/upload", post(upload_encoded))
        .route("/api/upload/file", post(upload_multipart))
        .route("/api/status", get(get_status))
        .route("/api/fields", get(get_fields))
        .route("/api/chart", post(render_chart))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let address = config.address();
    let port = config.port;
    let wildcard = config.host == "0.0.0.0";

    let state = Arc::new(AppState::new(config)?);
    info!(
        "Palette mode {:?}, decode cache {}",
        state.dispatcher.palette_mode,
        if state.config.cache_decoded { "on" } else { "off" }
    );
    let app = router(state);

    let listener = TcpListener::bind(&address).await?;
    info!("Listening on http://{}", address);
    if wildcard {
        match local_ip_address::local_ip() {
            Ok(ip) => info!("Reachable on the local network at http://{}:{}", ip, port),
            Err(e) => warn!("Could not determine local IP address: {}", e),
        }
    }

    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard(State(state): State<Arc<AppState>>) -> Response {
    let context = serde_json::json!({
        "chart_types": ChartType::ALL.iter().map(|t| t.label()).collect::<Vec<_>>(),
        "palettes": Palette::ALL.iter().map(|p| p.name()).collect::<Vec<_>>(),
        "default_chart_type": ChartType::default().label(),
        "default_palette": Palette::default().name(),
    });

    match state.templates.render("dashboard", &context) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            error!("Failed to render dashboard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

async fn get_options() -> Json<OptionsResponse> {
    Json(OptionsResponse {
        chart_types: ChartType::ALL.iter().map(|t| t.label()).collect(),
        palettes: Palette::ALL.iter().map(|p| p.name()).collect(),
        default_chart_type: ChartType::default(),
        default_palette: Palette::default(),
    })
}

/// Upload sent as `{filename, contents}` with a data URL payload.
async fn upload_encoded(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(upload): Json<UploadedFile>,
) -> (CookieJar, Json<UploadReport>) {
    accept_upload(&state, jar, upload).await
}

/// Upload sent as a multipart form with a `file` field.
async fn upload_multipart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart upload: {}", e);
                return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        return match field.bytes().await {
            Ok(bytes) => {
                accept_upload(&state, jar, UploadedFile::from_bytes(filename, &bytes))
                    .await
                    .into_response()
            }
            Err(e) => {
                warn!("Failed to read uploaded file {}: {}", filename, e);
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
        };
    }

    (StatusCode::BAD_REQUEST, "Missing 'file' field").into_response()
}

async fn get_status(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<UploadReport> {
    let Some(id) = session_id(&jar) else {
        return Json(UploadReport::no_file());
    };
    let Some(upload) = state.sessions.upload(&id) else {
        return Json(UploadReport::no_file());
    };
    let Some(outcome) = decoded_table(&state, id).await else {
        return Json(UploadReport::no_file());
    };

    Json(report_for(&upload.name, &outcome))
}

async fn get_fields(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<FieldsQuery>,
) -> Response {
    let columns = match session_table(&state, &jar).await {
        None => None,
        Some(Ok(table)) => Some(table.column_names()),
        Some(Err(e)) => {
            warn!("Cannot build {} form: {}", query.chart_type, e);
            Some(Vec::new())
        }
    };

    match form_for(query.chart_type, columns.as_deref()) {
        FormOutcome::Suspended => StatusCode::NO_CONTENT.into_response(),
        FormOutcome::Fields(fields) => Json(fields).into_response(),
    }
}

async fn render_chart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<ChartRequest>,
) -> Response {
    let Some(outcome) = session_table(&state, &jar).await else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let rendered = outcome.and_then(|table| {
        state
            .dispatcher
            .try_render(request.chart_type, &request.bindings, request.palette, &table)
    });

    let response = match rendered {
        Ok(figure) => ChartResponse {
            figure,
            error: None,
        },
        Err(e) => {
            warn!("Error generating {}: {}", request.chart_type, e);
            ChartResponse {
                figure: ChartSpec::empty(),
                error: Some(e.to_string()),
            }
        }
    };

    Json(response).into_response()
}

async fn accept_upload(
    state: &Arc<AppState>,
    jar: CookieJar,
    upload: UploadedFile,
) -> (CookieJar, Json<UploadReport>) {
    let filename = upload.name.clone();
    let current = session_id(&jar);
    let (id, upload_id) = state.sessions.store_upload(current.as_deref(), upload);

    let report = match decoded_table(state, id.clone()).await {
        Some(outcome) => report_for(&filename, &outcome),
        None => UploadReport::no_file(),
    };
    info!("Upload {} ({}): {}", upload_id, filename, report.status);

    let mut cookie = Cookie::new(SESSION_COOKIE, id);
    cookie.set_path("/");
    cookie.set_http_only(true);
    (jar.add(cookie), Json(report))
}

fn report_for(filename: &str, outcome: &VizResult<Arc<TabularData>>) -> UploadReport {
    match outcome {
        Ok(table) => UploadReport::from_outcome(filename, Ok(table.as_ref())),
        Err(e) => {
            warn!("Failed to decode {}: {}", filename, e);
            UploadReport::from_outcome(filename, Err(e))
        }
    }
}

fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string())
}

async fn session_table(
    state: &Arc<AppState>,
    jar: &CookieJar,
) -> Option<VizResult<Arc<TabularData>>> {
    let id = session_id(jar)?;
    decoded_table(state, id).await
}

/// Decodes (or fetches from cache) a session's table on the blocking pool,
/// so large workbooks do not stall the async workers.
async fn decoded_table(state: &Arc<AppState>, id: String) -> Option<VizResult<Arc<TabularData>>> {
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || state.sessions.table(&id)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Decode task failed: {}", e);
            Some(Err(VizError::decode(format!("decoding was interrupted: {}", e))))
        }
    }
}
