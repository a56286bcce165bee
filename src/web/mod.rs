// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web dashboard and JSON API

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::db::{CategoryCount, RecordStore, StoredRecord, TIMESTAMP_FORMAT};
use crate::organizer::{OrganizeRunSummary, Organizer, RunStatus};
use crate::report::{self, ChartData, DashboardSnapshot};
use crate::TidyError;

/// Shared application state
pub struct AppState {
    pub store: RecordStore,
    pub organizer: Organizer,
    pub config: AppConfig,
    /// Message shown once on the next dashboard render
    flash: Mutex<Option<String>>,
}

impl AppState {
    /// Build the state, creating the upload directory if needed
    pub fn new(config: AppConfig, store: RecordStore) -> crate::Result<Self> {
        std::fs::create_dir_all(config.upload_dir())?;
        let organizer = Organizer::from_config(&config, Arc::new(store.clone()));
        Ok(Self {
            store,
            organizer,
            config,
            flash: Mutex::new(None),
        })
    }

    fn set_flash(&self, message: String) {
        if let Ok(mut slot) = self.flash.lock() {
            *slot = Some(message);
        }
    }

    fn take_flash(&self) -> Option<String> {
        self.flash.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Error response for API handlers
pub struct ApiError(TidyError);

impl<E> From<E> for ApiError
where
    E: Into<TidyError>,
{
    fn from(e: E) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TidyError::DirectoryNotFound(_) => StatusCode::NOT_FOUND,
            TidyError::InvalidUpload(_) | TidyError::Config(_) => StatusCode::BAD_REQUEST,
            TidyError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!("Request failed: {}", self.0);
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.web.max_upload_bytes;

    Router::new()
        // Pages
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/dashboard", get(dashboard_page))
        .route("/records", get(records_page))
        // Actions
        .route("/organize", post(organize))
        .route("/upload", post(upload))
        .route("/report", get(download_report))
        // API endpoints
        .route("/api/summary", get(api_summary))
        .route("/api/chartdata", get(api_chartdata))
        .route("/api/records", get(api_records))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Page Handlers ===

async fn dashboard_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let snapshot = report::dashboard(&state.store, state.config.web.recent_limit)?;
    let waiting = waiting_uploads(&state.config.upload_dir());
    let flash = state.take_flash();

    Ok(Html(render_dashboard(&snapshot, &waiting, flash.as_deref())))
}

async fn records_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let records = state.store.list_all()?;
    Ok(Html(render_records_page(&records)))
}

// === Action Handlers ===

#[derive(Debug, Default, Deserialize)]
struct OrganizeRequest {
    local_path: Option<String>,
}

/// Accepts either a JSON body or a submitted form. JSON callers get the
/// run summary; forms are redirected back to the dashboard.
async fn organize(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    let body = if is_json {
        match Json::<OrganizeRequest>::from_request(request, &()).await {
            Ok(Json(body)) => body,
            Err(rejection) => return rejection.into_response(),
        }
    } else {
        match Form::<OrganizeRequest>::from_request(request, &()).await {
            Ok(Form(body)) => body,
            Err(rejection) => return rejection.into_response(),
        }
    };

    let target = body
        .local_path
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.config.upload_dir());

    let summary = match run_organizer(&state, target).await {
        Ok(summary) => summary,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if is_json {
        let status = match summary.status {
            RunStatus::DirectoryNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::OK,
        };
        (status, Json(summary)).into_response()
    } else {
        state.set_flash(summary.message());
        Redirect::to("/dashboard").into_response()
    }
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<OrganizeRunSummary>, ApiError> {
    let upload_dir = state.config.upload_dir();
    tokio::fs::create_dir_all(&upload_dir).await?;

    let mut saved = 0usize;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TidyError::InvalidUpload(e.to_string()))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let Some(name) = field.file_name().and_then(sanitize_upload_name) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| TidyError::InvalidUpload(e.to_string()))?;

        tokio::fs::write(upload_dir.join(&name), &data).await?;
        info!("Saved upload {} ({} bytes)", name, data.len());
        saved += 1;
    }

    if saved == 0 {
        return Err(TidyError::InvalidUpload("No file part".to_string()).into());
    }

    let summary = run_organizer(&state, upload_dir).await?;
    state.set_flash(summary.message());
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    dir: Option<String>,
}

async fn download_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let dir = query
        .dir
        .filter(|d| !d.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.config.upload_dir());
    if !dir.is_dir() {
        return Err(TidyError::DirectoryNotFound(dir).into());
    }

    let store = state.store.clone();
    let report_config = state.config.report.clone();
    let path = tokio::task::spawn_blocking(move || report::write_pdf_report(&store, &dir, &report_config))
        .await
        .map_err(|e| TidyError::Server(format!("Report task failed: {}", e)))??;
    let bytes = tokio::fs::read(&path).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", state.config.report.file_name),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn run_organizer(state: &AppState, dir: PathBuf) -> crate::Result<OrganizeRunSummary> {
    let organizer = state.organizer.clone();
    tokio::task::spawn_blocking(move || organizer.organize(&dir))
        .await
        .map_err(|e| TidyError::Server(format!("Organizer task failed: {}", e)))?
}

// === API Handlers ===

async fn api_summary(State(state): State<Arc<AppState>>) -> Result<Json<BTreeMap<String, i64>>, ApiError> {
    Ok(Json(report::category_summary(&state.store)?))
}

async fn api_chartdata(State(state): State<Arc<AppState>>) -> Result<Json<ChartData>, ApiError> {
    Ok(Json(report::chart_data(&state.store)?))
}

#[derive(Deserialize)]
struct RecordsQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct RecordsResponse {
    total: i64,
    records: Vec<StoredRecord>,
}

async fn api_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let records = match query.limit {
        Some(limit) => state.store.list_recent(limit)?,
        None => state.store.list_all()?,
    };
    Ok(Json(RecordsResponse {
        total: state.store.count()?,
        records,
    }))
}

// === Helpers ===

/// Base name of an uploaded file, or `None` if nothing usable is left
fn sanitize_upload_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return None;
    }
    Some(name.to_string())
}

fn waiting_uploads(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// === Template Rendering ===

fn base_template(title: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - tidydir</title>
    <style>
        :root {{
            --bg-primary: #1a1a2e;
            --bg-secondary: #16213e;
            --bg-card: #0f3460;
            --text-primary: #e8e8e8;
            --text-secondary: #a0a0a0;
            --accent: #e94560;
            --success: #00d9a5;
            --border: #2a2a4a;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }}
        .container {{ max-width: 1400px; margin: 0 auto; padding: 20px; }}
        nav {{
            background: var(--bg-secondary);
            padding: 15px 20px;
            display: flex;
            align-items: center;
            gap: 30px;
            border-bottom: 1px solid var(--border);
        }}
        nav .logo {{ font-size: 1.5em; font-weight: bold; color: var(--accent); text-decoration: none; }}
        nav a {{ color: var(--text-secondary); text-decoration: none; }}
        nav a:hover {{ color: var(--text-primary); }}
        .card {{ background: var(--bg-card); border-radius: 12px; padding: 20px; margin-bottom: 20px; }}
        .card h2 {{ margin-bottom: 15px; color: var(--accent); }}
        .flash {{ border-left: 4px solid var(--success); }}
        .stats-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
            gap: 20px;
            margin-bottom: 30px;
        }}
        .stat-card {{ background: var(--bg-card); border-radius: 12px; padding: 20px; text-align: center; }}
        .stat-card .number {{ font-size: 2.5em; font-weight: bold; color: var(--accent); }}
        .stat-card .label {{ color: var(--text-secondary); font-size: 0.9em; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 12px; text-align: left; border-bottom: 1px solid var(--border); }}
        th {{ color: var(--text-secondary); font-weight: 500; }}
        .category-badge {{
            display: inline-block;
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            padding: 4px 10px;
            border-radius: 6px;
            font-size: 0.85em;
        }}
        .bar {{ height: 10px; background: var(--success); border-radius: 4px; }}
        input, button {{ padding: 8px; border-radius: 6px; border: 1px solid var(--border); }}
        button {{ background: var(--accent); color: white; cursor: pointer; }}
    </style>
</head>
<body>
    <nav>
        <a href="/dashboard" class="logo">tidydir</a>
        <a href="/dashboard">Dashboard</a>
        <a href="/records">Records</a>
        <a href="/report">Report</a>
    </nav>
    <main class="container">
        {}
    </main>
</body>
</html>"#, escape_html(title), content)
}

fn render_dashboard(snapshot: &DashboardSnapshot, waiting: &[String], flash: Option<&str>) -> String {
    let flash_html = flash
        .map(|m| format!(r#"<div class="card flash">{}</div>"#, escape_html(m)))
        .unwrap_or_default();

    let stats_html = format!(r#"
        <div class="stats-grid">
            <div class="stat-card">
                <div class="number">{}</div>
                <div class="label">Files Organized</div>
            </div>
            <div class="stat-card">
                <div class="number">{}</div>
                <div class="label">Waiting in Uploads</div>
            </div>
            <div class="stat-card">
                <div class="number">{}</div>
                <div class="label">Active Days</div>
            </div>
        </div>
    "#, snapshot.total, waiting.len(), snapshot.daily.labels.len());

    let categories_html = render_category_rows(&snapshot.categories, snapshot.total);

    let daily_html: String = snapshot.daily.labels.iter()
        .zip(&snapshot.daily.counts)
        .map(|(day, count)| format!("<tr><td>{}</td><td>{}</td></tr>", day, count))
        .collect();

    let waiting_html: String = if waiting.is_empty() {
        "<li>Nothing waiting</li>".to_string()
    } else {
        waiting.iter().map(|n| format!("<li>{}</li>", escape_html(n))).collect()
    };

    let content = format!(r#"
        <h1>Dashboard</h1>
        {}
        {}
        <div style="display: grid; grid-template-columns: 2fr 1fr; gap: 20px;">
            <div class="card">
                <h2>Recent Moves</h2>
                {}
            </div>
            <div class="card">
                <h2>Categories</h2>
                <table>
                    <tr><th>Category</th><th>Count</th><th></th></tr>
                    {}
                </table>
            </div>
        </div>
        <div style="display: grid; grid-template-columns: 1fr 1fr 1fr; gap: 20px;">
            <div class="card">
                <h2>Organize a Folder</h2>
                <form method="post" action="/organize">
                    <input type="text" name="local_path" placeholder="Leave empty for uploads">
                    <button type="submit">Organize</button>
                </form>
            </div>
            <div class="card">
                <h2>Upload Files</h2>
                <form method="post" action="/upload" enctype="multipart/form-data">
                    <input type="file" name="files" multiple>
                    <button type="submit">Upload</button>
                </form>
                <ul style="margin-top: 10px; margin-left: 20px;">{}</ul>
            </div>
            <div class="card">
                <h2>Moves per Day</h2>
                <table>
                    <tr><th>Day</th><th>Moves</th></tr>
                    {}
                </table>
            </div>
        </div>
    "#, flash_html, stats_html, render_records_table(&snapshot.recent), categories_html, waiting_html, daily_html);

    base_template("Dashboard", &content)
}

fn render_category_rows(categories: &[CategoryCount], total: i64) -> String {
    categories.iter()
        .map(|c| {
            let pct = if total > 0 { c.count * 100 / total } else { 0 };
            format!(
                r#"<tr><td>{}</td><td>{}</td><td style="width: 40%"><div class="bar" style="width: {}%"></div></td></tr>"#,
                escape_html(&c.category), c.count, pct
            )
        })
        .collect()
}

fn render_records_table(records: &[StoredRecord]) -> String {
    if records.is_empty() {
        return "<p>No files organized yet.</p>".to_string();
    }

    let rows: String = records.iter()
        .map(|r| {
            format!(r#"
                <tr>
                    <td>{}</td>
                    <td><span class="category-badge">{}</span></td>
                    <td>{}</td>
                    <td>{}</td>
                </tr>
            "#,
            escape_html(&r.record.filename),
            escape_html(&r.record.category),
            escape_html(&r.record.destination_path),
            r.record.timestamp.format(TIMESTAMP_FORMAT)
            )
        })
        .collect();

    format!(r#"
        <table>
            <tr>
                <th>File</th>
                <th>Category</th>
                <th>Moved To</th>
                <th>Date</th>
            </tr>
            {}
        </table>
    "#, rows)
}

fn render_records_page(records: &[StoredRecord]) -> String {
    let content = format!(r#"
        <h1>Records</h1>
        <div class="card">
            {}
        </div>
    "#, render_records_table(records));

    base_template("Records", &content)
}

/// Start the web server with config and record store
pub async fn start_server(config: AppConfig, store: RecordStore) -> crate::Result<()> {
    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState::new(config, store)?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Dashboard available at http://{}/dashboard", addr);

    let router = create_router(state);
    axum::serve(listener, router).await
        .map_err(|e| TidyError::Server(format!("Server error: {}", e)))?;

    Ok(())
}
