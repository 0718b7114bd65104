//! HTTP surface: the browser page, the mobile JSON API and the playback script.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::task;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::catalog::{CatalogError, CatalogReader, Lookup, VideoRecord};
use crate::playback::PLAYBACK_SCRIPT;
use crate::query;
use crate::render::{PageView, STORE_UNAVAILABLE_MESSAGE};

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<CatalogReader>,
}

impl AppState {
    pub fn new(catalog: CatalogReader) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    /// Runs the per-token lookup on the blocking pool.
    async fn lookup(&self, tokens: Vec<String>) -> Result<Lookup, SearchError> {
        let catalog = self.catalog.clone();
        task::spawn_blocking(move || catalog.lookup(&tokens))
            .await
            .map_err(|err| SearchError::Internal(format!("task join error: {err}")))?
            .map_err(SearchError::from)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(search_page))
        .route("/api/videos", post(api_videos))
        .route("/assets/playback.js", get(playback_script))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug)]
enum SearchError {
    StoreUnavailable,
    Internal(String),
}

impl From<CatalogError> for SearchError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unavailable { .. } => {
                warn!("catalog unavailable: {:#}", anyhow::Error::new(err));
                Self::StoreUnavailable
            }
            CatalogError::Query(_) => Self::Internal(format!("{:#}", anyhow::Error::new(err))),
        }
    }
}

/// Failure of the HTML route; rendered as a bare 500.
#[derive(Debug)]
pub struct PageError(String);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!("page request failed: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        Self(format!("{err:#}"))
    }
}

type PageResult = Result<Html<String>, PageError>;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    field: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            field: "error",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            field: "error",
            message: message.into(),
        }
    }

    /// Not-found replies carry a `message` rather than an `error`.
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            field: "message",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(
            self.field.to_owned(),
            serde_json::Value::String(self.message),
        );
        (self.status, Json(serde_json::Value::Object(body))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSearchRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiSearchResponse {
    pub videos: Vec<VideoRecord>,
}

async fn index() -> PageResult {
    Ok(Html(PageView::empty().render()?))
}

async fn search_page(State(state): State<AppState>, Form(form): Form<SearchForm>) -> PageResult {
    let tokens = query::tokenize(form.query.as_deref().unwrap_or_default());
    if tokens.is_empty() {
        return Ok(Html(PageView::empty().render()?));
    }

    let view = match state.lookup(tokens).await {
        Ok(lookup) => {
            info!(
                matches = lookup.videos.len(),
                unmatched = lookup.unmatched.len(),
                "page search"
            );
            PageView::from_lookup(lookup)
        }
        Err(SearchError::StoreUnavailable) => PageView::message(STORE_UNAVAILABLE_MESSAGE),
        Err(SearchError::Internal(message)) => return Err(PageError(message)),
    };
    Ok(Html(view.render()?))
}

impl ApiSearchRequest {
    /// Reads the body as JSON whatever its declared content type. Empty or
    /// unreadable bodies carry no query.
    fn from_body(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }
        serde_json::from_slice(body).unwrap_or_else(|err| {
            warn!("unreadable API body: {err}");
            Self::default()
        })
    }
}

async fn api_videos(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ApiSearchResponse>> {
    let request = ApiSearchRequest::from_body(&body);

    let tokens = query::tokenize(request.query.as_deref().unwrap_or_default());
    if tokens.is_empty() {
        return Err(ApiError::bad_request("No query provided"));
    }

    let lookup = state.lookup(tokens).await.map_err(|err| match err {
        SearchError::StoreUnavailable => ApiError::internal(STORE_UNAVAILABLE_MESSAGE),
        SearchError::Internal(message) => {
            error!("API search failed: {message}");
            ApiError::internal("Internal server error")
        }
    })?;

    if lookup.videos.is_empty() {
        return Err(ApiError::not_found("No matches found"));
    }

    info!(matches = lookup.videos.len(), "API search");
    Ok(Json(ApiSearchResponse {
        videos: lookup.videos,
    }))
}

async fn playback_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        PLAYBACK_SCRIPT,
    )
}
