//! HTTP surface (feature `server`).
//!
//! | route                  | response                                  |
//! |------------------------|-------------------------------------------|
//! | `GET /health`          | `{"status":"ok"}`                         |
//! | `GET /{source}/api`    | Torznab: `t=caps`, `t=search`, `t=tvsearch` |
//! | `GET /{source}/search` | JSON list of releases (`q`, `ep`)         |
//!
//! A Torznab search with an empty `q` is a capability probe and answers with
//! the single mock item without touching the origin.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    error::Error,
    search::{Indexer, Indexers},
    torznab::{self, ChannelMetadata, DEFAULT_LIMIT, TorznabItem},
    types::ReleaseItem,
};

/// Shared handler state.
pub struct AppState {
    pub indexers: Indexers,
    /// Prefix of every channel title
    pub title: String,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub fn new(indexers: Indexers, title: impl Into<String>) -> SharedAppState {
        Arc::new(Self {
            indexers,
            title: title.into(),
        })
    }

    fn indexer(&self, id: &str) -> Result<&Indexer, HttpError> {
        self.indexers
            .get(id)
            .ok_or_else(|| HttpError::UnknownSource(id.to_string()))
    }
}

pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/:source/api", get(torznab_handler))
        .route("/:source/search", get(json_search))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Numeric parameters arrive as strings so an empty `offset=` does not reject
/// the whole request.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct TorznabQuery {
    #[serde(rename = "t")]
    operation: Option<String>,
    #[serde(rename = "q")]
    query: Option<String>,
    ep: Option<String>,
    season: Option<String>,
    offset: Option<String>,
    limit: Option<String>,
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse::<T>().ok())
}

impl TorznabQuery {
    fn operation(&self) -> TorznabOperation<'_> {
        match self.operation.as_deref().unwrap_or("search") {
            "caps" => TorznabOperation::Caps,
            "search" => TorznabOperation::Search,
            "tvsearch" | "tv-search" => TorznabOperation::TvSearch,
            other => TorznabOperation::Unsupported(other),
        }
    }

    fn term(&self) -> &str {
        self.query.as_deref().map(str::trim).unwrap_or_default()
    }

    fn episode(&self) -> Option<u32> {
        parse_number(self.ep.as_deref())
    }

    fn season(&self) -> Option<u32> {
        parse_number(self.season.as_deref())
    }

    fn offset(&self) -> usize {
        parse_number(self.offset.as_deref()).unwrap_or(0)
    }

    fn limit(&self) -> usize {
        parse_number(self.limit.as_deref())
            .filter(|&limit| limit > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(DEFAULT_LIMIT)
    }
}

enum TorznabOperation<'a> {
    Caps,
    Search,
    TvSearch,
    Unsupported(&'a str),
}

fn xml_response(status: StatusCode, xml: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml).into_response()
}

async fn torznab_handler(
    State(state): State<SharedAppState>,
    Path(source): Path<String>,
    Query(query): Query<TorznabQuery>,
) -> Result<Response, HttpError> {
    let indexer = state.indexer(&source)?;
    let operation = query.operation();
    let operation_name = match &operation {
        TorznabOperation::Caps => "caps",
        TorznabOperation::Search => "search",
        TorznabOperation::TvSearch => "tvsearch",
        TorznabOperation::Unsupported(name) => *name,
    };

    info!(
        source = indexer.id(),
        operation = operation_name,
        q = query.term(),
        ep = query.ep.as_deref(),
        season = query.season.as_deref(),
        "torznab request received"
    );

    let metadata = ChannelMetadata::new(
        format!("{} {}", state.title, indexer.name()),
        format!("/{}/api", indexer.id()),
    );

    match operation {
        TorznabOperation::Caps => Ok(xml_response(StatusCode::OK, torznab::render_caps(&metadata)?)),
        TorznabOperation::Search | TorznabOperation::TvSearch => respond_search(indexer, &metadata, &query).await,
        TorznabOperation::Unsupported(name) => Err(HttpError::UnsupportedOperation(name.to_string())),
    }
}

async fn respond_search(
    indexer: &Indexer,
    metadata: &ChannelMetadata,
    query: &TorznabQuery,
) -> Result<Response, HttpError> {
    let term = query.term();
    if term.is_empty() {
        let xml = torznab::render_feed(metadata, &[torznab::mock_item()], 0, 1)?;
        return Ok(xml_response(StatusCode::OK, xml));
    }

    let releases = match query.episode() {
        Some(episode) => indexer.search_by_episode(term, episode).await?,
        None => indexer.search_by_term(term).await?,
    };

    let offset = query.offset();
    let season = query.season();
    let items: Vec<TorznabItem> = releases
        .iter()
        .skip(offset)
        .take(query.limit())
        .map(|release| TorznabItem::from_release(release, season))
        .collect();

    info!(
        source = indexer.id(),
        total = releases.len(),
        returned = items.len(),
        offset,
        "prepared torznab feed items"
    );

    let xml = torznab::render_feed(metadata, &items, offset, releases.len())?;
    Ok(xml_response(StatusCode::OK, xml))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct JsonQuery {
    q: Option<String>,
    ep: Option<String>,
}

async fn json_search(
    State(state): State<SharedAppState>,
    Path(source): Path<String>,
    Query(query): Query<JsonQuery>,
) -> Result<Json<Vec<ReleaseItem>>, JsonError> {
    let indexer = state.indexer(&source)?;
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let releases = match parse_number::<u32>(query.ep.as_deref()) {
        Some(episode) => indexer.search_by_episode(term, episode).await,
        None => indexer.search_by_term(term).await,
    }
    .map_err(HttpError::from)?;

    Ok(Json(releases))
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("unknown source `{0}`")]
    UnknownSource(String),
    #[error("unsupported torznab operation `{0}`")]
    UnsupportedOperation(String),
    #[error(transparent)]
    Indexer(#[from] Error),
}

impl HttpError {
    fn status(&self) -> StatusCode {
        match self {
            HttpError::UnknownSource(_) => StatusCode::NOT_FOUND,
            HttpError::UnsupportedOperation(_) => StatusCode::BAD_REQUEST,
            HttpError::Indexer(Error::HttpStatus { .. } | Error::Network { .. }) => StatusCode::BAD_GATEWAY,
            HttpError::Indexer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Torznab error code: 202 no such function, 900 everything else.
    fn torznab_code(&self) -> u16 {
        match self {
            HttpError::UnsupportedOperation(_) => 202,
            _ => 900,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let HttpError::UnknownSource(_) = self {
            return (status, self.to_string()).into_response();
        }

        error!("torznab handler error: {self}");
        match torznab::render_error(self.torznab_code(), &self.to_string()) {
            Ok(xml) => xml_response(status, xml),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

/// [`HttpError`] rendered as a JSON body.
#[derive(Debug)]
pub struct JsonError(HttpError);

impl From<HttpError> for JsonError {
    fn from(e: HttpError) -> Self {
        JsonError(e)
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            error!("search handler error: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
