use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use paper_core::persist::{load_index, IndexPaths};
use paper_core::{DocId, Document, Engine, Error, Field, SearchHit, DEFAULT_LIMIT};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Upper bound on `k` accepted from clients.
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, PartialEq)]
pub struct SearchParams {
    pub q: String,
    pub fields: Vec<Field>,
    pub k: usize,
}

impl SearchParams {
    /// Reads `q`, `k` and `fields` from decoded query pairs. `fields` may be
    /// repeated and each value may hold a comma-separated list. A `k` of zero
    /// or below asks for no results.
    fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ApiError> {
        let mut q = None;
        let mut k = DEFAULT_LIMIT;
        let mut fields = Vec::new();
        for (key, value) in pairs {
            match key.as_str() {
                "q" => q = Some(value),
                "k" => {
                    let requested: i64 = value
                        .trim()
                        .parse()
                        .map_err(|_| bad_request(json!({ "error": format!("invalid k: {value}") })))?;
                    k = usize::try_from(requested.max(0)).unwrap_or(MAX_LIMIT);
                }
                "fields" => {
                    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                        fields.push(name.parse::<Field>().map_err(error_response)?);
                    }
                }
                _ => {}
            }
        }
        let q = q.ok_or_else(|| bad_request(json!({ "error": "missing query parameter q" })))?;
        Ok(Self { q, fields, k: k.min(MAX_LIMIT) })
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    pub results: Vec<SearchHit>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub type ApiError = (StatusCode, Json<Value>);

fn bad_request(body: Value) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(body))
}

fn error_response(err: Error) -> ApiError {
    match err {
        Error::QuerySyntax { message, position, fragment } => {
            bad_request(json!({ "error": message, "position": position, "near": fragment }))
        }
        Error::UnknownField(name) => bad_request(json!({ "error": format!("unknown field: {name}") })),
        Error::NotFound(doc_id) => (StatusCode::NOT_FOUND, Json(json!({ "error": "not found", "doc_id": doc_id }))),
        other => {
            tracing::error!(error = %other, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": other.to_string() })))
        }
    }
}

/// Loads the snapshot in `index_dir` and builds the router around it.
pub fn build_app(index_dir: String) -> Result<Router> {
    let index = load_index(&IndexPaths::new(&index_dir))?;
    Ok(build_router(Arc::new(Engine::from_index(index))))
}

pub fn build_router(engine: Arc<Engine>) -> Router {
    let app_state = AppState { engine };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let params = SearchParams::from_pairs(pairs)?;
    let results = state.engine.search(&params.q, &params.fields, params.k).map_err(error_response)?;
    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, hits = results.len(), "search served");
    Ok(Json(SearchResponse { query: params.q, took_ms: elapsed.as_millis(), took_s: elapsed.as_secs_f64(), results }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<Document>, ApiError> {
    state.engine.get(doc_id).map(Json).map_err(error_response)
}
