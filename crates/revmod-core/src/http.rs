//! HTTP surface.
//!
//! ```text
//! GET /                      usage
//! GET /{app}[@{ref}]         302 to the root export
//! GET /{app}[@{ref}]/{path}  302 to the canonical form, an export, or the file
//! ```

use std::future::Future;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use revmod_domain::AppRef;
use serde_json::json;
use tracing::{error, info, warn};

use crate::service::{ModuleService, ServeError, Served};
use crate::store::ObjectStore;

pub const USAGE: &str = "revmod: serve git revisions as importable modules

GET /{app}                 redirect to the root export at HEAD
GET /{app}@{ref}           redirect to the root export at {ref}
GET /{app}@{ref}/{path}    fetch {path} at {ref}; program source is served
                           with specifiers rewritten through the import map
";

const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const NO_CACHE: &str = "no-cache";

/// Builds the router serving every app below the store.
pub fn router<S>(service: ModuleService<S>) -> Router
where
    S: ObjectStore + 'static,
{
    Router::new()
        .route("/", get(usage))
        .route("/{app}", get(entry::<S>))
        .route("/{app}/{*path}", get(file::<S>))
        .fallback(unrouted)
        .with_state(service)
}

/// Serves `service` on `listener` until `shutdown` resolves.
pub async fn serve<S, F>(
    listener: tokio::net::TcpListener,
    service: ModuleService<S>,
    shutdown: F,
) -> std::io::Result<()>
where
    S: ObjectStore + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn usage() -> &'static str {
    USAGE
}

async fn unrouted(uri: Uri) -> Response {
    warn!(path = uri.path(), "no route");
    error_response(
        StatusCode::NOT_FOUND,
        &format!("'{}' does not name an app or a file", uri.path()),
    )
}

async fn entry<S>(State(service): State<ModuleService<S>>, Path(segment): Path<String>) -> Response
where
    S: ObjectStore + 'static,
{
    let app = match AppRef::parse(&segment) {
        Ok(app) => app,
        Err(err) => return error_response(StatusCode::NOT_FOUND, &err.to_string()),
    };
    info!(app = %app.app, reference = app.reference(), "entry request");
    let result = tokio::task::spawn_blocking(move || service.resolve_entry(&app))
        .await
        .map_err(|err| ServeError::Internal(format!("request task failed: {err}")))
        .and_then(|result| result);
    match result {
        Ok(location) => redirect(&location),
        Err(err) => err.into_response(),
    }
}

async fn file<S>(
    State(service): State<ModuleService<S>>,
    Path((segment, path)): Path<(String, String)>,
) -> Response
where
    S: ObjectStore + 'static,
{
    let app = match AppRef::parse(&segment) {
        Ok(app) => app,
        Err(err) => return error_response(StatusCode::NOT_FOUND, &err.to_string()),
    };
    info!(app = %app.app, reference = app.reference(), %path, "file request");
    let result = tokio::task::spawn_blocking(move || service.serve_path(&app, &path))
        .await
        .map_err(|err| ServeError::Internal(format!("request task failed: {err}")))
        .and_then(|result| result);
    match result {
        Ok(Served::Redirect(location)) => redirect(&location),
        Ok(Served::Source { content_type, body }) => (
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
                (header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE)),
            ],
            body,
        )
            .into_response(),
        Ok(Served::Asset {
            content_type,
            bytes,
        }) => {
            let content_type = HeaderValue::from_str(&content_type)
                .unwrap_or_else(|_| HeaderValue::from_static(crate::service::OCTET_STREAM));
            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE)),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (
            StatusCode::FOUND,
            [
                (header::LOCATION, location),
                (header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE)),
            ],
        )
            .into_response(),
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "redirect location is not a valid header value",
        ),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = json!({
        "success": false,
        "message": message,
        "status": status.as_u16(),
    });
    (status, Json(body)).into_response()
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = if self.is_not_found() {
            warn!(reason = self.reason(), error = %self, "request failed");
            StatusCode::NOT_FOUND
        } else {
            error!(reason = self.reason(), error = %self, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error_response(status, &self.to_string())
    }
}
