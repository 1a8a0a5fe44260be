// src/serve/server.rs

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream::{self, Stream};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::model::ServeSection;

/// Path browsers subscribe to for reload notifications.
const RELOAD_PATH: &str = "/__sitepipe/reload";

/// Snippet injected into served HTML pages; reloads the page whenever the
/// runtime broadcasts a finished rebuild.
const RELOAD_SNIPPET: &str = concat!(
    "<script>new EventSource(\"/__sitepipe/reload\")",
    ".onmessage = () => location.reload();</script>"
);

#[derive(Clone)]
struct AppState {
    out_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
}

/// Bind and spawn the dev server. Returns the bound address.
///
/// The server runs until the process exits; it holds only a subscription
/// handle to the reload channel, so it never keeps a build alive.
pub async fn spawn_server(
    serve: &ServeSection,
    out_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
) -> Result<SocketAddr> {
    let state = AppState { out_dir, reload_tx };

    let app = Router::new()
        .route(RELOAD_PATH, get(reload_events))
        .fallback(get(serve_asset))
        .with_state(state);

    let bind = format!("{}:{}", serve.host, serve.port);
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding dev server to {bind}"))?;
    let addr = listener.local_addr().context("reading dev server address")?;

    info!("dev server listening on http://{addr}/");

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "dev server stopped");
        }
    });

    Ok(addr)
}

/// SSE endpoint: one `reload` message per finished clean rebuild.
async fn reload_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.reload_tx.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(()) => Some((Ok(Event::default().data("reload")), rx)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // A browser that missed reloads only needs one more.
                debug!(skipped, "reload subscriber lagged");
                Some((Ok(Event::default().data("reload")), rx))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Serve a file from the output directory.
async fn serve_asset(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(path) = resolve_request_path(&state.out_dir, uri.path()) else {
        return (StatusCode::BAD_REQUEST, "invalid path").into_response();
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(path = ?path, error = %err, "asset not found");
            return (StatusCode::NOT_FOUND, "not found").into_response();
        }
    };

    let content_type = content_type_for(&path);

    if content_type == "text/html" {
        // Inject the live-reload snippet into pages as they are served; the
        // files on disk stay byte-identical to the build output.
        let page = match String::from_utf8(bytes) {
            Ok(page) => inject_reload_snippet(&page),
            Err(err) => {
                warn!(path = ?path, error = %err, "HTML page is not valid UTF-8; serving raw");
                return serve_bytes(content_type, err.into_bytes());
            }
        };
        return serve_bytes(content_type, page.into_bytes());
    }

    serve_bytes(content_type, bytes)
}

fn serve_bytes(content_type: &'static str, bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
}

/// Map a request path to a file under `out_dir`.
///
/// Rejects traversal components; `/` and directory paths resolve to their
/// `index.html`.
fn resolve_request_path(out_dir: &Path, request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');

    let rel = Path::new(trimmed);
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return None,
        }
    }

    let mut path = out_dir.join(rel);
    if trimmed.is_empty() || path.is_dir() {
        path = path.join("index.html");
    }
    Some(path)
}

/// Insert the reload snippet before `</body>`, or append it when the page
/// has no closing body tag.
fn inject_reload_snippet(page: &str) -> String {
    match page.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(page.len() + RELOAD_SNIPPET.len());
            out.push_str(&page[..idx]);
            out.push_str(RELOAD_SNIPPET);
            out.push_str(&page[idx..]);
            out
        }
        None => {
            let mut out = page.to_string();
            out.push_str(RELOAD_SNIPPET);
            out
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}
