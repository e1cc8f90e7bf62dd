//! HTTP dispatcher
//!
//! Maps request paths to files under the site directory. Markdown files go
//! through the render pipeline; everything else is served statically. The
//! core components are shared across all worker tasks through the state.

use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    Router,
};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::cache::{FileCache, NotifyWatcher};
use crate::content::MarkdownFile;
use crate::error::Error;
use crate::render::PageRenderer;
use crate::template::TemplateResolver;
use crate::MdServe;

/// Shared server state
struct ServerState {
    app: MdServe,
    cache: Arc<FileCache>,
    renderer: PageRenderer,
}

/// Start the server
pub async fn start(app: &MdServe) -> Result<()> {
    let notifier = Arc::new(NotifyWatcher::new()?);
    let cache = Arc::new(FileCache::new(notifier));
    let resolver = TemplateResolver::new(Arc::clone(&cache), app.site_dir.clone());
    let renderer = PageRenderer::new(resolver);

    let state = Arc::new(ServerState {
        app: app.clone(),
        cache,
        renderer,
    });

    let router = Router::new().fallback(dispatch).with_state(state);

    // Handle "localhost" specially for binding
    let bind_ip = if app.config.ip == "localhost" {
        "127.0.0.1"
    } else {
        app.config.ip.as_str()
    };
    let addr: SocketAddr = format!("{}:{}", bind_ip, app.config.port).parse()?;

    println!(
        "Server running at http://{}:{}",
        app.config.ip, app.config.port
    );
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Fallback handler: route to the Markdown pipeline or static serving
async fn dispatch(State(state): State<Arc<ServerState>>, request: Request<Body>) -> Response {
    let decoded = percent_decode_str(request.uri().path())
        .decode_utf8_lossy()
        .to_string();
    let file_path = map_request_path(&state.app, &decoded);

    if !state.app.config.is_markdown(&file_path) {
        // Static file; ServeDir rejects traversal on its own
        let mut service = ServeDir::new(&state.app.site_dir);
        return match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        };
    }

    if decoded.split('/').any(|c| c == "..") {
        return error_response(Error::NotFound(file_path));
    }

    let download = wants_download(request.uri().query());

    // The pipeline does synchronous file reads
    let result =
        tokio::task::spawn_blocking(move || handle_markdown(&state, &file_path, download)).await;

    match result {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            tracing::error!("render task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Serve a Markdown file: raw download or rendered page
fn handle_markdown(
    state: &ServerState,
    path: &Path,
    download: bool,
) -> Result<Response, Error> {
    let file = MarkdownFile::load(path, &state.cache)?;

    if download {
        if !state.app.config.allow_download {
            tracing::warn!("download of {} refused by configuration", path.display());
            return Err(Error::AccessDenied(path.to_path_buf()));
        }
        return Ok((
            [
                (header::CONTENT_TYPE, "text/markdown; charset=UTF-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", file.file_name),
                ),
            ],
            file.content.to_string(),
        )
            .into_response());
    }

    if !file.is_published() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let html = state
        .renderer
        .render_page(&file, &state.app.template_path, &state.app.config.root)?;
    let status = StatusCode::from_u16(file.status_code()).unwrap_or(StatusCode::OK);

    Ok((status, Html(html)).into_response())
}

/// Map a decoded URL path to a file under the site directory
fn map_request_path(app: &MdServe, uri_path: &str) -> PathBuf {
    let clean = uri_path.trim_start_matches('/');
    let candidate = app.site_dir.join(clean);

    if clean.is_empty() || clean.ends_with('/') || candidate.is_dir() {
        candidate.join(&app.config.index)
    } else {
        candidate
    }
}

/// Whether the request asks for the original file (`?download=1`);
/// the parameter must carry a value
fn wants_download(query: Option<&str>) -> bool {
    query
        .map(|q| {
            q.split('&')
                .any(|pair| matches!(pair.split_once('='), Some(("download", v)) if !v.is_empty()))
        })
        .unwrap_or(false)
}

/// Map the error taxonomy onto response statuses
fn error_response(err: Error) -> Response {
    match err {
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "File not found").into_response(),
        Error::AccessDenied(_) => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
        Error::InvalidTemplate(msg) => {
            tracing::error!("template error: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "Invalid template").into_response()
        }
        Error::Io { path, source } => {
            tracing::error!("io error on {}: {}", path.display(), source);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::FakeNotifier;
    use crate::cache::ChangeNotifier;
    use crate::config::ServerConfig;
    use std::fs;
    use tempfile::TempDir;

    fn state_for(dir: &TempDir, config: ServerConfig) -> ServerState {
        let site_dir = dir.path().to_path_buf();
        let template_path = site_dir.join(&config.template);
        let app = MdServe {
            config,
            base_dir: site_dir.clone(),
            site_dir: site_dir.clone(),
            template_path,
        };
        let notifier = Arc::new(FakeNotifier::new());
        let cache = Arc::new(FileCache::new(notifier as Arc<dyn ChangeNotifier>));
        let resolver = TemplateResolver::new(Arc::clone(&cache), site_dir);
        ServerState {
            app,
            cache: Arc::clone(&cache),
            renderer: PageRenderer::new(resolver),
        }
    }

    fn write_site(dir: &TempDir) {
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::write(
            dir.path().join("templates/layout.html"),
            "<html><title>{{title}}</title>{{content}}</html>",
        )
        .unwrap();
        fs::write(dir.path().join("index.md"), "---\ntitle: Home\n---\n# Welcome\n").unwrap();
    }

    #[test]
    fn test_wants_download() {
        assert!(wants_download(Some("download=1")));
        assert!(wants_download(Some("a=b&download=yes")));
        assert!(!wants_download(Some("download=")));
        assert!(!wants_download(Some("download")));
        assert!(!wants_download(Some("a=b")));
        assert!(!wants_download(None));
    }

    #[test]
    fn test_map_request_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        let state = state_for(&dir, ServerConfig::default());

        assert_eq!(
            map_request_path(&state.app, "/a.md"),
            dir.path().join("a.md")
        );
        assert_eq!(
            map_request_path(&state.app, "/"),
            dir.path().join("index.md")
        );
        assert_eq!(
            map_request_path(&state.app, "/docs"),
            dir.path().join("docs/index.md")
        );
        assert_eq!(
            map_request_path(&state.app, "/docs/"),
            dir.path().join("docs/index.md")
        );
    }

    #[test]
    fn test_rendered_page_response() {
        let dir = TempDir::new().unwrap();
        write_site(&dir);
        let state = state_for(&dir, ServerConfig::default());

        let response = handle_markdown(&state, &dir.path().join("index.md"), false).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_unpublished_is_not_found() {
        let dir = TempDir::new().unwrap();
        write_site(&dir);
        fs::write(dir.path().join("draft.md"), "---\npublished: false\n---\nwip").unwrap();
        let state = state_for(&dir, ServerConfig::default());

        let err = handle_markdown(&state, &dir.path().join("draft.md"), false).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_custom_status_code_passes_through() {
        let dir = TempDir::new().unwrap();
        write_site(&dir);
        fs::write(
            dir.path().join("missing.md"),
            "---\nstatus_code: 404\n---\nNot here",
        )
        .unwrap();
        let state = state_for(&dir, ServerConfig::default());

        let response = handle_markdown(&state, &dir.path().join("missing.md"), false).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_download_disabled_is_denied() {
        let dir = TempDir::new().unwrap();
        write_site(&dir);
        let state = state_for(&dir, ServerConfig::default());

        let err = handle_markdown(&state, &dir.path().join("index.md"), true).unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));
    }

    #[test]
    fn test_download_enabled_serves_raw_text() {
        let dir = TempDir::new().unwrap();
        write_site(&dir);
        let config = ServerConfig {
            allow_download: true,
            ..Default::default()
        };
        let state = state_for(&dir, config);

        let response = handle_markdown(&state, &dir.path().join("index.md"), true).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("text/markdown"));
        assert!(response
            .headers()
            .contains_key(header::CONTENT_DISPOSITION));
    }

    #[test]
    fn test_error_statuses() {
        let not_found = error_response(Error::NotFound(PathBuf::from("/x")));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let denied = error_response(Error::AccessDenied(PathBuf::from("/x")));
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let invalid = error_response(Error::InvalidTemplate("bad".to_string()));
        assert_eq!(invalid.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
