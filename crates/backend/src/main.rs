mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{extract::State, response::Html, routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;

const FALLBACK_INDEX: &str = r#"<!DOCTYPE html>
<html>
<head><title>Polygon Tools</title></head>
<body>
<h1>Polygon Tools</h1>
<p>Frontend not built yet. Run <code>dx build --release</code> in <code>crates/frontend</code> and copy the output to the dist directory.</p>
</body>
</html>"#;

/// Build a cache-controlled static file router.
///
/// Separated so tests can exercise the caching layer with arbitrary directories.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Location of the bundle's entry page.
#[derive(Clone)]
struct IndexPage(Arc<PathBuf>);

/// Build the full application router.
fn build_app(config: &ServerConfig) -> Router {
    // Static file routers are stateless, so merge them before adding app state
    let static_files = Router::new()
        .nest(
            "/static",
            cached_static_router(&config.assets_dir, CACHE_1DAY),
        )
        .nest(
            "/dist",
            cached_static_router(&config.dist_dir, CACHE_IMMUTABLE),
        )
        .nest(
            "/assets",
            cached_static_router(&config.dist_dir.join("assets"), CACHE_IMMUTABLE),
        );

    let index = IndexPage(Arc::new(config.dist_dir.join("index.html")));

    Router::new()
        .route("/", get(serve_index))
        .with_state(index)
        .merge(static_files)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

async fn serve_index(State(IndexPage(path)): State<IndexPage>) -> Html<String> {
    // Serve the built frontend, or a placeholder until it exists
    match tokio::fs::read_to_string(path.as_path()).await {
        Ok(html) => Html(html),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Frontend bundle missing, serving fallback page");
            Html(FALLBACK_INDEX.to_string())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        dist = %config.dist_dir.display(),
        assets = %config.assets_dir.display(),
        "Serving polygon tools"
    );

    let app = build_app(&config);
    let addr = format!("0.0.0.0:{}", config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("Server running at http://localhost:{}", config.port);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Create a temp dir with a test file and return the dir path.
    fn temp_dir_with_file(file_name: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(file_name), content).unwrap();
        dir
    }

    /// A dist dir holding `index.html`, a hashed bundle and an `assets/` subdir.
    fn dist_dir() -> tempfile::TempDir {
        let dir = temp_dir_with_file("index.html", "<html>workbench</html>");
        std::fs::write(dir.path().join("app-abc123.js"), "bundle()").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/main-xyz.css"), "body{}").unwrap();
        dir
    }

    fn test_app(assets_dir: &Path, dist_dir: &Path) -> Router {
        build_app(&ServerConfig {
            port: 0,
            dist_dir: dist_dir.to_path_buf(),
            assets_dir: assets_dir.to_path_buf(),
        })
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_static_assets_have_1day_cache() {
        let assets_dir = temp_dir_with_file("sample.zip", "PK");
        let dist = dist_dir();

        let resp = get(test_app(assets_dir.path(), dist.path()), "/static/sample.zip").await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("cache-control").unwrap(),
            "public, max-age=86400, must-revalidate"
        );
    }

    #[tokio::test]
    async fn test_dist_bundles_have_immutable_cache() {
        let assets_dir = temp_dir_with_file("sample.zip", "PK");
        let dist = dist_dir();

        let resp = get(test_app(assets_dir.path(), dist.path()), "/dist/app-abc123.js").await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("cache-control").unwrap(),
            "public, max-age=31536000, immutable"
        );
    }

    #[tokio::test]
    async fn test_dist_assets_have_immutable_cache() {
        let assets_dir = temp_dir_with_file("sample.zip", "PK");
        let dist = dist_dir();

        let resp = get(test_app(assets_dir.path(), dist.path()), "/assets/main-xyz.css").await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("cache-control").unwrap(),
            "public, max-age=31536000, immutable"
        );
    }

    #[tokio::test]
    async fn test_missing_static_file_returns_404() {
        let assets_dir = temp_dir_with_file("sample.zip", "PK");
        let dist = dist_dir();

        let resp = get(test_app(assets_dir.path(), dist.path()), "/static/nonexistent.txt").await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_and_dist_have_different_cache_policies() {
        let assets_dir = temp_dir_with_file("data.json", "{}");
        let dist = dist_dir();
        let app = test_app(assets_dir.path(), dist.path());

        let static_resp = get(app.clone(), "/static/data.json").await;
        let dist_resp = get(app, "/dist/app-abc123.js").await;

        let static_cc = static_resp
            .headers()
            .get("cache-control")
            .unwrap()
            .to_str()
            .unwrap();
        let dist_cc = dist_resp
            .headers()
            .get("cache-control")
            .unwrap()
            .to_str()
            .unwrap();

        assert_ne!(static_cc, dist_cc);
        assert!(static_cc.contains("max-age=86400"));
        assert!(dist_cc.contains("max-age=31536000"));
    }

    #[tokio::test]
    async fn test_index_serves_built_bundle() {
        let assets_dir = temp_dir_with_file("sample.zip", "PK");
        let dist = dist_dir();

        let resp = get(test_app(assets_dir.path(), dist.path()), "/").await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "<html>workbench</html>");
    }

    #[tokio::test]
    async fn test_index_falls_back_without_bundle() {
        let assets_dir = temp_dir_with_file("sample.zip", "PK");
        let empty_dist = tempfile::tempdir().unwrap();

        let resp = get(test_app(assets_dir.path(), empty_dist.path()), "/").await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("Frontend not built yet"));
    }
}
