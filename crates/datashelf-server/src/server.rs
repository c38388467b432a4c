//! HTTP server implementation using Axum.

use crate::handlers::{
    get_dataset, get_dataset_file, handle_health, handle_not_found, list_datasets,
    publish_dataset,
};
use crate::response::envelope_timeout;
use axum::{extract::DefaultBodyLimit, middleware::map_response, routing::get, Router};
use datashelf_core::{DatasetCatalog, UploadConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

/// Application state shared across handlers.
pub struct AppState {
    pub catalog: DatasetCatalog,
    /// Body limit in bytes, reported back when an upload exceeds it.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(catalog: DatasetCatalog, options: &ServerOptions) -> Self {
        Self {
            catalog,
            max_upload_bytes: options.max_upload_bytes,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub max_upload_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: UploadConfig::MAX_UPLOAD_BYTES,
            request_timeout: UploadConfig::REQUEST_TIMEOUT,
        }
    }
}

/// Build the router with all dataset routes and middleware.
pub fn build_router(state: Arc<AppState>, options: &ServerOptions) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Audit log of every request
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(handle_health))
        .route("/datasets", get(list_datasets))
        .route("/datasets/:id", get(get_dataset).put(publish_dataset))
        .route("/datasets/:id/:path", get(get_dataset_file))
        .fallback(handle_not_found)
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(map_response(envelope_timeout))
        .layer(cors)
        .layer(trace)
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    catalog: DatasetCatalog,
    options: ServerOptions,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState::new(catalog, &options));
    let app = build_router(state, &options);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use datashelf_core::PublisherConfig;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "datashelf-test-boundary";

    fn publisher() -> PublisherConfig {
        PublisherConfig {
            cloud_name: "cloud".to_string(),
            creator_uuid: "creator-uuid".to_string(),
            creator_name: "creator".to_string(),
        }
    }

    fn test_app(temp_dir: &TempDir, index: &str) -> Router {
        test_app_with(temp_dir, index, ServerOptions::default())
    }

    fn test_app_with(temp_dir: &TempDir, index: &str, options: ServerOptions) -> Router {
        std::fs::write(temp_dir.path().join("datasets.json"), index).unwrap();
        let catalog = DatasetCatalog::open(temp_dir.path(), publisher()).unwrap();
        build_router(Arc::new(AppState::new(catalog, &options)), &options)
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file_name, content) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            let disposition = match file_name {
                Some(file_name) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    name, file_name
                ),
                None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", name),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn put_request(id: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(format!("/datasets/{}", id))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const MANIFEST: &[u8] =
        br#"{"uuid":"abc-123","name":"n","version":"1.0.0","files":[{"path":"f.txt"}]}"#;

    #[tokio::test]
    async fn test_server_starts() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("datasets.json"), "[]").unwrap();
        let catalog = DatasetCatalog::open(temp_dir.path(), publisher()).unwrap();

        let addr = start_server(catalog, ServerOptions::default(), "127.0.0.1", 0)
            .await
            .unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_health() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, "[]");
        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_list_datasets() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(
            &temp_dir,
            r#"[{"uuid": "a", "name": "x"}, {"uuid": "b", "name": "y"}]"#,
        );

        let response = app.clone().oneshot(get_request("/datasets")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);

        let response = app.oneshot(get_request("/datasets?name=y")).await.unwrap();
        assert_eq!(json_body(response).await, json!([{"uuid": "b", "name": "y"}]));
    }

    #[tokio::test]
    async fn test_get_missing_dataset_is_404_with_id() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, "[]");

        let response = app.oneshot(get_request("/datasets/nope-42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["code"], json!(404));
        assert!(body["message"].as_str().unwrap().contains("nope-42"));
    }

    #[tokio::test]
    async fn test_file_not_found_messages_differ() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, r#"[{"uuid": "a", "files": [{"path": "f.txt"}]}]"#);

        let unlisted = app
            .clone()
            .oneshot(get_request("/datasets/a/g.txt"))
            .await
            .unwrap();
        let missing = app.oneshot(get_request("/datasets/a/f.txt")).await.unwrap();
        assert_eq!(unlisted.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_ne!(
            json_body(unlisted).await["message"],
            json_body(missing).await["message"]
        );
    }

    #[tokio::test]
    async fn test_publish_and_download() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, "[]");

        let response = app
            .clone()
            .oneshot(put_request(
                "abc-123",
                &[
                    ("manifest", Some("manifest.json"), MANIFEST),
                    ("f.txt", Some("f.txt"), b"file bytes"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record = json_body(response).await;
        assert_eq!(record["urn"], json!("cloud:creator:n:1.0.0"));

        let response = app
            .oneshot(get_request("/datasets/abc-123/f.txt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"file bytes");
    }

    #[tokio::test]
    async fn test_publish_with_bad_manifest_keeps_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, "[]");

        let response = app
            .oneshot(put_request(
                "abc-123",
                &[
                    ("manifest", Some("manifest.json"), b"{broken"),
                    ("f.txt", Some("f.txt"), b"file bytes"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Error parsing manifest file"));
        assert!(!temp_dir.path().join("abc-123").exists());
    }

    #[tokio::test]
    async fn test_publish_mismatch_is_400() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, "[]");

        let response = app
            .oneshot(put_request(
                "different",
                &[("manifest", Some("manifest.json"), MANIFEST)],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = json_body(response).await["message"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(message.contains("different"));
        assert!(message.contains("abc-123"));
    }

    #[tokio::test]
    async fn test_publish_without_manifest_is_400() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, "[]");

        let response = app
            .oneshot(put_request("abc-123", &[("f.txt", Some("f.txt"), b"x")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["message"],
            json!("Missing manifest for dataset 'abc-123'")
        );
    }

    #[tokio::test]
    async fn test_publish_manifest_as_plain_field() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, "[]");

        let response = app
            .oneshot(put_request("abc-123", &[("manifest", None, MANIFEST)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_publish_without_multipart_body_is_500() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, "[]");

        let request = Request::builder()
            .method("PUT")
            .uri("/datasets/abc-123")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(MANIFEST))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = json_body(response).await["message"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(message.starts_with("Error parsing form"));
    }

    #[tokio::test]
    async fn test_unknown_route_has_envelope() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir, "[]");
        let response = app.oneshot(get_request("/nothing/here")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], json!(404));
    }

    #[tokio::test]
    async fn test_oversized_upload_names_the_limit() {
        let temp_dir = TempDir::new().unwrap();
        let options = ServerOptions {
            max_upload_bytes: 64,
            ..ServerOptions::default()
        };
        let app = test_app_with(&temp_dir, "[]", options);

        let large = vec![b'x'; 4096];
        let response = app
            .oneshot(put_request(
                "abc-123",
                &[
                    ("manifest", Some("manifest.json"), MANIFEST),
                    ("f.txt", Some("f.txt"), &large[..]),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = json_body(response).await["message"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(message.starts_with("Error parsing form"));
        assert!(message.contains("64 bytes"));
        assert!(!temp_dir.path().join("abc-123").exists());
        assert!(std::fs::read_dir(temp_dir.path().join(".staging"))
            .unwrap()
            .next()
            .is_none());
    }

    #[tokio::test]
    async fn test_stalled_upload_times_out_with_envelope() {
        let temp_dir = TempDir::new().unwrap();
        let options = ServerOptions {
            request_timeout: Duration::from_millis(50),
            ..ServerOptions::default()
        };
        let app = test_app_with(&temp_dir, "[]", options);

        // The writer half stays open, so the body never completes
        let (_writer, reader) = tokio::io::duplex(64);
        let request = Request::builder()
            .method("PUT")
            .uri("/datasets/abc-123")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from_stream(tokio_util::io::ReaderStream::new(reader)))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            json_body(response).await,
            json!({"code": 408, "message": "Request timed out"})
        );
    }
}
