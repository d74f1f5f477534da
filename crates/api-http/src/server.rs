//! HTTP Server
//!
//! Binds the router to a TCP listener and serves until shutdown.

use crate::handler::{self, AppState};
use axum::routing::get;
use axum::Router;
use linkrelay_core::application::{DeliveryService, ShutdownToken};
use linkrelay_core::error::{AppError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
const DEFAULT_HTTP_PORT: u16 = 3000;

/// HTTP Server Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

pub fn build_router(delivery: Arc<DeliveryService>) -> Router {
    let state = AppState { delivery };
    Router::new()
        .route(
            "/{token}",
            get(handler::enqueue_root).post(handler::enqueue_root),
        )
        .route("/{token}/extension-poll", get(handler::poll))
        .route(
            "/api/{token}",
            get(handler::enqueue_legacy).post(handler::enqueue_legacy),
        )
        .route("/api/{token}/extension-poll", get(handler::poll))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP Server
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
}

impl HttpServer {
    pub async fn bind(config: &HttpServerConfig, delivery: Arc<DeliveryService>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            AppError::Config(format!("Failed to bind HTTP server to {}: {}", addr, e))
        })?;
        Ok(Self {
            listener,
            router: build_router(delivery),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` fires, then drain in-flight requests
    pub async fn run(self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(addr = %self.local_addr()?, "HTTP server listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use linkrelay_core::application::QueueStore;
    use linkrelay_core::domain::{QueueSettings, Token, TokenFormat};
    use linkrelay_core::port::sorted_set::memory::InMemorySortedSetStore;
    use linkrelay_core::port::time_provider::ManualTimeProvider;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BASE: &str = "https://relay.example";

    fn app_with(settings: QueueSettings) -> (Router, Token) {
        let clock = Arc::new(ManualTimeProvider::new(1_700_000_000_000));
        let sets = Arc::new(InMemorySortedSetStore::new(clock.clone()));
        let queue = Arc::new(QueueStore::new(sets, clock, settings));
        let format = TokenFormat::default();
        let token = format.generate();
        let delivery = Arc::new(DeliveryService::new(queue, format, BASE));
        (build_router(delivery), token)
    }

    fn app() -> (Router, Token) {
        app_with(QueueSettings::default())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_via_query_then_poll() {
        let (app, token) = app();

        let (status, body) = send(&app, get_req(&format!("/{}?link=example.com", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["queued"], 1);
        assert_eq!(body["links"], json!(["https://example.com/"]));
        assert_eq!(body["message"], "Queued one link to be opened in your browser.");
        assert_eq!(body["docs"]["hyperlink"], format!("{}/#{}", BASE, token));

        let (status, body) = send(&app, get_req(&format!("/{}/extension-poll", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true, "delivered": 1, "links": ["https://example.com/"]}));

        let (_, body) = send(&app, get_req(&format!("/{}/extension-poll", token))).await;
        assert_eq!(body["delivered"], 0);
    }

    #[tokio::test]
    async fn test_enqueue_via_json_body() {
        let (app, token) = app();
        let (status, body) = send(
            &app,
            post_json(&format!("/{}", token), json!({"links": ["a.com", "b.com"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["queued"], 2);
        assert_eq!(body["message"], "Queued 2 links to be opened in your browser.");
    }

    #[tokio::test]
    async fn test_repeated_and_bracketed_query_keys() {
        let (app, token) = app();
        let (_, body) = send(
            &app,
            get_req(&format!("/{}?link%5B%5D=a.com&link%5B%5D=b.com&links=c.com", token)),
        )
        .await;
        assert_eq!(body["queued"], 3);
    }

    #[tokio::test]
    async fn test_invalid_token_on_enqueue_has_bare_docs() {
        let (app, _) = app();
        let (status, body) = send(&app, get_req("/short?link=example.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], linkrelay_core::error::INVALID_TOKEN_MESSAGE);
        assert_eq!(body["docs"]["hyperlink"], BASE);
    }

    #[tokio::test]
    async fn test_invalid_token_on_poll_has_no_docs() {
        let (app, _) = app();
        let (status, body) = send(&app, get_req("/short/extension-poll")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"ok": false, "error": linkrelay_core::error::INVALID_TOKEN_MESSAGE})
        );
    }

    #[tokio::test]
    async fn test_missing_links_returns_examples() {
        let (app, token) = app();
        let (status, body) = send(&app, get_req(&format!("/{}", token))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["examples"].as_array().unwrap().len(), 2);
        assert!(body["docs"].is_object());
    }

    #[tokio::test]
    async fn test_quota_returns_429_with_limit() {
        let settings = QueueSettings {
            max_queue_size: 2,
            ..QueueSettings::default()
        };
        let (app, token) = app_with(settings);

        let (status, _) = send(&app, get_req(&format!("/{}?link=a.com,b.com", token))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, get_req(&format!("/{}?link=c.com", token))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["limit"], 2);
    }

    #[tokio::test]
    async fn test_legacy_routes() {
        let (app, token) = app();

        let (status, body) = send(&app, get_req(&format!("/api/{}?link=a.com", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Queued 1 link(s).");
        assert!(body.get("docs").is_none());

        let (_, body) = send(&app, get_req(&format!("/api/{}", token))).await;
        assert!(body["examples"][0]
            .as_str()
            .unwrap()
            .contains("/api/<SECRET>?link="));
        assert!(body.get("docs").is_none());

        let (_, body) = send(&app, get_req(&format!("/api/{}/extension-poll", token))).await;
        assert_eq!(body["links"], json!(["https://a.com/"]));
    }

    #[tokio::test]
    async fn test_server_binds_and_shuts_down() {
        let clock = Arc::new(ManualTimeProvider::new(0));
        let sets = Arc::new(InMemorySortedSetStore::new(clock.clone()));
        let queue = Arc::new(QueueStore::new(sets, clock, QueueSettings::default()));
        let delivery = Arc::new(DeliveryService::new(queue, TokenFormat::default(), BASE));

        let config = HttpServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        };
        let server = HttpServer::bind(&config, delivery).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let (tx, rx) = linkrelay_core::application::shutdown_channel();
        let handle = tokio::spawn(server.run(rx));
        tx.shutdown();
        handle.await.unwrap().unwrap();
    }
}
