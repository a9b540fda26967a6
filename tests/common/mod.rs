#![allow(dead_code)]

use axum::body::Body;
use dashmap::DashMap;
use http::{header, Method, Request};
use o2paris::config::hash_password;
use o2paris::db;
use o2paris::models::pinpoint::{CreatePinpoint, Pinpoint};
use o2paris::models::sound::Sound;
use o2paris::player::beep::{synthesize, BeepConfig};
use o2paris::routes;
use o2paris::state::AppState;
use sqlx::SqlitePool;
use std::sync::{Arc, OnceLock};

pub const ADMIN_PASSWORD: &str = "fontaine-wallace";

/// Argon2 is slow in debug builds; hash once per test binary.
fn admin_password_hash() -> Arc<str> {
    static HASH: OnceLock<String> = OnceLock::new();
    Arc::from(
        HASH.get_or_init(|| hash_password(ADMIN_PASSWORD).expect("failed to hash password"))
            .as_str(),
    )
}

/// Test server that owns an in-memory SQLite pool and full AppState.
/// Each instance is isolated, safe for parallel tests.
pub struct TestServer {
    pub state: AppState,
}

impl TestServer {
    /// Create a new TestServer with an in-memory SQLite database.
    pub async fn new() -> Self {
        let pool = db::create_pool("sqlite::memory:")
            .await
            .expect("failed to create test pool");

        let state = AppState {
            db: pool,
            admin_password_hash: Some(admin_password_hash()),
            trust_forwarded_for: false,
            rate_limits: Arc::new(DashMap::new()),
        };

        Self { state }
    }

    /// A server with admin login disabled.
    pub async fn without_admin() -> Self {
        let mut server = Self::new().await;
        server.state.admin_password_hash = None;
        server
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    /// Returns a reference to the underlying SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.state.db
    }

    /// Binds a TCP listener on port 0, spawns the server, and returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
            )
            .await
            .unwrap();
        });
        format!("http://127.0.0.1:{}", addr.port())
    }

    /// Issue an admin session directly and return the `Authorization` value.
    pub async fn admin_auth(&self) -> String {
        let (token, _) = db::auth::issue_token(self.pool())
            .await
            .expect("failed to issue admin token");
        format!("Bearer {token}")
    }

    pub async fn create_pinpoint(&self, title: &str, sound_url: &str) -> Pinpoint {
        db::pinpoints::create_pinpoint(
            self.pool(),
            &CreatePinpoint {
                latitude: 48.8566,
                longitude: 2.3522,
                title: title.to_string(),
                description: None,
                sound_url: sound_url.to_string(),
                icon: None,
            },
        )
        .await
        .expect("failed to create test pinpoint")
    }

    /// Store a short synthesized WAV and return its metadata.
    pub async fn create_wav_sound(&self, filename: &str) -> Sound {
        db::sounds::create_sound(self.pool(), filename, "audio/wav", &wav_bytes())
            .await
            .expect("failed to create test sound")
    }
}

/// A valid 300 ms WAV file.
pub fn wav_bytes() -> Vec<u8> {
    synthesize(&BeepConfig::default())
        .expect("failed to synthesize wav")
        .bytes
}

// ---------------------------------------------------------------------------
// Request builder helpers
// ---------------------------------------------------------------------------

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build an authenticated request with no body.
pub fn authenticated_request(method: Method, uri: &str, auth_header: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, auth_header)
        .body(Body::empty())
        .unwrap()
}

/// Build an authenticated request with a JSON body.
pub fn authenticated_json_request(
    method: Method,
    uri: &str,
    auth_header: &str,
    body: &serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, auth_header)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Build an unauthenticated request with a JSON body.
pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Build an authenticated `multipart/form-data` upload with a single `file` part.
pub fn multipart_upload(
    uri: &str,
    auth_header: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let boundary = "o2paris-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, auth_header)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Parse a response body into a `serde_json::Value`.
pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Assert the response carries the full set of no-store directives.
pub fn assert_no_store(response: &axum::response::Response) {
    let headers = response.headers();
    let cache_control = headers
        .get(header::CACHE_CONTROL)
        .expect("missing cache-control")
        .to_str()
        .unwrap();
    assert!(
        cache_control.contains("no-store") && cache_control.contains("max-age=0"),
        "unexpected cache-control: {cache_control}"
    );
    assert_eq!(headers.get(header::PRAGMA).unwrap(), "no-cache");
    assert_eq!(headers.get(header::EXPIRES).unwrap(), "0");
    assert_eq!(headers.get("cdn-cache-control").unwrap(), "no-store");
    assert_eq!(headers.get("surrogate-control").unwrap(), "no-store");
}

pub async fn test_app() -> axum::Router {
    let server = TestServer::new().await;
    routes::router(server.state)
}
