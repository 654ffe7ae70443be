#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use evently::auth::{AuthConfig, AuthService};
use evently::config::{Config, FileConfig};
use evently::generation::GeminiClient;
use evently::model::InMemoryDb;
use evently::routes::{router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const GEMINI_KEY: &str = "test-key";
pub const GEMINI_MODEL: &str = "gemini-test";

/// Config pointing the Gemini client at `gemini_root` (e.g. a mock server)
pub fn test_config(gemini_root: &str) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("GEMINI_API_KEY", GEMINI_KEY.to_string()),
        ("JWT_SECRET", JWT_SECRET.to_string()),
        ("GEMINI_MODEL", GEMINI_MODEL.to_string()),
        ("GEMINI_BASE_URL", format!("{}/v1beta", gemini_root)),
    ]);
    Config::from_sources(|key| vars.get(key).cloned(), FileConfig::default())
        .expect("test config should load")
}

/// Router over an in-memory store plus a token minter sharing its secret
pub struct TestApp {
    pub app: Router,
    pub auth: Arc<AuthService>,
}

impl TestApp {
    pub fn new(gemini_root: &str) -> Self {
        let config = test_config(gemini_root);
        let auth = Arc::new(AuthService::new(AuthConfig::from_config(&config)));
        let state = AppState {
            auth_service: auth.clone(),
            db: Arc::new(InMemoryDb::default()),
            generator: Arc::new(GeminiClient::new(&config).expect("client should build")),
        };

        Self {
            app: router(state),
            auth,
        }
    }

    /// App whose generator points at an unroutable address
    pub fn offline() -> Self {
        Self::new("http://127.0.0.1:9")
    }

    pub fn token(&self, user_id: &str, email: &str) -> String {
        self.auth
            .issue_token(user_id, Some(email))
            .expect("token should be issued")
    }

    /// Send a request and return the status and parsed JSON body.
    /// Non-JSON bodies come back as a JSON string; empty bodies as null.
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.app.clone().oneshot(req).await.expect("router is infallible");
        let status = res.status();
        let bytes = res
            .into_body()
            .collect()
            .await
            .expect("body should be readable")
            .to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(request(method, uri, token, body)).await
    }
}

/// Build a request with an optional bearer token and JSON body
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}
