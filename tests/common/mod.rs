#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use geogate::db::Database;
use geogate::mailer::{Mailer, Message};
use geogate::{ServerConfig, create_app};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Signing secret shared by every test app in this binary.
pub const TEST_SECRET: &[u8] = b"test-token-secret-which-is-long-enough";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub mailer: Mailer,
}

pub async fn setup() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let mailer = Mailer::recording();
    let config = ServerConfig {
        db: db.clone(),
        token_secret: TEST_SECRET.to_vec(),
        mailer: mailer.clone(),
    };
    TestApp {
        app: create_app(&config),
        db,
        mailer,
    }
}

impl TestApp {
    /// Drive one request through the router and decode the JSON body
    /// (Null for empty bodies).
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _headers, value) = self.request_full(method, uri, token, body).await;
        (status, value)
    }

    /// Like `request`, but also returns the response headers.
    pub async fn request_full(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };
        (status, headers, value)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            "/sign_up",
            None,
            Some(json!({
                "email": email,
                "password": password,
                "password_confirmation": password,
            })),
        )
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            "/sign_in",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Sign in and return the bearer token.
    pub async fn bearer(&self, email: &str, password: &str) -> String {
        let (status, body) = self.sign_in(email, password).await;
        assert_eq!(status, StatusCode::OK, "sign_in failed: {}", body);
        body["token"]
            .as_str()
            .expect("No token in sign_in response")
            .to_string()
    }

    /// The most recently queued outbound message.
    pub fn last_message(&self) -> Message {
        self.mailer
            .sent()
            .last()
            .cloned()
            .expect("No outbound messages queued")
    }
}
