//! Test harness: the full router over in-memory storage and a scripted model.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use grounding::testing::MockAI;
use grounding::{GroundingPipeline, MemoryStore, RecordStore, AI};
use serde_json::Value;
use server_core::kernel::ServerDeps;
use server_core::server::build_app;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub deps: ServerDeps,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_ai(MockAI::new())
    }

    pub fn with_ai(ai: MockAI) -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let ai: Arc<dyn AI> = Arc::new(ai);
        let knowledge_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("knowledge");
        let deps = ServerDeps::new(GroundingPipeline::new(store, ai), None, knowledge_dir);
        Self {
            router: build_app(deps.clone(), &[]),
            deps,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    /// Seed from the bundled knowledge files.
    pub async fn seed(&self) -> Value {
        let (status, body) = self.post("/api/v1/knowledge/seed", Value::Null).await;
        assert_eq!(status, StatusCode::OK, "seed failed: {}", body);
        body
    }
}
