use std::collections::HashMap;
use std::sync::Mutex;
use async_trait::async_trait;
use axum::Router;
use crate::error::FetchError;
use crate::openapi::fetch::SpecSource;
use crate::openapi::SpecDocument;

pub const PETSTORE: &str = r#"{
    "swagger": "2.0",
    "info": {"title": "Petstore", "version": "1.0.0"},
    "host": "petstore.internal",
    "tags": [{"name": "pets"}],
    "paths": {
        "/pets": {
            "get": {"operationId": "listPets", "tags": ["pets"]},
            "delete": {"operationId": "purgePets", "x-visibility": "private"}
        },
        "/internal/metrics": {"x-visibility": "private", "get": {}}
    },
    "definitions": {
        "Pet": {"type": "object"},
        "AuditRecord": {"type": "object", "x-visibility": "private"}
    },
    "x-mcmp-component-type": "public-cloud"
}"#;

/// Serve `app` on an ephemeral local port and return its `host:port`.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

/// In-memory spec source keyed by `host:port`. Unknown locations fail
/// like a missing document would.
#[derive(Default)]
pub struct StubSource {
    docs: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn with(self, location: &str, body: &str) -> Self {
        self.set(location, body);
        self
    }

    pub fn set(&self, location: &str, body: &str) {
        self.docs.lock().unwrap().insert(location.to_string(), body.to_string());
    }

    pub fn clear(&self) {
        self.docs.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpecSource for StubSource {
    async fn load(&self, location: &str) -> Result<SpecDocument, FetchError> {
        self.calls.lock().unwrap().push(location.to_string());

        let url = format!("http://{}/swagger.json", location);
        let body = self.docs.lock().unwrap().get(location).cloned();
        match body {
            Some(body) => SpecDocument::analyze(body.as_bytes())
                .map_err(|reason| FetchError::Analysis { url, reason }),
            None => Err(FetchError::Status { url, status: 404 }),
        }
    }
}
