use std::time::Duration;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use shared::protocol::{FETCH_SCHEME, SWAGGER_DOCUMENT};
use crate::error::FetchError;
use crate::openapi::SpecDocument;

/// Resolves a `host:port` to the description that service publishes.
#[async_trait]
pub trait SpecSource: Send + Sync {
    async fn load(&self, location: &str) -> Result<SpecDocument, FetchError>;
}

/// Fetches `http://<host:port>/swagger.json` with a bounded timeout.
#[derive(Clone)]
pub struct HttpSpecFetcher {
    http: Client,
}

impl HttpSpecFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http })
    }

    pub fn spec_url(location: &str) -> String {
        format!("{}://{}/{}", FETCH_SCHEME, location, SWAGGER_DOCUMENT)
    }
}

fn request_error(url: &str, source: reqwest::Error) -> FetchError {
    if source.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else {
        FetchError::Request { url: url.to_string(), source }
    }
}

#[async_trait]
impl SpecSource for HttpSpecFetcher {
    async fn load(&self, location: &str) -> Result<SpecDocument, FetchError> {
        if location.is_empty() {
            return Err(FetchError::EmptyLocation);
        }

        let url = Self::spec_url(location);
        tracing::debug!("apiLoader location: {}", url);

        let response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status: status.as_u16() });
        }

        let body = response.bytes().await.map_err(|e| request_error(&url, e))?;

        SpecDocument::analyze(&body).map_err(|reason| FetchError::Analysis { url, reason })
    }
}
