use reqwest::Client;
use serde_json::Value;
use crate::error::PolicyLoadError;
use crate::openapi::SpecDocument;

/// Where the rewrite policy lives: a local JSON/YAML file or an http(s) URL.
/// It is re-read at the start of every discovery cycle.
#[derive(Clone)]
pub struct PolicySource {
    location: String,
    http: Client,
}

impl PolicySource {
    pub fn new(location: impl Into<String>, http: Client) -> Self {
        Self {
            location: location.into(),
            http,
        }
    }

    fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }

    pub async fn load(&self) -> Result<SpecDocument, PolicyLoadError> {
        let text = if self.is_remote() {
            self.fetch().await?
        } else {
            tokio::fs::read_to_string(&self.location)
                .await
                .map_err(|source| PolicyLoadError::Read {
                    location: self.location.clone(),
                    source,
                })?
        };

        parse_policy(&text).map_err(|reason| PolicyLoadError::Parse {
            location: self.location.clone(),
            reason,
        })
    }

    async fn fetch(&self) -> Result<String, PolicyLoadError> {
        let fail = |reason: String| PolicyLoadError::Fetch {
            location: self.location.clone(),
            reason,
        };

        let response = self
            .http
            .get(&self.location)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("status {}", status)));
        }

        response.text().await.map_err(|e| fail(e.to_string()))
    }
}

/// YAML is a superset of JSON, so one parser covers both encodings.
fn parse_policy(text: &str) -> Result<SpecDocument, String> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    SpecDocument::from_fragment(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use axum::{routing::get, Router};
    use crate::test_support::serve;

    const POLICY_YAML: &str = r#"
securityDefinitions:
  oauth:
    type: oauth2
    flow: implicit
    authorizationUrl: https://auth.example.com/authorize
security:
  - oauth: [read]
schemes: [https]
X-Custom: kept
"#;

    fn policy_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_yaml_file() {
        let file = policy_file(POLICY_YAML);
        let source = PolicySource::new(file.path().to_string_lossy(), Client::new());

        let policy = source.load().await.unwrap();
        assert!(policy.security_definitions.contains_key("oauth"));
        assert_eq!(policy.security[0]["oauth"], vec!["read"]);
        assert_eq!(policy.schemes, vec!["https"]);
        assert_eq!(policy.extensions.get_str("X-Custom"), Some("kept"));
    }

    #[tokio::test]
    async fn test_load_json_file() {
        let file = policy_file(r#"{"schemes": ["https"], "x-logo": {"url": "logo.png"}}"#);
        let source = PolicySource::new(file.path().to_string_lossy(), Client::new());

        let policy = source.load().await.unwrap();
        assert_eq!(policy.schemes, vec!["https"]);
        assert!(policy.extensions.get("x-logo").is_some());
    }

    #[tokio::test]
    async fn test_load_from_url() {
        let app = Router::new().route("/rewrites.yaml", get(|| async { POLICY_YAML }));
        let host = serve(app).await;
        let source = PolicySource::new(format!("http://{}/rewrites.yaml", host), Client::new());
        assert!(source.is_remote());

        let policy = source.load().await.unwrap();
        assert_eq!(policy.schemes, vec!["https"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = PolicySource::new("/nonexistent/rewrites.yaml", Client::new());
        assert!(matches!(source.load().await, Err(PolicyLoadError::Read { .. })));
    }

    #[tokio::test]
    async fn test_malformed_policy() {
        let file = policy_file("schemes: [https\n  : :");
        let source = PolicySource::new(file.path().to_string_lossy(), Client::new());
        assert!(matches!(source.load().await, Err(PolicyLoadError::Parse { .. })));

        let scalar = policy_file("just a string");
        let source = PolicySource::new(scalar.path().to_string_lossy(), Client::new());
        assert!(matches!(source.load().await, Err(PolicyLoadError::Parse { .. })));
    }
}
