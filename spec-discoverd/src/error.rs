use thiserror::Error;

/// Loading a single service's description failed. Isolated to one
/// `host:port`; the discovery cycle carries on without it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("api location has no value")]
    EmptyLocation,

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("document at {url} failed analysis: {reason}")]
    Analysis { url: String, reason: String },
}

impl FetchError {
    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::EmptyLocation => "empty_location",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Request { .. } => "request",
            FetchError::Status { .. } => "status",
            FetchError::Analysis { .. } => "analysis",
        }
    }
}

/// The shared rewrite policy could not be loaded. Aborts the whole cycle.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("unable to read rewrites from {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to fetch rewrites from {location}: {reason}")]
    Fetch { location: String, reason: String },

    #[error("unable to analyze rewrites from {location}: {reason}")]
    Parse { location: String, reason: String },
}

/// Transforming one document failed. Isolated to one service.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A caller broke the pipeline's input contract; not retried.
    #[error("contract violation: {0}")]
    Contract(&'static str),

    #[error("unable to marshal final spec: {0}")]
    Serialize(#[from] serde_json::Error),
}
