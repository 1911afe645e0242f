/// Path component every discovered service serves its description under
pub const SWAGGER_DOCUMENT: &str = "swagger.json";

/// Scheme used when fetching service descriptions
pub const FETCH_SCHEME: &str = "http";

/// Base path stripped from publish paths to form served routes
pub const DISCOVERY_BASE_PATH: &str = "discover";

/// Headers applied to every served spec
pub const SPEC_CONTENT_TYPE: &str = "application/json";
pub const SPEC_CACHE_CONTROL: &str = "public, max-age=259200";
