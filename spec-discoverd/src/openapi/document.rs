//! Structured view of a Swagger/OpenAPI description.
//!
//! Only the parts discovery rewrites are modelled as fields. Everything else
//! (info, host, parameters, responses, ...) is carried in each object's
//! [`Extensions`] map so that a document survives parse and serialize intact.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Vendor extension key marking a path, operation or definition as hidden.
pub const VISIBILITY_EXT: &str = "x-visibility";
pub const PRIVATE: &str = "private";

fn is_vendor_key(key: &str) -> bool {
    key.get(..2).map_or(false, |p| p.eq_ignore_ascii_case("x-"))
}

/// Vendor extensions plus any unmodelled members of the owning object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(Map<String, Value>);

impl Extensions {
    /// Exact-case lookup of a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Normalizing write: the key is lower-cased before insertion.
    pub fn add(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_lowercase(), value.into());
    }

    /// Verbatim write: the key keeps its exact case.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Entries whose key carries the `x-` vendor prefix (any case).
    pub fn vendor(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter().filter(|(k, _)| is_vendor_key(k))
    }

    pub fn is_private(&self) -> bool {
        self.get_str(VISIBILITY_EXT) == Some(PRIVATE)
    }
}

/// Map of API paths. Keys with a vendor prefix are extensions of the
/// paths object itself rather than path items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Paths {
    pub items: BTreeMap<String, PathItem>,
    pub extensions: Extensions,
}

impl TryFrom<Map<String, Value>> for Paths {
    type Error = serde_json::Error;

    fn try_from(raw: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut paths = Paths::default();
        for (key, value) in raw {
            if is_vendor_key(&key) {
                paths.extensions.insert(key, value);
            } else {
                paths.items.insert(key, serde_json::from_value(value)?);
            }
        }
        Ok(paths)
    }
}

impl From<Paths> for Map<String, Value> {
    fn from(paths: Paths) -> Self {
        let mut out = paths.extensions.0;
        for (key, item) in paths.items {
            // PathItem holds only JSON values; to_value does not fail
            if let Ok(value) = serde_json::to_value(item) {
                out.insert(key, value);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "operationId", default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(flatten)]
    pub extensions: Extensions,
}

pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swagger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Paths>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Schema>,
    #[serde(rename = "securityDefinitions", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub security_definitions: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl SpecDocument {
    /// Structural analysis of a fetched payload: it must be a JSON object
    /// declaring a `swagger` or `openapi` version, with well-shaped members.
    pub fn analyze(bytes: &[u8]) -> Result<Self, String> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

        let obj = value.as_object().ok_or("document is not a JSON object")?;
        let versioned = ["swagger", "openapi"]
            .iter()
            .any(|k| obj.get(*k).map(Value::is_string).unwrap_or(false));
        if !versioned {
            return Err("document declares neither a swagger nor an openapi version".to_string());
        }

        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    /// Parse a spec fragment, such as a rewrite policy, which need not
    /// carry a version.
    pub fn from_fragment(value: Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err("fragment is not a mapping".to_string());
        }
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    /// Canonical serialization: compact JSON with object keys sorted.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        serde_json::to_vec(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PETSTORE: &str = r#"{
        "swagger": "2.0",
        "info": {"title": "Petstore", "version": "1.0.0"},
        "host": "petstore.default:8080",
        "tags": [{"name": "pets", "description": "Everything about pets"}],
        "paths": {
            "x-paths-ext": true,
            "/pets": {
                "parameters": [],
                "get": {
                    "operationId": "listPets",
                    "tags": ["pets"],
                    "responses": {"200": {"description": "ok"}}
                },
                "post": {"operationId": "createPet", "x-visibility": "private"}
            }
        },
        "definitions": {"Pet": {"type": "object"}},
        "x-mcmp-component-type": "public-cloud"
    }"#;

    #[test]
    fn test_analyze_models_known_members() {
        let doc = SpecDocument::analyze(PETSTORE.as_bytes()).unwrap();
        assert_eq!(doc.swagger.as_deref(), Some("2.0"));
        assert_eq!(doc.tags[0].name, "pets");
        assert_eq!(doc.extensions.get_str("x-mcmp-component-type"), Some("public-cloud"));

        let paths = doc.paths.as_ref().unwrap();
        assert_eq!(paths.items.len(), 1);
        assert_eq!(paths.extensions.get("x-paths-ext"), Some(&json!(true)));

        let pets = &paths.items["/pets"];
        assert_eq!(pets.get.as_ref().unwrap().operation_id.as_deref(), Some("listPets"));
        assert!(pets.post.as_ref().unwrap().extensions.is_private());
    }

    #[test]
    fn test_unmodelled_members_survive_serialization() {
        let doc = SpecDocument::analyze(PETSTORE.as_bytes()).unwrap();
        let out: Value = serde_json::from_slice(&doc.to_canonical_json().unwrap()).unwrap();
        let original: Value = serde_json::from_str(PETSTORE).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_analyze_rejects_malformed() {
        assert!(SpecDocument::analyze(b"not json").is_err());
        assert!(SpecDocument::analyze(b"[1, 2]").is_err());
        assert!(SpecDocument::analyze(br#"{"info": {}}"#).is_err());
        assert!(SpecDocument::analyze(br#"{"swagger": "2.0", "paths": []}"#).is_err());
        assert!(SpecDocument::analyze(br#"{"openapi": "3.0.0"}"#).is_ok());
    }

    #[test]
    fn test_visibility_is_exact() {
        let mut ext = Extensions::default();
        assert!(!ext.is_private());

        ext.insert("x-visibility", json!("Private"));
        assert!(!ext.is_private());

        ext.insert("X-Visibility", json!("private"));
        assert!(!ext.is_private());

        ext.insert("x-visibility", json!("private"));
        assert!(ext.is_private());
    }

    #[test]
    fn test_add_normalizes_insert_preserves() {
        let mut ext = Extensions::default();
        ext.add("X-GroupBy", "a");
        ext.insert("X-Custom", json!("b"));

        assert_eq!(ext.get_str("x-groupby"), Some("a"));
        assert_eq!(ext.get_str("X-GroupBy"), None);
        assert_eq!(ext.get_str("X-Custom"), Some("b"));
        assert_eq!(ext.get_str("x-custom"), None);
    }

    #[test]
    fn test_vendor_filters_prefix() {
        let mut ext = Extensions::default();
        ext.insert("info", json!({}));
        ext.insert("x-a", json!(1));
        ext.insert("X-B", json!(2));

        let keys: Vec<&str> = ext.vendor().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["X-B", "x-a"]);
    }
}
