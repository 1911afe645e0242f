//! Sanitizes a fetched description before it is published.
//!
//! The steps run in a fixed order, each mutating the document in place:
//!
//! 1. drop private paths and operations
//! 2. drop private definitions
//! 3. set the `x-groupby` label
//! 4. apply the rewrite policy, if one was loaded this cycle

use std::collections::BTreeMap;
use crate::error::TransformError;
use crate::openapi::document::{Operation, PathItem};
use crate::openapi::SpecDocument;

pub const EXT_COMPONENT_TYPE: &str = "x-mcmp-component-type";
pub const EXT_GROUP_BY: &str = "x-groupby";

pub const GROUP_PRIVATE_CLOUD: &str = "Private Cloud Services";
pub const GROUP_PUBLIC_CLOUD: &str = "Public Cloud Services";
pub const GROUP_CORE: &str = "Platform APIs";

type OperationSlot = fn(&mut PathItem) -> &mut Option<Operation>;

/// Operations subject to per-method visibility checks.
const CHECKED_METHODS: [(&str, OperationSlot); 5] = [
    ("GET", |p| &mut p.get),
    ("PUT", |p| &mut p.put),
    ("PATCH", |p| &mut p.patch),
    ("POST", |p| &mut p.post),
    ("DELETE", |p| &mut p.delete),
];

/// A transformed document ready to be published.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSpec {
    pub path: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    spec_dir: String,
    groupings: BTreeMap<String, String>,
}

impl Pipeline {
    pub fn new(spec_dir: impl Into<String>, groupings: BTreeMap<String, String>) -> Self {
        Self {
            spec_dir: spec_dir.into(),
            groupings,
        }
    }

    /// `<spec-dir>/<hostname>`, tolerating a trailing slash on the directory.
    pub fn publish_path(&self, hostname: &str) -> String {
        format!("{}/{}", self.spec_dir.trim_end_matches('/'), hostname)
    }

    pub fn process(
        &self,
        hostname: &str,
        policy: Option<&SpecDocument>,
        mut doc: SpecDocument,
    ) -> Result<ProcessedSpec, TransformError> {
        if hostname.is_empty() {
            return Err(TransformError::Contract("hostname must not be empty"));
        }

        remove_private_apis(&mut doc);
        remove_private_definitions(&mut doc);
        apply_grouping(&mut doc, &self.groupings);
        if let Some(policy) = policy {
            apply_rewrites(policy, &mut doc);
        }

        let data = doc.to_canonical_json()?;
        Ok(ProcessedSpec {
            path: self.publish_path(hostname),
            data,
        })
    }
}

pub fn remove_private_apis(doc: &mut SpecDocument) {
    let Some(paths) = doc.paths.as_mut() else {
        tracing::warn!("no API paths defined");
        return;
    };

    paths.items.retain(|path, item| {
        if item.extensions.is_private() {
            tracing::debug!("removing private path {}", path);
            return false;
        }

        for (method, slot) in CHECKED_METHODS {
            let op = slot(item);
            if op.as_ref().is_some_and(|op| op.extensions.is_private()) {
                tracing::debug!("removing private operation {} {}", method, path);
                *op = None;
            }
        }
        true
    });
}

pub fn remove_private_definitions(doc: &mut SpecDocument) {
    doc.definitions.retain(|_, schema| !schema.extensions.is_private());
}

/// Sets `x-groupby` from the component type, then lets configured tag
/// groupings override it; the last matching tag wins.
pub fn apply_grouping(doc: &mut SpecDocument, groupings: &BTreeMap<String, String>) {
    let label = match doc.extensions.get_str(EXT_COMPONENT_TYPE) {
        Some("private-cloud") => GROUP_PRIVATE_CLOUD,
        Some("public-cloud") => GROUP_PUBLIC_CLOUD,
        _ => GROUP_CORE,
    };
    doc.extensions.add(EXT_GROUP_BY, label);

    for tag in &doc.tags {
        if let Some(group) = groupings.get(&tag.name) {
            doc.extensions.add(EXT_GROUP_BY, group.as_str());
        }
    }
}

/// Security definitions, security requirements and schemes are replaced
/// wholesale when the policy defines them. Vendor extensions are merged
/// key by key with their case untouched: downstream consumers look keys up
/// case-sensitively, so this must not go through `Extensions::add`.
pub fn apply_rewrites(policy: &SpecDocument, doc: &mut SpecDocument) {
    if !policy.security_definitions.is_empty() {
        doc.security_definitions = policy.security_definitions.clone();
    }

    if !policy.security.is_empty() {
        doc.security = policy.security.clone();
    }

    if !policy.schemes.is_empty() {
        doc.schemes = policy.schemes.clone();
    }

    for (key, value) in policy.extensions.vendor() {
        doc.extensions.insert(key.clone(), value.clone());
    }
}
