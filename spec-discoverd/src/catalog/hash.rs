use std::collections::BTreeMap;
use sha2::{Digest, Sha256};
use shared::types::Service;

/// SHA-256 over the catalog's services, sorted by hostname so the digest
/// does not depend on map iteration order.
pub fn compute_hash(services: &[Service]) -> String {
    let mut sorted: Vec<&Service> = services.iter().collect();
    sorted.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    let mut hasher = Sha256::new();
    for svc in sorted {
        match serde_json::to_vec(svc) {
            Ok(bytes) => hasher.update(&bytes),
            Err(e) => tracing::warn!("Skipping {} in catalog hash: {}", svc.hostname, e),
        }
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// SHA-256 over a published spec set. `BTreeMap` iteration is ordered.
pub fn specs_hash(specs: &BTreeMap<String, Vec<u8>>) -> String {
    let mut hasher = Sha256::new();
    for (path, data) in specs {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(data);
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
