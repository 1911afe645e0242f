use std::collections::BTreeMap;
use std::sync::Arc;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use shared::event::Event;
use shared::types::{Deployment, Service};
use crate::catalog::hash::specs_hash;
use crate::catalog_manager::CatalogHandle;
use crate::openapi::fetch::SpecSource;
use crate::openapi::policy::PolicySource;
use crate::openapi::SpecDocument;
use crate::registry::{RegistryEvent, RegistryWatcher};
use crate::transform::Pipeline;

/// Hostname substrings that are never discovered.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<String>,
}

impl IgnoreList {
    /// Empty patterns are dropped: an empty substring would match every host.
    pub fn new(patterns: impl IntoIterator<Item = String>) -> Self {
        Self {
            patterns: patterns.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.patterns.iter().any(|p| hostname.contains(p.as_str()))
    }
}

/// The set of transformed specs currently on offer, keyed by publish path.
#[derive(Debug, Clone, Default)]
pub struct PublishedSpecs {
    specs: BTreeMap<String, Vec<u8>>,
    fingerprint: String,
    generated_at: Option<DateTime<Utc>>,
}

impl PublishedSpecs {
    pub fn new(specs: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            fingerprint: specs_hash(&specs),
            specs,
            generated_at: Some(Utc::now()),
        }
    }

    #[cfg(test)]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.specs.get(path).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.specs.iter()
    }

    pub fn paths(&self) -> Vec<String> {
        self.specs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }
}

/// Background tasks started by [`Discoverer::run`].
pub struct DiscoveryTasks {
    pub watcher: JoinHandle<()>,
    pub events: JoinHandle<()>,
}

impl DiscoveryTasks {
    pub async fn join(self) {
        let _ = tokio::join!(self.watcher, self.events);
    }
}

/// Keeps the catalog in step with the registry and re-runs discovery on
/// every change. Every event triggers a full cycle; events are not coalesced.
pub struct Discoverer {
    catalog: CatalogHandle,
    source: Arc<dyn SpecSource>,
    policy: Option<PolicySource>,
    pipeline: Pipeline,
    ignore: IgnoreList,
    published: ArcSwap<PublishedSpecs>,
    cycle: Mutex<()>,
    stop: CancellationToken,
}

impl Discoverer {
    pub fn new(
        catalog: CatalogHandle,
        source: Arc<dyn SpecSource>,
        policy: Option<PolicySource>,
        pipeline: Pipeline,
        ignore: IgnoreList,
    ) -> Self {
        tracing::info!("initializing new discoverer instance");

        Self {
            catalog,
            source,
            policy,
            pipeline,
            ignore,
            published: ArcSwap::from_pointee(PublishedSpecs::default()),
            cycle: Mutex::new(()),
            stop: CancellationToken::new(),
        }
    }

    /// Current published set. Always a complete set from a single cycle.
    pub fn specs(&self) -> Arc<PublishedSpecs> {
        self.published.load_full()
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    /// Starts delivering registry events in the background, waits until the
    /// watcher's initial listing is in the catalog, then runs one discovery
    /// cycle before returning.
    pub async fn run(self: &Arc<Self>, watcher: Box<dyn RegistryWatcher>) -> DiscoveryTasks {
        let (tx, mut rx) = mpsc::channel(256);
        let (synced_tx, synced_rx) = oneshot::channel();

        let watcher_cancel = self.stop.clone();
        let watcher = tokio::spawn(async move {
            if let Err(e) = watcher.run(tx, watcher_cancel).await {
                tracing::error!("Registry watcher error: {}", e);
            }
        });

        let this = Arc::clone(self);
        let events = tokio::spawn(async move {
            let mut synced_tx = Some(synced_tx);
            loop {
                tokio::select! {
                    event = rx.recv() => match event {
                        Some(RegistryEvent::Synced) => {
                            tracing::info!("Registry initial sync complete");
                            if let Some(synced) = synced_tx.take() {
                                let _ = synced.send(());
                            }
                        }
                        Some(event) => this.handle_event(event).await,
                        None => break,
                    },
                    _ = this.stop.cancelled() => break,
                }
            }
            tracing::info!("Discovery event loop stopped");
        });

        // A watcher that stops before syncing drops the sender
        tokio::select! {
            _ = synced_rx => {}
            _ = self.stop.cancelled() => {}
        }
        self.discover().await;

        DiscoveryTasks { watcher, events }
    }

    /// Stops event delivery. Meant to be called once.
    pub fn shutdown(&self) {
        self.stop.cancel();
        tracing::info!("shutting down discovery process");
    }

    pub async fn handle_event(&self, event: RegistryEvent) {
        match event {
            RegistryEvent::Service(event) => self.update_services(event).await,
            RegistryEvent::Deployment(event) => self.update_deployments(event).await,
            RegistryEvent::Synced => {}
        }
    }

    async fn update_services(&self, event: Event<Service>) {
        let kind = event.kind();
        tracing::debug!("(Discover Handler) Service: {} Event: {}", event.entity(), kind);

        if self.ignore.contains(&event.entity().hostname) {
            tracing::debug!("{} service is blacklisted", event.entity().hostname);
            return;
        }

        let result = match event {
            Event::Add(svc) | Event::Update(svc) => self.catalog.insert_service(svc).await,
            Event::Delete(svc) => self.catalog.delete_service(svc).await,
        };
        if let Err(e) = result {
            tracing::error!("Failed to apply service {} event: {}", kind, e);
            return;
        }

        self.discover().await;
    }

    async fn update_deployments(&self, event: Event<Deployment>) {
        let kind = event.kind();
        tracing::debug!("(Discover Handler) Deployment: {:?} Event: {}", event.entity(), kind);

        let result = match event {
            Event::Add(dpl) | Event::Update(dpl) => self.catalog.insert_deployment(dpl).await,
            Event::Delete(dpl) => self.catalog.delete_deployment(dpl).await,
        };
        if let Err(e) = result {
            tracing::error!("Failed to apply deployment {} event: {}", kind, e);
            return;
        }

        self.discover().await;
    }

    /// One discovery cycle. Cycles never overlap. A cycle that publishes
    /// nothing leaves the previous set in place.
    pub async fn discover(&self) {
        let _cycle = self.cycle.lock().await;

        let Some(specs) = self.fetch_api_specs().await else {
            return;
        };
        if specs.is_empty() {
            tracing::debug!("no API specs discovered, keeping previous set");
            return;
        }

        let published = PublishedSpecs::new(specs);
        tracing::info!(
            specs = published.len(),
            fingerprint = %published.fingerprint(),
            "successfully processed API changes"
        );
        self.published.store(Arc::new(published));
    }

    /// Returns `None` when the rewrite policy cannot be loaded.
    async fn fetch_api_specs(&self) -> Option<BTreeMap<String, Vec<u8>>> {
        let policy = match &self.policy {
            Some(source) => match source.load().await {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::error!("unable to load rewrites, abandoning cycle: {}", e);
                    return None;
                }
            },
            None => None,
        };

        let services = match self.catalog.list_services().await {
            Ok(services) => services,
            Err(e) => {
                tracing::error!("Failed to list catalog services: {}", e);
                return None;
            }
        };

        let mut specs = BTreeMap::new();
        for service in services {
            if service.hostname.is_empty() || self.ignore.contains(&service.hostname) {
                tracing::warn!("invalid service {:?}", service.hostname);
                continue;
            }

            for port in service.http_ports() {
                let location = format!("{}:{}", service.hostname, port.port);
                let loaded = self.load_one(&service.hostname, &location, policy.as_ref()).await;
                if let Some((path, data)) = loaded {
                    specs.insert(path, data);
                }
            }
        }

        Some(specs)
    }

    async fn load_one(
        &self,
        hostname: &str,
        location: &str,
        policy: Option<&SpecDocument>,
    ) -> Option<(String, Vec<u8>)> {
        let doc = match self.source.load(location).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(kind = e.kind(), "unable to load specs for {}: {}", location, e);
                return None;
            }
        };

        match self.pipeline.process(hostname, policy, doc) {
            Ok(processed) => Some((processed.path, processed.data)),
            Err(e) => {
                tracing::error!("unable to process specs for {}: {}", location, e);
                None
            }
        }
    }
}
