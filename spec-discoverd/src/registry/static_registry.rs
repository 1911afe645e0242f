use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use anyhow::Result;
use shared::event::Event;
use shared::types::{Deployment, Service};
use crate::config::{DiscoveryConfig, RegistryConfig};
use crate::registry::{RegistryEvent, RegistryWatcher};

/// Registry backed by the config file. Announces every entity in the watched
/// namespace once, then re-announces them as updates on each resync tick,
/// the way an informer's periodic resync does.
pub struct StaticRegistry {
    services: Vec<Service>,
    deployments: Vec<Deployment>,
    resync: Duration,
}

impl StaticRegistry {
    pub fn new(services: Vec<Service>, deployments: Vec<Deployment>, resync: Duration) -> Self {
        Self {
            services,
            deployments,
            resync,
        }
    }

    pub fn from_config(discovery: &DiscoveryConfig, registry: &RegistryConfig) -> Self {
        let watched =
            |namespace: &str| discovery.namespace.is_empty() || discovery.namespace == namespace;

        let services = registry
            .services
            .iter()
            .filter(|s| watched(s.namespace.as_str()))
            .map(|s| s.service.clone())
            .collect();

        let deployments = registry
            .deployments
            .iter()
            .filter(|d| watched(d.namespace.as_str()))
            .cloned()
            .collect();

        Self::new(services, deployments, discovery.resync_interval())
    }

    fn events(
        &self,
        make_service: fn(Service) -> Event<Service>,
        make_deployment: fn(Deployment) -> Event<Deployment>,
    ) -> Vec<RegistryEvent> {
        let services = self
            .services
            .iter()
            .cloned()
            .map(|s| RegistryEvent::Service(make_service(s)));
        let deployments = self
            .deployments
            .iter()
            .cloned()
            .map(|d| RegistryEvent::Deployment(make_deployment(d)));
        services.chain(deployments).collect()
    }
}

async fn send_all(tx: &mpsc::Sender<RegistryEvent>, events: Vec<RegistryEvent>) -> bool {
    for event in events {
        if tx.send(event).await.is_err() {
            return false;
        }
    }
    true
}

#[async_trait]
impl RegistryWatcher for StaticRegistry {
    async fn run(
        self: Box<Self>,
        tx: mpsc::Sender<RegistryEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        tracing::info!(
            "Starting static registry with {} services, {} deployments",
            self.services.len(),
            self.deployments.len()
        );

        let mut initial = self.events(Event::Add, Event::Add);
        initial.push(RegistryEvent::Synced);
        if !send_all(&tx, initial).await {
            tracing::warn!("Registry event receiver closed");
            return Ok(());
        }

        if self.resync.is_zero() {
            tracing::info!("Registry resync disabled");
            cancel.cancelled().await;
            return Ok(());
        }

        let start = tokio::time::Instant::now() + self.resync;
        let mut resync = tokio::time::interval_at(start, self.resync);

        loop {
            tokio::select! {
                _ = resync.tick() => {
                    tracing::debug!("Registry resync");
                    if !send_all(&tx, self.events(Event::Update, Event::Update)).await {
                        tracing::warn!("Registry event receiver closed");
                        break;
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::info!("Static registry shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
