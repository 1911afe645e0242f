//! Boundary to whatever watches the cluster's service registry.
//!
//! A watcher pushes [`RegistryEvent`]s into a channel until cancelled; the
//! discoverer drains that channel one event at a time. After announcing its
//! initial listing a watcher sends [`RegistryEvent::Synced`] once.

pub mod static_registry;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use anyhow::Result;
use shared::event::Event;
use shared::types::{Deployment, Service};

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Service(Event<Service>),
    Deployment(Event<Deployment>),
    /// Every entity present at startup has been announced.
    Synced,
}

#[async_trait]
pub trait RegistryWatcher: Send + 'static {
    async fn run(
        self: Box<Self>,
        tx: mpsc::Sender<RegistryEvent>,
        cancel: CancellationToken,
    ) -> Result<()>;
}
