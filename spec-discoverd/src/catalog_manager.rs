use std::thread;
use tokio::sync::{mpsc, oneshot, watch};
use anyhow::Result;
use shared::types::{Deployment, Service};
use crate::catalog::{hash, store::{DeploymentMap, ServiceMap}};

/// Commands sent to the catalog thread
pub enum CatalogCommand {
    InsertService(Service, oneshot::Sender<bool>),
    DeleteService(Service, oneshot::Sender<bool>),
    ListServices(oneshot::Sender<Vec<Service>>),
    InsertDeployment(Deployment, oneshot::Sender<bool>),
    DeleteDeployment(Deployment, oneshot::Sender<bool>),
    ListDeployments(oneshot::Sender<Vec<Deployment>>),
    Shutdown,
}

/// Handle to the catalog. The maps are owned by a single thread that
/// applies commands one at a time, so every list is a consistent snapshot.
#[derive(Clone)]
pub struct CatalogHandle {
    tx: mpsc::Sender<CatalogCommand>,
}

impl CatalogHandle {
    /// Spawn the catalog thread with empty maps. The service fingerprint is
    /// published on `hash_tx` after every change to the service map.
    pub fn spawn(hash_tx: watch::Sender<String>) -> Self {
        let (tx, mut rx) = mpsc::channel::<CatalogCommand>(256);

        let recompute_hash = |services: &ServiceMap, hash_tx: &watch::Sender<String>| {
            let _ = hash_tx.send(hash::compute_hash(&services.list()));
        };

        thread::spawn(move || {
            let mut services = ServiceMap::new();
            let mut deployments = DeploymentMap::new();

            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    CatalogCommand::InsertService(service, reply) => {
                        let changed = services.insert(service);
                        if changed {
                            recompute_hash(&services, &hash_tx);
                        }
                        let _ = reply.send(changed);
                    }
                    CatalogCommand::DeleteService(service, reply) => {
                        let changed = services.delete(&service);
                        if changed {
                            recompute_hash(&services, &hash_tx);
                        }
                        let _ = reply.send(changed);
                    }
                    CatalogCommand::ListServices(reply) => {
                        let _ = reply.send(services.list());
                    }
                    CatalogCommand::InsertDeployment(deployment, reply) => {
                        let _ = reply.send(deployments.insert(deployment));
                    }
                    CatalogCommand::DeleteDeployment(deployment, reply) => {
                        let _ = reply.send(deployments.delete(&deployment));
                    }
                    CatalogCommand::ListDeployments(reply) => {
                        let _ = reply.send(deployments.list());
                    }
                    CatalogCommand::Shutdown => {
                        tracing::info!(
                            "Catalog thread shutting down with {} services, {} deployments",
                            services.len(),
                            deployments.len()
                        );
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Insert or overwrite a service. Returns true if data changed.
    pub async fn insert_service(&self, service: Service) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(CatalogCommand::InsertService(service, reply)).await?;
        Ok(rx.await?)
    }

    /// Remove a service by hostname. Returns true if it was present.
    pub async fn delete_service(&self, service: Service) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(CatalogCommand::DeleteService(service, reply)).await?;
        Ok(rx.await?)
    }

    /// Snapshot of all services
    pub async fn list_services(&self) -> Result<Vec<Service>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(CatalogCommand::ListServices(reply)).await?;
        Ok(rx.await?)
    }

    pub async fn insert_deployment(&self, deployment: Deployment) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(CatalogCommand::InsertDeployment(deployment, reply)).await?;
        Ok(rx.await?)
    }

    pub async fn delete_deployment(&self, deployment: Deployment) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(CatalogCommand::DeleteDeployment(deployment, reply)).await?;
        Ok(rx.await?)
    }

    pub async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(CatalogCommand::ListDeployments(reply)).await?;
        Ok(rx.await?)
    }

    /// Shutdown the catalog thread
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(CatalogCommand::Shutdown).await?;
        Ok(())
    }
}
