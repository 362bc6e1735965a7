//! Remote store for exposure objects
//!
//! [`ExposureStore`] is everything the reconciler needs from the cluster.
//! [`KubeStore`] implements it over the Kubernetes API; tests use in-memory
//! fakes.

use crate::error::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

/// get/create/update/delete for Services and Ingresses, plus pod listing
#[async_trait]
pub trait ExposureStore: Send + Sync {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, StoreError>;

    async fn create_service(&self, namespace: &str, service: &Service)
        -> Result<Service, StoreError>;

    async fn update_service(&self, namespace: &str, service: &Service)
        -> Result<Service, StoreError>;

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, StoreError>;

    async fn create_ingress(&self, namespace: &str, ingress: &Ingress)
        -> Result<Ingress, StoreError>;

    async fn update_ingress(&self, namespace: &str, ingress: &Ingress)
        -> Result<Ingress, StoreError>;

    async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    /// Pods in `namespace` matching `label_selector` (`key=value,...`)
    async fn list_pods(&self, namespace: &str, label_selector: &str)
        -> Result<Vec<Pod>, StoreError>;
}

/// Kubernetes API backed store
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn ingresses(&self, namespace: &str) -> Api<Ingress> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map API 404 to [`StoreError::NotFound`], keep everything else
fn store_error(kind: &'static str, namespace: &str, name: &str, error: kube::Error) -> StoreError {
    match error {
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        e => StoreError::Kubernetes(e),
    }
}

#[async_trait]
impl ExposureStore for KubeStore {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, StoreError> {
        self.services(namespace)
            .get(name)
            .await
            .map_err(|e| store_error("Service", namespace, name, e))
    }

    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, StoreError> {
        self.services(namespace)
            .create(&PostParams::default(), service)
            .await
            .map_err(|e| store_error("Service", namespace, &service.name_any(), e))
    }

    async fn update_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, StoreError> {
        let name = service.name_any();
        self.services(namespace)
            .replace(&name, &PostParams::default(), service)
            .await
            .map_err(|e| store_error("Service", namespace, &name, e))
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.services(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| store_error("Service", namespace, name, e))
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, StoreError> {
        self.ingresses(namespace)
            .get(name)
            .await
            .map_err(|e| store_error("Ingress", namespace, name, e))
    }

    async fn create_ingress(
        &self,
        namespace: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, StoreError> {
        self.ingresses(namespace)
            .create(&PostParams::default(), ingress)
            .await
            .map_err(|e| store_error("Ingress", namespace, &ingress.name_any(), e))
    }

    async fn update_ingress(
        &self,
        namespace: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, StoreError> {
        let name = ingress.name_any();
        self.ingresses(namespace)
            .replace(&name, &PostParams::default(), ingress)
            .await
            .map_err(|e| store_error("Ingress", namespace, &name, e))
    }

    async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.ingresses(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| store_error("Ingress", namespace, name, e))
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, StoreError> {
        debug!("Listing pods in {} matching {}", namespace, label_selector);

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        pods.list(&ListParams::default().labels(label_selector))
            .await
            .map(|list| list.items)
            .map_err(|e| store_error("Pod", namespace, label_selector, e))
    }
}
