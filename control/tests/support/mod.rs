//! Test support: in-memory ExposureStore and pod fixtures

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use common::{APP_NAME_ANNOTATION, GUID_LABEL, ROUTES_ANNOTATION};
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::ErrorResponse;
use kube::ResourceExt;
use podgress::apis::pods::store::ExposureStore;
use podgress::error::StoreError;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

type Key = (String, String);

#[derive(Default)]
struct State {
    services: BTreeMap<Key, Service>,
    ingresses: BTreeMap<Key, Ingress>,
    pods: Vec<Pod>,
    calls: Vec<String>,
    failing: HashSet<String>,
    next_version: u64,
}

/// In-memory store recording every call; operations can be made to fail
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn api_error(code: u16, message: &str) -> StoreError {
    StoreError::Kubernetes(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: "Test".to_string(),
        code,
    }))
}

fn not_found(kind: &'static str, namespace: &str, name: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn matches_selector(pod: &Pod, selector: &str) -> bool {
    let labels = pod.labels();
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels.get(k).map(String::as_str) == Some(v),
            None => false,
        })
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `operation` (e.g. `get_service`) fail with a 500
    pub fn fail(&self, operation: &str) {
        self.state.lock().unwrap().failing.insert(operation.to_string());
    }

    pub fn add_pod(&self, pod: Pod) {
        self.state.lock().unwrap().pods.push(pod);
    }

    pub fn remove_pod(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .pods
            .retain(|pod| pod.name_any() != name);
    }

    pub fn insert_service(&self, service: Service) {
        let k = key(&service.namespace().unwrap_or_default(), &service.name_any());
        self.state.lock().unwrap().services.insert(k, service);
    }

    pub fn insert_ingress(&self, ingress: Ingress) {
        let k = key(&ingress.namespace().unwrap_or_default(), &ingress.name_any());
        self.state.lock().unwrap().ingresses.insert(k, ingress);
    }

    pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
        self.state.lock().unwrap().services.get(&key(namespace, name)).cloned()
    }

    pub fn ingress(&self, namespace: &str, name: &str) -> Option<Ingress> {
        self.state.lock().unwrap().ingresses.get(&key(namespace, name)).cloned()
    }

    /// Calls made so far, as `operation namespace/name`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Record the call and fail it if requested
    fn enter(&self, operation: &str, namespace: &str, name: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{} {}/{}", operation, namespace, name));
        if state.failing.contains(operation) {
            return Err(api_error(500, &format!("{} failed", operation)));
        }
        Ok(())
    }

    fn bump_version(&self) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_version += 1;
        state.next_version.to_string()
    }
}

#[async_trait]
impl ExposureStore for FakeStore {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, StoreError> {
        self.enter("get_service", namespace, name)?;
        self.service(namespace, name)
            .ok_or_else(|| not_found("Service", namespace, name))
    }

    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, StoreError> {
        let name = service.name_any();
        self.enter("create_service", namespace, &name)?;
        if self.service(namespace, &name).is_some() {
            return Err(api_error(409, "already exists"));
        }
        let mut created = service.clone();
        created.metadata.resource_version = Some(self.bump_version());
        self.state
            .lock()
            .unwrap()
            .services
            .insert(key(namespace, &name), created.clone());
        Ok(created)
    }

    async fn update_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, StoreError> {
        let name = service.name_any();
        self.enter("update_service", namespace, &name)?;
        if self.service(namespace, &name).is_none() {
            return Err(not_found("Service", namespace, &name));
        }
        self.state
            .lock()
            .unwrap()
            .services
            .insert(key(namespace, &name), service.clone());
        Ok(service.clone())
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.enter("delete_service", namespace, name)?;
        self.state
            .lock()
            .unwrap()
            .services
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| not_found("Service", namespace, name))
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, StoreError> {
        self.enter("get_ingress", namespace, name)?;
        self.ingress(namespace, name)
            .ok_or_else(|| not_found("Ingress", namespace, name))
    }

    async fn create_ingress(
        &self,
        namespace: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, StoreError> {
        let name = ingress.name_any();
        self.enter("create_ingress", namespace, &name)?;
        if self.ingress(namespace, &name).is_some() {
            return Err(api_error(409, "already exists"));
        }
        let mut created = ingress.clone();
        created.metadata.resource_version = Some(self.bump_version());
        self.state
            .lock()
            .unwrap()
            .ingresses
            .insert(key(namespace, &name), created.clone());
        Ok(created)
    }

    async fn update_ingress(
        &self,
        namespace: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, StoreError> {
        let name = ingress.name_any();
        self.enter("update_ingress", namespace, &name)?;
        if self.ingress(namespace, &name).is_none() {
            return Err(not_found("Ingress", namespace, &name));
        }
        self.state
            .lock()
            .unwrap()
            .ingresses
            .insert(key(namespace, &name), ingress.clone());
        Ok(ingress.clone())
    }

    async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.enter("delete_ingress", namespace, name)?;
        self.state
            .lock()
            .unwrap()
            .ingresses
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| not_found("Ingress", namespace, name))
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, StoreError> {
        self.enter("list_pods", namespace, label_selector)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .pods
            .iter()
            .filter(|pod| pod.namespace().as_deref() == Some(namespace))
            .filter(|pod| matches_selector(pod, label_selector))
            .cloned()
            .collect())
    }
}

/// Pod of application `app` (guid `<app>-guid`) in namespace `apps`
pub fn app_pod(app: &str, pod_name: &str, routes: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(pod_name.to_string()),
            namespace: Some("apps".to_string()),
            labels: Some(BTreeMap::from([(
                GUID_LABEL.to_string(),
                format!("{}-guid", app),
            )])),
            annotations: Some(BTreeMap::from([
                (APP_NAME_ANNOTATION.to_string(), app.to_string()),
                (ROUTES_ANNOTATION.to_string(), routes.to_string()),
            ])),
            ..Default::default()
        },
        ..Default::default()
    }
}
