//! Pod event reconciler
//!
//! Converges the Service and Ingress of an application on the state derived
//! from one pod event. Nothing is remembered between events: the cluster is
//! the only state, which keeps replayed events harmless.
//!
//! ## Flow
//!
//! 1. Extract the routing model from the pod; invalid models are skipped
//! 2. `Deleted`: list pods sharing the app GUID. Any left means scale-down,
//!    nothing is deleted. None left: delete Service, then Ingress
//! 3. `Added`/`Modified`: Service first, then Ingress. Each is fetched and
//!    patched, or created when missing. A failure on one does not stop the
//!    other
//!
//! Errors never leave [`PodReconciler::handle`]; they are logged and reflected
//! in the returned [`ReconcileOutcome`].

use crate::apis::metrics::{record_exposure_operation, record_pod_reconciliation};
use crate::apis::pods::store::ExposureStore;
use crate::error::StoreError;
use common::{MetaMap, RoutableApp, RouteHandler};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const SERVICE: &str = "Service";
const INGRESS: &str = "Ingress";

/// One pod lifecycle event
#[derive(Debug, Clone)]
pub enum PodEvent {
    Added(Pod),
    Modified(Pod),
    Deleted(Pod),
}

impl PodEvent {
    pub fn pod(&self) -> &Pod {
        match self {
            PodEvent::Added(pod) | PodEvent::Modified(pod) | PodEvent::Deleted(pod) => pod,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PodEvent::Added(_) => "added",
            PodEvent::Modified(_) => "modified",
            PodEvent::Deleted(_) => "deleted",
        }
    }
}

/// Labels, annotations and TLS toggle applied to every generated object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeInputs {
    pub labels: MetaMap,
    pub annotations: MetaMap,
    pub tls: bool,
}

/// Result of one operation on one exposure object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Created,
    Updated,
    Deleted,
    /// Delete found nothing to delete
    AlreadyAbsent,
    Failed,
}

/// What handling an event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Model invalid, no remote calls made
    Skipped,
    /// Service and Ingress created or updated
    Applied {
        service: StepResult,
        ingress: StepResult,
    },
    /// Other instances still run, exposure objects kept
    ScaledDown { remaining: usize },
    /// Last instance gone, exposure objects deleted
    Removed {
        service: StepResult,
        ingress: StepResult,
    },
    /// Pod listing failed, nothing deleted
    Aborted,
}

impl ReconcileOutcome {
    /// Metric label for this outcome
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Skipped => "skipped",
            ReconcileOutcome::Applied { service, ingress }
            | ReconcileOutcome::Removed { service, ingress } => {
                if *service == StepResult::Failed || *ingress == StepResult::Failed {
                    "partial"
                } else {
                    "success"
                }
            }
            ReconcileOutcome::ScaledDown { .. } => "scaled_down",
            ReconcileOutcome::Aborted => "aborted",
        }
    }
}

/// Builds a routing model from a pod
pub type Extractor<H> = fn(&Pod) -> H;

/// Label selector string (`k1=v1,k2=v2`) for a selector map
pub fn label_selector(selector: &MetaMap) -> String {
    selector
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Pod event reconciler
pub struct PodReconciler<S, H = RoutableApp> {
    store: S,
    merge: MergeInputs,
    extract: Extractor<H>,
}

impl<S: ExposureStore> PodReconciler<S, RoutableApp> {
    /// Reconciler using the annotation-based [`RoutableApp`] model
    pub fn new(store: S, merge: MergeInputs) -> Self {
        Self::with_extractor(store, merge, RoutableApp::from_pod)
    }
}

impl<S, H> PodReconciler<S, H>
where
    S: ExposureStore,
    H: RouteHandler + Send + Sync,
{
    pub fn with_extractor(store: S, merge: MergeInputs, extract: Extractor<H>) -> Self {
        Self {
            store,
            merge,
            extract,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn merge_inputs(&self) -> &MergeInputs {
        &self.merge
    }

    /// Handle one pod event
    pub async fn handle(&self, event: &PodEvent) -> ReconcileOutcome {
        let start = Instant::now();
        let pod = event.pod();
        let namespace = pod.namespace().unwrap_or_default();

        let app = (self.extract)(pod);
        let outcome = if !app.validate() {
            debug!(
                "Pod {}/{} has no routable app data, skipping",
                namespace,
                pod.name_any()
            );
            ReconcileOutcome::Skipped
        } else {
            debug!(
                "Handling {} pod {}/{} (first instance: {})",
                event.kind(),
                namespace,
                pod.name_any(),
                app.first_instance()
            );
            match event {
                PodEvent::Deleted(_) => self.remove(&namespace, &app).await,
                PodEvent::Added(_) | PodEvent::Modified(_) => self.apply(&namespace, &app).await,
            }
        };

        record_pod_reconciliation(
            &namespace,
            event.kind(),
            start.elapsed().as_secs_f64(),
            outcome.label(),
        );
        outcome
    }

    /// Delete both exposure objects once no instance of the app remains
    async fn remove(&self, namespace: &str, app: &H) -> ReconcileOutcome {
        let service = app.desired_service(&self.merge.labels, &self.merge.annotations);
        let selector = label_selector(
            &service
                .spec
                .as_ref()
                .and_then(|spec| spec.selector.clone())
                .unwrap_or_default(),
        );

        match self.store.list_pods(namespace, &selector).await {
            Ok(pods) if !pods.is_empty() => {
                info!(
                    "{} instance(s) of {}/{} still running, keeping Service and Ingress",
                    pods.len(),
                    namespace,
                    service.name_any()
                );
                return ReconcileOutcome::ScaledDown {
                    remaining: pods.len(),
                };
            }
            Ok(_) => {}
            Err(e) => {
                error!(
                    "Failed to list pods in {} matching {}: {}",
                    namespace, selector, e
                );
                return ReconcileOutcome::Aborted;
            }
        }

        let service_name = service.name_any();
        let service_result = delete_step(
            SERVICE,
            namespace,
            &service_name,
            self.store.delete_service(namespace, &service_name).await,
        );

        let ingress_name = app
            .desired_ingress(&self.merge.labels, &self.merge.annotations, self.merge.tls)
            .name_any();
        let ingress_result = delete_step(
            INGRESS,
            namespace,
            &ingress_name,
            self.store.delete_ingress(namespace, &ingress_name).await,
        );

        ReconcileOutcome::Removed {
            service: service_result,
            ingress: ingress_result,
        }
    }

    /// Create or patch Service, then Ingress
    async fn apply(&self, namespace: &str, app: &H) -> ReconcileOutcome {
        let service = self.apply_service(namespace, app).await;
        let ingress = self.apply_ingress(namespace, app).await;

        ReconcileOutcome::Applied { service, ingress }
    }

    async fn apply_service(&self, namespace: &str, app: &H) -> StepResult {
        let labels = &self.merge.labels;
        let annotations = &self.merge.annotations;
        let desired = app.desired_service(labels, annotations);
        let name = desired.name_any();

        match self.store.get_service(namespace, &name).await {
            Ok(mut existing) => {
                app.update_service(&mut existing, labels, annotations);
                let result = self.store.update_service(namespace, &existing).await;
                write_step(SERVICE, "update", namespace, &name, result)
            }
            Err(e) if e.is_not_found() => {
                let result = self.store.create_service(namespace, &desired).await;
                write_step(SERVICE, "create", namespace, &name, result)
            }
            Err(e) => {
                error!("Failed to get Service {}/{}: {}", namespace, name, e);
                record_exposure_operation(SERVICE, "get", "error");
                StepResult::Failed
            }
        }
    }

    async fn apply_ingress(&self, namespace: &str, app: &H) -> StepResult {
        let labels = &self.merge.labels;
        let annotations = &self.merge.annotations;
        let tls = self.merge.tls;
        let desired = app.desired_ingress(labels, annotations, tls);
        let name = desired.name_any();

        match self.store.get_ingress(namespace, &name).await {
            Ok(mut existing) => {
                app.update_ingress(&mut existing, labels, annotations, tls);
                let result = self.store.update_ingress(namespace, &existing).await;
                write_step(INGRESS, "update", namespace, &name, result)
            }
            Err(e) if e.is_not_found() => {
                let result = self.store.create_ingress(namespace, &desired).await;
                write_step(INGRESS, "create", namespace, &name, result)
            }
            Err(e) => {
                error!("Failed to get Ingress {}/{}: {}", namespace, name, e);
                record_exposure_operation(INGRESS, "get", "error");
                StepResult::Failed
            }
        }
    }
}

/// Log and record a create/update call
fn write_step<T>(
    kind: &str,
    operation: &str,
    namespace: &str,
    name: &str,
    result: Result<T, StoreError>,
) -> StepResult {
    match result {
        Ok(_) => {
            info!("{} {} {}/{}", past_tense(operation), kind, namespace, name);
            record_exposure_operation(kind, operation, "success");
            if operation == "create" {
                StepResult::Created
            } else {
                StepResult::Updated
            }
        }
        Err(e) => {
            error!("Failed to {} {} {}/{}: {}", operation, kind, namespace, name, e);
            record_exposure_operation(kind, operation, "error");
            StepResult::Failed
        }
    }
}

/// Log and record a delete call, NotFound counts as converged
fn delete_step(
    kind: &str,
    namespace: &str,
    name: &str,
    result: Result<(), StoreError>,
) -> StepResult {
    match result {
        Ok(()) => {
            info!("Deleted {} {}/{}", kind, namespace, name);
            record_exposure_operation(kind, "delete", "success");
            StepResult::Deleted
        }
        Err(e) if e.is_not_found() => {
            warn!("{} {}/{} already gone", kind, namespace, name);
            record_exposure_operation(kind, "delete", "not_found");
            StepResult::AlreadyAbsent
        }
        Err(e) => {
            error!("Failed to delete {} {}/{}: {}", kind, namespace, name, e);
            record_exposure_operation(kind, "delete", "error");
            StepResult::Failed
        }
    }
}

fn past_tense(operation: &str) -> &'static str {
    match operation {
        "create" => "Created",
        _ => "Updated",
    }
}
