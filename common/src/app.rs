//! Application route model
//!
//! Turns a pod's labels and annotations into a [`RoutableApp`]. Extraction
//! never fails: missing or malformed metadata produces empty fields, and the
//! resulting model is rejected later by [`RoutableApp::validate`].

use crate::{
    MetaMap, APP_NAME_ANNOTATION, COPY_GENERIC_LABELS_ANNOTATION, FIRST_INSTANCE_ID, GUID_LABEL,
    ROUTES_ANNOTATION,
};
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A hostname exposed by an application on one container port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    #[serde(alias = "Hostname")]
    pub hostname: String,

    #[serde(alias = "Port")]
    pub port: i32,
}

/// Failure to decode the routes annotation
#[derive(Error, Debug)]
#[error("malformed routes annotation: {0}")]
pub struct RouteDecodeError(#[from] serde_json::Error);

/// Routing view of one application instance, built from its pod
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutableApp {
    /// Groups all instances of the application
    pub guid: String,

    /// Base name of the Service and Ingress
    pub name: String,

    pub namespace: String,

    /// Originating pod (diagnostics only)
    pub pod_name: String,

    /// Ordinal suffix of the pod name, `"0"` for the first instance
    pub instance_id: String,

    /// Pod labels, used for generic label propagation only
    pub labels: MetaMap,

    /// Pod annotations
    pub annotations: MetaMap,

    /// Raw value of the copy-generic-labels annotation
    pub copy_generic_labels: String,

    /// Routes in annotation order
    pub routes: Vec<Route>,
}

impl RoutableApp {
    /// Build the model from a pod. Malformed routes decode to an empty list.
    pub fn from_pod(pod: &Pod) -> Self {
        let labels = pod.metadata.labels.clone().unwrap_or_default();
        let annotations = pod.metadata.annotations.clone().unwrap_or_default();
        let pod_name = pod.metadata.name.clone().unwrap_or_default();

        let routes = parse_routes(annotations.get(ROUTES_ANNOTATION).map(String::as_str))
            .unwrap_or_default();

        Self {
            guid: labels.get(GUID_LABEL).cloned().unwrap_or_default(),
            name: annotations
                .get(APP_NAME_ANNOTATION)
                .cloned()
                .unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            instance_id: instance_id(&pod_name),
            pod_name,
            copy_generic_labels: annotations
                .get(COPY_GENERIC_LABELS_ANNOTATION)
                .cloned()
                .unwrap_or_default(),
            labels,
            annotations,
            routes,
        }
    }

    /// True when there is enough information to expose the application
    pub fn validate(&self) -> bool {
        !self.routes.is_empty()
            && !self.guid.is_empty()
            && !self.name.is_empty()
            && !self.namespace.is_empty()
            && !self.pod_name.is_empty()
            && !self.instance_id.is_empty()
    }

    /// True for instance `"0"`, which includes pods without an ordinal suffix
    pub fn first_instance(&self) -> bool {
        self.instance_id == FIRST_INSTANCE_ID
    }
}

/// Decode the routes annotation value.
///
/// An absent annotation is an empty route list, not an error. Capitalised
/// keys (`Hostname`, `Port`) are accepted; a route missing either field
/// rejects the whole annotation rather than defaulting it.
pub fn parse_routes(raw: Option<&str>) -> Result<Vec<Route>, RouteDecodeError> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => Ok(serde_json::from_str(raw)?),
    }
}

/// Ordinal suffix of a pod name (`web-3` -> `"3"`).
///
/// Names without a numeric last segment map to `"0"`, so `web-abc` cannot be
/// told apart from `web-0`.
pub fn instance_id(pod_name: &str) -> String {
    match pod_name.rsplit('-').next() {
        Some(last) if last.parse::<u64>().is_ok() => last.to_string(),
        _ => FIRST_INSTANCE_ID.to_string(),
    }
}
