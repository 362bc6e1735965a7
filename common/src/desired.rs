//! Desired Service and Ingress for a routable application
//!
//! Everything here is pure: objects are rebuilt from the [`RoutableApp`] on
//! every call and never cached.
//!
//! - Service: one port per unique route port, selecting pods by GUID label
//! - Ingress: one rule per route (duplicated ports included), optional TLS
//!   entry per route sharing the `<name>-tls` secret
//!
//! The `update_*` functions patch an object read back from the cluster. Only
//! ports/selector (Service), rules/TLS (Ingress) and the desired labels and
//! annotations are written; every other field keeps its remote value.

use crate::{MetaMap, RoutableApp, GENERIC_LABEL_PREFIX, GUID_LABEL};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::HashSet;

/// Path matched by every generated Ingress rule
pub const INGRESS_PATH: &str = "/";

/// Path type of every generated Ingress rule
pub const INGRESS_PATH_TYPE: &str = "Prefix";

/// Name of the TLS secret shared by all hosts of an application
pub fn tls_secret_name(service_name: &str) -> String {
    format!("{}-tls", service_name)
}

/// Caller labels, overlaid with the pod's generic labels when the app opted in
pub fn object_labels(app: &RoutableApp, labels: &MetaMap) -> MetaMap {
    let mut merged = labels.clone();

    if app.copy_generic_labels == "true" {
        for (key, value) in &app.labels {
            if key.contains(GENERIC_LABEL_PREFIX) {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    merged
}

/// Selector matching every live instance of the application
pub fn selector(app: &RoutableApp) -> MetaMap {
    MetaMap::from([(GUID_LABEL.to_string(), app.guid.clone())])
}

/// Service ports for the app's routes, first occurrence of each port wins
fn service_ports(app: &RoutableApp) -> Vec<ServicePort> {
    let mut seen = HashSet::new();

    app.routes
        .iter()
        .filter(|route| seen.insert(route.port))
        .map(|route| ServicePort {
            // Multi-port Services are rejected unless every port is named
            name: Some(format!("port-{}", route.port)),
            port: route.port,
            target_port: Some(IntOrString::Int(route.port)),
            ..Default::default()
        })
        .collect()
}

fn object_meta(app: &RoutableApp, labels: &MetaMap, annotations: &MetaMap) -> ObjectMeta {
    ObjectMeta {
        name: Some(app.name.clone()),
        namespace: Some(app.namespace.clone()),
        labels: Some(object_labels(app, labels)),
        annotations: Some(annotations.clone()),
        ..Default::default()
    }
}

/// Desired Service for the application
pub fn desired_service(app: &RoutableApp, labels: &MetaMap, annotations: &MetaMap) -> Service {
    Service {
        metadata: object_meta(app, labels, annotations),
        spec: Some(ServiceSpec {
            ports: Some(service_ports(app)),
            selector: Some(selector(app)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Desired Ingress for the application, with one TLS entry per route if `tls`
pub fn desired_ingress(
    app: &RoutableApp,
    labels: &MetaMap,
    annotations: &MetaMap,
    tls: bool,
) -> Ingress {
    // Backend name is the Service name, which is the app name
    let service_name = &app.name;

    let rules = app
        .routes
        .iter()
        .map(|route| IngressRule {
            host: Some(route.hostname.clone()),
            http: Some(HTTPIngressRuleValue {
                paths: vec![HTTPIngressPath {
                    path: Some(INGRESS_PATH.to_string()),
                    path_type: INGRESS_PATH_TYPE.to_string(),
                    backend: IngressBackend {
                        service: Some(IngressServiceBackend {
                            name: service_name.clone(),
                            port: Some(ServiceBackendPort {
                                number: Some(route.port),
                                ..Default::default()
                            }),
                        }),
                        ..Default::default()
                    },
                }],
            }),
        })
        .collect();

    let tls = tls.then(|| {
        app.routes
            .iter()
            .map(|route| IngressTLS {
                hosts: Some(vec![route.hostname.clone()]),
                secret_name: Some(tls_secret_name(service_name)),
            })
            .collect()
    });

    Ingress {
        metadata: object_meta(app, labels, annotations),
        spec: Some(IngressSpec {
            rules: Some(rules),
            tls,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Overlay desired labels/annotations, keeping keys owned by others
fn merge_meta(existing: &mut ObjectMeta, desired: ObjectMeta) {
    if let Some(labels) = desired.labels {
        existing.labels.get_or_insert_with(MetaMap::new).extend(labels);
    }
    if let Some(annotations) = desired.annotations {
        existing
            .annotations
            .get_or_insert_with(MetaMap::new)
            .extend(annotations);
    }
}

/// Patch an existing Service towards the desired state (ports, selector, meta)
pub fn update_service(
    app: &RoutableApp,
    service: &mut Service,
    labels: &MetaMap,
    annotations: &MetaMap,
) {
    let desired = desired_service(app, labels, annotations);
    merge_meta(&mut service.metadata, desired.metadata);

    let desired_spec = desired.spec.unwrap_or_default();
    let spec = service.spec.get_or_insert_with(ServiceSpec::default);
    spec.ports = desired_spec.ports;
    spec.selector = desired_spec.selector;
}

/// Patch an existing Ingress towards the desired state (rules, TLS, meta)
pub fn update_ingress(
    app: &RoutableApp,
    ingress: &mut Ingress,
    labels: &MetaMap,
    annotations: &MetaMap,
    tls: bool,
) {
    let desired = desired_ingress(app, labels, annotations, tls);
    merge_meta(&mut ingress.metadata, desired.metadata);

    let desired_spec = desired.spec.unwrap_or_default();
    let spec = ingress.spec.get_or_insert_with(IngressSpec::default);
    spec.rules = desired_spec.rules;
    spec.tls = desired_spec.tls;
}
