//! Route handling capability
//!
//! The reconciler only talks to this trait, so alternate ways of deriving
//! routes from a pod can be plugged in by injecting a different extractor.

use crate::{desired, MetaMap, RoutableApp};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;

/// What the reconciler needs from a routing model
pub trait RouteHandler {
    /// Enough information to touch remote state
    fn validate(&self) -> bool;

    /// Pod is instance `"0"` (or carries no ordinal)
    fn first_instance(&self) -> bool;

    fn desired_service(&self, labels: &MetaMap, annotations: &MetaMap) -> Service;

    fn desired_ingress(&self, labels: &MetaMap, annotations: &MetaMap, tls: bool) -> Ingress;

    /// Partial merge of the desired Service into `service`
    fn update_service(&self, service: &mut Service, labels: &MetaMap, annotations: &MetaMap);

    /// Partial merge of the desired Ingress into `ingress`
    fn update_ingress(
        &self,
        ingress: &mut Ingress,
        labels: &MetaMap,
        annotations: &MetaMap,
        tls: bool,
    );
}

impl RouteHandler for RoutableApp {
    fn validate(&self) -> bool {
        RoutableApp::validate(self)
    }

    fn first_instance(&self) -> bool {
        RoutableApp::first_instance(self)
    }

    fn desired_service(&self, labels: &MetaMap, annotations: &MetaMap) -> Service {
        desired::desired_service(self, labels, annotations)
    }

    fn desired_ingress(&self, labels: &MetaMap, annotations: &MetaMap, tls: bool) -> Ingress {
        desired::desired_ingress(self, labels, annotations, tls)
    }

    fn update_service(&self, service: &mut Service, labels: &MetaMap, annotations: &MetaMap) {
        desired::update_service(self, service, labels, annotations)
    }

    fn update_ingress(
        &self,
        ingress: &mut Ingress,
        labels: &MetaMap,
        annotations: &MetaMap,
        tls: bool,
    ) {
        desired::update_ingress(self, ingress, labels, annotations, tls)
    }
}
