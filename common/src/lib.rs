//! Podgress Common Types
//!
//! Application route model extracted from pod metadata, and the pure
//! computation of the Service and Ingress that expose it.
//! Nothing in this crate talks to the cluster.

use std::collections::BTreeMap;

pub mod app;
pub mod desired;
pub mod handler;

pub use app::{instance_id, parse_routes, RoutableApp, Route, RouteDecodeError};
pub use handler::RouteHandler;

/// Label grouping every instance of one application
pub const GUID_LABEL: &str = "cloudfoundry.org/guid";

/// Annotation holding the application name (base name of Service and Ingress)
pub const APP_NAME_ANNOTATION: &str = "cloudfoundry.org/application_name";

/// Annotation holding the JSON route list: `[{"hostname":"a.example.com","port":8080}]`
pub const ROUTES_ANNOTATION: &str = "cloudfoundry.org/routes";

/// Annotation enabling propagation of generic Kubernetes labels (`"true"`)
pub const COPY_GENERIC_LABELS_ANNOTATION: &str = "eirinix.suse.org/CopyKubeGenericLabels";

/// Substring identifying generic Kubernetes labels (`app.kubernetes.io/name`, ...)
pub const GENERIC_LABEL_PREFIX: &str = "app.kubernetes.io";

/// Instance ID of the first instance, also used when the pod name has no ordinal
pub const FIRST_INSTANCE_ID: &str = "0";

/// Label or annotation map as carried by Kubernetes object metadata
pub type MetaMap = BTreeMap<String, String>;
