//! Configuration for the Podgress controller
//!
//! Read from environment variables. Cluster credentials are not configured
//! here; the kube client infers them (kubeconfig or in-cluster).

use crate::apis::pods::reconciler::MergeInputs;
use crate::error::PodgressError;
use common::MetaMap;
use serde::{Deserialize, Serialize};
use std::env;

/// Namespace to watch; empty watches all namespaces
pub const NAMESPACE_ENV: &str = "PODGRESS_NAMESPACE";

/// JSON object of labels added to every Service and Ingress
pub const LABELS_ENV: &str = "PODGRESS_LABELS";

/// JSON object of annotations added to every Service and Ingress
pub const ANNOTATIONS_ENV: &str = "PODGRESS_ANNOTATIONS";

/// `true` adds a TLS entry per host to every Ingress
pub const ENABLE_TLS_ENV: &str = "PODGRESS_ENABLE_TLS";

/// Controller configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch for application pods
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Extra labels for generated objects
    #[serde(default)]
    pub labels: MetaMap,

    /// Extra annotations for generated objects
    #[serde(default)]
    pub annotations: MetaMap,

    /// Generate TLS entries on Ingresses
    #[serde(default)]
    pub tls: bool,
}

fn default_namespace() -> String {
    "eirini".to_string()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            labels: MetaMap::new(),
            annotations: MetaMap::new(),
            tls: false,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, PodgressError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PodgressError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup(NAMESPACE_ENV) {
            config.namespace = val;
        }

        if let Some(val) = lookup(LABELS_ENV).filter(|v| !v.trim().is_empty()) {
            config.labels = parse_meta(LABELS_ENV, &val)?;
        }

        if let Some(val) = lookup(ANNOTATIONS_ENV).filter(|v| !v.trim().is_empty()) {
            config.annotations = parse_meta(ANNOTATIONS_ENV, &val)?;
        }

        if let Some(val) = lookup(ENABLE_TLS_ENV) {
            config.tls = val.trim().parse::<bool>().map_err(|_| {
                PodgressError::Config(format!("{} must be true or false, got '{}'", ENABLE_TLS_ENV, val))
            })?;
        }

        Ok(config)
    }

    /// Labels, annotations and TLS toggle for the reconciler
    pub fn merge_inputs(&self) -> MergeInputs {
        MergeInputs {
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            tls: self.tls,
        }
    }
}

fn parse_meta(key: &str, raw: &str) -> Result<MetaMap, PodgressError> {
    serde_json::from_str(raw)
        .map_err(|e| PodgressError::Config(format!("{} is not a JSON string map: {}", key, e)))
}
