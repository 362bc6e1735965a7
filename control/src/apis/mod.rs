//! Kubernetes API integrations
//!
//! Pod watcher and the Service/Ingress reconciler it drives.

pub mod metrics;
pub mod pods;
