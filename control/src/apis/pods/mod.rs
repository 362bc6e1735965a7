//! Pod-driven exposure
//!
//! - PodWatcher: resumable pod event stream
//! - PodReconciler: Service/Ingress convergence per pod event
//! - ExposureStore: cluster access used by the reconciler

pub mod pod_watcher;
pub mod reconciler;
pub mod store;
