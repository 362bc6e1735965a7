use anyhow::Result;
use k8s_openapi::api::core::v1::Pod;
use kube::api::Api;
use podgress::apis::pods::pod_watcher::watch_pods;
use podgress::apis::pods::reconciler::PodReconciler;
use podgress::apis::pods::store::KubeStore;
use podgress::config::ControllerConfig;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Podgress controller
///
/// Creates, updates and deletes a Service and an Ingress per routable
/// application from the pods it runs.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (needed for Kubernetes TLS client)
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok(); // Ignore error if already installed

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = ControllerConfig::from_env()?;

    info!("Starting Podgress controller");
    if config.namespace.is_empty() {
        info!("   Namespace: <all>");
    } else {
        info!("   Namespace: {}", config.namespace);
    }
    info!("   Labels: {:?}", config.labels);
    info!("   Annotations: {:?}", config.annotations);
    info!("   TLS: {}", config.tls);

    let client = kube::Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let pods: Api<Pod> = if config.namespace.is_empty() {
        Api::all(client.clone())
    } else {
        Api::namespaced(client.clone(), &config.namespace)
    };

    let reconciler = PodReconciler::new(KubeStore::new(client), config.merge_inputs());

    tokio::select! {
        _ = watch_pods(pods, &reconciler) => {
            error!("Pod watcher exited");
            return Err(anyhow::anyhow!("pod watcher exited"));
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
