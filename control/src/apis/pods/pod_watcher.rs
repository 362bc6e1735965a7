//! Pod watcher
//!
//! Feeds pod lifecycle events to the [`PodReconciler`], one at a time.
//!
//! ## How It Works
//!
//! 1. `kube::runtime::watcher` lists the pods, then watches from the list's
//!    resourceVersion. Pods that already exist arrive as `InitApply` and are
//!    reconciled like new ones
//! 2. `Apply`/`Delete` go to the reconciler; `Init`/`InitDone` only mark a
//!    relist
//! 3. Bookmarks, resuming a closed watch and relisting after 410 Gone happen
//!    inside the watcher
//! 4. Watch errors are logged; the stream backs off and retries on its own

use crate::apis::pods::reconciler::{PodEvent, PodReconciler};
use crate::apis::pods::store::ExposureStore;
use common::RouteHandler;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::watcher;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::WatchStreamExt;
use kube::{api::Api, ResourceExt};
use tracing::{debug, info, warn};

/// Translate a watcher event; relist markers carry no pod.
///
/// The watcher cannot tell a new pod from a changed one, so `Apply` becomes
/// `Modified`. Pods seen during a (re)list become `Added`.
pub fn pod_event(event: watcher::Event<Pod>) -> Option<PodEvent> {
    match event {
        watcher::Event::InitApply(pod) => Some(PodEvent::Added(pod)),
        watcher::Event::Apply(pod) => Some(PodEvent::Modified(pod)),
        watcher::Event::Delete(pod) => Some(PodEvent::Deleted(pod)),
        watcher::Event::Init | watcher::Event::InitDone => None,
    }
}

/// Hand every event of `events` to `reconciler` until the stream ends.
///
/// Errors are logged and skipped; the stream decides when to retry.
pub async fn handle_pod_events<S, H, St>(events: St, reconciler: &PodReconciler<S, H>)
where
    S: ExposureStore,
    H: RouteHandler + Send + Sync,
    St: Stream<Item = Result<watcher::Event<Pod>, watcher::Error>>,
{
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        match event {
            Ok(watcher::Event::Init) => {
                debug!("Pod relist started");
            }
            Ok(watcher::Event::InitDone) => {
                info!("Pod relist complete");
            }
            Ok(event) => {
                if let Some(event) = pod_event(event) {
                    let outcome = reconciler.handle(&event).await;
                    debug!(
                        "Handled {} pod {}: {:?}",
                        event.kind(),
                        event.pod().name_any(),
                        outcome
                    );
                }
            }
            Err(e) => {
                warn!("Pod watcher error: {}", e);
            }
        }
    }
}

/// Watch pods and hand every event to `reconciler`.
///
/// Runs indefinitely; failed list and watch calls are retried with backoff.
pub async fn watch_pods<S, H>(api: Api<Pod>, reconciler: &PodReconciler<S, H>)
where
    S: ExposureStore,
    H: RouteHandler + Send + Sync,
{
    info!("Starting pod watcher");

    let events = watcher(api, WatcherConfig::default()).default_backoff();
    handle_pod_events(events, reconciler).await;

    warn!("Pod watcher stream ended");
}
