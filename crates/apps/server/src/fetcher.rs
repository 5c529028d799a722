//! Tokio driver around [`FetchCoordinator`].
//!
//! One task owns the coordinator. It receives radius changes over a channel,
//! sleeps until the debounce deadline, spawns one task per dispatched query,
//! and feeds completions back in. Published collections and status snapshots
//! are exposed through `watch` channels, so readers never block the driver.

use std::sync::Arc;

use layers::FeatureCollection;
use streaming::{
    Completion, FetchCoordinator, FetchError, FetchStatus, OverpassResponse, Request,
    SpatialSource,
};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
#[error("fetch driver has stopped")]
pub struct FetcherClosed;

/// Cheap, cloneable handle to a running driver.
#[derive(Clone)]
pub struct FetchHandle {
    radius_tx: mpsc::UnboundedSender<f64>,
    collection_rx: watch::Receiver<Arc<FeatureCollection>>,
    status_rx: watch::Receiver<FetchStatus>,
}

impl FetchHandle {
    /// Queues a radius change (meters). Validation happens in the driver;
    /// rejected values are logged and ignored.
    pub fn set_radius(&self, radius_m: f64) -> Result<(), FetcherClosed> {
        self.radius_tx.send(radius_m).map_err(|_| FetcherClosed)
    }

    /// The latest published collection.
    pub fn collection(&self) -> Arc<FeatureCollection> {
        Arc::clone(&self.collection_rx.borrow())
    }

    pub fn status(&self) -> FetchStatus {
        self.status_rx.borrow().clone()
    }
}

type Done = (Request, Result<OverpassResponse, FetchError>);

/// Starts the driver on the current runtime.
///
/// The driver exits once every [`FetchHandle`] has been dropped.
pub fn spawn(
    coordinator: FetchCoordinator,
    source: Arc<dyn SpatialSource>,
) -> (FetchHandle, JoinHandle<()>) {
    let (radius_tx, radius_rx) = mpsc::unbounded_channel();
    let (collection_tx, collection_rx) = watch::channel(Arc::clone(coordinator.current()));
    let (status_tx, status_rx) = watch::channel(coordinator.status());

    let task = tokio::spawn(run(coordinator, source, radius_rx, collection_tx, status_tx));
    let handle = FetchHandle {
        radius_tx,
        collection_rx,
        status_rx,
    };
    (handle, task)
}

async fn run(
    mut coordinator: FetchCoordinator,
    source: Arc<dyn SpatialSource>,
    mut radius_rx: mpsc::UnboundedReceiver<f64>,
    collection_tx: watch::Sender<Arc<FeatureCollection>>,
    status_tx: watch::Sender<FetchStatus>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Done>();
    info!(source = source.name(), "fetch driver started");

    loop {
        let deadline = coordinator.next_deadline();

        tokio::select! {
            msg = radius_rx.recv() => {
                let Some(radius_m) = msg else { break };
                if let Err(e) = coordinator.radius_changed(radius_m, Instant::now().into_std()) {
                    warn!("ignoring radius change: {e}");
                }
            }
            Some((request, result)) = done_rx.recv() => {
                if let Completion::Published(collection) = coordinator.complete(request, result) {
                    collection_tx.send_replace(collection);
                }
            }
            _ = sleep_until(deadline) => {
                if let Some(dispatch) = coordinator.poll(Instant::now().into_std()) {
                    let source = Arc::clone(&source);
                    let tokens = coordinator.tokens();
                    let done = done_tx.clone();
                    tokio::spawn(async move {
                        let result = source.fetch(&dispatch.text).await;
                        if !tokens.is_latest(dispatch.request) {
                            debug!(request = dispatch.request.0, "superseded while in flight");
                            return;
                        }
                        let _ = done.send((dispatch.request, result));
                    });
                }
            }
        }

        status_tx.send_replace(coordinator.status());
    }

    info!("fetch driver stopped");
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(Instant::from_std(d)).await,
        None => std::future::pending().await,
    }
}
