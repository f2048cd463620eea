use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ResourceClient;
use crate::config::RefreshConfig;
use crate::error::TaskError;
use crate::resource::{Identified, SharedResource};

/// Handle to a background task; dropping it leaves the task running.
pub struct PollerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    pub async fn stop(self) -> Result<(), TaskError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(TaskError::from)
    }
}

/// Run `tick` every `interval` until stopped. The first tick fires at once.
pub fn spawn_refresher<F, Fut>(interval: Duration, mut tick: F) -> PollerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("refresher shutdown requested");
                    break;
                }
                _ = ticker.tick() => tick().await,
            }
        }
    });

    PollerHandle { cancel_tx, join }
}

/// Keep a resource fresh (today's delivery tasks, dashboard counters).
/// Failures land in the fetch slot like any manual refresh.
pub fn refresh_resource<T>(client: ResourceClient<T>, config: &RefreshConfig) -> PollerHandle
where
    T: Identified + DeserializeOwned + Clone + Send + Sync + 'static,
{
    spawn_refresher(config.interval(), move || {
        let client = client.clone();
        async move {
            if let Err(err) = client.fetch().await {
                warn!(error = %err, "background refresh failed");
            }
        }
    })
}

/// Feed inbound push messages into `store`, newest first.
pub fn spawn_inbox<T>(store: SharedResource<T>, mut inbound: mpsc::Receiver<T>) -> PollerHandle
where
    T: Identified + Send + Sync + 'static,
{
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("inbox shutdown requested");
                    break;
                }
                message = inbound.recv() => match message {
                    Some(item) => {
                        debug!(id = %item.id(), "inbound message");
                        store.write().await.receive(item);
                    }
                    None => {
                        debug!("inbound channel closed");
                        break;
                    }
                },
            }
        }
    });

    PollerHandle { cancel_tx, join }
}
