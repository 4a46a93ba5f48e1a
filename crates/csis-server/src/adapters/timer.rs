//! Lease timers on the tokio clock.

use super::runtime::ServiceEvent;
use crate::domain::LeaseId;
use crate::ports::outbound::LeaseTimer;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// One sleeping task per armed lease; expiry is posted as
/// [`ServiceEvent::LeaseExpired`].
///
/// Must be armed from within a tokio runtime.
pub struct TokioLeaseTimer {
    events: mpsc::Sender<ServiceEvent>,
    tasks: Mutex<HashMap<LeaseId, JoinHandle<()>>>,
}

impl TokioLeaseTimer {
    /// Create a timer posting to `events`.
    pub fn new(events: mpsc::Sender<ServiceEvent>) -> Self {
        Self {
            events,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Leases armed and not yet fired or cancelled.
    pub fn active(&self) -> usize {
        self.tasks
            .lock()
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }
}

impl LeaseTimer for TokioLeaseTimer {
    fn arm(&self, lease: LeaseId, duration: Duration) {
        let Ok(runtime) = Handle::try_current() else {
            error!(%lease, "No tokio runtime, lease will never expire");
            return;
        };

        let events = self.events.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if events.send(ServiceEvent::LeaseExpired(lease)).await.is_err() {
                debug!(%lease, "Runtime gone, lease expiry dropped");
            }
        });

        let mut tasks = self.tasks.lock();
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(lease, task);
    }

    fn cancel(&self, lease: LeaseId) {
        if let Some(task) = self.tasks.lock().remove(&lease) {
            task.abort();
        }
    }
}

impl Drop for TokioLeaseTimer {
    fn drop(&mut self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}
