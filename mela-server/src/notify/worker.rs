//! Push worker
//!
//! Drains the outbound push queue into the [`LiveHub`]. Exits when every
//! dispatcher handle (and so the queue sender) is dropped.

use tokio::sync::mpsc;

use super::PushJob;
use crate::live::LiveHub;

pub struct PushWorker {
    hub: LiveHub,
}

impl PushWorker {
    pub fn new(hub: LiveHub) -> Self {
        Self { hub }
    }

    /// Run until the queue closes. Jobs are handled one at a time and
    /// handing off to a connection never waits, so pushes to a connection
    /// keep their enqueue order and a slow client cannot hold up others.
    pub async fn run(self, mut rx: mpsc::Receiver<PushJob>) {
        tracing::info!("Live push worker started");

        while let Some(job) = rx.recv().await {
            match job {
                PushJob::User { user_id, message } => {
                    let delivered = self.hub.push_to_user(&user_id, &message);
                    if delivered == 0 {
                        tracing::debug!(user_id = %user_id, "No live session, push dropped");
                    } else {
                        tracing::debug!(user_id = %user_id, delivered, "Live push delivered");
                    }
                }
                PushJob::Group { group, message } => {
                    let delivered = self.hub.broadcast(group, &message);
                    tracing::debug!(group = %group, delivered, "Live broadcast delivered");
                }
            }
        }

        tracing::info!("Live push queue closed, worker stopping");
    }
}
