//! LiveHub: per-user push channel
//!
//! Tracks live WebSocket sessions and routes push messages to them.
//!
//! ```text
//! PushWorker
//!       │ push_to_user / broadcast
//!       ▼
//! LiveHub
//!   ├── users:       user_id → [connection id]   (targeted pushes)
//!   └── connections: id → { user, group, state, tx }
//!                                            │ bounded mpsc
//!                                            ▼
//!                                   WS session (sink)
//! ```
//!
//! A connection is reserved in `Connecting` (counts toward the per-user
//! cap, receives nothing), becomes `Connected` once the socket is upgraded
//! and joins its role group, and is removed when its [`LiveConnection`]
//! is dropped. Delivery is at-most-once: pushes to a user with no live
//! connection are dropped.
//!
//! Handing a message to a connection never waits. A connection whose
//! buffer is full loses that message; the session side disconnects a
//! client whose socket write exceeds `push_timeout`.

use dashmap::DashMap;
use shared::error::AppError;
use shared::live::{LiveGroup, LiveMessage};
use shared::models::CurrentUser;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Per-connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct LiveHubConfig {
    /// Outbound buffer per connection
    pub connection_buffer: usize,
    pub max_connections_per_user: usize,
    /// Upper bound for writing one message to the client socket
    pub push_timeout: Duration,
}

impl Default for LiveHubConfig {
    fn default() -> Self {
        Self {
            connection_buffer: 64,
            max_connections_per_user: 10,
            push_timeout: Duration::from_secs(2),
        }
    }
}

struct Entry {
    user_id: String,
    group: Option<LiveGroup>,
    state: ConnectionState,
    tx: mpsc::Sender<LiveMessage>,
}

struct HubInner {
    config: LiveHubConfig,
    next_id: AtomicU64,
    users: DashMap<String, Vec<u64>>,
    connections: DashMap<u64, Entry>,
}

#[derive(Clone)]
pub struct LiveHub {
    inner: Arc<HubInner>,
}

impl LiveHub {
    pub fn new(config: LiveHubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                config,
                next_id: AtomicU64::new(1),
                users: DashMap::new(),
                connections: DashMap::new(),
            }),
        }
    }

    /// Reserve a connection slot for `user` (state `Connecting`).
    ///
    /// Fails with `ResourceLimitExceeded` when the user already holds
    /// `max_connections_per_user` connections.
    pub fn connect(&self, user: &CurrentUser) -> Result<LiveConnection, AppError> {
        let max = self.inner.config.max_connections_per_user;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut ids = self.inner.users.entry(user.id.clone()).or_default();
            if ids.len() >= max {
                let current = ids.len();
                return Err(AppError::resource_limit(format!(
                    "Too many live connections ({current}/{max})"
                )));
            }
            ids.push(id);
        }

        let (tx, rx) = mpsc::channel(self.inner.config.connection_buffer.max(1));
        self.inner.connections.insert(
            id,
            Entry {
                user_id: user.id.clone(),
                group: user.primary_group(),
                state: ConnectionState::Connecting,
                tx,
            },
        );

        Ok(LiveConnection {
            id,
            user_id: user.id.clone(),
            hub: self.clone(),
            rx,
        })
    }

    fn open(&self, id: u64) -> Option<LiveGroup> {
        let mut entry = self.inner.connections.get_mut(&id)?;
        entry.state = ConnectionState::Connected;
        entry.group
    }

    fn disconnect(&self, id: u64) {
        let Some((_, entry)) = self.inner.connections.remove(&id) else {
            return;
        };
        let now_empty = match self.inner.users.get_mut(&entry.user_id) {
            Some(mut ids) => {
                ids.retain(|c| *c != id);
                ids.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.inner
                .users
                .remove_if(&entry.user_id, |_, ids| ids.is_empty());
        }
    }

    pub fn state(&self, id: u64) -> ConnectionState {
        self.inner
            .connections
            .get(&id)
            .map(|e| e.state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Connections (any state) currently held by a user
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.inner.users.get(user_id).map(|ids| ids.len()).unwrap_or(0)
    }

    /// Connected sessions in a group
    pub fn group_size(&self, group: LiveGroup) -> usize {
        self.inner
            .connections
            .iter()
            .filter(|e| e.state == ConnectionState::Connected && e.group == Some(group))
            .count()
    }

    /// Deliver to every connected session of `user_id`.
    ///
    /// Returns the number of sessions that accepted the message.
    pub fn push_to_user(&self, user_id: &str, message: &LiveMessage) -> usize {
        let ids = match self.inner.users.get(user_id) {
            Some(ids) => ids.clone(),
            None => return 0,
        };
        let targets: Vec<_> = ids
            .iter()
            .filter_map(|id| {
                let entry = self.inner.connections.get(id)?;
                (entry.state == ConnectionState::Connected).then(|| (*id, entry.tx.clone()))
            })
            .collect();
        Self::deliver(targets, message)
    }

    /// Deliver to every connected session in `group`
    pub fn broadcast(&self, group: LiveGroup, message: &LiveMessage) -> usize {
        let targets: Vec<_> = self
            .inner
            .connections
            .iter()
            .filter(|e| e.state == ConnectionState::Connected && e.group == Some(group))
            .map(|e| (*e.key(), e.tx.clone()))
            .collect();
        Self::deliver(targets, message)
    }

    fn deliver(targets: Vec<(u64, mpsc::Sender<LiveMessage>)>, message: &LiveMessage) -> usize {
        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = id, "Live connection buffer full, message dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = id, "Live connection closed during push");
                }
            }
        }
        delivered
    }
}

/// A reserved live connection; dropping it disconnects
pub struct LiveConnection {
    id: u64,
    user_id: String,
    hub: LiveHub,
    rx: mpsc::Receiver<LiveMessage>,
}

impl LiveConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> ConnectionState {
        self.hub.state(self.id)
    }

    /// Budget for one socket write of this session
    pub fn push_timeout(&self) -> Duration {
        self.hub.inner.config.push_timeout
    }

    /// Mark the connection `Connected` and join its role group
    pub fn open(&mut self) -> Option<LiveGroup> {
        self.hub.open(self.id)
    }

    /// Next outbound message
    pub async fn recv(&mut self) -> Option<LiveMessage> {
        self.rx.recv().await
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}
