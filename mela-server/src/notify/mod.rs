//! Notification dispatcher
//!
//! Records notifications durably, then hands them to the live push queue.
//! The write is the only guaranteed part: enqueueing never blocks and a
//! full or closed queue just drops the push (the client reconciles via
//! `list_recent`).

mod worker;

pub use worker::PushWorker;

use shared::error::{AppError, ErrorCode};
use shared::live::{LiveGroup, LiveMessage};
use shared::models::{CurrentUser, Notification, NotificationDraft};
use shared::util::clamp_limit;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::db::MarketStore;
use crate::error::ServiceResult;

/// Most notifications returned by `list_recent`
pub const RECENT_LIMIT: i64 = 10;

/// Outbound push request
#[derive(Debug, Clone)]
pub enum PushJob {
    User { user_id: String, message: LiveMessage },
    Group { group: LiveGroup, message: LiveMessage },
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn MarketStore>,
    push_tx: mpsc::Sender<PushJob>,
}

impl NotificationDispatcher {
    /// Create the dispatcher and the receiving end of its push queue
    pub fn new(
        store: Arc<dyn MarketStore>,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<PushJob>) {
        let (push_tx, push_rx) = mpsc::channel(queue_capacity.max(1));
        (Self { store, push_tx }, push_rx)
    }

    /// Persist a notification, then push it best-effort
    pub async fn emit(&self, draft: NotificationDraft) -> ServiceResult<Notification> {
        let notification = self.store.insert_notification(draft).await?;
        self.publish(&notification);
        Ok(notification)
    }

    /// Queue the live push for an already persisted notification
    pub fn publish(&self, notification: &Notification) {
        self.enqueue(PushJob::User {
            user_id: notification.user_id.clone(),
            message: LiveMessage::notification(notification.message.clone()),
        });
    }

    pub fn publish_all(&self, notifications: &[Notification]) {
        for n in notifications {
            self.publish(n);
        }
    }

    /// Push text to every connected member of `group` (not persisted)
    pub fn broadcast(&self, group: LiveGroup, text: impl Into<String>) {
        self.enqueue(PushJob::Group {
            group,
            message: LiveMessage::notification(text),
        });
    }

    fn enqueue(&self, job: PushJob) {
        match self.push_tx.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(job = ?job, "Push queue full, live push dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Push queue closed, live push dropped");
            }
        }
    }

    /// Mark one of the caller's notifications read. Idempotent.
    pub async fn mark_read(
        &self,
        caller: &CurrentUser,
        notification_id: i64,
    ) -> ServiceResult<Notification> {
        let mut notification = self
            .store
            .get_notification(notification_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::NotificationNotFound))?;

        if notification.user_id != caller.id {
            return Err(AppError::new(ErrorCode::NotNotificationOwner).into());
        }

        if !notification.is_read {
            self.store.mark_notification_read(notification_id).await?;
            notification.is_read = true;
        }
        Ok(notification)
    }

    /// Caller's most recent notifications, newest first, at most 10
    pub async fn list_recent(
        &self,
        caller: &CurrentUser,
        limit: Option<i64>,
    ) -> ServiceResult<Vec<Notification>> {
        let limit = clamp_limit(limit, RECENT_LIMIT);
        Ok(self
            .store
            .list_recent_notifications(&caller.id, limit)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use shared::models::Role;

    fn setup(capacity: usize) -> (NotificationDispatcher, mpsc::Receiver<PushJob>) {
        NotificationDispatcher::new(Arc::new(MemoryStore::new()), capacity)
    }

    fn customer(id: &str) -> CurrentUser {
        CurrentUser::new(id, id, vec![Role::Customer])
    }

    #[tokio::test]
    async fn emit_persists_then_queues_push() {
        let (dispatcher, mut rx) = setup(8);
        let n = dispatcher
            .emit(NotificationDraft::new("c1", "hello"))
            .await
            .unwrap();
        assert!(!n.is_read);

        match rx.recv().await.unwrap() {
            PushJob::User { user_id, message } => {
                assert_eq!(user_id, "c1");
                assert_eq!(message.text(), "hello");
            }
            other => panic!("Expected user push, got {other:?}"),
        }

        let recent = dispatcher.list_recent(&customer("c1"), None).await.unwrap();
        assert_eq!(recent, vec![n]);
    }

    #[tokio::test]
    async fn push_failure_does_not_fail_emit() {
        let (dispatcher, rx) = setup(1);
        drop(rx);
        assert!(
            dispatcher
                .emit(NotificationDraft::new("c1", "first"))
                .await
                .is_ok()
        );

        let (dispatcher, _rx) = setup(1);
        dispatcher.emit(NotificationDraft::new("c1", "a")).await.unwrap();
        // queue full
        dispatcher.emit(NotificationDraft::new("c1", "b")).await.unwrap();
        let recent = dispatcher.list_recent(&customer("c1"), None).await.unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn mark_read_is_owner_only_and_idempotent() {
        let (dispatcher, _rx) = setup(8);
        let n = dispatcher
            .emit(NotificationDraft::new("c1", "hello"))
            .await
            .unwrap();

        let err = dispatcher
            .mark_read(&customer("c2"), n.id)
            .await
            .map_err(AppError::from)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotNotificationOwner);

        let read = dispatcher.mark_read(&customer("c1"), n.id).await.unwrap();
        assert!(read.is_read);
        let again = dispatcher.mark_read(&customer("c1"), n.id).await.unwrap();
        assert_eq!(read, again);

        let recent = dispatcher.list_recent(&customer("c1"), None).await.unwrap();
        assert!(recent[0].is_read);

        let err = dispatcher
            .mark_read(&customer("c1"), 9999)
            .await
            .map_err(AppError::from)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotificationNotFound);
    }

    #[tokio::test]
    async fn list_recent_is_bounded_and_newest_first() {
        let (dispatcher, _rx) = setup(64);
        for i in 0..15 {
            dispatcher
                .emit(NotificationDraft::new("c1", format!("n{i}")))
                .await
                .unwrap();
        }

        let recent = dispatcher
            .list_recent(&customer("c1"), Some(50))
            .await
            .unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].message, "n14");
        assert!(recent.windows(2).all(|w| {
            (w[0].created_at, w[0].id) > (w[1].created_at, w[1].id)
        }));

        let few = dispatcher
            .list_recent(&customer("c1"), Some(3))
            .await
            .unwrap();
        assert_eq!(few.len(), 3);
    }

    #[tokio::test]
    async fn broadcast_queues_group_job() {
        let (dispatcher, mut rx) = setup(8);
        dispatcher.broadcast(LiveGroup::Admins, "maintenance");
        match rx.recv().await.unwrap() {
            PushJob::Group { group, message } => {
                assert_eq!(group, LiveGroup::Admins);
                assert_eq!(message.text(), "maintenance");
            }
            other => panic!("Expected group push, got {other:?}"),
        }
    }
}
