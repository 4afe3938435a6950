use crate::clinic::ClinicStore;
use crate::constants::{NOTIFICATION_PAGE_SIZE, PROFILE_ACTION_URL};
use crate::identity::Identity;
use crate::models::{Notification, NotificationData, NotificationKind};
use crate::policy::{authorize, Action, Resource};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use healthcure_uuid::RecordId;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub unread_count: usize,
    pub notifications: Vec<Notification>,
}

/// Content of a notification about to be sent.
pub(crate) struct Outgoing {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<ClinicStore>,
}

impl NotificationService {
    pub fn new(store: Arc<ClinicStore>) -> Self {
        Self { store }
    }

    /// Latest notifications for the caller, newest first, with the total unread count.
    pub fn list(&self, who: &Identity) -> CoreResult<NotificationPage> {
        authorize(who, Resource::Notification, Action::List)?;
        let mut mine = self
            .store
            .notifications
            .find(|n| n.user_id == who.user_id)?;
        let unread_count = mine.iter().filter(|n| !n.is_read).count();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.truncate(NOTIFICATION_PAGE_SIZE);

        Ok(NotificationPage {
            unread_count,
            notifications: mine,
        })
    }

    /// Someone else's notification is reported as missing.
    pub fn mark_read(&self, who: &Identity, id: &RecordId) -> CoreResult<Notification> {
        authorize(who, Resource::Notification, Action::Update)?;
        self.store.notifications.write(|txn| {
            let mut notification = txn
                .get(id)
                .filter(|n| n.user_id == who.user_id)
                .cloned()
                .ok_or(CoreError::NotFound("notification"))?;
            notification.is_read = true;
            txn.put(notification.clone());
            Ok(notification)
        })
    }

    /// Returns how many notifications changed.
    pub fn mark_all_read(&self, who: &Identity) -> CoreResult<usize> {
        authorize(who, Resource::Notification, Action::Update)?;
        self.store.notifications.write(|txn| {
            let unread: Vec<Notification> = txn
                .find(|n| n.user_id == who.user_id && !n.is_read)
                .into_iter()
                .cloned()
                .collect();
            let count = unread.len();
            for mut notification in unread {
                notification.is_read = true;
                txn.put(notification);
            }
            Ok(count)
        })
    }

    pub(crate) fn send(&self, user_id: RecordId, outgoing: Outgoing) -> CoreResult<Notification> {
        send(&self.store, user_id, outgoing)
    }
}

/// Stores a notification for `user_id` pointing at the profile page.
pub(crate) fn send(
    store: &ClinicStore,
    user_id: RecordId,
    outgoing: Outgoing,
) -> CoreResult<Notification> {
    let notification = Notification {
        id: RecordId::new(),
        user_id,
        kind: outgoing.kind,
        title: outgoing.title,
        message: outgoing.message,
        is_read: false,
        data: outgoing.data,
        action_url: Some(PROFILE_ACTION_URL.to_string()),
        created_at: Utc::now(),
    };
    tracing::debug!("notifying {} ({:?})", user_id, notification.kind);
    store.notifications.insert(notification)
}

/// Marks every unread link request addressed to `user_id` about `patient_id` as read.
pub(crate) fn close_link_requests(
    store: &ClinicStore,
    user_id: &RecordId,
    patient_id: &RecordId,
) -> CoreResult<()> {
    store.notifications.write(|txn| {
        let open: Vec<Notification> = txn
            .find(|n| &n.user_id == user_id && n.is_open_link_request(patient_id))
            .into_iter()
            .cloned()
            .collect();
        for mut notification in open {
            notification.is_read = true;
            txn.put(notification);
        }
        Ok(())
    })
}
