//! Best-effort user notifications.

use std::error::Error as StdError;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::db::{self, notification::Kind, user};

pub type Error = Box<dyn StdError + Send + Sync>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: user::Id,
        kind: Kind,
        message: String,
    ) -> Result<(), Error>;
}

/// Stores notifications in the `notifications` table for clients to poll.
pub struct DbNotifier {
    pool: db::Pool,
}

impl DbNotifier {
    pub fn new(pool: db::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    async fn notify(
        &self,
        user_id: user::Id,
        kind: Kind,
        message: String,
    ) -> Result<(), Error> {
        let notification = db::Notification {
            id: db::notification::Id::new(),
            user_id,
            kind,
            message,
            created_at: OffsetDateTime::now_utc(),
        };
        self.pool
            .get()
            .await?
            .insert_notification(&notification)
            .await?;
        Ok(())
    }
}

/// Sends a notification after the triggering operation has committed.
/// Failures are logged and swallowed.
pub async fn dispatch(
    notifier: &dyn Notifier,
    user_id: user::Id,
    kind: Kind,
    message: String,
) {
    if let Err(e) = notifier.notify(user_id, kind, message).await {
        tracing::warn!(%user_id, %kind, error = %e, "notification failed");
    }
}
