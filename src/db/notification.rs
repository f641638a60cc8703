use derive_more::Display;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{user, Client, Error};

#[derive(Clone, Debug)]
pub struct Notification {
    pub id: Id,
    pub user_id: user::Id,
    pub kind: Kind,
    pub message: String,
    pub created_at: OffsetDateTime,
}

uuid_id!(Id);

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    TryFromRepr,
    PartialEq,
    Serialize,
)]
#[repr(u8)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    #[display("tickets_issued")]
    TicketsIssued = 1,

    #[display("payment_failed")]
    PaymentFailed = 2,

    #[display("checked_in")]
    CheckedIn = 3,
}

int2_enum!(Kind, "invalid notification kind");

impl Client {
    pub async fn insert_notification(
        &self,
        notification: &Notification,
    ) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO notifications (id, user_id, kind, message, created_at) \
            VALUES ($1, $2, $3, $4, $5)";

        self.0
            .execute(
                SQL,
                &[
                    &notification.id,
                    &notification.user_id,
                    &notification.kind,
                    &notification.message,
                    &notification.created_at,
                ],
            )
            .await?;
        Ok(())
    }
}
