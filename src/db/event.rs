use constcat::concat;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::Row;

use super::{user, Client, Error, Tx};

#[derive(Clone, Debug)]
pub struct Event {
    pub id: Id,
    pub name: String,
    pub status: Status,
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
    pub created_by: user::Id,
    pub created_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl From<&Row> for Event {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            status: row.get("status"),
            starts_at: row.get("starts_at"),
            ends_at: row.get("ends_at"),
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
            deleted_at: row.get("deleted_at"),
        }
    }
}

uuid_id!(Id);

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, TryFromRepr, PartialEq, Serialize,
)]
#[repr(u8)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Being prepared, not visible to buyers.
    Draft = 1,

    /// On sale and open for admission.
    Published = 2,

    /// Called off by the organizer.
    Canceled = 3,
}

int2_enum!(Status, "invalid event status");

const SELECT: &str = "\
    SELECT id, name, status, starts_at, ends_at, \
           created_by, created_at, deleted_at \
    FROM events";

impl Client {
    pub async fn get_event_by_id(&self, id: Id) -> Result<Option<Event>, Error> {
        const SQL: &str =
            concat!(SELECT, " WHERE id = $1 AND deleted_at IS NULL");
        Ok(self.0.query_opt(SQL, &[&id]).await?.as_ref().map(Event::from))
    }
}

impl Tx<'_> {
    pub async fn get_event_by_id(&self, id: Id) -> Result<Option<Event>, Error> {
        const SQL: &str =
            concat!(SELECT, " WHERE id = $1 AND deleted_at IS NULL");
        Ok(self.0.query_opt(SQL, &[&id]).await?.as_ref().map(Event::from))
    }

    pub async fn insert_event(&self, event: &Event) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO events (id, name, status, starts_at, ends_at, \
                                created_by, created_at, deleted_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

        self.0
            .execute(
                SQL,
                &[
                    &event.id,
                    &event.name,
                    &event.status,
                    &event.starts_at,
                    &event.ends_at,
                    &event.created_by,
                    &event.created_at,
                    &event.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }
}
