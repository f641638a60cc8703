use constcat::concat;
use derive_more::Display;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::Row;

use super::{event, order, ticket_type, user, Client, Error, Tx};

/// Issued e-ticket. Never deleted by the pipeline; the only mutation after
/// issuance is the check-in transition.
#[derive(Clone, Debug)]
pub struct Ticket {
    pub id: Id,
    /// Admission credential and QR payload.
    pub code: String,
    pub order_line_id: order::LineId,
    pub event_id: event::Id,
    pub ticket_type_id: ticket_type::Id,
    pub user_id: user::Id,
    pub attendee_name: String,
    pub qr_location: String,
    pub status: Status,
    pub checked_in_at: Option<OffsetDateTime>,
    pub checked_in_by: Option<user::Id>,
    pub created_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl From<&Row> for Ticket {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            code: row.get("code"),
            order_line_id: row.get("order_line_id"),
            event_id: row.get("event_id"),
            ticket_type_id: row.get("ticket_type_id"),
            user_id: row.get("user_id"),
            attendee_name: row.get("attendee_name"),
            qr_location: row.get("qr_location"),
            status: row.get("status"),
            checked_in_at: row.get("checked_in_at"),
            checked_in_by: row.get("checked_in_by"),
            created_at: row.get("created_at"),
            deleted_at: row.get("deleted_at"),
        }
    }
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
pub enum Status {
    /// Valid for admission.
    #[display("active")]
    Active = 1,

    /// Used at the venue. Terminal.
    #[display("checked_in")]
    CheckedIn = 2,
}

int2_enum!(Status, "invalid ticket status");

const COLUMNS: &str = "\
    id, code, order_line_id, event_id, ticket_type_id, user_id, \
    attendee_name, qr_location, status, checked_in_at, checked_in_by, \
    created_at, deleted_at";

impl Client {
    pub async fn get_ticket_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Ticket>, Error> {
        const SQL: &str = concat!(
            "SELECT ",
            COLUMNS,
            " FROM tickets WHERE code = $1 AND deleted_at IS NULL",
        );
        Ok(self.0.query_opt(SQL, &[&code]).await?.as_ref().map(Ticket::from))
    }

    pub async fn get_tickets_by_user(
        &self,
        user_id: user::Id,
    ) -> Result<Vec<Ticket>, Error> {
        const SQL: &str = concat!(
            "SELECT ",
            COLUMNS,
            " FROM tickets \
              WHERE user_id = $1 AND deleted_at IS NULL \
              ORDER BY created_at DESC, id DESC",
        );
        Ok(self
            .0
            .query(SQL, &[&user_id])
            .await?
            .iter()
            .map(Ticket::from)
            .collect())
    }

    pub async fn get_tickets_by_order(
        &self,
        order_id: order::Id,
    ) -> Result<Vec<Ticket>, Error> {
        const SQL: &str = concat!(
            "SELECT ",
            COLUMNS,
            " FROM tickets \
              WHERE order_line_id IN ( \
                  SELECT id FROM order_lines WHERE order_id = $1 \
              ) AND deleted_at IS NULL \
              ORDER BY order_line_id",
        );
        Ok(self
            .0
            .query(SQL, &[&order_id])
            .await?
            .iter()
            .map(Ticket::from)
            .collect())
    }
}

impl Tx<'_> {
    /// Loads a live ticket and holds its row lock until the transaction
    /// ends.
    pub async fn lock_ticket_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Ticket>, Error> {
        const SQL: &str = concat!(
            "SELECT ",
            COLUMNS,
            " FROM tickets \
              WHERE code = $1 AND deleted_at IS NULL \
              FOR UPDATE",
        );
        Ok(self.0.query_opt(SQL, &[&code]).await?.as_ref().map(Ticket::from))
    }

    /// Inserts a freshly issued ticket. `order_line_id` is unique in the
    /// schema, so a second ticket for the same line fails the transaction.
    pub async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), Error> {
        const SQL: &str = concat!(
            "INSERT INTO tickets (",
            COLUMNS,
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        );

        self.0
            .execute(
                SQL,
                &[
                    &ticket.id,
                    &ticket.code,
                    &ticket.order_line_id,
                    &ticket.event_id,
                    &ticket.ticket_type_id,
                    &ticket.user_id,
                    &ticket.attendee_name,
                    &ticket.qr_location,
                    &ticket.status,
                    &ticket.checked_in_at,
                    &ticket.checked_in_by,
                    &ticket.created_at,
                    &ticket.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Writes status, time and admitting admin in a single statement,
    /// returning the ticket as stored.
    pub async fn update_ticket_check_in(
        &self,
        ticket: &Ticket,
    ) -> Result<Ticket, Error> {
        const SQL: &str = concat!(
            "UPDATE tickets \
             SET status = $2, \
                 checked_in_at = $3, \
                 checked_in_by = $4 \
             WHERE id = $1 \
             RETURNING ",
            COLUMNS,
        );

        let row = self
            .0
            .query_one(
                SQL,
                &[
                    &ticket.id,
                    &ticket.status,
                    &ticket.checked_in_at,
                    &ticket.checked_in_by,
                ],
            )
            .await?;
        Ok(Ticket::from(&row))
    }
}
