use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db;

pub use crate::db::ticket::{Id, Status};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Id,
    pub code: String,
    pub status: Status,
    pub event_id: db::event::Id,
    pub ticket_type_id: db::ticket_type::Id,
    pub order_line_id: db::order::LineId,
    pub user_id: db::user::Id,
    pub attendee_name: String,
    pub qr_location: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub checked_in_at: Option<OffsetDateTime>,
    pub checked_in_by: Option<db::user::Id>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<db::Ticket> for Ticket {
    fn from(ticket: db::Ticket) -> Self {
        Self {
            id: ticket.id,
            code: ticket.code,
            status: ticket.status,
            event_id: ticket.event_id,
            ticket_type_id: ticket.ticket_type_id,
            order_line_id: ticket.order_line_id,
            user_id: ticket.user_id,
            attendee_name: ticket.attendee_name,
            qr_location: ticket.qr_location,
            checked_in_at: ticket.checked_in_at,
            checked_in_by: ticket.checked_in_by,
            created_at: ticket.created_at,
        }
    }
}
