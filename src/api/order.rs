use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{api, db};

pub use crate::db::order::{Id, LineId, Status};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Id,
    pub code: String,
    pub user_id: db::user::Id,
    pub status: Status,
    pub total_amount: Decimal,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ordered_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub paid_at: Option<OffsetDateTime>,
    pub lines: Vec<Line>,
    /// Issued tickets; empty until the order is paid.
    #[serde(default)]
    pub tickets: Vec<api::Ticket>,
}

impl Order {
    pub fn new(order: db::Order, tickets: Vec<db::Ticket>) -> Self {
        Self {
            id: order.id,
            code: order.code,
            user_id: order.user_id,
            status: order.status,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            payment_reference: order.payment_reference,
            created_at: order.created_at,
            ordered_at: order.ordered_at,
            paid_at: order.paid_at,
            lines: order.lines.into_iter().map(Line::from).collect(),
            tickets: tickets.into_iter().map(api::Ticket::from).collect(),
        }
    }
}

impl From<db::Order> for Order {
    fn from(order: db::Order) -> Self {
        Self::new(order, Vec::new())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: LineId,
    pub ticket_type_id: db::ticket_type::Id,
    pub event_id: db::event::Id,
    pub price_per_ticket: Decimal,
}

impl From<db::order::Line> for Line {
    fn from(line: db::order::Line) -> Self {
        Self {
            id: line.id,
            ticket_type_id: line.ticket_type_id,
            event_id: line.event_id,
            price_per_ticket: line.price_per_ticket,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub orders: Vec<Order>,
    pub total_count: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub ticket_type_ids: Vec<db::ticket_type::Id>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub payment_amount: Decimal,
}
