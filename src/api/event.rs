use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{db, service::catalog};

pub use crate::db::event::{Id, Status};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Id,
    pub name: String,
    pub status: Status,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,
    pub ticket_types: Vec<TicketType>,
}

impl Event {
    pub fn new(event: db::Event, ticket_types: Vec<db::TicketType>) -> Self {
        Self {
            id: event.id,
            name: event.name,
            status: event.status,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            ticket_types: ticket_types
                .into_iter()
                .map(TicketType::from)
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: db::ticket_type::Id,
    pub name: String,
    pub price: Decimal,
    pub quota: Option<i32>,
    pub sold: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub sale_starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub sale_ends_at: OffsetDateTime,
}

impl From<db::TicketType> for TicketType {
    fn from(tt: db::TicketType) -> Self {
        Self {
            id: tt.id,
            name: tt.name,
            price: tt.price,
            quota: tt.quota,
            sold: tt.sold,
            sale_starts_at: tt.sale_starts_at,
            sale_ends_at: tt.sale_ends_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    pub status: Status,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,
    pub ticket_types: Vec<NewTicketType>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicketType {
    pub name: String,
    pub price: Decimal,
    pub quota: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub sale_starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub sale_ends_at: OffsetDateTime,
}

impl From<NewEvent> for catalog::NewEvent {
    fn from(new: NewEvent) -> Self {
        Self {
            name: new.name,
            status: new.status,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            ticket_types: new
                .ticket_types
                .into_iter()
                .map(|tt| catalog::NewTicketType {
                    name: tt.name,
                    price: tt.price,
                    quota: tt.quota,
                    sale_starts_at: tt.sale_starts_at,
                    sale_ends_at: tt.sale_ends_at,
                })
                .collect(),
        }
    }
}
