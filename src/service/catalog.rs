//! Minimal catalog setup: events are created together with their ticket
//! types and are read back with live inventory counters.

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    auth::{self, Capability},
    db::{self, event, ticket_type, Event, TicketType, User},
};

use super::Error;

pub struct NewEvent {
    pub name: String,
    pub status: event::Status,
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
    pub ticket_types: Vec<NewTicketType>,
}

pub struct NewTicketType {
    pub name: String,
    pub price: Decimal,
    pub quota: Option<i32>,
    pub sale_starts_at: OffsetDateTime,
    pub sale_ends_at: OffsetDateTime,
}

pub async fn create_event(
    pool: &db::Pool,
    admin: &User,
    new: NewEvent,
) -> Result<(Event, Vec<TicketType>), Error> {
    auth::require(admin.role, Capability::ManageCatalog)?;
    validate(&new)?;

    let now = OffsetDateTime::now_utc();
    let event = Event {
        id: event::Id::new(),
        name: new.name,
        status: new.status,
        starts_at: new.starts_at,
        ends_at: new.ends_at,
        created_by: admin.id,
        created_at: now,
        deleted_at: None,
    };
    let ticket_types = new
        .ticket_types
        .into_iter()
        .map(|tt| TicketType {
            id: ticket_type::Id::new(),
            event_id: event.id,
            name: tt.name,
            price: tt.price,
            quota: tt.quota,
            sold: 0,
            sale_starts_at: tt.sale_starts_at,
            sale_ends_at: tt.sale_ends_at,
            deleted_at: None,
        })
        .collect::<Vec<_>>();

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;
    tx.insert_event(&event).await?;
    for ticket_type in &ticket_types {
        tx.insert_ticket_type(ticket_type).await?;
    }
    tx.commit().await?;

    tracing::info!(event_id = %event.id, name = %event.name, "event created");
    Ok((event, ticket_types))
}

pub async fn get_event(
    pool: &db::Pool,
    id: event::Id,
) -> Result<(Event, Vec<TicketType>), Error> {
    let client = pool.get().await?;
    let event = client
        .get_event_by_id(id)
        .await?
        .ok_or(Error::NotFound("event"))?;
    let ticket_types = client.get_ticket_types_by_event(id).await?;
    Ok((event, ticket_types))
}

fn validate(new: &NewEvent) -> Result<(), Error> {
    use Error as E;

    if new.name.trim().is_empty() {
        return Err(E::InvalidInput("event name must not be empty".into()));
    }
    if new.ends_at <= new.starts_at {
        return Err(E::InvalidInput("event must end after it starts".into()));
    }
    for tt in &new.ticket_types {
        if tt.name.trim().is_empty() {
            return Err(E::InvalidInput(
                "ticket type name must not be empty".into(),
            ));
        }
        if tt.price.is_sign_negative() {
            return Err(E::InvalidInput(format!(
                "price of {} must not be negative",
                tt.name,
            )));
        }
        if tt.quota.is_some_and(|q| q < 0) {
            return Err(E::InvalidInput(format!(
                "quota of {} must not be negative",
                tt.name,
            )));
        }
        if tt.sale_ends_at <= tt.sale_starts_at {
            return Err(E::InvalidInput(format!(
                "sale window of {} must end after it starts",
                tt.name,
            )));
        }
    }
    Ok(())
}
