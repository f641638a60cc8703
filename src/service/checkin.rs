//! Admission of ticket holders at the venue.

use time::{Duration, OffsetDateTime};

use crate::{
    auth::{self, Capability},
    db::{self, event, notification::Kind, ticket, Event, Ticket, User},
    notify::{self, Notifier},
};

use super::Error;

/// How long before the event start the doors open for check-in.
pub const LEAD_TIME: Duration = Duration::hours(1);

pub fn opens_at(event: &Event) -> OffsetDateTime {
    event.starts_at - LEAD_TIME
}

/// Admission preconditions, checked in this order:
/// ticket exists, event is published, doors are open, ticket is unused.
pub fn check(
    ticket: Option<&Ticket>,
    event: Option<&Event>,
    now: OffsetDateTime,
) -> Result<(), Error> {
    let ticket = ticket.ok_or(Error::NotFound("ticket"))?;
    let event = event
        .filter(|e| e.status == event::Status::Published)
        .ok_or(Error::EventNotActive)?;
    let opens_at = opens_at(event);
    if now < opens_at {
        return Err(Error::CheckinNotOpen { opens_at });
    }
    if ticket.status == ticket::Status::CheckedIn {
        return Err(Error::AlreadyCheckedIn);
    }
    Ok(())
}

/// Marks the ticket as used by `admin`. A ticket can be checked in once.
pub async fn check_in(
    pool: &db::Pool,
    notifier: &dyn Notifier,
    admin: &User,
    code: &str,
) -> Result<Ticket, Error> {
    auth::require(admin.role, Capability::CheckInTickets)?;

    let now = OffsetDateTime::now_utc();
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let ticket = tx.lock_ticket_by_code(code).await?;
    let event = match &ticket {
        Some(ticket) => tx.get_event_by_id(ticket.event_id).await?,
        None => None,
    };
    check(ticket.as_ref(), event.as_ref(), now)?;
    let (Some(mut ticket), Some(event)) = (ticket, event) else {
        return Err(Error::NotFound("ticket"));
    };

    ticket.status = ticket::Status::CheckedIn;
    ticket.checked_in_at = Some(now);
    ticket.checked_in_by = Some(admin.id);
    let ticket = tx.update_ticket_check_in(&ticket).await?;
    tx.commit().await?;

    tracing::info!(
        ticket = %ticket.code,
        event_id = %event.id,
        admin_id = %admin.id,
        "ticket checked in",
    );
    notify::dispatch(
        notifier,
        ticket.user_id,
        Kind::CheckedIn,
        format!("Ticket {} checked in for {}.", ticket.code, event.name),
    )
    .await;
    Ok(ticket)
}

/// Returns a ticket visible to `user`: their own, or any for admins.
pub async fn get_ticket(
    pool: &db::Pool,
    user: &User,
    code: &str,
) -> Result<Ticket, Error> {
    let ticket = pool
        .get()
        .await?
        .get_ticket_by_code(code)
        .await?
        .ok_or(Error::NotFound("ticket"))?;
    if ticket.user_id != user.id && !user.role.can(Capability::ViewAnyTicket) {
        return Err(Error::Forbidden);
    }
    Ok(ticket)
}

pub async fn list_tickets(
    pool: &db::Pool,
    user: &User,
) -> Result<Vec<Ticket>, Error> {
    Ok(pool.get().await?.get_tickets_by_user(user.id).await?)
}
