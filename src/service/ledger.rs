//! Inventory ledger guarding `0 <= sold <= quota` for every ticket type.
//!
//! Both operations must run inside the transaction that owns the rest of the
//! order change, so a rollback also undoes the counter movement.

use crate::db::{ticket_type, TicketType, Tx};

use super::Error;

#[derive(Debug)]
pub enum Reservation {
    /// One unit is taken. Carries the ticket type as it was right after the
    /// increment, so its price is the one to snapshot.
    Reserved(TicketType),
    SoldOut,
    NotFound,
}

pub async fn reserve(
    tx: &Tx<'_>,
    id: ticket_type::Id,
) -> Result<Reservation, Error> {
    if let Some(ticket_type) = tx.increment_sold(id).await? {
        return Ok(Reservation::Reserved(ticket_type));
    }
    // Not-yet-activated ticket types (no quota) have nothing to sell.
    Ok(if tx.ticket_type_exists(id).await? {
        Reservation::SoldOut
    } else {
        Reservation::NotFound
    })
}

/// Gives one unit back. A counter already at zero means a release without
/// a matching reservation, which is reported instead of being clamped.
pub async fn release(tx: &Tx<'_>, id: ticket_type::Id) -> Result<(), Error> {
    match tx.decrement_sold(id).await? {
        Some(_) => Ok(()),
        None => {
            tracing::error!(ticket_type_id = %id, "inventory release underflow");
            Err(Error::LedgerUnderflow(id))
        }
    }
}
