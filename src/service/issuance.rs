//! Turns the lines of an order that just became `paid` into tickets.

use futures::future::join_all;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::{ticket, Order, Ticket, Tx, User},
    qr::{ArtifactLocation, RenderError, Renderer},
};

use super::Error;

/// Issues exactly one ticket per order line inside `tx`.
///
/// Must run in the same transaction that moves the order to `paid`: a
/// render or insert failure aborts the whole transaction, so either every
/// line gets its ticket or none does. Artifacts already rendered for a
/// failed issuance are discarded.
pub async fn issue(
    tx: &Tx<'_>,
    renderer: &dyn Renderer,
    order: &Order,
    buyer: &User,
    now: OffsetDateTime,
) -> Result<Vec<Ticket>, Error> {
    let codes = order.lines.iter().map(|_| generate_code()).collect::<Vec<_>>();
    let locations = render_all(renderer, &codes).await?;

    let mut tickets = Vec::with_capacity(order.lines.len());
    for ((line, code), qr_location) in
        order.lines.iter().zip(&codes).zip(locations)
    {
        let ticket = Ticket {
            id: ticket::Id::new(),
            code: code.clone(),
            order_line_id: line.id,
            event_id: line.event_id,
            ticket_type_id: line.ticket_type_id,
            user_id: buyer.id,
            attendee_name: buyer.name.clone(),
            qr_location,
            status: ticket::Status::Active,
            checked_in_at: None,
            checked_in_by: None,
            created_at: now,
            deleted_at: None,
        };
        if let Err(e) = tx.insert_ticket(&ticket).await {
            discard_codes(renderer, &codes).await;
            return Err(e.into());
        }
        tickets.push(ticket);
    }

    tracing::info!(
        order = %order.code,
        count = tickets.len(),
        "tickets issued",
    );
    Ok(tickets)
}

/// Removes the artifacts of tickets whose transaction did not commit.
pub async fn discard(renderer: &dyn Renderer, tickets: &[Ticket]) {
    join_all(tickets.iter().map(|t| renderer.discard(&t.code))).await;
}

async fn discard_codes(renderer: &dyn Renderer, codes: &[String]) {
    join_all(codes.iter().map(|code| renderer.discard(code))).await;
}

/// Renders every code concurrently. On failure, the artifacts that did get
/// rendered are discarded and the first error is returned.
async fn render_all(
    renderer: &dyn Renderer,
    codes: &[String],
) -> Result<Vec<ArtifactLocation>, RenderError> {
    let results = join_all(codes.iter().map(|code| renderer.render(code))).await;

    let mut locations = Vec::with_capacity(codes.len());
    let mut rendered = Vec::with_capacity(codes.len());
    let mut failure = None;
    for (code, result) in codes.iter().zip(results) {
        match result {
            Ok(location) => {
                locations.push(location);
                rendered.push(code.clone());
            }
            Err(e) => {
                failure.get_or_insert(e);
            }
        }
    }

    match failure {
        None => Ok(locations),
        Some(e) => {
            tracing::warn!(
                rendered = rendered.len(),
                total = codes.len(),
                error = %e,
                "ticket rendering failed, discarding artifacts",
            );
            discard_codes(renderer, &rendered).await;
            Err(e)
        }
    }
}

/// `TKT-` followed by 32 hex digits of a random (v4) UUID, which leaves 122
/// random bits per code.
pub fn generate_code() -> String {
    format!("TKT-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}
