use itertools::Itertools as _;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{self, Capability},
    db::{self, event, order, ticket_type, Order, Ticket, User},
};

use super::{
    ledger::{self, Reservation},
    Error,
};

/// Places a `pending` order with one line per ticket type, reserving one
/// unit of each.
///
/// Either the order, all its lines and all reservations are committed, or
/// nothing is.
pub async fn create(
    pool: &db::Pool,
    buyer: &User,
    ticket_type_ids: &[ticket_type::Id],
) -> Result<Order, Error> {
    auth::require(buyer.role, Capability::PlaceOrders)?;
    if ticket_type_ids.is_empty() {
        return Err(Error::InvalidInput(
            "order must contain at least one ticket type".into(),
        ));
    }

    let now = OffsetDateTime::now_utc();
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let mut ticket_types = Vec::with_capacity(ticket_type_ids.len());
    for &id in ticket_type_ids {
        let ticket_type = tx
            .get_ticket_type_by_id(id)
            .await?
            .ok_or(Error::NotFound("ticket type"))?;
        ticket_types.push(ticket_type);
    }
    if let Some(event_id) =
        ticket_types.iter().map(|tt| tt.event_id).duplicates().next()
    {
        return Err(Error::DuplicatePurchase(event_id));
    }
    // Stable lock order across concurrent requests.
    ticket_types.sort_by_key(|tt| tt.event_id);

    for ticket_type in &ticket_types {
        let event = tx
            .get_event_by_id(ticket_type.event_id)
            .await?
            .ok_or(Error::NotFound("event"))?;
        if event.status != event::Status::Published {
            return Err(Error::EventNotActive);
        }
        if !ticket_type.is_on_sale_at(now) {
            return Err(Error::SaleClosed(ticket_type.id));
        }

        tx.lock_purchase(buyer.id, event.id).await?;
        if tx.has_active_order_for_event(buyer.id, event.id).await? {
            return Err(Error::DuplicatePurchase(event.id));
        }
    }

    let order_id = order::Id::new();
    let mut lines = Vec::with_capacity(ticket_types.len());
    for ticket_type in &ticket_types {
        let reserved = match ledger::reserve(&tx, ticket_type.id).await? {
            Reservation::Reserved(reserved) => reserved,
            Reservation::SoldOut => {
                return Err(Error::SoldOut(ticket_type.id));
            }
            Reservation::NotFound => {
                return Err(Error::NotFound("ticket type"));
            }
        };
        lines.push(order::Line {
            id: order::LineId::new(),
            order_id,
            ticket_type_id: reserved.id,
            event_id: reserved.event_id,
            price_per_ticket: reserved.price,
        });
    }

    let order = Order {
        id: order_id,
        code: generate_code(now),
        user_id: buyer.id,
        total_amount: lines.iter().map(|l| l.price_per_ticket).sum::<Decimal>(),
        status: order::Status::Pending,
        payment_method: None,
        payment_reference: None,
        created_at: now,
        ordered_at: now,
        paid_at: None,
        lines,
    };
    tx.insert_order(&order).await?;
    tx.commit().await?;

    tracing::info!(
        order = %order.code,
        user_id = %buyer.id,
        total = %order.total_amount,
        "order placed",
    );
    Ok(order)
}

/// Cancels a `pending` order of the caller and returns its units to the
/// ledger.
pub async fn cancel(
    pool: &db::Pool,
    user: &User,
    code: &str,
) -> Result<Order, Error> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let mut order = tx
        .lock_order_by_code(code)
        .await?
        .ok_or(Error::NotFound("order"))?;
    if order.user_id != user.id {
        return Err(Error::Forbidden);
    }
    order.status = order.status.transition(order::Status::Canceled)?;

    for line in &order.lines {
        ledger::release(&tx, line.ticket_type_id).await?;
    }
    tx.update_order_payment(&order).await?;
    tx.commit().await?;

    tracing::info!(order = %order.code, "order canceled");
    Ok(order)
}

/// Returns the order together with the tickets issued for it.
pub async fn get(
    pool: &db::Pool,
    user: &User,
    code: &str,
) -> Result<(Order, Vec<Ticket>), Error> {
    let client = pool.get().await?;
    let order = client
        .get_order_by_code(code)
        .await?
        .ok_or(Error::NotFound("order"))?;
    if order.user_id != user.id && !user.role.can(Capability::ViewAllOrders) {
        return Err(Error::Forbidden);
    }
    let tickets = client.get_tickets_by_order(order.id).await?;
    Ok((order, tickets))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scope {
    Mine,
    All,
}

/// Page of orders, newest first, plus the total count for the scope.
pub async fn list(
    pool: &db::Pool,
    user: &User,
    scope: Scope,
    offset: usize,
    limit: usize,
) -> Result<(Vec<Order>, usize), Error> {
    let owner = match scope {
        Scope::Mine => Some(user.id),
        Scope::All => {
            auth::require(user.role, Capability::ViewAllOrders)?;
            None
        }
    };

    let client = pool.get().await?;
    let page_fut = client.get_orders_page(owner, offset, limit);
    let total_count_fut = client.get_orders_count(owner);
    Ok(tokio::try_join!(page_fut, total_count_fut)?)
}

/// `ORD-<yyyymmdd>-<12 hex digits>`; uniqueness is enforced by the schema.
pub fn generate_code(now: OffsetDateTime) -> String {
    let date = now.date();
    let random = Uuid::new_v4().simple().to_string().to_uppercase();
    format!(
        "ORD-{:04}{:02}{:02}-{}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        &random[..12],
    )
}
