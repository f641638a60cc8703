//! Moves orders out of `pending`, either through a manual checkout by the
//! buyer or through a payment gateway callback.
//!
//! Both paths lock the order row first and treat an order that is already
//! settled as done: no transition and no side effect is applied twice.

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    db::{self, notification::Kind, order, Order, Ticket, Tx, User},
    gateway::{Callback, Outcome, Verifier},
    notify::{self, Notifier},
    qr::Renderer,
};

use super::{issuance, ledger, Error};

#[derive(Debug)]
pub enum Settlement {
    /// The order left `pending` during this call.
    Applied { order: Order, tickets: Vec<Ticket> },

    /// The order had already been settled; nothing was changed.
    AlreadySettled(Order),
}

impl Settlement {
    pub fn order(&self) -> &Order {
        match self {
            Self::Applied { order, .. } | Self::AlreadySettled(order) => order,
        }
    }
}

struct Payment {
    method: Option<String>,
    reference: Option<String>,
}

/// Settles a locked `pending` order. Paid orders get their tickets issued,
/// any other outcome returns the reserved units to the ledger.
async fn settle(
    tx: &Tx<'_>,
    renderer: &dyn Renderer,
    mut order: Order,
    outcome: Outcome,
    payment: Payment,
    now: OffsetDateTime,
) -> Result<(Order, Vec<Ticket>), Error> {
    order.status = order.status.transition(outcome.status())?;
    order.payment_method = payment.method;
    order.payment_reference = payment.reference;

    let tickets = match outcome {
        Outcome::Paid => {
            order.paid_at = Some(now);
            tx.update_order_payment(&order).await?;
            let buyer = tx
                .get_user_by_id(order.user_id)
                .await?
                .ok_or(Error::NotFound("buyer"))?;
            issuance::issue(tx, renderer, &order, &buyer, now).await?
        }
        Outcome::Failed | Outcome::Expired => {
            for line in &order.lines {
                ledger::release(tx, line.ticket_type_id).await?;
            }
            tx.update_order_payment(&order).await?;
            Vec::new()
        }
    };
    Ok((order, tickets))
}

/// Commits a settlement. Artifacts of tickets that did not make it into the
/// database are discarded.
async fn commit(
    tx: Tx<'_>,
    renderer: &dyn Renderer,
    tickets: &[Ticket],
) -> Result<(), Error> {
    if let Err(e) = tx.commit().await {
        issuance::discard(renderer, tickets).await;
        return Err(e.into());
    }
    Ok(())
}

async fn notify_settled(
    notifier: &dyn Notifier,
    order: &Order,
    tickets: &[Ticket],
) {
    let (kind, message) = match order.status {
        order::Status::Paid => (
            Kind::TicketsIssued,
            format!(
                "Payment for order {} received, {} ticket(s) issued.",
                order.code,
                tickets.len(),
            ),
        ),
        status => (
            Kind::PaymentFailed,
            format!(
                "Payment for order {} {status}, reserved tickets were released.",
                order.code,
            ),
        ),
    };
    notify::dispatch(notifier, order.user_id, kind, message).await;
}

/// Buyer-initiated settlement. `amount` must cover the order total.
pub async fn checkout(
    pool: &db::Pool,
    renderer: &dyn Renderer,
    notifier: &dyn Notifier,
    user: &User,
    code: &str,
    amount: Decimal,
) -> Result<Settlement, Error> {
    let now = OffsetDateTime::now_utc();
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let order = tx
        .lock_order_by_code(code)
        .await?
        .ok_or(Error::NotFound("order"))?;
    if order.user_id != user.id {
        return Err(Error::Forbidden);
    }
    match order.status {
        order::Status::Pending => {}
        order::Status::Paid => {
            tracing::info!(order = %order.code, "checkout of a paid order ignored");
            return Ok(Settlement::AlreadySettled(order));
        }
        from => {
            return Err(order::InvalidTransition {
                from,
                to: order::Status::Paid,
            }
            .into());
        }
    }
    check_amount(order.total_amount, amount)?;

    let payment = Payment {
        method: Some("manual".into()),
        reference: None,
    };
    let (order, tickets) =
        settle(&tx, renderer, order, Outcome::Paid, payment, now).await?;
    commit(tx, renderer, &tickets).await?;

    tracing::info!(order = %order.code, "order paid by checkout");
    notify_settled(notifier, &order, &tickets).await;
    Ok(Settlement::Applied { order, tickets })
}

/// Gateway-initiated settlement.
///
/// Duplicate and late callbacks for orders that are no longer `pending`
/// are acknowledged without effect. Callers must acknowledge the gateway
/// whatever this returns.
pub async fn handle_callback(
    pool: &db::Pool,
    renderer: &dyn Renderer,
    notifier: &dyn Notifier,
    verifier: &dyn Verifier,
    callback: Callback,
) -> Result<Settlement, Error> {
    verifier.verify(&callback)?;

    let outcome = Outcome::from_transaction_status(&callback.transaction_status)
        .unwrap_or_else(|| {
            tracing::warn!(
                order = %callback.order_id,
                status = %callback.transaction_status,
                "unhandled transaction status, settling as failed",
            );
            Outcome::Failed
        });

    let now = OffsetDateTime::now_utc();
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let order = tx
        .lock_order_by_code(&callback.order_id)
        .await?
        .ok_or(Error::NotFound("order"))?;
    if order.status.is_terminal() {
        tracing::info!(
            order = %order.code,
            status = %order.status,
            requested = %outcome,
            "callback for settled order ignored",
        );
        return Ok(Settlement::AlreadySettled(order));
    }

    let payment = Payment {
        method: callback.payment_type,
        reference: callback.transaction_id,
    };
    let (order, tickets) =
        settle(&tx, renderer, order, outcome, payment, now).await?;
    commit(tx, renderer, &tickets).await?;

    tracing::info!(order = %order.code, status = %order.status, "order settled by gateway");
    notify_settled(notifier, &order, &tickets).await;
    Ok(Settlement::Applied { order, tickets })
}

fn check_amount(required: Decimal, offered: Decimal) -> Result<(), Error> {
    if offered < required {
        Err(Error::InsufficientPayment { required, offered })
    } else {
        Ok(())
    }
}
