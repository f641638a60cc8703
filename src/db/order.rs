use constcat::concat;
use derive_more::Display;
use enum_utils::TryFromRepr;
use itertools::Itertools as _;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::Row;

use super::{event, ticket_type, user, Client, Error, Tx};

#[derive(Clone, Debug)]
pub struct Order {
    pub id: Id,
    /// Human-readable unique reference, also used by the payment gateway.
    pub code: String,
    pub user_id: user::Id,
    pub total_amount: Decimal,
    pub status: Status,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: OffsetDateTime,
    pub ordered_at: OffsetDateTime,
    pub paid_at: Option<OffsetDateTime>,
    pub lines: Vec<Line>,
}

impl Order {
    fn from_row(row: &Row, lines: Vec<Line>) -> Self {
        Self {
            id: row.get("id"),
            code: row.get("code"),
            user_id: row.get("user_id"),
            total_amount: row.get("total_amount"),
            status: row.get("payment_status"),
            payment_method: row.get("payment_method"),
            payment_reference: row.get("payment_reference"),
            created_at: row.get("created_at"),
            ordered_at: row.get("ordered_at"),
            paid_at: row.get("paid_at"),
            lines,
        }
    }
}

/// Priced line item. `price_per_ticket` is captured when the order is
/// created and never re-read from the ticket type.
#[derive(Clone, Debug)]
pub struct Line {
    pub id: LineId,
    pub order_id: Id,
    pub ticket_type_id: ticket_type::Id,
    pub event_id: event::Id,
    pub price_per_ticket: Decimal,
}

impl From<&Row> for Line {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            order_id: row.get("order_id"),
            ticket_type_id: row.get("ticket_type_id"),
            event_id: row.get("event_id"),
            price_per_ticket: row.get("price_per_ticket"),
        }
    }
}

uuid_id!(Id);

uuid_id!(LineId);

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
    /// Inventory is reserved, waiting for payment.
    #[display("pending")]
    Pending = 1,

    /// Payment is settled and tickets are issued.
    #[display("paid")]
    Paid = 2,

    /// Payment was denied or canceled by the gateway.
    #[display("failed")]
    Failed = 3,

    /// Payment window ran out on the gateway side.
    #[display("expired")]
    Expired = 4,

    /// Canceled by the buyer before payment.
    #[display("canceled")]
    Canceled = 5,
}

int2_enum!(Status, "invalid payment status");

impl Status {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }

    /// Checks that moving from `self` to `to` is legal and returns `to`.
    ///
    /// Only `pending` has outgoing edges, and they all lead to a terminal
    /// state.
    pub fn transition(self, to: Self) -> Result<Self, InvalidTransition> {
        match (self, to) {
            (
                Self::Pending,
                Self::Paid | Self::Failed | Self::Expired | Self::Canceled,
            ) => Ok(to),
            (from, to) => Err(InvalidTransition { from, to }),
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("order is {from} and cannot become {to}")]
pub struct InvalidTransition {
    pub from: Status,
    pub to: Status,
}

const SELECT_ORDER: &str = "\
    SELECT id, code, user_id, total_amount, payment_status, \
           payment_method, payment_reference, \
           created_at, ordered_at, paid_at \
    FROM orders";

const SELECT_LINES: &str = "\
    SELECT id, order_id, ticket_type_id, event_id, price_per_ticket \
    FROM order_lines";

impl Client {
    pub async fn get_order_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Order>, Error> {
        const SQL: &str = concat!(SELECT_ORDER, " WHERE code = $1");
        const LINES_SQL: &str =
            concat!(SELECT_LINES, " WHERE order_id = $1 ORDER BY id");

        let Some(row) = self.0.query_opt(SQL, &[&code]).await? else {
            return Ok(None);
        };
        let id: Id = row.get("id");
        let lines = self
            .0
            .query(LINES_SQL, &[&id])
            .await?
            .iter()
            .map(Line::from)
            .collect();
        Ok(Some(Order::from_row(&row, lines)))
    }

    /// Newest orders first, optionally restricted to a single buyer.
    pub async fn get_orders_page(
        &self,
        user_id: Option<user::Id>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Order>, Error> {
        const SQL: &str = concat!(
            SELECT_ORDER,
            " WHERE ($1::UUID IS NULL OR user_id = $1) \
              ORDER BY created_at DESC, \
                       id DESC \
              OFFSET $2 LIMIT $3",
        );
        const LINES_SQL: &str = concat!(
            SELECT_LINES,
            " WHERE order_id IN (SELECT unnest($1::UUID[])) ORDER BY id",
        );

        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = self.0.query(SQL, &[&user_id, &offset, &limit]).await?;
        let ids = rows.iter().map(|row| row.get("id")).collect::<Vec<Id>>();
        let mut lines = self
            .0
            .query(LINES_SQL, &[&ids])
            .await?
            .iter()
            .map(Line::from)
            .into_group_map_by(|line| line.order_id);

        Ok(rows
            .iter()
            .map(|row| {
                let id: Id = row.get("id");
                let lines = lines.remove(&id).unwrap_or_default();
                Order::from_row(row, lines)
            })
            .collect())
    }

    pub async fn get_orders_count(
        &self,
        user_id: Option<user::Id>,
    ) -> Result<usize, Error> {
        const SQL: &str = "\
            SELECT COUNT(*) FROM orders \
            WHERE ($1::UUID IS NULL OR user_id = $1)";
        let count = self.0.query_one(SQL, &[&user_id]).await?.get::<_, i64>(0);
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl Tx<'_> {
    /// Loads an order and holds its row lock until the transaction ends.
    pub async fn lock_order_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Order>, Error> {
        const SQL: &str =
            concat!(SELECT_ORDER, " WHERE code = $1 FOR UPDATE");
        const LINES_SQL: &str =
            concat!(SELECT_LINES, " WHERE order_id = $1 ORDER BY id");

        let Some(row) = self.0.query_opt(SQL, &[&code]).await? else {
            return Ok(None);
        };
        let id: Id = row.get("id");
        let lines = self
            .0
            .query(LINES_SQL, &[&id])
            .await?
            .iter()
            .map(Line::from)
            .collect();
        Ok(Some(Order::from_row(&row, lines)))
    }

    /// Serializes purchases of the same buyer for the same event until the
    /// transaction ends.
    pub async fn lock_purchase(
        &self,
        user_id: user::Id,
        event_id: event::Id,
    ) -> Result<(), Error> {
        const SQL: &str =
            "SELECT pg_advisory_xact_lock(hashtextextended($1::TEXT, 0))";
        let key = format!("purchase:{user_id}:{event_id}");
        self.0.execute(SQL, &[&key]).await?;
        Ok(())
    }

    /// Whether the buyer has a pending or paid order with a line for the
    /// event.
    pub async fn has_active_order_for_event(
        &self,
        user_id: user::Id,
        event_id: event::Id,
    ) -> Result<bool, Error> {
        const SQL: &str = "\
            SELECT EXISTS ( \
                SELECT 1 \
                FROM orders o \
                JOIN order_lines l ON l.order_id = o.id \
                WHERE o.user_id = $1 \
                  AND l.event_id = $2 \
                  AND o.payment_status IN ($3, $4) \
            )";
        Ok(self
            .0
            .query_one(
                SQL,
                &[&user_id, &event_id, &Status::Pending, &Status::Paid],
            )
            .await?
            .get(0))
    }

    pub async fn insert_order(&self, order: &Order) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO orders (id, code, user_id, total_amount, \
                                payment_status, payment_method, \
                                payment_reference, created_at, \
                                ordered_at, paid_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)";
        const LINE_SQL: &str = "\
            INSERT INTO order_lines (id, order_id, ticket_type_id, \
                                     event_id, price_per_ticket) \
            VALUES ($1, $2, $3, $4, $5)";

        self.0
            .execute(
                SQL,
                &[
                    &order.id,
                    &order.code,
                    &order.user_id,
                    &order.total_amount,
                    &order.status,
                    &order.payment_method,
                    &order.payment_reference,
                    &order.created_at,
                    &order.ordered_at,
                    &order.paid_at,
                ],
            )
            .await?;
        for line in &order.lines {
            self.0
                .execute(
                    LINE_SQL,
                    &[
                        &line.id,
                        &line.order_id,
                        &line.ticket_type_id,
                        &line.event_id,
                        &line.price_per_ticket,
                    ],
                )
                .await?;
        }
        Ok(())
    }

    /// Persists the payment state of an order whose row is locked by this
    /// transaction.
    pub async fn update_order_payment(&self, order: &Order) -> Result<(), Error> {
        const SQL: &str = "\
            UPDATE orders \
            SET payment_status = $2, \
                payment_method = $3, \
                payment_reference = $4, \
                paid_at = $5 \
            WHERE id = $1";

        self.0
            .execute(
                SQL,
                &[
                    &order.id,
                    &order.status,
                    &order.payment_method,
                    &order.payment_reference,
                    &order.paid_at,
                ],
            )
            .await?;
        Ok(())
    }
}
