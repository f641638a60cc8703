use constcat::concat;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio_postgres::Row;

use super::{event, Client, Error, Tx};

#[derive(Clone, Debug)]
pub struct TicketType {
    pub id: Id,
    pub event_id: event::Id,
    pub name: String,
    pub price: Decimal,
    /// `None` until the ticket type is activated for sale.
    pub quota: Option<i32>,
    pub sold: i32,
    pub sale_starts_at: OffsetDateTime,
    pub sale_ends_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl TicketType {
    pub fn is_on_sale_at(&self, now: OffsetDateTime) -> bool {
        self.sale_starts_at <= now && now < self.sale_ends_at
    }
}

impl From<&Row> for TicketType {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            event_id: row.get("event_id"),
            name: row.get("name"),
            price: row.get("price"),
            quota: row.get("quota"),
            sold: row.get("sold"),
            sale_starts_at: row.get("sale_starts_at"),
            sale_ends_at: row.get("sale_ends_at"),
            deleted_at: row.get("deleted_at"),
        }
    }
}

uuid_id!(Id);

const COLUMNS: &str = "\
    id, event_id, name, price, quota, sold, \
    sale_starts_at, sale_ends_at, deleted_at";

impl Client {
    pub async fn get_ticket_types_by_event(
        &self,
        event_id: event::Id,
    ) -> Result<Vec<TicketType>, Error> {
        const SQL: &str = concat!(
            "SELECT ",
            COLUMNS,
            " FROM ticket_types \
              WHERE event_id = $1 AND deleted_at IS NULL \
              ORDER BY price, name",
        );
        Ok(self
            .0
            .query(SQL, &[&event_id])
            .await?
            .iter()
            .map(TicketType::from)
            .collect())
    }
}

impl Tx<'_> {
    pub async fn get_ticket_type_by_id(
        &self,
        id: Id,
    ) -> Result<Option<TicketType>, Error> {
        const SQL: &str = concat!(
            "SELECT ",
            COLUMNS,
            " FROM ticket_types WHERE id = $1 AND deleted_at IS NULL",
        );
        Ok(self
            .0
            .query_opt(SQL, &[&id])
            .await?
            .as_ref()
            .map(TicketType::from))
    }

    pub async fn insert_ticket_type(
        &self,
        ticket_type: &TicketType,
    ) -> Result<(), Error> {
        const SQL: &str = concat!(
            "INSERT INTO ticket_types (",
            COLUMNS,
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        );

        self.0
            .execute(
                SQL,
                &[
                    &ticket_type.id,
                    &ticket_type.event_id,
                    &ticket_type.name,
                    &ticket_type.price,
                    &ticket_type.quota,
                    &ticket_type.sold,
                    &ticket_type.sale_starts_at,
                    &ticket_type.sale_ends_at,
                    &ticket_type.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Increments `sold` by one if a unit is left.
    ///
    /// The conditional `UPDATE` takes the row lock and re-checks
    /// `sold < quota` after acquiring it, so concurrent callers racing for
    /// the last unit are serialized and only one of them gets a row back.
    pub async fn increment_sold(
        &self,
        id: Id,
    ) -> Result<Option<TicketType>, Error> {
        const SQL: &str = concat!(
            "UPDATE ticket_types SET sold = sold + 1 \
             WHERE id = $1 \
               AND deleted_at IS NULL \
               AND quota IS NOT NULL \
               AND sold < quota \
             RETURNING ",
            COLUMNS,
        );
        Ok(self
            .0
            .query_opt(SQL, &[&id])
            .await?
            .as_ref()
            .map(TicketType::from))
    }

    /// Decrements `sold` by one, returning the new value, or `None` if the
    /// row is missing or `sold` is already zero.
    pub async fn decrement_sold(&self, id: Id) -> Result<Option<i32>, Error> {
        const SQL: &str = "\
            UPDATE ticket_types SET sold = sold - 1 \
            WHERE id = $1 AND sold > 0 \
            RETURNING sold";
        Ok(self
            .0
            .query_opt(SQL, &[&id])
            .await?
            .map(|row| row.get("sold")))
    }

    pub async fn ticket_type_exists(&self, id: Id) -> Result<bool, Error> {
        const SQL: &str = "\
            SELECT EXISTS ( \
                SELECT 1 FROM ticket_types \
                WHERE id = $1 AND deleted_at IS NULL \
            )";
        Ok(self.0.query_one(SQL, &[&id]).await?.get(0))
    }
}
