/// Declares a UUID-backed identifier stored in `UUID` columns.
macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            ::serde::Deserialize,
            ::derive_more::Display,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            ::serde::Serialize,
        )]
        pub struct $name(::uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(::uuid::Uuid::new_v4())
            }
        }

        impl From<u128> for $name {
            fn from(value: u128) -> Self {
                Self(::uuid::Uuid::from_u128(value))
            }
        }

        impl ::tokio_postgres::types::FromSql<'_> for $name {
            ::tokio_postgres::types::accepts!(UUID);

            fn from_sql(
                ty: &::tokio_postgres::types::Type,
                raw: &[u8],
            ) -> Result<
                Self,
                Box<dyn ::std::error::Error + Sync + Send>,
            > {
                <::uuid::Uuid as ::tokio_postgres::types::FromSql>::from_sql(
                    ty, raw,
                )
                .map(Self)
            }
        }

        impl ::tokio_postgres::types::ToSql for $name {
            ::tokio_postgres::types::accepts!(UUID);

            ::tokio_postgres::types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &::tokio_postgres::types::Type,
                out: &mut ::tokio_postgres::types::private::BytesMut,
            ) -> Result<
                ::tokio_postgres::types::IsNull,
                Box<dyn ::std::error::Error + Sync + Send>,
            > {
                <::uuid::Uuid as ::tokio_postgres::types::ToSql>::to_sql(
                    &self.0, ty, out,
                )
            }
        }
    };
}

/// Declares `FromSql`/`ToSql` for a `#[repr(u8)]` enum stored in `INT2`
/// columns. The enum must derive `enum_utils::TryFromRepr`.
macro_rules! int2_enum {
    ($name:ident, $what:literal) => {
        impl ::tokio_postgres::types::FromSql<'_> for $name {
            ::tokio_postgres::types::accepts!(INT2);

            fn from_sql(
                ty: &::tokio_postgres::types::Type,
                raw: &[u8],
            ) -> Result<
                Self,
                Box<dyn ::std::error::Error + Sync + Send>,
            > {
                let repr =
                    <i16 as ::tokio_postgres::types::FromSql>::from_sql(
                        ty, raw,
                    )?;
                let repr = u8::try_from(repr)?;
                Self::try_from(repr).map_err(|_| $what.into())
            }
        }

        impl ::tokio_postgres::types::ToSql for $name {
            ::tokio_postgres::types::accepts!(INT2);

            ::tokio_postgres::types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &::tokio_postgres::types::Type,
                out: &mut ::tokio_postgres::types::private::BytesMut,
            ) -> Result<
                ::tokio_postgres::types::IsNull,
                Box<dyn ::std::error::Error + Sync + Send>,
            > {
                let repr = i16::from((*self) as u8);
                <i16 as ::tokio_postgres::types::ToSql>::to_sql(&repr, ty, out)
            }
        }
    };
}

pub mod event;
pub mod notification;
pub mod order;
pub mod ticket;
pub mod ticket_type;
pub mod user;

use std::error::Error as StdError;

use deadpool_postgres::{CreatePoolError, PoolConfig, Runtime};
use derive_more::{Display, From};
use tokio_postgres::NoTls;

use crate::config;

pub use self::{
    event::Event, notification::Notification, order::Order, ticket::Ticket,
    ticket_type::TicketType, user::User,
};

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("postgres: {_0}")]
    Postgres(tokio_postgres::Error),
    #[display("connection pool: {_0}")]
    Pool(deadpool_postgres::PoolError),
}

impl StdError for Error {}

pub fn connect(config: config::Db) -> Result<Pool, CreatePoolError> {
    let mut cfg = deadpool_postgres::Config::new();
    cfg.url = Some(config.url);
    cfg.pool = Some(PoolConfig::new(config.pool_size));
    cfg.create_pool(Some(Runtime::Tokio1), NoTls).map(Pool)
}

#[derive(Clone)]
pub struct Pool(deadpool_postgres::Pool);

impl Pool {
    pub async fn get(&self) -> Result<Client, Error> {
        Ok(Client(self.0.get().await?))
    }
}

/// Pooled connection. Reads made through it take no locks and may observe
/// stale values.
pub struct Client(deadpool_postgres::Object);

impl Client {
    /// Opens a READ COMMITTED transaction. Every check-then-write inside it
    /// must lock its rows first (`FOR UPDATE` or a conditional `UPDATE`).
    pub async fn transaction(&mut self) -> Result<Tx<'_>, Error> {
        Ok(Tx(self.0.transaction().await?))
    }
}

/// Open transaction. Dropping it without [`Tx::commit`] rolls back.
pub struct Tx<'a>(deadpool_postgres::Transaction<'a>);

impl Tx<'_> {
    pub async fn commit(self) -> Result<(), Error> {
        Ok(self.0.commit().await?)
    }
}
