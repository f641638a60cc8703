use std::error::Error as StdError;

use constcat::concat;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Row,
};

use super::{Client, Error, Tx};

#[derive(Clone, Debug)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub role: Role,
    pub login: String,
    pub password_hash: PasswordHash,
}

impl From<&Row> for User {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            login: row.get("login"),
            password_hash: row.get("password_hash"),
            role: row.get("role"),
        }
    }
}

uuid_id!(Id);

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, TryFromRepr, PartialEq, Serialize,
)]
#[repr(u8)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Buys tickets and manages own orders.
    Customer = 1,

    /// Runs the catalog and admits attendees at the venue.
    Admin = 2,
}

int2_enum!(Role, "invalid role");

/// Hex-encoded SHA-256 digest of a password.
#[derive(Clone, Debug, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(secret: &str) -> Self {
        Self(hex::encode(Sha256::digest(secret.as_bytes())))
    }
}

impl FromSql<'_> for PasswordHash {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for PasswordHash {
    accepts!(TEXT);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

const SELECT: &str = "SELECT id, name, login, password_hash, role FROM users";

impl Client {
    pub async fn get_user_by_login(
        &self,
        login: &str,
    ) -> Result<Option<User>, Error> {
        const SQL: &str = concat!(SELECT, " WHERE login = $1 LIMIT 1");
        Ok(self
            .0
            .query_opt(SQL, &[&login])
            .await?
            .as_ref()
            .map(User::from))
    }

    pub async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error> {
        const SQL: &str = concat!(SELECT, " WHERE id = $1 LIMIT 1");
        Ok(self.0.query_opt(SQL, &[&id]).await?.as_ref().map(User::from))
    }
}

impl Tx<'_> {
    pub async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error> {
        const SQL: &str = concat!(SELECT, " WHERE id = $1 LIMIT 1");
        Ok(self.0.query_opt(SQL, &[&id]).await?.as_ref().map(User::from))
    }
}
