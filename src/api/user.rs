use serde::{Deserialize, Serialize};

use crate::db;

pub use crate::db::user::{Id, PasswordHash, Role};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub role: Role,
}

impl From<db::User> for User {
    fn from(user: db::User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            role: user.role,
        }
    }
}
