//! Role-based capabilities.

use crate::{db::user::Role, service::Error};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capability {
    PlaceOrders,
    ViewAllOrders,
    ViewAnyTicket,
    CheckInTickets,
    ManageCatalog,
}

impl Role {
    pub fn can(self, capability: Capability) -> bool {
        use Capability as C;

        match self {
            Self::Customer => matches!(capability, C::PlaceOrders),
            Self::Admin => matches!(
                capability,
                C::ViewAllOrders
                    | C::ViewAnyTicket
                    | C::CheckInTickets
                    | C::ManageCatalog,
            ),
        }
    }
}

pub fn require(role: Role, capability: Capability) -> Result<(), Error> {
    if role.can(capability) {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}
