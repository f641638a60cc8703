//! Order, payment, issuance and admission operations.
//!
//! Every operation that touches more than one row runs in a single
//! [`db::Tx`]. Notifications are sent only after the transaction commits.

pub mod catalog;
pub mod checkin;
pub mod issuance;
pub mod ledger;
pub mod order;
pub mod settlement;

use axum::http::StatusCode;
use derive_more::{Display, From};
use rust_decimal::Decimal;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    db::{self, event, order as db_order, ticket_type},
    gateway, qr,
};

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("{_0} not found")]
    NotFound(&'static str),

    #[from]
    #[display("{_0}")]
    InvalidStateTransition(db_order::InvalidTransition),

    #[display("ticket type {_0} is sold out")]
    SoldOut(ticket_type::Id),

    #[display("an active order for event {_0} already exists")]
    DuplicatePurchase(event::Id),

    #[display("payment of {offered} is less than the order total of {required}")]
    InsufficientPayment { required: Decimal, offered: Decimal },

    #[display("authentication required")]
    Unauthorized,

    #[from]
    #[display("payment callback rejected: {_0}")]
    CallbackRejected(gateway::VerifyError),

    #[display("operation is not allowed for this user")]
    Forbidden,

    #[display("event is not published")]
    EventNotActive,

    #[display("ticket type {_0} is not on sale")]
    SaleClosed(ticket_type::Id),

    #[display("check-in opens at {}", rfc3339(opens_at))]
    CheckinNotOpen { opens_at: OffsetDateTime },

    #[display("ticket is already checked in")]
    AlreadyCheckedIn,

    #[display("{_0}")]
    InvalidInput(String),

    #[display("inventory of ticket type {_0} is already at zero")]
    LedgerUnderflow(ticket_type::Id),

    #[from]
    #[display("cannot render ticket artifact: {_0}")]
    Render(qr::RenderError),

    #[from]
    #[display("cannot issue access token: {_0}")]
    Token(jsonwebtoken::errors::Error),

    #[from]
    #[display("internal error: {_0}")]
    Internal(db::Error),
}

impl std::error::Error for Error {}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidStateTransition(_)
            | Self::SoldOut(_)
            | Self::DuplicatePurchase(_)
            | Self::EventNotActive
            | Self::SaleClosed(_)
            | Self::AlreadyCheckedIn => StatusCode::CONFLICT,
            Self::InsufficientPayment { .. }
            | Self::CheckinNotOpen { .. }
            | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::CallbackRejected(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::LedgerUnderflow(_)
            | Self::Render(_)
            | Self::Token(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable name of the failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            Self::SoldOut(_) => "SOLD_OUT",
            Self::DuplicatePurchase(_) => "DUPLICATE_PURCHASE",
            Self::InsufficientPayment { .. } => "INSUFFICIENT_PAYMENT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::CallbackRejected(_) => "CALLBACK_REJECTED",
            Self::Forbidden => "FORBIDDEN",
            Self::EventNotActive => "EVENT_NOT_ACTIVE",
            Self::SaleClosed(_) => "SALE_CLOSED",
            Self::CheckinNotOpen { .. } => "CHECKIN_NOT_OPEN",
            Self::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::LedgerUnderflow(_)
            | Self::Render(_)
            | Self::Token(_)
            | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure comes from the server side and must not be
    /// described to the caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Render(_)
                | Self::Token(_)
                | Self::LedgerUnderflow(_),
        )
    }
}

fn rfc3339(at: &OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}
