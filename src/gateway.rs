//! Inbound payment gateway callbacks.
//!
//! The gateway may deliver the same notification several times and in any
//! order. Deduplication happens in settlement by looking at the current order
//! state, not here.

use constant_time_eq::constant_time_eq;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha512};

use crate::db::order;

/// Callback body as sent by the gateway.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Callback {
    /// Order code the payment was made for.
    pub order_id: String,
    pub transaction_status: String,
    pub payment_type: Option<String>,
    pub transaction_id: Option<String>,
    pub status_code: Option<String>,
    pub gross_amount: Option<String>,
    pub signature_key: Option<String>,
    pub fraud_status: Option<String>,
}

/// Settlement outcome a callback asks for.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Outcome {
    #[display("paid")]
    Paid,
    #[display("failed")]
    Failed,
    #[display("expired")]
    Expired,
}

impl Outcome {
    /// Maps a gateway transaction status, or `None` if it is not one we
    /// know how to handle.
    pub fn from_transaction_status(status: &str) -> Option<Self> {
        match status {
            "capture" | "settlement" => Some(Self::Paid),
            "deny" | "cancel" => Some(Self::Failed),
            "expire" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn status(self) -> order::Status {
        match self {
            Self::Paid => order::Status::Paid,
            Self::Failed => order::Status::Failed,
            Self::Expired => order::Status::Expired,
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum VerifyError {
    #[display("signature fields are missing")]
    MissingFields,
    #[display("signature does not match")]
    Mismatch,
}

/// Authenticity check applied to every callback before it is processed.
pub trait Verifier: Send + Sync {
    fn verify(&self, callback: &Callback) -> Result<(), VerifyError>;
}

/// Accepts every callback. Used when no server key is configured.
pub struct Unverified;

impl Verifier for Unverified {
    fn verify(&self, _: &Callback) -> Result<(), VerifyError> {
        Ok(())
    }
}

/// Checks `signature_key` against
/// `SHA-512(order_id + status_code + gross_amount + server_key)`.
pub struct SignatureKey {
    server_key: String,
}

impl SignatureKey {
    pub fn new(server_key: String) -> Self {
        Self { server_key }
    }
}

impl Verifier for SignatureKey {
    fn verify(&self, callback: &Callback) -> Result<(), VerifyError> {
        let (Some(status_code), Some(gross_amount), Some(signature)) = (
            &callback.status_code,
            &callback.gross_amount,
            &callback.signature_key,
        ) else {
            return Err(VerifyError::MissingFields);
        };

        let expected = Sha512::new()
            .chain_update(&callback.order_id)
            .chain_update(status_code)
            .chain_update(gross_amount)
            .chain_update(&self.server_key)
            .finalize();
        let signature =
            hex::decode(signature).map_err(|_| VerifyError::Mismatch)?;
        if constant_time_eq(&expected, &signature) {
            Ok(())
        } else {
            Err(VerifyError::Mismatch)
        }
    }
}
