//! Provider-side ticket validation
//!
//! The validator recomputes the same verification the vault will perform,
//! before the provider spends resources serving a request. It is a pure
//! function of the fixed vault/signer identities plus a local watermark:
//! the highest sequence it has already accepted, used only to reject
//! replays before settlement. The watermark is a cache of vault truth, not
//! a source of it.

use alloy_primitives::{Address, U256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::crypto::{is_authorized_signer, recover_signer};
use crate::domain::ClaimableTicket;

/// Reasons a ticket is rejected, in evaluation order.
///
/// Every rejection is terminal for that ticket: the issuer can only produce
/// a new, higher-sequence ticket, never repair a rejected one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No ticket was provided with the request
    #[error("payment ticket missing")]
    MissingTicket,

    /// Sequence does not supersede the highest already accepted
    #[error("ticket sequence {sequence} is not newer than watermark {watermark}")]
    OutdatedSequence { sequence: U256, watermark: U256 },

    /// Ticket names a different payee identity
    #[error("ticket payee does not match this provider")]
    WrongPayee,

    /// Ticket targets a different vault deployment
    #[error("ticket vault address does not match this deployment")]
    WrongVault,

    /// Cumulative amount is below the per-request floor
    #[error("ticket amount {amount} is below the per-request cost {floor}")]
    AmountBelowFloor { amount: U256, floor: U256 },

    /// Recovered signer is not the authorized payer key
    #[error("ticket signature does not recover to the authorized signer")]
    BadSignature,
}

/// Validates tickets against fixed deployment identities and a replay
/// watermark.
pub struct TicketValidator {
    payee: String,
    vault: Address,
    authorized_signer: Address,
    cost_per_request: U256,
    watermark: Mutex<U256>,
}

impl TicketValidator {
    pub fn new(
        payee: impl Into<String>,
        vault: Address,
        authorized_signer: Address,
        cost_per_request: U256,
    ) -> Self {
        Self {
            payee: payee.into(),
            vault,
            authorized_signer,
            cost_per_request,
            watermark: Mutex::new(U256::ZERO),
        }
    }

    /// Verify a ticket. On acceptance the watermark advances to the
    /// ticket's sequence; rejections leave it untouched.
    ///
    /// The amount check is a floor, never an exact match: cumulative growth
    /// across unsettled requests is expected and legitimate.
    pub async fn verify(&self, ticket: Option<&ClaimableTicket>) -> Result<(), ValidationError> {
        let ticket = ticket.ok_or(ValidationError::MissingTicket)?;

        let mut watermark = self.watermark.lock().await;

        if ticket.sequence() <= *watermark {
            return Err(ValidationError::OutdatedSequence {
                sequence: ticket.sequence(),
                watermark: *watermark,
            });
        }
        if ticket.ticket.payee != self.payee {
            return Err(ValidationError::WrongPayee);
        }
        if ticket.ticket.vault != self.vault {
            return Err(ValidationError::WrongVault);
        }
        if ticket.amount() < self.cost_per_request {
            return Err(ValidationError::AmountBelowFloor {
                amount: ticket.amount(),
                floor: self.cost_per_request,
            });
        }

        let recovered =
            recover_signer(&ticket.digest(), &ticket.signature).map_err(|_| ValidationError::BadSignature)?;
        if !is_authorized_signer(recovered, self.authorized_signer) {
            return Err(ValidationError::BadSignature);
        }

        *watermark = ticket.sequence();
        debug!(sequence = %ticket.sequence(), "ticket accepted");
        Ok(())
    }

    /// Apply an observed successful claim: the vault's accepted sequence is
    /// authoritative, so set the watermark to it exactly.
    pub async fn confirm_settled(&self, sequence: U256) {
        *self.watermark.lock().await = sequence;
    }

    /// Current replay watermark.
    pub async fn watermark(&self) -> U256 {
        *self.watermark.lock().await
    }
}
