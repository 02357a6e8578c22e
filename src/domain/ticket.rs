//! Payment ticket types
//!
//! A [`Ticket`] is an unsigned voucher naming a payee identity, a cumulative
//! amount, a sequence number, and the vault it targets. A
//! [`ClaimableTicket`] is a ticket plus the payer's recoverable signature
//! over the ticket digest; it is immutable once created and only ever
//! superseded by a ticket with a strictly greater sequence.
//!
//! Wire format (field names fixed by the transport contract):
//!
//! ```json
//! {
//!   "toPayeeIdentity": "0zk1...",
//!   "nonce": "3",
//!   "amount": "900",
//!   "vaultContractAddress": "0x...",
//!   "signature": "0x<130 hex chars>"
//! }
//! ```

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::crypto::hash::ticket_digest;
use crate::crypto::signing::{TicketSignature, TicketSigner};
use crate::crypto::SigningError;
use crate::domain::u256_decimal;

/// Unsigned payment voucher.
///
/// `payee` and `vault` are fixed per deployment; only `sequence` and
/// `amount` vary per issuance. A sequence of zero is the "no tickets issued
/// yet" sentinel and must never appear on a signed ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Opaque payee identity (privacy-address string)
    #[serde(rename = "toPayeeIdentity")]
    pub payee: String,

    /// Sequence number; strictly increasing, 1-based ("nonce" on the wire)
    #[serde(rename = "nonce", with = "u256_decimal")]
    pub sequence: U256,

    /// Cumulative amount owed since the last accepted ticket
    #[serde(with = "u256_decimal")]
    pub amount: U256,

    /// Address of the vault this ticket can be claimed against
    #[serde(rename = "vaultContractAddress")]
    pub vault: Address,
}

impl Ticket {
    /// The digest this ticket is signed over.
    pub fn digest(&self) -> B256 {
        ticket_digest(&self.payee, self.amount, self.sequence, self.vault)
    }

    /// Sign this ticket, producing a [`ClaimableTicket`].
    pub fn sign(self, signer: &TicketSigner) -> Result<ClaimableTicket, SigningError> {
        let signature = signer.sign_digest(&self.digest())?;
        Ok(ClaimableTicket {
            ticket: self,
            signature,
        })
    }
}

/// Signed payment voucher, ready for validation and on-chain redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimableTicket {
    #[serde(flatten)]
    pub ticket: Ticket,

    /// 65-byte `(r, s, v)` signature over the ticket digest
    pub signature: TicketSignature,
}

impl ClaimableTicket {
    /// Recompute the digest from the carried ticket fields.
    pub fn digest(&self) -> B256 {
        self.ticket.digest()
    }

    pub fn sequence(&self) -> U256 {
        self.ticket.sequence
    }

    pub fn amount(&self) -> U256 {
        self.ticket.amount
    }
}

/// Snapshot of the vault's public accounting, as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundsSummary {
    #[serde(with = "u256_decimal")]
    pub total_funded: U256,

    #[serde(with = "u256_decimal")]
    pub total_withdrawn: U256,

    #[serde(with = "u256_decimal")]
    pub available_funds: U256,
}
