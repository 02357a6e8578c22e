//! Ticket digest construction
//!
//! A ticket is bound to exactly four fields: payee identity, cumulative
//! amount, sequence number, and vault address. The digest is
//!
//! ```text
//! keccak256( keccak256(payee_utf8) || amount_be32 || sequence_be32 || vault_20 )
//! ```
//!
//! with `amount` and `sequence` encoded as fixed-width 32-byte big-endian
//! integers. The signer signs this digest directly, with no message prefix,
//! so the vault can recompute it byte-for-byte from the claim parameters.

use alloy_primitives::{keccak256, Address, B256, U256};

/// Compute the signing digest for a ticket.
///
/// The payee identity is an opaque string (a privacy-address, not an EVM
/// address), so it is hashed first to a fixed 32 bytes before concatenation.
pub fn ticket_digest(payee: &str, amount: U256, sequence: U256, vault: Address) -> B256 {
    let payee_hash = keccak256(payee.as_bytes());

    let mut preimage = Vec::with_capacity(32 + 32 + 32 + 20);
    preimage.extend_from_slice(payee_hash.as_slice());
    preimage.extend_from_slice(&amount.to_be_bytes::<32>());
    preimage.extend_from_slice(&sequence.to_be_bytes::<32>());
    preimage.extend_from_slice(vault.as_slice());

    keccak256(&preimage)
}
