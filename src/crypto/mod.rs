//! Cryptographic primitives for payment tickets
//!
//! - [`hash`]: deterministic ticket digest construction
//! - [`signing`]: secp256k1 ECDSA signing and signer recovery

pub mod hash;
pub mod signing;

pub use hash::ticket_digest;
pub use signing::{
    is_authorized_signer, recover_signer, SigningError, TicketSignature, TicketSigner,
};
