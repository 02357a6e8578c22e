//! Ticket Vault Library
//!
//! Cumulative payment-ticket protocol for per-request micropayments: a
//! client signs ever-increasing payment tickets, the provider validates
//! them locally before serving, and a single vault settles the latest
//! ticket for the whole unclaimed window.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (tickets, funds accounting)
//! - [`crypto`] - Cryptographic utilities (digests, secp256k1 signing)
//! - [`issuer`] - Client-side ticket issuance
//! - [`validator`] - Provider-side ticket verification
//! - [`ledger`] - Local sequence bookkeeping
//! - [`vault`] - Vault state machine and claim authorization
//! - [`settlement`] - Settlement bridge and privacy-relay boundary
//! - [`api`] - REST API routes
//! - [`server`] - HTTP server bootstrap

pub mod api;
pub mod crypto;
pub mod domain;
pub mod issuer;
pub mod ledger;
pub mod server;
pub mod settlement;
pub mod validator;
pub mod vault;

// Re-export commonly used types
pub use crypto::{ticket_digest, recover_signer, SigningError, TicketSignature, TicketSigner};
pub use domain::{ClaimableTicket, FundsSummary, Ticket};
pub use issuer::TicketIssuer;
pub use ledger::SequenceLedger;
pub use settlement::{
    AvailabilityError, BridgeError, ClaimCall, LedgerClient, PrivacyRelay, SettlementBridge,
    SettlementReceipt,
};
pub use validator::{TicketValidator, ValidationError};
pub use vault::{SettlementError, Vault, VaultConfig, VaultHandle};
