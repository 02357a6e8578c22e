//! Vault settlement state machine
//!
//! The vault is the authoritative, single-writer ledger for one payee/signer
//! pair. It holds deposited funds and the last accepted ticket sequence, and
//! enforces exactly three things on a claim: the signature recovers to the
//! authorized signer, the amount fits the held balance, and the sequence is
//! strictly fresh. It performs no accounting of how many requests a ticket
//! represents; cumulative-amount bookkeeping is the signer's responsibility.
//! That trade-off keeps settlement O(1) regardless of request volume.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::crypto::hash::ticket_digest;
use crate::crypto::signing::TicketSignature;
use crate::crypto::{is_authorized_signer, recover_signer};
use crate::domain::FundsSummary;

/// Definite settlement failures raised by the vault.
///
/// None of these can succeed on retry with identical parameters: a rejected
/// `(amount, sequence)` pair is rejected forever by monotonicity, and an
/// unauthorized caller stays unauthorized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    /// Claimed amount exceeds the vault's held balance
    #[error("claim amount {amount} exceeds available vault balance {available}")]
    InsufficientVaultBalance { amount: U256, available: U256 },

    /// Claimed sequence does not exceed the last accepted one
    #[error("claim sequence {sequence} is not greater than last accepted {last_accepted}")]
    SequenceNotMonotonic {
        sequence: U256,
        last_accepted: U256,
    },

    /// Caller is not the authorized claimant, or the signature does not
    /// recover to the authorized signer
    #[error("claim not authorized: {0}")]
    Unauthorized(&'static str),
}

/// Identities bound into a vault at construction, fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Address this vault is deployed at (bound into every ticket digest)
    pub address: Address,
    /// Opaque payee identity funds are ultimately delivered to
    pub payee_identity: String,
    /// The single key whose signatures the vault accepts
    pub authorized_signer: Address,
    /// The single relay address allowed to call `claim`
    pub authorized_claimant: Address,
}

/// The vault state machine. Owns its counters exclusively; all access goes
/// through [`VaultHandle`], which serializes mutation.
#[derive(Debug)]
pub struct Vault {
    config: VaultConfig,
    total_funded: U256,
    total_withdrawn: U256,
    last_accepted_sequence: U256,
}

impl Vault {
    pub fn new(config: VaultConfig) -> Self {
        Self {
            config,
            total_funded: U256::ZERO,
            total_withdrawn: U256::ZERO,
            last_accepted_sequence: U256::ZERO,
        }
    }

    /// Permissionless top-up: anyone may fund the vault.
    pub fn deposit(&mut self, amount: U256) {
        self.total_funded += amount;
        info!(amount = %amount, total_funded = %self.total_funded, "vault deposit");
    }

    /// Settle a ticket. All-or-nothing: checks run in a fixed order
    /// (caller, signature, balance, sequence) and state only changes when
    /// every check passes.
    ///
    /// Returns the amount transferred to the caller.
    pub fn claim(
        &mut self,
        caller: Address,
        amount: U256,
        sequence: U256,
        signature: &TicketSignature,
    ) -> Result<U256, SettlementError> {
        if caller != self.config.authorized_claimant {
            return Err(SettlementError::Unauthorized("caller is not the claimant"));
        }

        let digest = ticket_digest(
            &self.config.payee_identity,
            amount,
            sequence,
            self.config.address,
        );
        let recovered = recover_signer(&digest, signature)
            .map_err(|_| SettlementError::Unauthorized("signature does not recover"))?;
        if !is_authorized_signer(recovered, self.config.authorized_signer) {
            return Err(SettlementError::Unauthorized(
                "recovered signer is not authorized",
            ));
        }

        let available = self.available();
        if amount > available {
            return Err(SettlementError::InsufficientVaultBalance { amount, available });
        }

        if sequence <= self.last_accepted_sequence {
            return Err(SettlementError::SequenceNotMonotonic {
                sequence,
                last_accepted: self.last_accepted_sequence,
            });
        }

        self.total_withdrawn += amount;
        self.last_accepted_sequence = sequence;
        info!(
            amount = %amount,
            sequence = %sequence,
            total_withdrawn = %self.total_withdrawn,
            "vault claim settled"
        );
        Ok(amount)
    }

    pub fn total_funded(&self) -> U256 {
        self.total_funded
    }

    pub fn total_withdrawn(&self) -> U256 {
        self.total_withdrawn
    }

    pub fn last_accepted_sequence(&self) -> U256 {
        self.last_accepted_sequence
    }

    fn available(&self) -> U256 {
        self.total_funded - self.total_withdrawn
    }

    pub fn funds_summary(&self) -> FundsSummary {
        FundsSummary {
            total_funded: self.total_funded,
            total_withdrawn: self.total_withdrawn,
            available_funds: self.available(),
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }
}

/// Shared, serialized handle to a vault instance. Cloning shares the same
/// underlying state; every operation takes the single writer lock.
#[derive(Clone)]
pub struct VaultHandle {
    inner: Arc<Mutex<Vault>>,
}

impl VaultHandle {
    pub fn new(config: VaultConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vault::new(config))),
        }
    }

    pub async fn deposit(&self, amount: U256) {
        self.inner.lock().await.deposit(amount);
    }

    pub async fn claim(
        &self,
        caller: Address,
        amount: U256,
        sequence: U256,
        signature: &TicketSignature,
    ) -> Result<U256, SettlementError> {
        self.inner.lock().await.claim(caller, amount, sequence, signature)
    }

    pub async fn last_accepted_sequence(&self) -> U256 {
        self.inner.lock().await.last_accepted_sequence()
    }

    pub async fn funds_summary(&self) -> FundsSummary {
        self.inner.lock().await.funds_summary()
    }
}
