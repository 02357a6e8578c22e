//! Client-side ticket issuance
//!
//! The issuer produces monotonically-numbered, cumulative-amount tickets.
//! Each new ticket supersedes all previous unclaimed ones and carries their
//! combined cost, so the provider only ever needs to redeem the single
//! latest ticket. Issuance mutates a single sequence counter, so concurrent
//! `generate` calls on one issuer are serialized through an internal lock:
//! an interleaved read-modify-write would hand two callers the same
//! sequence number with divergent amounts, and only one could ever settle.

use alloy_primitives::{Address, U256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::crypto::{SigningError, TicketSigner};
use crate::domain::{ClaimableTicket, Ticket};
use crate::ledger::SequenceLedger;
use crate::settlement::{AvailabilityError, LedgerClient};

/// Produces signed, cumulative payment tickets for one payee/vault pair.
pub struct TicketIssuer {
    payee: String,
    vault: Address,
    signer: TicketSigner,
    state: Mutex<SequenceLedger>,
}

impl TicketIssuer {
    /// Create an issuer with zeroed counters. Only correct against a vault
    /// that has never accepted a claim; otherwise use [`TicketIssuer::connect`].
    pub fn new(payee: impl Into<String>, vault: Address, signer: TicketSigner) -> Self {
        Self {
            payee: payee.into(),
            vault,
            signer,
            state: Mutex::new(SequenceLedger::new()),
        }
    }

    /// Create an issuer seeded from the vault's `lastAcceptedSequence`.
    ///
    /// Required after a restart: local counters are caches of vault truth,
    /// and assuming zero would re-issue sequences the vault has already
    /// accepted and permanently voided.
    pub async fn connect<L: LedgerClient + ?Sized>(
        payee: impl Into<String>,
        vault: Address,
        signer: TicketSigner,
        ledger: &L,
    ) -> Result<Self, AvailabilityError> {
        let confirmed = ledger.last_accepted_sequence().await?;
        debug!(sequence = %confirmed, "seeding issuer from vault state");
        Ok(Self {
            payee: payee.into(),
            vault,
            signer,
            state: Mutex::new(SequenceLedger::from_confirmed(confirmed)),
        })
    }

    /// Generate the next ticket, charging `cost_per_request` on top of every
    /// request issued since the last acknowledged settlement.
    ///
    /// The sequence advances optimistically: it is not rolled back if the
    /// ticket is rejected or superseded, because any later ticket carries
    /// the full cumulative amount anyway.
    pub async fn generate(&self, cost_per_request: U256) -> Result<ClaimableTicket, SigningError> {
        let mut ledger = self.state.lock().await;

        let unclaimed = ledger.unclaimed();
        let mut sequence = ledger.issued().wrapping_add(U256::from(1));
        if sequence.is_zero() {
            // Sequence zero is the "nothing issued" sentinel and must never
            // appear on a signed ticket.
            sequence = U256::from(1);
        }
        let amount = cost_per_request * (unclaimed + U256::from(1));

        let claimable = Ticket {
            payee: self.payee.clone(),
            sequence,
            amount,
            vault: self.vault,
        }
        .sign(&self.signer)?;

        ledger.record_issued(sequence);
        debug!(sequence = %sequence, amount = %amount, "issued payment ticket");
        Ok(claimable)
    }

    /// Apply an explicit settlement acknowledgment: the vault accepted
    /// `sequence`, so collapse the unclaimed window up to it.
    pub async fn acknowledge_settlement(&self, sequence: U256) {
        self.state.lock().await.reconcile(sequence);
    }

    /// Current (issued, confirmed) counters, for bookkeeping and tests.
    pub async fn sequences(&self) -> SequenceLedger {
        *self.state.lock().await
    }

    /// Address of the key this issuer signs with.
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TicketIssuer {
        TicketIssuer::new(
            "0zk1payee",
            Address::repeat_byte(0x22),
            TicketSigner::generate(),
        )
    }

    #[tokio::test]
    async fn test_first_ticket_has_sequence_one() {
        let issuer = issuer();
        let ticket = issuer.generate(U256::from(300)).await.unwrap();
        assert_eq!(ticket.sequence(), U256::from(1));
        assert_eq!(ticket.amount(), U256::from(300));
    }

    #[tokio::test]
    async fn test_cumulative_amounts_without_settlement() {
        let issuer = issuer();
        let cost = U256::from(300);

        let t1 = issuer.generate(cost).await.unwrap();
        let t2 = issuer.generate(cost).await.unwrap();
        let t3 = issuer.generate(cost).await.unwrap();

        assert_eq!(t1.sequence(), U256::from(1));
        assert_eq!(t1.amount(), U256::from(300));
        assert_eq!(t2.sequence(), U256::from(2));
        assert_eq!(t2.amount(), U256::from(600));
        assert_eq!(t3.sequence(), U256::from(3));
        assert_eq!(t3.amount(), U256::from(900));
    }

    #[tokio::test]
    async fn test_acknowledgment_resets_cumulative_window() {
        let issuer = issuer();
        let cost = U256::from(300);

        for _ in 0..3 {
            issuer.generate(cost).await.unwrap();
        }
        issuer.acknowledge_settlement(U256::from(3)).await;

        let next = issuer.generate(cost).await.unwrap();
        assert_eq!(next.sequence(), U256::from(4));
        assert_eq!(next.amount(), U256::from(300));
    }

    #[tokio::test]
    async fn test_cumulative_formula_holds_per_request() {
        let issuer = issuer();
        let cost = U256::from(7);

        issuer.acknowledge_settlement(U256::from(10)).await;
        // k-th ticket since last acceptance: sequence = settled + k,
        // amount = k * cost.
        for k in 1..=20u64 {
            let ticket = issuer.generate(cost).await.unwrap();
            assert_eq!(ticket.sequence(), U256::from(10 + k));
            assert_eq!(ticket.amount(), U256::from(k) * cost);
        }
    }

    #[tokio::test]
    async fn test_rejection_does_not_roll_back_sequence() {
        let issuer = issuer();
        let cost = U256::from(300);

        let t1 = issuer.generate(cost).await.unwrap();
        // No acknowledgment: the next ticket supersedes rather than reuses.
        let t2 = issuer.generate(cost).await.unwrap();
        assert!(t2.sequence() > t1.sequence());
    }

    #[tokio::test]
    async fn test_concurrent_generates_never_collide() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let issuer = Arc::new(issuer());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let issuer = Arc::clone(&issuer);
            handles.push(tokio::spawn(async move {
                issuer.generate(U256::from(5)).await.unwrap().sequence()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        assert_eq!(seen.len(), 16);
    }
}
