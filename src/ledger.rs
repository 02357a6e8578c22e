//! Optimistic mirror of vault sequence state
//!
//! Issuer and validator each keep a local cache of the vault's
//! `lastAcceptedSequence`. The cache is a pair: the highest sequence this
//! party has locally committed to (`issued`) and the highest sequence it
//! knows the vault accepted (`confirmed`). Neither value is authoritative;
//! the vault is. Reconciliation is the only way `confirmed` moves, and it
//! never rolls `issued` back, because already-generated tickets remain valid
//! supersets of cost.

use alloy_primitives::U256;

/// Last-known vs confirmed sequence pair for one party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceLedger {
    issued: U256,
    confirmed: U256,
}

impl SequenceLedger {
    /// Fresh ledger with no history. Only correct for a vault whose
    /// `lastAcceptedSequence` is still zero; after a restart use
    /// [`SequenceLedger::from_confirmed`] with the on-chain value instead.
    pub fn new() -> Self {
        Self {
            issued: U256::ZERO,
            confirmed: U256::ZERO,
        }
    }

    /// Seed both counters from the vault's `lastAcceptedSequence`.
    pub fn from_confirmed(sequence: U256) -> Self {
        Self {
            issued: sequence,
            confirmed: sequence,
        }
    }

    /// Highest sequence generated locally.
    pub fn issued(&self) -> U256 {
        self.issued
    }

    /// Highest sequence known to be accepted by the vault.
    pub fn confirmed(&self) -> U256 {
        self.confirmed
    }

    /// Number of tickets issued since the last confirmed settlement.
    pub fn unclaimed(&self) -> U256 {
        self.issued - self.confirmed
    }

    /// Record a locally generated sequence. Optimistic: advances regardless
    /// of whether the ticket is ever accepted.
    pub fn record_issued(&mut self, sequence: U256) {
        debug_assert!(sequence > self.issued, "issued sequence must advance");
        self.issued = sequence;
    }

    /// Apply an observed successful claim: set the confirmed sequence to the
    /// claimed value exactly, and pull `issued` up if it was behind (the
    /// vault can only have accepted a sequence some issuer generated, but
    /// this party may not have been the one to generate it).
    pub fn reconcile(&mut self, accepted_sequence: U256) {
        self.confirmed = accepted_sequence;
        if self.issued < accepted_sequence {
            self.issued = accepted_sequence;
        }
    }
}

impl Default for SequenceLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ledger_is_zeroed() {
        let ledger = SequenceLedger::new();
        assert_eq!(ledger.issued(), U256::ZERO);
        assert_eq!(ledger.confirmed(), U256::ZERO);
        assert_eq!(ledger.unclaimed(), U256::ZERO);
    }

    #[test]
    fn test_seed_from_chain_state() {
        let ledger = SequenceLedger::from_confirmed(U256::from(7));
        assert_eq!(ledger.issued(), U256::from(7));
        assert_eq!(ledger.confirmed(), U256::from(7));
        assert_eq!(ledger.unclaimed(), U256::ZERO);
    }

    #[test]
    fn test_unclaimed_tracks_issuance() {
        let mut ledger = SequenceLedger::new();
        ledger.record_issued(U256::from(1));
        ledger.record_issued(U256::from(2));
        ledger.record_issued(U256::from(3));
        assert_eq!(ledger.unclaimed(), U256::from(3));
    }

    #[test]
    fn test_reconcile_collapses_both_counters() {
        let mut ledger = SequenceLedger::new();
        ledger.record_issued(U256::from(1));
        ledger.record_issued(U256::from(2));
        ledger.record_issued(U256::from(3));

        ledger.reconcile(U256::from(3));
        assert_eq!(ledger.confirmed(), U256::from(3));
        assert_eq!(ledger.issued(), U256::from(3));
        assert_eq!(ledger.unclaimed(), U256::ZERO);
    }

    #[test]
    fn test_reconcile_does_not_roll_back_issued() {
        let mut ledger = SequenceLedger::new();
        for i in 1..=5u64 {
            ledger.record_issued(U256::from(i));
        }

        // Vault accepted an older (since-superseded) ticket.
        ledger.reconcile(U256::from(3));
        assert_eq!(ledger.confirmed(), U256::from(3));
        assert_eq!(ledger.issued(), U256::from(5));
        assert_eq!(ledger.unclaimed(), U256::from(2));
    }

    #[test]
    fn test_reconcile_ahead_of_local_issuance() {
        // Another issuer instance advanced the vault past this one's view.
        let mut ledger = SequenceLedger::from_confirmed(U256::from(2));
        ledger.reconcile(U256::from(9));
        assert_eq!(ledger.confirmed(), U256::from(9));
        assert_eq!(ledger.issued(), U256::from(9));
    }
}
