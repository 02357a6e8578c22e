//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for any valid input.

use alloy_primitives::{Address, U256};
use proptest::prelude::*;

use ticketvault::crypto::{recover_signer, ticket_digest};
use ticketvault::{Ticket, TicketSigner};

// ============================================================================
// Custom Strategies
// ============================================================================

/// Generate a random 20-byte address
fn arb_address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from)
}

/// Generate a random U256 from raw limbs
fn arb_u256() -> impl Strategy<Value = U256> {
    any::<[u8; 32]>().prop_map(|b| U256::from_be_bytes(b))
}

/// Generate a plausible shielded payee identity
fn arb_payee() -> impl Strategy<Value = String> {
    "0zk1[a-z0-9]{8,40}".prop_map(|s| s)
}

fn arb_ticket() -> impl Strategy<Value = Ticket> {
    (arb_payee(), arb_u256(), arb_u256(), arb_address()).prop_map(
        |(payee, sequence, amount, vault)| Ticket {
            payee,
            sequence,
            amount,
            vault,
        },
    )
}

// ============================================================================
// Digest Properties
// ============================================================================

proptest! {
    /// The digest is a pure function of the ticket fields.
    #[test]
    fn prop_digest_deterministic(ticket in arb_ticket()) {
        let a = ticket_digest(&ticket.payee, ticket.amount, ticket.sequence, ticket.vault);
        let b = ticket_digest(&ticket.payee, ticket.amount, ticket.sequence, ticket.vault);
        prop_assert_eq!(a, b);
    }

    /// Changing any field changes the digest.
    #[test]
    fn prop_digest_binds_every_field(ticket in arb_ticket(), other in arb_ticket()) {
        prop_assume!(ticket.payee != other.payee);
        prop_assume!(ticket.amount != other.amount);
        prop_assume!(ticket.sequence != other.sequence);
        prop_assume!(ticket.vault != other.vault);

        let base = ticket.digest();

        let mut t = ticket.clone();
        t.payee = other.payee;
        prop_assert_ne!(base, t.digest());

        let mut t = ticket.clone();
        t.amount = other.amount;
        prop_assert_ne!(base, t.digest());

        let mut t = ticket.clone();
        t.sequence = other.sequence;
        prop_assert_ne!(base, t.digest());

        let mut t = ticket;
        t.vault = other.vault;
        prop_assert_ne!(base, t.digest());
    }

    /// Amount and sequence occupy distinct fixed-width slots: swapping
    /// unequal values never collides.
    #[test]
    fn prop_digest_amount_sequence_not_interchangeable(
        payee in arb_payee(),
        a in arb_u256(),
        b in arb_u256(),
        vault in arb_address(),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(
            ticket_digest(&payee, a, b, vault),
            ticket_digest(&payee, b, a, vault)
        );
    }
}

// ============================================================================
// Signature Properties
// ============================================================================

proptest! {
    /// Recovery round-trips for any key and any ticket.
    #[test]
    fn prop_signature_recovers_signer(seed in any::<[u8; 32]>(), ticket in arb_ticket()) {
        // Reject seeds outside the secp256k1 scalar field.
        let Ok(signer) = TicketSigner::from_bytes(&seed) else {
            return Ok(());
        };

        let claimable = ticket.sign(&signer).unwrap();
        let recovered = recover_signer(&claimable.digest(), &claimable.signature).unwrap();
        prop_assert_eq!(recovered, signer.address());
    }

    /// A signature over one ticket never authorizes a different ticket.
    #[test]
    fn prop_signature_does_not_transfer(ticket in arb_ticket(), other in arb_ticket()) {
        prop_assume!(ticket.digest() != other.digest());

        let signer = TicketSigner::generate();
        let claimable = ticket.sign(&signer).unwrap();

        match recover_signer(&other.digest(), &claimable.signature) {
            // Recovery over the wrong digest yields some other address.
            Ok(recovered) => prop_assert_ne!(recovered, signer.address()),
            Err(_) => {}
        }
    }

    /// Distinct keys produce distinct recovered addresses.
    #[test]
    fn prop_distinct_keys_distinct_signers(ticket in arb_ticket()) {
        let a = TicketSigner::generate();
        let b = TicketSigner::generate();
        prop_assume!(a.address() != b.address());

        let signed = ticket.sign(&a).unwrap();
        let recovered = recover_signer(&signed.digest(), &signed.signature).unwrap();
        prop_assert_ne!(recovered, b.address());
    }
}

// ============================================================================
// Wire Format Properties
// ============================================================================

proptest! {
    /// JSON round-trip preserves every ticket field and the signature
    /// stays verifiable.
    #[test]
    fn prop_wire_roundtrip(ticket in arb_ticket()) {
        let signer = TicketSigner::generate();
        let claimable = ticket.sign(&signer).unwrap();

        let json = serde_json::to_string(&claimable).unwrap();
        let decoded: ticketvault::ClaimableTicket = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(&decoded.ticket, &claimable.ticket);
        let recovered = recover_signer(&decoded.digest(), &decoded.signature).unwrap();
        prop_assert_eq!(recovered, signer.address());
    }

    /// Amounts serialize as base-10 decimal strings, never hex.
    #[test]
    fn prop_amounts_are_decimal_strings(ticket in arb_ticket()) {
        let signer = TicketSigner::generate();
        let claimable = ticket.sign(&signer).unwrap();

        let value: serde_json::Value =
            serde_json::to_value(&claimable).unwrap();
        let amount = value["amount"].as_str().unwrap();
        prop_assert!(amount.chars().all(|c| c.is_ascii_digit()));
        prop_assert_eq!(U256::from_str_radix(amount, 10).unwrap(), claimable.amount());
    }
}
