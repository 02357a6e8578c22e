//! Ticket signing and signer recovery
//!
//! Tickets carry a 65-byte `(r, s, v)` secp256k1 signature over the ticket
//! digest, with `v` in Ethereum convention (27 or 28). The digest is signed
//! directly as a prehash; there is no EIP-191 style message prefix, so the
//! vault and the validator recover the signer from the same bytes.

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error type for signing and recovery operations
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("invalid signature format")]
    InvalidSignatureFormat,

    #[error("invalid recovery id")]
    InvalidRecoveryId,

    #[error("invalid secret key format")]
    InvalidSecretKeyFormat,

    #[error("signer recovery failed")]
    RecoveryFailed,

    #[error("signing failed: {0}")]
    SigningFailed(String),
}

// ============================================================================
// Ticket Signature
// ============================================================================

/// 65-byte `r || s || v` signature, `v` in {27, 28}.
///
/// Serializes on the wire as `0x` + 130 hex chars.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TicketSignature(pub [u8; 65]);

impl TicketSignature {
    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Parse from hex (with or without `0x` prefix).
    pub fn from_hex(hex_str: &str) -> Result<Self, SigningError> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str).map_err(|_| SigningError::InvalidSignatureFormat)?;
        let bytes: [u8; 65] = bytes
            .try_into()
            .map_err(|_| SigningError::InvalidSignatureFormat)?;
        Ok(Self(bytes))
    }

    /// Hex rendering with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for TicketSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TicketSignature({})", self.to_hex())
    }
}

impl std::fmt::Display for TicketSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for TicketSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TicketSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Ticket Signer
// ============================================================================

/// Payer-side secp256k1 keypair for ticket signing
#[derive(Clone)]
pub struct TicketSigner {
    signing_key: SigningKey,
}

impl TicketSigner {
    /// Generate a new random signing key
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Create from a 32-byte secret key
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, SigningError> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|_| SigningError::InvalidSecretKeyFormat)?;
        Ok(Self { signing_key })
    }

    /// Create from a hex-encoded secret key (with or without `0x` prefix)
    pub fn from_hex(hex_str: &str) -> Result<Self, SigningError> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str).map_err(|_| SigningError::InvalidSecretKeyFormat)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SigningError::InvalidSecretKeyFormat)?;
        Self::from_bytes(&bytes)
    }

    /// The Ethereum-style address of this signer's public key
    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a ticket digest directly, producing a recoverable `(r, s, v)`
    /// signature with no message prefixing.
    pub fn sign_digest(&self, digest: &B256) -> Result<TicketSignature, SigningError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| SigningError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = 27 + recovery_id.to_byte();
        Ok(TicketSignature(bytes))
    }
}

impl std::fmt::Debug for TicketSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Recovery
// ============================================================================

/// Recover the signer address from a ticket digest and signature.
pub fn recover_signer(digest: &B256, signature: &TicketSignature) -> Result<Address, SigningError> {
    let bytes = signature.as_bytes();

    let v = bytes[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(SigningError::InvalidRecoveryId)?;

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|_| SigningError::InvalidSignatureFormat)?;

    let verifying_key =
        VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
            .map_err(|_| SigningError::RecoveryFailed)?;

    Ok(address_of(&verifying_key))
}

/// Capability check: is the recovered address the configured authorized
/// signer? Pure function of its two inputs so synthetic keys test it
/// directly.
pub fn is_authorized_signer(recovered: Address, authorized: Address) -> bool {
    recovered == authorized
}

fn address_of(verifying_key: &VerifyingKey) -> Address {
    let point = verifying_key.to_encoded_point(false);
    // Uncompressed SEC1 point: 0x04 || x || y. Address is the low 20 bytes of
    // keccak256(x || y).
    let digest = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

// ============================================================================
// Tests
// ============================================================================
