//! Settlement bridge and the privacy-relay boundary
//!
//! Converts an accepted ticket into an actual fund movement. The privacy
//! SDK that moves value is a black box behind [`PrivacyRelay`]: the bridge
//! only needs its success/failure outcome. The vault's `claim` is the
//! linearization point for the whole protocol, so the bridge treats it as
//! blocking and awaitable, and never retries an ambiguous outcome blindly:
//! it first re-reads `lastAcceptedSequence` to learn whether the claim
//! actually landed.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::crypto::signing::TicketSignature;
use crate::domain::{u256_decimal, ClaimableTicket, FundsSummary};
use crate::vault::{SettlementError, VaultHandle};

/// Upstream dependency failures, distinct from validation and settlement
/// failures so callers can tell "try again later" from "this ticket is bad".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvailabilityError {
    /// Ledger connection or privacy SDK not ready; retryable after a delay
    #[error("upstream dependency not ready: {0}")]
    NotReady(String),

    /// Submitted, but the transaction outcome is unknown (e.g. timeout).
    /// Must trigger a reconciliation read before any further claim.
    #[error("settlement outcome unknown: {0}")]
    OutcomeUnknown(String),
}

/// Failure domain of a settlement attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// Definite vault rejection; retrying identical parameters cannot succeed
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// Upstream unavailable or outcome unknown; retryable after reconciliation
    #[error(transparent)]
    Unavailable(#[from] AvailabilityError),
}

/// Relay-level result of submitting a claim: a definite rejection is
/// terminal, an availability failure is ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Rejected(#[from] SettlementError),

    #[error(transparent)]
    Unavailable(#[from] AvailabilityError),
}

/// The claim parameters handed to the relay, exactly as the vault entry
/// point takes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimCall {
    #[serde(with = "u256_decimal")]
    pub amount: U256,

    #[serde(with = "u256_decimal")]
    pub sequence: U256,

    pub signature: TicketSignature,
}

/// Outcome of a relayed transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxOutcome {
    /// Transaction identifier, when the relay produces one
    pub tx_id: Option<String>,
}

/// Read access to authoritative vault state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn last_accepted_sequence(&self) -> Result<U256, AvailabilityError>;
    async fn available_funds(&self) -> Result<FundsSummary, AvailabilityError>;
}

/// Opaque privacy-transfer capability surface. Implementations shield funds
/// toward a private recipient and execute calls through an unshield, but
/// the bridge only observes success or failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrivacyRelay: Send + Sync {
    async fn shield(&self, amount: U256, recipient: &str) -> Result<TxOutcome, AvailabilityError>;
    async fn unshield_and_call(&self, call: ClaimCall) -> Result<TxOutcome, RelayError>;
}

// ============================================================================
// In-process relay
// ============================================================================

/// Relay that executes claims directly against the in-process vault with a
/// fixed claimant identity. This is the deployment used when no external
/// privacy relay is configured.
pub struct InProcessRelay {
    vault: VaultHandle,
    claimant: Address,
}

impl InProcessRelay {
    pub fn new(vault: VaultHandle, claimant: Address) -> Self {
        Self { vault, claimant }
    }
}

#[async_trait]
impl PrivacyRelay for InProcessRelay {
    async fn shield(&self, amount: U256, _recipient: &str) -> Result<TxOutcome, AvailabilityError> {
        self.vault.deposit(amount).await;
        Ok(TxOutcome::default())
    }

    async fn unshield_and_call(&self, call: ClaimCall) -> Result<TxOutcome, RelayError> {
        self.vault
            .claim(self.claimant, call.amount, call.sequence, &call.signature)
            .await?;
        Ok(TxOutcome::default())
    }
}

#[async_trait]
impl LedgerClient for VaultHandle {
    async fn last_accepted_sequence(&self) -> Result<U256, AvailabilityError> {
        Ok(VaultHandle::last_accepted_sequence(self).await)
    }

    async fn available_funds(&self) -> Result<FundsSummary, AvailabilityError> {
        Ok(VaultHandle::funds_summary(self).await)
    }
}

// ============================================================================
// HTTP relay
// ============================================================================

/// Relay backed by an external privacy-SDK service over HTTP.
///
/// Timeouts and transport failures after submission map to
/// [`AvailabilityError::OutcomeUnknown`]: the transaction may have landed.
pub struct HttpRelay {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShieldRequest<'a> {
    #[serde(with = "u256_decimal")]
    amount: U256,
    recipient: &'a str,
}

#[derive(Deserialize)]
struct RelayResponse {
    #[serde(default)]
    tx_id: Option<String>,
}

/// Structured error body the relay emits, mirroring this service's own
/// `ApiError` shape.
#[derive(Deserialize)]
struct RelayErrorBody {
    error: RelayErrorDetails,
}

#[derive(Deserialize)]
struct RelayErrorDetails {
    code: String,
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

impl HttpRelay {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Map a relay rejection by its machine-readable error code, carrying
    /// the structured detail values through. A rejection whose details
    /// cannot be read is treated as ambiguous rather than terminal, so the
    /// bridge reconciles instead of trusting a half-parsed error.
    fn map_rejection(body: &RelayErrorBody) -> RelayError {
        let field = |name: &str| -> Option<U256> {
            body.error
                .details
                .as_ref()
                .and_then(|d| d.get(name))
                .and_then(|v| v.as_str())
                .and_then(|s| U256::from_str_radix(s, 10).ok())
        };

        match body.error.code.as_str() {
            "SEQUENCE_NOT_MONOTONIC" => {
                if let (Some(sequence), Some(last_accepted)) =
                    (field("sequence"), field("lastAcceptedSequence"))
                {
                    return RelayError::Rejected(SettlementError::SequenceNotMonotonic {
                        sequence,
                        last_accepted,
                    });
                }
            }
            "INSUFFICIENT_VAULT_BALANCE" => {
                if let (Some(amount), Some(available)) = (field("amount"), field("available")) {
                    return RelayError::Rejected(SettlementError::InsufficientVaultBalance {
                        amount,
                        available,
                    });
                }
            }
            "UNAUTHORIZED" => {
                return RelayError::Rejected(SettlementError::Unauthorized(
                    "relay rejected claim",
                ));
            }
            _ => {}
        }
        RelayError::Unavailable(AvailabilityError::NotReady(body.error.message.clone()))
    }
}

#[async_trait]
impl LedgerClient for HttpRelay {
    async fn last_accepted_sequence(&self) -> Result<U256, AvailabilityError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SequenceResponse {
            #[serde(with = "u256_decimal")]
            last_accepted_sequence: U256,
        }

        let response = self
            .client
            .get(format!("{}/api/relay/last-accepted-sequence", self.base_url))
            .send()
            .await
            .map_err(|e| AvailabilityError::NotReady(e.to_string()))?
            .error_for_status()
            .map_err(|e| AvailabilityError::NotReady(e.to_string()))?;

        let body: SequenceResponse = response
            .json()
            .await
            .map_err(|e| AvailabilityError::NotReady(e.to_string()))?;
        Ok(body.last_accepted_sequence)
    }

    async fn available_funds(&self) -> Result<FundsSummary, AvailabilityError> {
        let response = self
            .client
            .get(format!("{}/api/relay/available-funds", self.base_url))
            .send()
            .await
            .map_err(|e| AvailabilityError::NotReady(e.to_string()))?
            .error_for_status()
            .map_err(|e| AvailabilityError::NotReady(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| AvailabilityError::NotReady(e.to_string()))
    }
}

#[async_trait]
impl PrivacyRelay for HttpRelay {
    async fn shield(&self, amount: U256, recipient: &str) -> Result<TxOutcome, AvailabilityError> {
        let response = self
            .client
            .post(format!("{}/api/relay/shield", self.base_url))
            .json(&ShieldRequest { amount, recipient })
            .send()
            .await
            .map_err(|e| AvailabilityError::NotReady(e.to_string()))?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AvailabilityError::NotReady(message));
        }

        let body: RelayResponse = response
            .json()
            .await
            .map_err(|e| AvailabilityError::NotReady(e.to_string()))?;
        Ok(TxOutcome { tx_id: body.tx_id })
    }

    async fn unshield_and_call(&self, call: ClaimCall) -> Result<TxOutcome, RelayError> {
        let response = self
            .client
            .post(format!("{}/api/relay/unshield-call", self.base_url))
            .json(&call)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::Unavailable(AvailabilityError::OutcomeUnknown(e.to_string()))
                } else {
                    RelayError::Unavailable(AvailabilityError::NotReady(e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            return match response.json::<RelayErrorBody>().await {
                Ok(body) => Err(Self::map_rejection(&body)),
                Err(e) => Err(RelayError::Unavailable(AvailabilityError::NotReady(
                    e.to_string(),
                ))),
            };
        }

        let body: RelayResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Unavailable(AvailabilityError::OutcomeUnknown(e.to_string())))?;
        Ok(TxOutcome { tx_id: body.tx_id })
    }
}

// ============================================================================
// Settlement bridge
// ============================================================================

/// Result of a successful settlement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    #[serde(with = "u256_decimal")]
    pub sequence: U256,

    #[serde(with = "u256_decimal")]
    pub amount: U256,

    pub tx_id: Option<String>,
}

/// Drives ticket redemption through the relay, reconciling against the
/// ledger whenever the outcome is ambiguous.
pub struct SettlementBridge {
    relay: Arc<dyn PrivacyRelay>,
    ledger: Arc<dyn LedgerClient>,
}

impl SettlementBridge {
    pub fn new(relay: Arc<dyn PrivacyRelay>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { relay, ledger }
    }

    /// Submit the latest accepted ticket for settlement.
    ///
    /// A definite vault rejection is surfaced as-is and never retried with
    /// the same parameters. An ambiguous outcome triggers a read of
    /// `lastAcceptedSequence` first: if the vault already reflects this
    /// sequence, the claim landed and is reported as success.
    #[instrument(skip(self, ticket), fields(sequence = %ticket.sequence(), amount = %ticket.amount()))]
    pub async fn settle(&self, ticket: &ClaimableTicket) -> Result<SettlementReceipt, BridgeError> {
        let call = ClaimCall {
            amount: ticket.amount(),
            sequence: ticket.sequence(),
            signature: ticket.signature,
        };

        match self.relay.unshield_and_call(call).await {
            Ok(outcome) => {
                info!(tx_id = ?outcome.tx_id, "settlement confirmed");
                Ok(SettlementReceipt {
                    sequence: ticket.sequence(),
                    amount: ticket.amount(),
                    tx_id: outcome.tx_id,
                })
            }
            Err(RelayError::Rejected(err)) => {
                warn!(error = %err, "settlement rejected");
                Err(BridgeError::Settlement(err))
            }
            Err(RelayError::Unavailable(err)) => {
                warn!(error = %err, "settlement outcome ambiguous, reconciling");
                match self.ledger.last_accepted_sequence().await {
                    Ok(last_accepted) if last_accepted >= ticket.sequence() => {
                        info!(
                            last_accepted = %last_accepted,
                            "claim landed despite ambiguous relay outcome"
                        );
                        Ok(SettlementReceipt {
                            sequence: ticket.sequence(),
                            amount: ticket.amount(),
                            tx_id: None,
                        })
                    }
                    _ => Err(BridgeError::Unavailable(err)),
                }
            }
        }
    }

    /// Read-through to the vault's public accounting.
    pub async fn available_funds(&self) -> Result<FundsSummary, AvailabilityError> {
        self.ledger.available_funds().await
    }
}
