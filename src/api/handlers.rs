//! REST handlers for the ticket lifecycle.

use alloy_primitives::U256;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::ApiError;
use crate::domain::{u256_decimal, ClaimableTicket, FundsSummary};
use crate::server::AppState;

/// Request/response envelope for a signed ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketEnvelope {
    pub ticket: ClaimableTicket,
}

/// Validation request; the ticket is optional so an absent one surfaces as
/// a missing-ticket payment rejection, not a body-parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub ticket: Option<ClaimableTicket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub result: bool,

    #[serde(with = "u256_decimal")]
    pub settled_sequence: U256,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositRequest {
    #[serde(with = "u256_decimal")]
    pub amount: U256,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositResponse {
    pub result: bool,
}

/// GET /api/vault/available-funds - Vault accounting snapshot.
pub async fn available_funds(
    State(state): State<AppState>,
) -> Result<Json<FundsSummary>, ApiError> {
    let summary = state.bridge.available_funds().await?;
    Ok(Json(summary))
}

/// POST /api/ticket/generate - Issue the next cumulative payment ticket.
#[instrument(skip(state))]
pub async fn generate_ticket(
    State(state): State<AppState>,
) -> Result<Json<TicketEnvelope>, ApiError> {
    let ticket = state.issuer.generate(state.cost_per_request).await?;
    Ok(Json(TicketEnvelope { ticket }))
}

/// POST /api/ticket/validate - Provider-side pre-service verification.
///
/// Returns 402 with a machine-readable rejection reason when the ticket
/// does not cover the request.
#[instrument(skip(state, request), fields(sequence = ?request.ticket.as_ref().map(|t| t.sequence())))]
pub async fn validate_ticket(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    state.validator.verify(request.ticket.as_ref()).await?;
    Ok(Json(ValidateResponse { valid: true }))
}

/// POST /api/ticket/claim - Settle a ticket against the vault.
///
/// On success the validator and issuer are both reconciled to the settled
/// sequence, collapsing the unclaimed window.
#[instrument(skip(state, request), fields(sequence = %request.ticket.sequence(), amount = %request.ticket.amount()))]
pub async fn claim_ticket(
    State(state): State<AppState>,
    Json(request): Json<TicketEnvelope>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let receipt = state.bridge.settle(&request.ticket).await?;

    state.validator.confirm_settled(receipt.sequence).await;
    state.issuer.acknowledge_settlement(receipt.sequence).await;
    info!(sequence = %receipt.sequence, amount = %receipt.amount, "ticket settled");

    Ok(Json(ClaimResponse {
        result: true,
        settled_sequence: receipt.sequence,
        tx_id: receipt.tx_id,
    }))
}

/// POST /api/vault/deposit - Shield funds into the vault. Permissionless.
#[instrument(skip(state, request), fields(amount = %request.amount))]
pub async fn deposit(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, ApiError> {
    state
        .relay
        .shield(request.amount, &state.payee_identity)
        .await?;
    Ok(Json(DepositResponse { result: true }))
}

/// GET /health - Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use alloy_primitives::Address;
    use axum::http::StatusCode;

    use crate::api::error::ErrorCode;
    use crate::crypto::TicketSigner;
    use crate::issuer::TicketIssuer;
    use crate::settlement::{InProcessRelay, SettlementBridge};
    use crate::validator::TicketValidator;
    use crate::vault::{VaultConfig, VaultHandle};

    const PAYEE: &str = "0zk1payee";
    const COST: u64 = 300;

    fn app_state() -> AppState {
        let signer = TicketSigner::generate();
        let claimant = Address::repeat_byte(0xAA);
        let vault_address = Address::repeat_byte(0x66);

        let vault = VaultHandle::new(VaultConfig {
            address: vault_address,
            payee_identity: PAYEE.to_string(),
            authorized_signer: signer.address(),
            authorized_claimant: claimant,
        });
        let relay = Arc::new(InProcessRelay::new(vault.clone(), claimant));

        AppState {
            issuer: Arc::new(TicketIssuer::new(PAYEE, vault_address, signer.clone())),
            validator: Arc::new(TicketValidator::new(
                PAYEE,
                vault_address,
                signer.address(),
                U256::from(COST),
            )),
            bridge: Arc::new(SettlementBridge::new(relay.clone(), Arc::new(vault))),
            relay,
            cost_per_request: U256::from(COST),
            payee_identity: PAYEE.to_string(),
        }
    }

    #[test]
    fn test_validate_request_accepts_absent_ticket() {
        let request: ValidateRequest = serde_json::from_str("{}").unwrap();
        assert!(request.ticket.is_none());

        let request: ValidateRequest = serde_json::from_str(r#"{"ticket":null}"#).unwrap();
        assert!(request.ticket.is_none());
    }

    #[tokio::test]
    async fn test_validate_without_ticket_is_payment_required() {
        let state = app_state();

        let err = validate_ticket(State(state), Json(ValidateRequest { ticket: None }))
            .await
            .unwrap_err();

        assert_eq!(err.error.code, ErrorCode::MissingTicket);
        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_validate_accepts_freshly_issued_ticket() {
        let state = app_state();
        let ticket = state.issuer.generate(state.cost_per_request).await.unwrap();

        let response = validate_ticket(
            State(state),
            Json(ValidateRequest {
                ticket: Some(ticket),
            }),
        )
        .await
        .unwrap();
        assert!(response.valid);
    }
}
