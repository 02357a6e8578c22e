//! HTTP server bootstrap for the ticket vault service.
//!
//! This module wires together:
//! - configuration
//! - signing keys and vault identities
//! - core services (issuer, validator, settlement bridge)
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::api;
use crate::crypto::TicketSigner;
use crate::issuer::TicketIssuer;
use crate::settlement::{
    HttpRelay, InProcessRelay, LedgerClient, PrivacyRelay, SettlementBridge,
};
use crate::validator::TicketValidator;
use crate::vault::{VaultConfig, VaultHandle};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Shielded payee identity tickets are made out to.
    pub payee_identity: String,
    /// Address of the vault deployment tickets are bound to.
    pub vault_address: Address,
    /// Hex-encoded secp256k1 secret key for ticket signing, if configured.
    pub signer_key: Option<String>,
    /// Address allowed to call the vault's claim entry point.
    pub authorized_claimant: Option<Address>,
    /// Flat cost charged per request.
    pub cost_per_request: U256,
    /// External privacy relay base URL; in-process vault when unset.
    pub relay_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .context("invalid listen address")?;

        let payee_identity = std::env::var("PAYEE_IDENTITY").context("PAYEE_IDENTITY is required")?;

        let vault_address: Address = std::env::var("VAULT_CONTRACT_ADDRESS")
            .context("VAULT_CONTRACT_ADDRESS is required")?
            .parse()
            .context("invalid VAULT_CONTRACT_ADDRESS")?;

        let authorized_claimant = match std::env::var("AUTHORIZED_CLAIMANT") {
            Ok(v) => Some(v.parse().context("invalid AUTHORIZED_CLAIMANT")?),
            Err(_) => None,
        };

        let cost_per_request = std::env::var("COST_PER_REQUEST")
            .unwrap_or_else(|_| "300".to_string());
        let cost_per_request = U256::from_str_radix(&cost_per_request, 10)
            .context("invalid COST_PER_REQUEST")?;

        Ok(Self {
            listen_addr,
            payee_identity,
            vault_address,
            signer_key: std::env::var("SIGNER_PRIVATE_KEY").ok(),
            authorized_claimant,
            cost_per_request,
            relay_url: std::env::var("RELAY_URL").ok(),
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TicketIssuer>,
    pub validator: Arc<TicketValidator>,
    pub bridge: Arc<SettlementBridge>,
    pub relay: Arc<dyn PrivacyRelay>,
    pub cost_per_request: U256,
    pub payee_identity: String,
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting ticket vault service v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let signer = match &config.signer_key {
        Some(hex_key) => TicketSigner::from_hex(hex_key).context("invalid SIGNER_PRIVATE_KEY")?,
        None => {
            let signer = TicketSigner::generate();
            info!(address = %signer.address(), "SIGNER_PRIVATE_KEY not set, generated ephemeral signing key");
            signer
        }
    };
    let claimant = config
        .authorized_claimant
        .unwrap_or_else(|| signer.address());

    let state = build_state(&config, signer, claimant).await?;
    let app = build_router()?.with_state(state);

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("Ticket vault service is ready to accept connections");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(
    config: &Config,
    signer: TicketSigner,
    claimant: Address,
) -> anyhow::Result<AppState> {
    let (relay, ledger): (Arc<dyn PrivacyRelay>, Arc<dyn LedgerClient>) = match &config.relay_url {
        Some(url) => {
            info!(url = %url, "using external privacy relay");
            let relay = Arc::new(HttpRelay::new(url.clone()));
            (relay.clone(), relay)
        }
        None => {
            info!("no relay configured, settling against in-process vault");
            let vault = VaultHandle::new(VaultConfig {
                address: config.vault_address,
                payee_identity: config.payee_identity.clone(),
                authorized_signer: signer.address(),
                authorized_claimant: claimant,
            });
            (
                Arc::new(InProcessRelay::new(vault.clone(), claimant)),
                Arc::new(vault),
            )
        }
    };

    // Local counters are caches of vault truth; re-seed them before issuing.
    let last_accepted = ledger
        .last_accepted_sequence()
        .await
        .map_err(|e| anyhow::anyhow!("failed to read vault state: {e}"))?;
    info!(sequence = %last_accepted, "seeded from vault lastAcceptedSequence");

    let issuer = Arc::new(
        TicketIssuer::connect(
            config.payee_identity.clone(),
            config.vault_address,
            signer.clone(),
            ledger.as_ref(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("failed to connect issuer: {e}"))?,
    );

    let validator = Arc::new(TicketValidator::new(
        config.payee_identity.clone(),
        config.vault_address,
        issuer.signer_address(),
        config.cost_per_request,
    ));
    validator.confirm_settled(last_accepted).await;

    let bridge = Arc::new(SettlementBridge::new(relay.clone(), ledger));

    Ok(AppState {
        issuer,
        validator,
        bridge,
        relay,
        cost_per_request: config.cost_per_request,
        payee_identity: config.payee_identity.clone(),
    })
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

fn build_router() -> anyhow::Result<Router<AppState>> {
    let api = Router::new()
        .route("/vault/available-funds", get(api::available_funds))
        .route("/vault/deposit", post(api::deposit))
        .route("/ticket/generate", post(api::generate_ticket))
        .route("/ticket/validate", post(api::validate_ticket))
        .route("/ticket/claim", post(api::claim_ticket));

    let mut router = Router::new()
        .nest("/api", api)
        .route("/health", get(api::health))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer_from_env()? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}
