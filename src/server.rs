use crate::handlers::handle_command;
use crate::models::{Interaction, INTERACTION_APPLICATION_COMMAND, INTERACTION_PING};
use crate::state::BotState;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub const HEALTH_MESSAGE: &str = "Bot Discord est actif!";

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

const RESPONSE_PONG: u8 = 1;
const RESPONSE_DEFERRED_CHANNEL_MESSAGE: u8 = 5;

pub struct ServerState {
    pub bot: Arc<BotState>,
    pub verifying_key: Option<VerifyingKey>,
}

pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey, String> {
    let bytes = hex::decode(hex_key.trim()).map_err(|e| format!("Invalid public key hex: {e}"))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| "Public key must be 32 bytes".to_string())?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| format!("Invalid public key: {e}"))
}

/// Discord signs `timestamp || body` with the application key
fn verify_discord_signature(key: &VerifyingKey, timestamp: &str, body: &[u8], signature_hex: &str) -> bool {
    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature = match Signature::from_slice(&signature_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    key.verify(&message, &signature).is_ok()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

async fn health_check() -> &'static str {
    HEALTH_MESSAGE
}

async fn interactions(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let Some(key) = state.verifying_key.as_ref() else {
        error!("Interaction received but no Discord public key is configured");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let (Some(signature), Some(timestamp)) = (
        header_str(&headers, SIGNATURE_HEADER),
        header_str(&headers, TIMESTAMP_HEADER),
    ) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if !verify_discord_signature(key, timestamp, &body, signature) {
        warn!("Invalid interaction signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let interaction: Interaction = serde_json::from_slice(&body).map_err(|e| {
        warn!("Malformed interaction payload: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    match interaction.interaction_type {
        INTERACTION_PING => Ok(Json(json!({ "type": RESPONSE_PONG }))),
        INTERACTION_APPLICATION_COMMAND => {
            let bot = state.bot.clone();
            tokio::spawn(async move {
                let interaction_id = interaction.id.clone();
                if let Err(e) = handle_command(bot, interaction).await {
                    error!("Error handling interaction {}: {}", interaction_id, e);
                }
            });
            Ok(Json(json!({ "type": RESPONSE_DEFERRED_CHANNEL_MESSAGE })))
        }
        other => {
            warn!(interaction_type = other, "Unsupported interaction type");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/interactions", post(interactions))
        .with_state(state)
}

pub async fn serve(state: Arc<ServerState>, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind HTTP server on port {}", port))?;
    info!("Serveur web démarré sur le port {}", port);
    axum::serve(listener, router(state))
        .await
        .context("HTTP server stopped")?;
    Ok(())
}
