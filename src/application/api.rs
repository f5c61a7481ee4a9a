//! Request/response boundary: base58 wire transactions in, JSON replies out

use bincode::Options;
use serde::{Deserialize, Serialize};
use solana_sdk::packet::PACKET_DATA_SIZE;
use solana_sdk::sanitize::Sanitize;
use solana_sdk::transaction::Transaction;
use tracing::error;

use super::services::RelayService;
use crate::shared::errors::{ErrorKind, RelayError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAccountRequest {
    /// Echoed back so line-oriented callers can correlate replies
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub transaction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse {
    Ok { signature: String },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub code: u16,
    #[serde(flatten)]
    pub body: ApiResponse,
}

impl ApiReply {
    fn from_error(id: Option<serde_json::Value>, err: &RelayError) -> Self {
        let message = if err.kind() == ErrorKind::Infrastructure {
            error!("Infrastructure failure: {}", err);
            "relay temporarily unavailable, retry later".to_string()
        } else {
            err.to_string()
        };
        Self {
            id,
            code: err.http_status(),
            body: ApiResponse::Error { message },
        }
    }
}

/// Decode a base58 bincode-encoded legacy transaction
pub fn decode_transaction(encoded: &str) -> Result<Transaction, RelayError> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|_| RelayError::Undecodable)?;
    if bytes.len() > PACKET_DATA_SIZE {
        return Err(RelayError::Undecodable);
    }
    let transaction: Transaction = bincode::options()
        .with_limit(PACKET_DATA_SIZE as u64)
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(&bytes)
        .map_err(|_| RelayError::Undecodable)?;
    transaction.sanitize().map_err(|_| RelayError::Undecodable)?;
    Ok(transaction)
}

pub async fn handle_create_account(service: &RelayService, request: CreateAccountRequest) -> ApiReply {
    let id = request.id;
    let result = match request.transaction.as_deref() {
        None => Err(RelayError::MissingTransaction),
        Some(encoded) => match decode_transaction(encoded) {
            Ok(transaction) => service.create_account_if_token_fee_paid(transaction).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(receipt) => ApiReply {
            id,
            code: 200,
            body: ApiResponse::Ok {
                signature: receipt.signature.to_string(),
            },
        },
        Err(e) => ApiReply::from_error(id, &e),
    }
}

/// Handle one JSON request body
pub async fn handle_json(service: &RelayService, body: &str) -> ApiReply {
    match serde_json::from_str::<CreateAccountRequest>(body) {
        Ok(request) => handle_create_account(service, request).await,
        Err(_) => ApiReply::from_error(None, &RelayError::MissingTransaction),
    }
}
