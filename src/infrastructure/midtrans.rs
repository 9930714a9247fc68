//! Midtrans Snap client and notification signature check.

use crate::domain::payment::SignedNotification;
use crate::domain::ports::{PaymentGateway, SnapRequest, SnapSession};
use crate::error::{PosError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha512};
use std::time::Duration;
use subtle::ConstantTimeEq;

pub const SANDBOX_SNAP_URL: &str = "https://app.sandbox.midtrans.com/snap/v1/transactions";
pub const PRODUCTION_SNAP_URL: &str = "https://app.midtrans.com/snap/v1/transactions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// `hex(sha512(order_id + status_code + gross_amount + server_key))`
pub fn notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Shows the first five and last three characters of a key.
pub fn mask_key(key: Option<&str>) -> String {
    match key {
        Some(k) if k.chars().count() > 8 => {
            let head: String = k.chars().take(5).collect();
            let tail: String = k.chars().skip(k.chars().count() - 3).collect();
            format!("{head}...{tail}")
        }
        Some(k) if !k.is_empty() => "***".to_string(),
        _ => "NOT_SET".to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct SnapResponse {
    token: String,
    redirect_url: String,
}

#[derive(Clone)]
pub struct MidtransGateway {
    client: reqwest::Client,
    server_key: Option<String>,
    snap_url: String,
}

impl MidtransGateway {
    pub fn new(server_key: Option<String>, production: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PosError::Internal(format!("HTTP client: {e}")))?;
        let snap_url = if production {
            PRODUCTION_SNAP_URL
        } else {
            SANDBOX_SNAP_URL
        };
        Ok(Self {
            client,
            server_key: server_key.filter(|k| !k.trim().is_empty()),
            snap_url: snap_url.to_string(),
        })
    }

    /// Points the client at another Snap endpoint.
    pub fn with_snap_url(mut self, url: impl Into<String>) -> Self {
        self.snap_url = url.into();
        self
    }

    fn server_key(&self) -> Result<&str> {
        self.server_key
            .as_deref()
            .ok_or_else(|| PosError::Config("MIDTRANS_SERVER_KEY is not set".into()))
    }

    fn request_body(request: &SnapRequest) -> Value {
        let mut body = json!({
            "transaction_details": {
                "order_id": request.order_id,
                "gross_amount": request.gross_amount,
            },
            "credit_card": { "secure": true },
        });
        if let Some(customer) = &request.customer_details {
            body["customer_details"] = customer.clone();
        }
        if !request.item_details.is_empty() {
            body["item_details"] = json!(request.item_details);
        }
        body
    }
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    async fn create_transaction(&self, request: SnapRequest) -> Result<SnapSession> {
        let server_key = self.server_key()?;
        let response = self
            .client
            .post(&self.snap_url)
            .basic_auth(server_key, None::<&str>)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(|e| PosError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(%status, order_id = %request.order_id, detail = %detail, "snap transaction rejected");
            return Err(PosError::Gateway(format!("Snap returned {status}")));
        }

        let snap: SnapResponse = response
            .json()
            .await
            .map_err(|e| PosError::Gateway(format!("Malformed Snap response: {e}")))?;
        tracing::info!(order_id = %request.order_id, "snap transaction created");
        Ok(SnapSession {
            token: snap.token,
            redirect_url: snap.redirect_url,
        })
    }

    fn verify_signature(&self, notification: &SignedNotification<'_>) -> bool {
        let Some(server_key) = self.server_key.as_deref() else {
            tracing::warn!("notification received but MIDTRANS_SERVER_KEY is not set");
            return false;
        };
        let expected = notification_signature(
            notification.order_id,
            notification.status_code,
            notification.gross_amount,
            server_key,
        );
        expected
            .as_bytes()
            .ct_eq(notification.signature_key.as_bytes())
            .into()
    }
}
