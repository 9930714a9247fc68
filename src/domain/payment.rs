use super::money::Money;
use crate::error::{PosError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Accepted deviation between a submitted amount and the order total.
pub const AMOUNT_TOLERANCE: Decimal = dec!(0.1);

pub const PROVIDER_MIDTRANS: &str = "midtrans";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Manual,
    Qris,
    Midtrans,
    MidtransQris,
}

impl PaymentMethod {
    /// Cash-like methods are settled at the till and start out pending.
    pub fn initial_status(&self) -> PaymentStatus {
        match self {
            Self::Cash | Self::Manual => PaymentStatus::Pending,
            Self::Qris | Self::Midtrans | Self::MidtransQris => PaymentStatus::Processing,
        }
    }

    pub fn provider(&self) -> Option<&'static str> {
        match self {
            Self::Qris | Self::Midtrans | Self::MidtransQris => Some(PROVIDER_MIDTRANS),
            Self::Cash | Self::Manual => None,
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| PosError::validation(format!("Invalid payment method: {s}")))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// `paid` can only be refunded and `refunded` is final.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        match self {
            Self::Paid => matches!(next, Self::Paid | Self::Refunded),
            Self::Refunded => next == Self::Refunded,
            Self::Pending | Self::Processing | Self::Failed => true,
        }
    }

    /// Statuses staff may set by hand.
    pub fn parse_manual(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            _ => Err(PosError::validation("Invalid payment status")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: u64,
    pub order_id: u64,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub provider: Option<String>,
    pub provider_ref: Option<String>,
    pub status: PaymentStatus,
    /// Last raw `transaction_status` reported by the gateway.
    pub gateway_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub order_id: u64,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub provider: Option<String>,
    pub provider_ref: Option<String>,
    pub status: PaymentStatus,
}

impl NewPayment {
    pub fn for_method(order_id: u64, amount: Money, method: PaymentMethod) -> Self {
        Self {
            order_id,
            amount,
            payment_method: method,
            provider: method.provider().map(str::to_string),
            provider_ref: None,
            status: method.initial_status(),
        }
    }
}

/// Gateway order reference: `order-{order_id}-{epoch_ms}`.
pub fn gateway_reference(order_id: u64, now: DateTime<Utc>) -> String {
    format!("order-{}-{}", order_id, now.timestamp_millis())
}

/// Recovers the internal order id from a gateway reference or a bare id.
pub fn parse_gateway_reference(reference: &str) -> Option<u64> {
    if let Some(rest) = reference.strip_prefix("order-")
        && let Some((id, _)) = rest.split_once('-')
        && !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit())
    {
        return id.parse().ok();
    }
    reference.trim().parse().ok()
}

/// Asynchronous payment notification as posted by the gateway.
///
/// Every field is optional on the wire; [`GatewayNotification::required`]
/// enforces the ones the signature covers.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct GatewayNotification {
    pub order_id: Option<String>,
    pub status_code: Option<String>,
    pub gross_amount: Option<String>,
    pub signature_key: Option<String>,
    pub transaction_status: Option<String>,
    pub fraud_status: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_type: Option<String>,
}

/// A notification with all signed fields present.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedNotification<'a> {
    pub order_id: &'a str,
    pub status_code: &'a str,
    pub gross_amount: &'a str,
    pub signature_key: &'a str,
    pub transaction_status: &'a str,
    pub fraud_status: Option<&'a str>,
}

impl GatewayNotification {
    pub fn required(&self) -> Result<SignedNotification<'_>> {
        let field = |value: &'_ Option<String>, name: &str| -> Result<()> {
            match value {
                Some(v) if !v.is_empty() => Ok(()),
                _ => Err(PosError::validation(format!("Invalid notification: missing {name}"))),
            }
        };
        field(&self.order_id, "order_id")?;
        field(&self.status_code, "status_code")?;
        field(&self.gross_amount, "gross_amount")?;
        field(&self.signature_key, "signature_key")?;
        field(&self.transaction_status, "transaction_status")?;

        Ok(SignedNotification {
            order_id: self.order_id.as_deref().unwrap_or_default(),
            status_code: self.status_code.as_deref().unwrap_or_default(),
            gross_amount: self.gross_amount.as_deref().unwrap_or_default(),
            signature_key: self.signature_key.as_deref().unwrap_or_default(),
            transaction_status: self.transaction_status.as_deref().unwrap_or_default(),
            fraud_status: self.fraud_status.as_deref(),
        })
    }
}

/// Maps a Midtrans `transaction_status` (and `fraud_status`) to our status.
pub fn map_gateway_status(transaction_status: &str, fraud_status: Option<&str>) -> Option<PaymentStatus> {
    match transaction_status {
        "capture" => match fraud_status {
            Some("challenge") => Some(PaymentStatus::Pending),
            Some("deny") => Some(PaymentStatus::Failed),
            _ => Some(PaymentStatus::Paid),
        },
        "settlement" => Some(PaymentStatus::Paid),
        "pending" => Some(PaymentStatus::Pending),
        "deny" | "cancel" | "expire" | "failure" => Some(PaymentStatus::Failed),
        "refund" | "partial_refund" => Some(PaymentStatus::Refunded),
        _ => None,
    }
}
