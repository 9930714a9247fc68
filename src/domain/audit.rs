use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    PaymentAmountMismatch,
    PaymentCreated,
    PaymentWebhookReceived,
    GuestQrisPaymentCreated,
    GuestManualPaymentCreated,
    PaymentStatusUpdated,
    ManualPaymentConfirmed,
}

/// Who triggered an audited action and from where.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub user_id: Option<u64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: u64,
    pub user_id: Option<u64>,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub user_id: Option<u64>,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditEntry {
    pub fn new(action: AuditAction, entity: &str, entity_id: impl ToString, ctx: &RequestContext) -> Self {
        Self {
            user_id: ctx.user_id,
            action,
            entity: entity.to_string(),
            entity_id: entity_id.to_string(),
            old_value: None,
            new_value: None,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        }
    }

    pub fn with_old(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }

    pub fn with_new(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }
}
