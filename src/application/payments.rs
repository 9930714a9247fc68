//! Payment capture and reconciliation.
//!
//! A payment becoming `paid` always goes through `PaymentService::apply_status`,
//! which completes the order and books the revenue exactly once. Every status
//! write is conditional on the status the payment was read with, so concurrent
//! duplicates (gateway retries, a staff confirm racing the webhook) settle once.

use super::{PageRequest, Pagination};
use crate::domain::audit::{AuditAction, NewAuditEntry, RequestContext};
use crate::domain::money::Money;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::payment::{
    AMOUNT_TOLERANCE, GatewayNotification, NewPayment, Payment, PaymentMethod, PaymentStatus,
    gateway_reference, map_gateway_status, parse_gateway_reference,
};
use crate::domain::ports::{
    AuditLogRef, MenuStoreRef, OrderStoreRef, PaymentGatewayRef, PaymentStoreRef,
    SalesStatStoreRef, SnapItem, SnapRequest,
};
use crate::domain::sales::{SalesEvent, date_key};
use crate::error::{PosError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::str::FromStr;

pub const DEFAULT_PAYMENT_PAGE_SIZE: u32 = 10;

const ENTITY_PAYMENT: &str = "Payment";
const ENTITY_ORDER: &str = "Order";

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPayment {
    #[serde(alias = "order_id")]
    pub order_id: u64,
    pub amount: Decimal,
    #[serde(default, alias = "payment_method")]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment_id: u64,
    pub order_id: u64,
    pub amount: Money,
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SnapCheckout {
    pub token: String,
    pub redirect_url: String,
    pub order_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GuestDigitalPayment {
    pub payment: Payment,
    pub midtrans: SnapCheckout,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPage {
    pub payments: Vec<Payment>,
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u32,
}

impl PaymentPage {
    fn new(payments: Vec<Payment>, pagination: Pagination) -> Self {
        Self {
            payments,
            total_items: pagination.total_items,
            total_pages: pagination.total_pages,
            current_page: pagination.current_page,
        }
    }
}

/// What a gateway notification changed.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationOutcome {
    pub order_id: u64,
    pub status: Option<PaymentStatus>,
    pub updated: usize,
}

#[derive(Clone)]
pub struct PaymentService {
    orders: OrderStoreRef,
    payments: PaymentStoreRef,
    menu: MenuStoreRef,
    audit: AuditLogRef,
    sales: SalesStatStoreRef,
    gateway: PaymentGatewayRef,
}

fn summary(payment: &Payment) -> Value {
    json!({
        "orderId": payment.order_id,
        "amount": payment.amount,
        "method": payment.payment_method,
    })
}

impl PaymentService {
    pub fn new(
        orders: OrderStoreRef,
        payments: PaymentStoreRef,
        menu: MenuStoreRef,
        audit: AuditLogRef,
        sales: SalesStatStoreRef,
        gateway: PaymentGatewayRef,
    ) -> Self {
        Self {
            orders,
            payments,
            menu,
            audit,
            sales,
            gateway,
        }
    }

    async fn get_order(&self, id: u64) -> Result<Order> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| PosError::not_found("Order not found"))
    }

    /// Moves `payment` to `next` if the stored row still has the status it was
    /// read with. Returns `None` when another writer changed it first. Only the
    /// winning transition into `paid` completes the order and books the revenue.
    async fn apply_status(&self, mut payment: Payment, next: PaymentStatus) -> Result<Option<Payment>> {
        let previous = payment.status;
        let now = Utc::now();
        payment.status = next;
        payment.updated_at = now;
        if !self.payments.update_if_status(payment.clone(), previous).await? {
            tracing::info!(
                payment_id = payment.id,
                from = ?previous,
                to = ?next,
                "payment changed concurrently; transition skipped"
            );
            return Ok(None);
        }

        if next == PaymentStatus::Paid && previous != PaymentStatus::Paid {
            if let Some(mut order) = self.orders.get(payment.order_id).await? {
                order.status = OrderStatus::Completed;
                order.updated_at = now;
                self.orders.update(order).await?;
            }
            self.sales
                .apply(&date_key(now), SalesEvent::PaymentPaid(payment.amount))
                .await?;
            tracing::info!(
                payment_id = payment.id,
                order_id = payment.order_id,
                amount = %payment.amount,
                "payment settled"
            );
        }
        Ok(Some(payment))
    }

    /// Persists gateway bookkeeping on `payment` without moving its status.
    /// Skipped when the stored status moved since the read.
    async fn touch(&self, mut payment: Payment) -> Result<()> {
        payment.updated_at = Utc::now();
        let status = payment.status;
        self.payments.update_if_status(payment, status).await?;
        Ok(())
    }

    /// Staff-side payment capture against an existing order.
    pub async fn process_payment(
        &self,
        request: ProcessPayment,
        ctx: &RequestContext,
    ) -> Result<PaymentReceipt> {
        if request.amount < Decimal::ZERO {
            return Err(PosError::validation("Invalid amount"));
        }
        let order = self.get_order(request.order_id).await?;

        if !order
            .total_amount
            .within_tolerance(request.amount, AMOUNT_TOLERANCE)
        {
            tracing::warn!(
                order_id = order.id,
                expected = %order.total_amount,
                submitted = %request.amount,
                "payment amount outside tolerance"
            );
            self.audit
                .record(
                    NewAuditEntry::new(AuditAction::PaymentAmountMismatch, ENTITY_ORDER, order.id, ctx)
                        .with_old(json!({ "totalAmount": order.total_amount }))
                        .with_new(json!({ "amount": request.amount })),
                )
                .await?;
            return Err(PosError::validation(
                "Payment amount does not match the order total",
            ));
        }

        let method = request.payment_method.unwrap_or_default();
        let payment = self
            .payments
            .create(NewPayment::for_method(order.id, order.total_amount, method))
            .await?;
        self.audit
            .record(
                NewAuditEntry::new(AuditAction::PaymentCreated, ENTITY_PAYMENT, payment.id, ctx)
                    .with_new(summary(&payment)),
            )
            .await?;
        tracing::info!(payment_id = payment.id, order_id = order.id, method = ?method, "payment created");

        Ok(PaymentReceipt {
            payment_id: payment.id,
            order_id: payment.order_id,
            amount: payment.amount,
            status: payment.status,
        })
    }

    /// Opens a hosted checkout for a guest order and records the pending payment.
    pub async fn create_guest_digital_payment(
        &self,
        order_id: u64,
        customer: Option<Value>,
        ctx: &RequestContext,
    ) -> Result<GuestDigitalPayment> {
        let order = self.get_order(order_id).await?;
        let reference = gateway_reference(order.id, Utc::now());

        let ids: Vec<u64> = order.items.iter().map(|it| it.menu_id).collect();
        let names: HashMap<u64, String> = self
            .menu
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();
        let item_details = order
            .items
            .iter()
            .map(|it| SnapItem {
                id: it.menu_id.to_string(),
                price: it.unit_price.to_gross_amount(),
                quantity: it.quantity,
                name: names
                    .get(&it.menu_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Menu #{}", it.menu_id)),
            })
            .collect();

        let session = self
            .gateway
            .create_transaction(SnapRequest {
                order_id: reference.clone(),
                gross_amount: order.total_amount.to_gross_amount(),
                customer_details: customer.filter(|c| !c.is_null()),
                item_details,
            })
            .await?;

        let mut new = NewPayment::for_method(order.id, order.total_amount, PaymentMethod::MidtransQris);
        new.provider_ref = Some(reference.clone());
        new.status = PaymentStatus::Pending;
        let payment = self.payments.create(new).await?;

        self.audit
            .record(
                NewAuditEntry::new(AuditAction::GuestQrisPaymentCreated, ENTITY_PAYMENT, payment.id, ctx)
                    .with_new(summary(&payment)),
            )
            .await?;
        tracing::info!(payment_id = payment.id, reference = %reference, "guest checkout opened");

        Ok(GuestDigitalPayment {
            payment,
            midtrans: SnapCheckout {
                token: session.token,
                redirect_url: session.redirect_url,
                order_id: reference,
            },
        })
    }

    /// Records a pay-at-the-counter intent. An open or settled payment for the
    /// order is returned as is.
    pub async fn create_guest_manual_payment(
        &self,
        order_id: u64,
        ctx: &RequestContext,
    ) -> Result<Payment> {
        let order = self.get_order(order_id).await?;
        if let Some(existing) = self
            .payments
            .find_by_order(order.id)
            .await?
            .into_iter()
            .find(|p| matches!(p.status, PaymentStatus::Pending | PaymentStatus::Paid))
        {
            return Ok(existing);
        }

        let payment = self
            .payments
            .create(NewPayment::for_method(order.id, order.total_amount, PaymentMethod::Manual))
            .await?;
        self.audit
            .record(
                NewAuditEntry::new(AuditAction::GuestManualPaymentCreated, ENTITY_PAYMENT, payment.id, ctx)
                    .with_new(summary(&payment)),
            )
            .await?;
        Ok(payment)
    }

    /// Reconciles an asynchronous gateway notification.
    pub async fn handle_notification(
        &self,
        notification: &GatewayNotification,
        ctx: &RequestContext,
    ) -> Result<NotificationOutcome> {
        let signed = notification.required()?;
        if !self.gateway.verify_signature(&signed) {
            tracing::warn!(reference = signed.order_id, "rejected notification with bad signature");
            return Err(PosError::Unauthorized("Invalid signature".into()));
        }
        let order_id = parse_gateway_reference(signed.order_id)
            .ok_or_else(|| PosError::validation("Invalid order reference"))?;

        self.audit
            .record(
                NewAuditEntry::new(AuditAction::PaymentWebhookReceived, ENTITY_PAYMENT, order_id, ctx)
                    .with_new(serde_json::to_value(notification)?),
            )
            .await?;

        let targets = match self.payments.find_by_provider_ref(signed.order_id).await? {
            Some(payment) => vec![payment],
            None => self.payments.find_by_order(order_id).await?,
        };
        if targets.is_empty() {
            return Err(PosError::not_found("Payment not found"));
        }

        let mapped = map_gateway_status(signed.transaction_status, signed.fraud_status);
        let gross = Decimal::from_str(signed.gross_amount.trim())
            .map_err(|_| PosError::validation("Invalid gross_amount"))?;

        let mut updated = 0;
        for mut payment in targets {
            payment.gateway_status = Some(signed.transaction_status.to_string());

            let Some(next) = mapped else {
                tracing::warn!(
                    payment_id = payment.id,
                    transaction_status = signed.transaction_status,
                    "unrecognised gateway status"
                );
                self.touch(payment).await?;
                continue;
            };

            if next == PaymentStatus::Paid
                && !payment.amount.within_tolerance(gross, AMOUNT_TOLERANCE)
            {
                tracing::warn!(
                    payment_id = payment.id,
                    expected = %payment.amount,
                    reported = %gross,
                    "gateway amount outside tolerance"
                );
                self.audit
                    .record(
                        NewAuditEntry::new(AuditAction::PaymentAmountMismatch, ENTITY_PAYMENT, payment.id, ctx)
                            .with_old(json!({ "amount": payment.amount }))
                            .with_new(json!({ "grossAmount": gross })),
                    )
                    .await?;
                self.touch(payment).await?;
                continue;
            }

            // Redelivery of the current status.
            if payment.status == next {
                self.touch(payment).await?;
                continue;
            }

            if !payment.status.can_transition_to(next) {
                tracing::warn!(
                    payment_id = payment.id,
                    from = ?payment.status,
                    to = ?next,
                    "ignoring illegal gateway transition"
                );
                self.touch(payment).await?;
                continue;
            }

            if self.apply_status(payment, next).await?.is_some() {
                updated += 1;
            }
        }

        Ok(NotificationOutcome {
            order_id,
            status: mapped,
            updated,
        })
    }

    /// Staff override of a payment's status.
    pub async fn update_status(&self, id: u64, status: &str, ctx: &RequestContext) -> Result<Payment> {
        let next = PaymentStatus::parse_manual(status)?;
        let payment = self.get_payment(id).await?;
        let previous = payment.status;
        if !previous.can_transition_to(next) {
            return Err(PosError::Conflict(format!(
                "Cannot change payment status from {} to {}",
                previous.as_str(),
                next.as_str()
            )));
        }

        let payment = self.apply_status(payment, next).await?.ok_or_else(|| {
            PosError::Conflict("Payment status changed concurrently, please retry".into())
        })?;
        self.audit
            .record(
                NewAuditEntry::new(AuditAction::PaymentStatusUpdated, ENTITY_PAYMENT, payment.id, ctx)
                    .with_old(json!({ "status": previous }))
                    .with_new(json!({ "status": next })),
            )
            .await?;
        Ok(payment)
    }

    /// Marks the order's pending manual payment as paid.
    pub async fn confirm_manual_payment(&self, order_id: u64, ctx: &RequestContext) -> Result<Payment> {
        let order = self.get_order(order_id).await?;
        let payment = self
            .payments
            .find_by_order(order.id)
            .await?
            .into_iter()
            .find(|p| p.payment_method == PaymentMethod::Manual)
            .ok_or_else(|| PosError::not_found("Manual payment not found"))?;
        if payment.status != PaymentStatus::Pending {
            return Err(PosError::validation("Payment already processed"));
        }

        let payment = self
            .apply_status(payment, PaymentStatus::Paid)
            .await?
            .ok_or_else(|| PosError::validation("Payment already processed"))?;
        self.audit
            .record(
                NewAuditEntry::new(AuditAction::ManualPaymentConfirmed, ENTITY_PAYMENT, payment.id, ctx)
                    .with_old(json!({ "status": PaymentStatus::Pending }))
                    .with_new(json!({ "status": PaymentStatus::Paid })),
            )
            .await?;
        Ok(payment)
    }

    pub async fn get_payment(&self, id: u64) -> Result<Payment> {
        self.payments
            .get(id)
            .await?
            .ok_or_else(|| PosError::not_found("Payment not found"))
    }

    pub async fn list_payments(&self, page: PageRequest) -> Result<PaymentPage> {
        let (payments, pagination) = page.slice(self.payments.list().await?);
        Ok(PaymentPage::new(payments, pagination))
    }
}
