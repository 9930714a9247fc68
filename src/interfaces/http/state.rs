use super::rate_limit::{RateLimitConfig, RateLimiter};
use crate::application::auth::{AuthService, AuthSettings};
use crate::application::idempotency::{IdempotencyCache, IdempotencyConfig};
use crate::application::menu::MenuService;
use crate::application::orders::OrderService;
use crate::application::payments::PaymentService;
use crate::application::replay::{ReplayConfig, ReplayGuard};
use crate::application::reports::ReportService;
use crate::domain::ports::{MailerRef, PaymentGatewayRef, Stores};
use std::sync::Arc;

/// HTTP-only knobs.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub trust_proxy: bool,
    /// Allowed CORS origin besides the development localhost rule.
    pub frontend_url: Option<String>,
    pub development: bool,
    /// Echoed on `/health` so the frontend can load Snap.
    pub midtrans_client_key: Option<String>,
    pub global_limit: RateLimitConfig,
    pub payment_limit: RateLimitConfig,
    pub replay: ReplayConfig,
    pub idempotency: IdempotencyConfig,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            trust_proxy: false,
            frontend_url: None,
            development: true,
            midtrans_client_key: None,
            global_limit: RateLimitConfig::global(),
            payment_limit: RateLimitConfig::payments(),
            replay: ReplayConfig::default(),
            idempotency: IdempotencyConfig::default(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub menu: MenuService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub reports: ReportService,
    pub idempotency: Arc<IdempotencyCache>,
    pub replay: Arc<ReplayGuard>,
    pub global_limiter: Arc<RateLimiter>,
    pub payment_limiter: Arc<RateLimiter>,
    pub settings: Arc<HttpSettings>,
}

impl AppState {
    pub fn new(
        stores: Stores,
        gateway: PaymentGatewayRef,
        mailer: MailerRef,
        auth: AuthSettings,
        settings: HttpSettings,
    ) -> Self {
        Self {
            auth: AuthService::new(stores.users.clone(), mailer, auth),
            menu: MenuService::new(stores.categories.clone(), stores.menu.clone()),
            orders: OrderService::new(
                stores.orders.clone(),
                stores.menu.clone(),
                stores.sales.clone(),
            ),
            payments: PaymentService::new(
                stores.orders.clone(),
                stores.payments.clone(),
                stores.menu.clone(),
                stores.audit.clone(),
                stores.sales.clone(),
                gateway,
            ),
            reports: ReportService::new(stores.orders, stores.menu, stores.sales),
            idempotency: Arc::new(IdempotencyCache::new(settings.idempotency.clone())),
            replay: Arc::new(ReplayGuard::new(settings.replay.clone())),
            global_limiter: Arc::new(RateLimiter::new(settings.global_limit.clone())),
            payment_limiter: Arc::new(RateLimiter::new(settings.payment_limit.clone())),
            settings: Arc::new(settings),
        }
    }
}
