//! REST API over the application services.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod rate_limit;
pub mod response;
pub mod state;

use crate::error::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{
    AUTHORIZATION, CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::http::{HeaderName, HeaderValue, Method, request};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use error::ApiError;
use handlers::{auth, health, menu, orders, owner, payments, staff};
use state::AppState;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const BODY_LIMIT_BYTES: usize = 10 * 1024;

fn origin_allowed(origin: &HeaderValue, frontend_url: Option<&str>, development: bool) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    if frontend_url.is_some_and(|url| url.trim_end_matches('/') == origin) {
        return true;
    }
    development
        && origin
            .strip_prefix("http://localhost:")
            .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

fn cors(state: &AppState) -> CorsLayer {
    let frontend_url = state.settings.frontend_url.clone();
    let development = state.settings.development;
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &request::Parts| {
                origin_allowed(origin, frontend_url.as_deref(), development)
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("idempotency-key"),
            HeaderName::from_static("x-nonce"),
            HeaderName::from_static("x-timestamp"),
        ])
        .max_age(Duration::from_secs(60 * 60))
}

async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

pub fn router(state: AppState) -> Router {
    let payment_limit = from_fn_with_state(state.clone(), rate_limit::payment_limit);

    let api = Router::new()
        // auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/users", get(auth::list_users).post(auth::create_user))
        .route("/api/auth/users/{id}/role", put(auth::update_role))
        .route("/api/auth/users/{id}", delete(auth::delete_user))
        // menu
        .route("/api/menu", get(menu::list_items).post(menu::create_item))
        .route("/api/menu/filters", get(menu::filters))
        .route(
            "/api/menu/categories",
            get(menu::list_categories).post(menu::create_category),
        )
        .route(
            "/api/menu/categories/{id}",
            put(menu::update_category).delete(menu::delete_category),
        )
        .route(
            "/api/menu/categories/{id}/subcategories",
            post(menu::add_subcategory),
        )
        .route(
            "/api/menu/categories/{id}/subcategories/{sub}",
            delete(menu::remove_subcategory),
        )
        .route(
            "/api/menu/{id}",
            get(menu::get_item)
                .put(menu::update_item)
                .delete(menu::delete_item),
        )
        // orders
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/guest", post(orders::create_guest_order))
        .route("/api/orders/guest/{id}", get(orders::get_guest_order))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/status", put(orders::update_status))
        .route(
            "/api/orders/order-items/{id}/status",
            put(orders::update_item_status),
        )
        // payments
        .route(
            "/api/payments/midtrans-webhook",
            post(payments::midtrans_webhook),
        )
        .route("/api/payments/guest/pay", post(payments::guest_pay))
        .route("/api/payments/guest/manual", post(payments::guest_manual))
        .route(
            "/api/payments",
            get(payments::list_payments).post(payments::process_payment),
        )
        .route(
            "/api/payments/process",
            post(payments::process_payment).route_layer(payment_limit),
        )
        .route("/api/payments/{id}", get(payments::get_payment))
        .route("/api/payments/{id}/status", put(payments::update_status))
        // staff
        .route("/api/staff", get(staff::list_staff).post(staff::create_staff))
        .route(
            "/api/staff/{id}",
            put(staff::update_staff).delete(staff::delete_staff),
        )
        .route("/api/staff/orders", get(staff::list_orders))
        .route("/api/staff/orders/{id}/receipt", get(staff::receipt))
        .route("/api/staff/orders/{id}/status", put(orders::update_status))
        .route(
            "/api/staff/payments/manual/{id}/confirm",
            post(staff::confirm_manual_payment),
        )
        // owner
        .route("/api/owner/reports/sales", get(owner::sales_report))
        .route("/api/owner/stats/daily", get(owner::daily_stats));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .merge(api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(from_fn_with_state(state.clone(), rate_limit::global_limit))
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API on `listener` until ctrl-c or SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let address = listener.local_addr()?;
    info!("Server running on {address}");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_rules() {
        let origin = |s: &'static str| HeaderValue::from_static(s);
        let frontend = Some("https://pos.example.com/");

        assert!(origin_allowed(&origin("https://pos.example.com"), frontend, false));
        assert!(!origin_allowed(&origin("https://evil.example.com"), frontend, false));
        assert!(origin_allowed(&origin("http://localhost:5173"), None, true));
        assert!(!origin_allowed(&origin("http://localhost:5173"), None, false));
        assert!(!origin_allowed(&origin("http://localhost:abc"), None, true));
        assert!(!origin_allowed(&origin("http://localhost:"), None, true));
    }
}
