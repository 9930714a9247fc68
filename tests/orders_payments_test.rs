mod common;

use chrono::Utc;
use common::{TestApp, signed_notification, spawn_app};
use reqwest::StatusCode;
use serde_json::{Value, json};

/// Menu with Nasi Goreng (25000) and Es Teh (5000); returns (owner, nasi, teh).
async fn stocked(app: &TestApp) -> (String, u64, u64) {
    let owner = app.owner_token().await;
    let nasi = app.create_menu_item(&owner, "Nasi Goreng", 25000).await;
    let teh = app.create_menu_item(&owner, "Es Teh", 5000).await;
    (owner, nasi, teh)
}

async fn process(
    app: &TestApp,
    token: &str,
    body: Value,
    headers: &[(&str, String)],
) -> (StatusCode, Value) {
    let mut request = app
        .client
        .post(app.url("/api/payments/process"))
        .bearer_auth(token)
        .json(&body);
    for (name, value) in headers {
        request = request.header(*name, value);
    }
    let response = request.send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_guest_order_is_priced_from_the_menu() {
    let app = spawn_app().await;
    let (_, nasi, teh) = stocked(&app).await;

    let (status, body) = app
        .post(
            "/api/orders/guest",
            None,
            json!({
                "tableNumber": 7,
                "customerName": "  Budi ",
                "items": [{"menuId": nasi, "quantity": 2}, {"menuId": teh, "quantity": 1}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = &body["data"];
    assert_eq!(order["totalAmount"].as_f64(), Some(55000.0));
    assert_eq!(order["customerName"], "Budi");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentMethod"], "guest");
    assert_eq!(order["items"][0]["unitPrice"].as_f64(), Some(25000.0));

    let id = order["id"].as_u64().unwrap();
    let (status, body) = app.get(&format!("/api/orders/guest/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tableNumber"], 7);

    let (status, _) = app.get("/api/orders/guest/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_orders_are_rejected() {
    let app = spawn_app().await;
    let (owner, nasi, _) = stocked(&app).await;

    let cases = [
        json!({"tableNumber": 1, "customerName": "Rina", "items": []}),
        json!({"tableNumber": 0, "customerName": "Rina", "items": [{"menuId": nasi, "quantity": 1}]}),
        json!({"tableNumber": 1, "customerName": " ", "items": [{"menuId": nasi, "quantity": 1}]}),
        json!({"tableNumber": 1, "customerName": "Rina", "items": [{"menuId": nasi, "quantity": 0}]}),
        json!({"tableNumber": 1, "customerName": "Rina", "items": [{"menuId": 999, "quantity": 1}]}),
        json!({"tableNumber": 1, "customerName": "Rina", "items": [{"menuId": nasi, "quantity": 4_000_000_000u64}]}),
    ];
    for case in cases {
        let (status, body) = app.post("/api/orders/guest", None, case.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case} -> {body}");
    }

    app.put(
        &format!("/api/menu/{nasi}"),
        Some(&owner),
        json!({"isAvailable": false}),
    )
    .await;
    let (status, body) = app
        .post(
            "/api/orders/guest",
            None,
            json!({"tableNumber": 1, "customerName": "Rina", "items": [{"menuId": nasi, "quantity": 1}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Menu item Nasi Goreng is not available");
}

#[tokio::test]
async fn test_staff_order_entry_and_status_updates() {
    let app = spawn_app().await;
    let (owner, nasi, _) = stocked(&app).await;
    let staff = app.staff_token(&owner, "kasir@resto.id").await;

    let items = json!([{"menuId": nasi, "quantity": 1}]);
    let (status, _) = app
        .post("/api/orders", None, json!({"tableNumber": 2, "items": items}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/api/orders",
            Some(&staff),
            json!({"tableNumber": 2, "items": items, "paymentMethod": "guest"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .post("/api/orders", Some(&staff), json!({"tableNumber": 2, "items": items}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["paymentMethod"], "manual");
    let id = body["data"]["id"].as_u64().unwrap();
    let item_id = body["data"]["items"][0]["id"].as_u64().unwrap();

    let (status, body) = app
        .put(
            &format!("/api/staff/orders/{id}/status"),
            Some(&staff),
            json!({"status": "preparing"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "preparing");

    let (status, _) = app
        .put(
            &format!("/api/orders/{id}/status"),
            Some(&staff),
            json!({"status": "eaten"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(
            &format!("/api/orders/order-items/{item_id}/status"),
            Some(&staff),
            json!({"status": "served"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["item"]["status"], "served");
    assert_eq!(body["data"]["order"]["items"][0]["status"], "served");

    let (status, _) = app
        .put(
            "/api/orders/order-items/999/status",
            Some(&staff),
            json!({"status": "served"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_staff_order_queue_pages_and_filters() {
    let app = spawn_app().await;
    let (owner, nasi, teh) = stocked(&app).await;
    let staff = app.staff_token(&owner, "kasir@resto.id").await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(app.guest_order(json!([{"menuId": nasi, "quantity": 1}])).await);
    }
    app.put(
        &format!("/api/staff/orders/{}/status", ids[0]),
        Some(&staff),
        json!({"status": "ready"}),
    )
    .await;

    let (status, body) = app.get("/api/staff/orders?limit=2", Some(&staff)).await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["orders"].as_array().unwrap().len(), 2);
    assert_eq!(page["orders"][0]["id"].as_u64(), Some(ids[2]));
    assert_eq!(page["pagination"]["totalItems"], 3);
    assert_eq!(page["pagination"]["totalPages"], 2);
    assert_eq!(page["pagination"]["currentPage"], 1);

    let (_, body) = app
        .get("/api/staff/orders?status=ready&page=1", Some(&staff))
        .await;
    assert_eq!(body["data"]["orders"].as_array().unwrap().len(), 1);
    let (_, body) = app.get("/api/staff/orders?status=all", Some(&staff)).await;
    assert_eq!(body["data"]["pagination"]["totalItems"], 3);

    let (status, _) = app.get("/api/staff/orders?page=0", Some(&staff)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/staff/orders?status=lost", Some(&staff)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Receipt lines carry the current menu name and price.
    let order = app
        .guest_order(json!([{"menuId": teh, "quantity": 3}]))
        .await;
    app.put(
        &format!("/api/menu/{teh}"),
        Some(&owner),
        json!({"name": "Es Teh Manis", "price": 6000}),
    )
    .await;
    let (status, body) = app
        .get(&format!("/api/staff/orders/{order}/receipt"), Some(&staff))
        .await;
    assert_eq!(status, StatusCode::OK);
    let line = &body["data"]["items"][0];
    assert_eq!(line["menuName"], "Es Teh Manis");
    assert_eq!(line["menuPrice"].as_f64(), Some(6000.0));
    assert_eq!(line["unitPrice"].as_f64(), Some(5000.0));
    assert_eq!(body["data"]["totalAmount"].as_f64(), Some(15000.0));
}

#[tokio::test]
async fn test_process_payment_checks_amount_and_replays() {
    let app = spawn_app().await;
    let (owner, nasi, teh) = stocked(&app).await;
    let staff = app.staff_token(&owner, "kasir@resto.id").await;
    let order = app
        .guest_order(json!([{"menuId": nasi, "quantity": 2}, {"menuId": teh, "quantity": 1}]))
        .await;

    let (status, body) = process(&app, &staff, json!({"orderId": order, "amount": 40000}), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment amount does not match the order total");

    // Within the 10% tolerance; the payment is booked at the order total.
    let (status, body) = process(&app, &staff, json!({"orderId": order, "amount": 50000}), &[]).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["amount"].as_f64(), Some(55000.0));

    let key = [("Idempotency-Key", "till-1-0001".to_string())];
    let (first_status, first) =
        process(&app, &staff, json!({"orderId": order, "amount": 55000}), &key).await;
    let (second_status, second) =
        process(&app, &staff, json!({"orderId": order, "amount": 55000}), &key).await;
    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::CREATED);
    assert_eq!(first["data"]["paymentId"], second["data"]["paymentId"]);

    // Another cashier reusing the key gets a payment of their own.
    let other = app.staff_token(&owner, "kasir2@resto.id").await;
    let (status, third) =
        process(&app, &other, json!({"orderId": order, "amount": 55000}), &key).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(third["data"]["paymentId"], first["data"]["paymentId"]);

    let now = Utc::now().timestamp_millis().to_string();
    let replay = [("X-Nonce", "n-42".to_string()), ("X-Timestamp", now)];
    let (status, _) = process(&app, &staff, json!({"orderId": order, "amount": 55000}), &replay).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) =
        process(&app, &staff, json!({"orderId": order, "amount": 55000}), &replay).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Duplicate request detected");

    let stale = [("X-Nonce", "n-43".to_string()), ("X-Timestamp", "1000".to_string())];
    let (status, body) = process(&app, &staff, json!({"orderId": order, "amount": 55000}), &stale).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Request expired");

    let (status, body) = app.get("/api/payments?limit=2", Some(&staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalItems"], 4);
    assert_eq!(body["data"]["payments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_guest_digital_payment_settles_through_webhook() {
    let app = spawn_app().await;
    let (owner, nasi, teh) = stocked(&app).await;
    let order = app
        .guest_order(json!([{"menuId": nasi, "quantity": 2}, {"menuId": teh, "quantity": 1}]))
        .await;

    let (status, body) = app
        .post(
            "/api/payments/guest/pay",
            None,
            json!({"orderId": order, "customerDetails": {"first_name": "Rina"}}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let reference = body["data"]["midtrans"]["order_id"].as_str().unwrap().to_string();
    assert!(reference.starts_with(&format!("order-{order}-")));
    assert_eq!(body["data"]["midtrans"]["token"], format!("snap-{reference}"));
    assert_eq!(body["data"]["payment"]["status"], "pending");
    assert_eq!(body["data"]["payment"]["providerRef"], reference.as_str());
    let payment = body["data"]["payment"]["id"].as_u64().unwrap();

    let mut forged = signed_notification(&reference, "settlement", "55000.00");
    forged["signature_key"] = json!("0000");
    let (status, body) = app.post("/api/payments/midtrans-webhook", None, forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid signature");

    let (status, _) = app
        .post("/api/payments/midtrans-webhook", None, json!({"order_id": reference}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let notification = signed_notification(&reference, "settlement", "55000.00");
    let (status, body) = app
        .post("/api/payments/midtrans-webhook", None, notification.clone())
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    let (_, body) = app.get(&format!("/api/payments/{payment}"), Some(&owner)).await;
    assert_eq!(body["data"]["status"], "paid");
    assert_eq!(body["data"]["gatewayStatus"], "settlement");
    let (_, body) = app.get(&format!("/api/orders/guest/{order}"), None).await;
    assert_eq!(body["data"]["status"], "completed");

    // A redelivered notification does not book the revenue twice.
    let (status, _) = app
        .post("/api/payments/midtrans-webhook", None, notification)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.get("/api/owner/stats/daily", Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalRevenue"].as_f64(), Some(55000.0));
    assert_eq!(body["data"]["totalPaidPayments"], 1);
    assert_eq!(body["data"]["totalOrders"], 1);
}

#[tokio::test]
async fn test_webhook_amount_mismatch_leaves_payment_open() {
    let app = spawn_app().await;
    let (owner, nasi, _) = stocked(&app).await;
    let order = app.guest_order(json!([{"menuId": nasi, "quantity": 1}])).await;

    let (_, body) = app
        .post("/api/payments/guest/pay", None, json!({"orderId": order}))
        .await;
    let reference = body["data"]["midtrans"]["order_id"].as_str().unwrap().to_string();
    let payment = body["data"]["payment"]["id"].as_u64().unwrap();

    let (status, _) = app
        .post(
            "/api/payments/midtrans-webhook",
            None,
            signed_notification(&reference, "settlement", "1000.00"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/api/payments/{payment}"), Some(&owner)).await;
    assert_eq!(body["data"]["status"], "pending");

    let (status, _) = app
        .post(
            "/api/payments/midtrans-webhook",
            None,
            signed_notification("order-999-1", "settlement", "1000.00"),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guest_manual_payment_confirmed_by_staff() {
    let app = spawn_app().await;
    let (owner, nasi, _) = stocked(&app).await;
    let staff = app.staff_token(&owner, "kasir@resto.id").await;
    let order = app.guest_order(json!([{"menuId": nasi, "quantity": 1}])).await;

    let (status, body) = app
        .post("/api/payments/guest/manual", None, json!({"orderId": order}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["payment"]["paymentMethod"], "manual");
    assert_eq!(body["data"]["payment"]["status"], "pending");
    let payment = body["data"]["payment"]["id"].clone();

    let (_, body) = app
        .post("/api/payments/guest/manual", None, json!({"orderId": order}))
        .await;
    assert_eq!(body["data"]["payment"]["id"], payment);

    let confirm = format!("/api/staff/payments/manual/{order}/confirm");
    let (status, _) = app.post(&confirm, None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.post(&confirm, Some(&staff), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Payment confirmed");
    assert_eq!(body["data"]["status"], "paid");

    let (status, body) = app.post(&confirm, Some(&staff), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment already processed");

    let (_, body) = app.get(&format!("/api/orders/guest/{order}"), None).await;
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn test_payment_status_override_rules() {
    let app = spawn_app().await;
    let (owner, nasi, _) = stocked(&app).await;
    let order = app.guest_order(json!([{"menuId": nasi, "quantity": 1}])).await;
    let (_, body) = app
        .post("/api/payments/guest/manual", None, json!({"orderId": order}))
        .await;
    let payment = body["data"]["payment"]["id"].as_u64().unwrap();
    let path = format!("/api/payments/{payment}/status");

    let (status, _) = app.put(&path, Some(&owner), json!({"status": "refunded"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.put(&path, Some(&owner), json!({"status": "paid"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");

    let (status, body) = app.put(&path, Some(&owner), json!({"status": "pending"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Cannot change payment status from paid to pending");
}

#[tokio::test]
async fn test_owner_reports() {
    let app = spawn_app().await;
    let (owner, nasi, teh) = stocked(&app).await;
    let staff = app.staff_token(&owner, "kasir@resto.id").await;

    let first = app
        .guest_order(json!([{"menuId": nasi, "quantity": 2}, {"menuId": teh, "quantity": 1}]))
        .await;
    app.guest_order(json!([{"menuId": teh, "quantity": 4}])).await;
    let third = app.guest_order(json!([{"menuId": teh, "quantity": 1}])).await;
    for id in [first, third] {
        let (status, _) = app
            .put(
                &format!("/api/staff/orders/{id}/status"),
                Some(&staff),
                json!({"status": "completed"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app.get("/api/owner/reports/sales", Some(&staff)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/owner/reports/sales", Some(&owner)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let report = &body["data"];
    assert_eq!(report["summary"]["totalOrders"], 2);
    assert_eq!(report["summary"]["totalRevenue"].as_f64(), Some(60000.0));
    assert_eq!(report["summary"]["averageOrderValue"].as_f64(), Some(30000.0));
    assert_eq!(report["periods"].as_array().unwrap().len(), 1);
    assert_eq!(report["topSellingItems"][0]["name"], "Nasi Goreng");
    assert_eq!(report["topSellingItems"][0]["quantity"], 2);

    let (status, body) = app
        .get("/api/owner/reports/sales?period=custom&start=2020-01-01&end=2020-01-31", Some(&owner))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["totalOrders"], 0);

    for query in ["period=yearly", "period=custom&start=2020-01-01", "period=daily&start=01-01-2020"] {
        let (status, _) = app
            .get(&format!("/api/owner/reports/sales?{query}"), Some(&owner))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
    }

    let (_, body) = app.get("/api/owner/stats/daily", Some(&owner)).await;
    assert_eq!(body["data"]["totalOrders"], 3);
    assert_eq!(body["data"]["totalPaidPayments"], 0);
    let (_, body) = app
        .get("/api/owner/stats/daily?date=2020-01-01", Some(&owner))
        .await;
    assert_eq!(body["data"]["date"], "2020-01-01");
    assert_eq!(body["data"]["totalOrders"], 0);
}
