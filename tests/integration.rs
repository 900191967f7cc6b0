use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delivery_lifecycle::api::rest::router;
use delivery_lifecycle::state::{AppState, Stores};
use serde_json::{json, Value};
use tower::ServiceExt;

const API: &str = "/api/v1/delivery";

fn setup() -> axum::Router {
    let state = AppState::new(Stores::in_memory(), Duration::from_secs(5), 1024);
    router(Arc::new(state))
}

fn json_request(method: &str, uri: &str, courier: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(courier) = courier {
        builder = builder.header("x-courier-id", courier);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, courier: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(courier) = courier {
        builder = builder.header("x-courier-id", courier);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn job_payload(order_id: &str, fee: i64) -> Value {
    json!({
        "orderId": order_id,
        "customerName": "Kavya",
        "customerPhone": "9000000003",
        "pickupAddress": "Dark store 7",
        "deliveryAddress": "14 Church Street",
        "pickup": { "lat": 12.975, "lng": 77.605 },
        "dropoff": { "lat": 12.968, "lng": 77.61 },
        "distanceKm": 2.4,
        "orderAmount": 820,
        "deliveryFee": fee,
        "items": [
            { "productId": "p-1", "name": "Milk", "quantity": 2, "price": 60 },
            { "productId": "p-2", "name": "Bread", "quantity": 1, "price": 45 }
        ],
        "paymentMethod": "online"
    })
}

async fn create_job(app: &axum::Router, order_id: &str, fee: i64) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", &format!("{API}/jobs"), None, job_payload(order_id, fee)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn register_courier(app: &axum::Router, id: &str) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{API}/couriers"),
            None,
            json!({ "id": id, "phoneNumber": "9876543210", "name": "Arjun" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

async fn post(app: &axum::Router, uri: &str, courier: &str, body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(json_request("POST", uri, Some(courier), body))
        .await
        .unwrap()
}

async fn deliver(app: &axum::Router, courier: &str, order_id: &str, fee: i64) -> String {
    let id = create_job(app, order_id, fee).await;

    let res = post(app, &format!("{API}/orders/{id}/accept"), courier, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = post(
        app,
        &format!("{API}/orders/{id}/status"),
        courier,
        json!({ "status": "in_transit" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = post(
        app,
        &format!("{API}/orders/{id}/complete"),
        courier,
        json!({ "notes": "handed to customer" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    id
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "delivery-lifecycle");
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    create_job(&app, "ORD-M", 40).await;

    let response = app.oneshot(get_request("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("jobs_created_total 1"));
    assert!(body.contains("lifecycle_operations_total"));
}

#[tokio::test]
async fn protected_routes_require_courier_identity() {
    let app = setup();
    let response = app
        .oneshot(get_request(&format!("{API}/orders/active"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn created_job_is_pending_and_listed_as_claimable() {
    let app = setup();
    let id = create_job(&app, "ORD-1", 40).await;

    let res = app
        .clone()
        .oneshot(get_request(&format!("{API}/orders/{id}"), Some("c-1")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["order"]["status"], "pending");
    assert!(body["order"]["courierId"].is_null());
    assert_eq!(body["order"]["itemsCount"], 3);

    let res = app
        .clone()
        .oneshot(get_request(&format!("{API}/orders/ORD-1"), Some("c-1")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["order"]["id"], id);

    let res = app
        .oneshot(get_request(&format!("{API}/orders/pending"), Some("c-1")))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["orders"][0]["id"], id);
}

#[tokio::test]
async fn duplicate_order_returns_400() {
    let app = setup();
    create_job(&app, "ORD-1", 40).await;

    let res = app
        .oneshot(json_request("POST", &format!("{API}/jobs"), None, job_payload("ORD-1", 40)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn accept_missing_job_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let res = post(&app, &format!("{API}/orders/{fake_id}/accept"), "c-1", json!({})).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_accept_is_not_available() {
    let app = setup();
    let id = create_job(&app, "ORD-1", 40).await;

    let res = post(&app, &format!("{API}/orders/{id}/accept"), "c-1", json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Order accepted successfully");

    let res = post(&app, &format!("{API}/orders/{id}/accept"), "c-2", json!({})).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "job not available");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_have_one_winner() {
    let app = setup();
    let id = create_job(&app, "ORD-RACE", 40).await;

    let mut handles = Vec::new();
    for n in 0..16 {
        let app = app.clone();
        let uri = format!("{API}/orders/{id}/accept");
        handles.push(tokio::spawn(async move {
            let courier = format!("c-{n}");
            app.oneshot(json_request("POST", &uri, Some(&courier), json!({})))
                .await
                .unwrap()
                .status()
        }));
    }

    let mut ok = 0;
    let mut conflict = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::CONFLICT => conflict += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflict, 15);
}

#[tokio::test]
async fn status_update_by_other_courier_returns_403() {
    let app = setup();
    let id = create_job(&app, "ORD-1", 40).await;
    post(&app, &format!("{API}/orders/{id}/accept"), "c-1", json!({})).await;

    let res = post(
        &app,
        &format!("{API}/orders/{id}/status"),
        "c-2",
        json!({ "status": "in_transit" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn skipping_a_status_returns_422() {
    let app = setup();
    let id = create_job(&app, "ORD-1", 40).await;
    post(&app, &format!("{API}/orders/{id}/accept"), "c-1", json!({})).await;

    let res = post(
        &app,
        &format!("{API}/orders/{id}/status"),
        "c-1",
        json!({ "status": "pending" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(res).await;
    assert_eq!(body["message"], "invalid status transition: picked_up -> pending");
}

#[tokio::test]
async fn status_skip_to_delivered_returns_422() {
    let app = setup();
    let id = create_job(&app, "ORD-1", 40).await;
    post(&app, &format!("{API}/orders/{id}/accept"), "c-1", json!({})).await;

    let res = post(
        &app,
        &format!("{API}/orders/{id}/status"),
        "c-1",
        json!({ "status": "delivered" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(res).await;
    assert_eq!(body["message"], "invalid status transition: picked_up -> delivered");

    let res = app
        .oneshot(get_request(&format!("{API}/earnings/history"), Some("c-1")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["total"], 0);
}

#[tokio::test]
async fn oversized_fee_is_rejected_on_create() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            &format!("{API}/jobs"),
            None,
            job_payload("ORD-1", i64::MAX),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn complete_before_transit_returns_409() {
    let app = setup();
    let id = create_job(&app, "ORD-1", 40).await;
    post(&app, &format!("{API}/orders/{id}/accept"), "c-1", json!({})).await;

    let res = post(&app, &format!("{API}/orders/{id}/complete"), "c-1", json!({})).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn full_delivery_flow_records_earnings_and_location() {
    let app = setup();
    register_courier(&app, "c-1").await;
    let id = create_job(&app, "ORD-1", 150).await;

    let res = post(&app, &format!("{API}/orders/{id}/accept"), "c-1", json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request(&format!("{API}/orders/active"), Some("c-1")))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["orders"][0]["status"], "picked_up");

    let res = post(
        &app,
        &format!("{API}/orders/{id}/status"),
        "c-1",
        json!({ "status": "in_transit", "latitude": 12.97, "longitude": 77.6 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = post(
        &app,
        &format!("{API}/orders/{id}/complete"),
        "c-1",
        json!({ "latitude": 12.968, "longitude": 77.61, "notes": "at reception" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["message"], "Delivery completed successfully");

    let res = app
        .clone()
        .oneshot(get_request(&format!("{API}/orders/{id}"), Some("c-1")))
        .await
        .unwrap();
    let order = body_json(res).await["order"].clone();
    assert_eq!(order["status"], "delivered");
    assert_eq!(order["notes"], "at reception");
    assert!(!order["pickedUpAt"].is_null());
    assert!(!order["inTransitAt"].is_null());
    assert!(!order["deliveredAt"].is_null());
    assert!(order["cancelledAt"].is_null());

    let res = app
        .clone()
        .oneshot(get_request(&format!("{API}/earnings?period=today"), Some("c-1")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["totalEarnings"], 160);
    assert_eq!(body["deliveriesCount"], 1);
    assert_eq!(body["avgPerDelivery"], 160);
    assert_eq!(body["bonusEarnings"], 24);
    assert_eq!(body["weeklyCount"], 1);
    assert_eq!(body["period"], "today");

    let res = app
        .oneshot(get_request(&format!("{API}/profile"), Some("c-1")))
        .await
        .unwrap();
    let profile = body_json(res).await["profile"].clone();
    assert_eq!(profile["totalDeliveries"], 1);
    assert_eq!(profile["location"]["lat"], 12.968);
    assert_eq!(profile["location"]["lng"], 77.61);
}

#[tokio::test]
async fn completing_twice_is_rejected_without_double_pay() {
    let app = setup();
    let id = deliver(&app, "c-1", "ORD-1", 80).await;

    let res = post(&app, &format!("{API}/orders/{id}/complete"), "c-1", json!({})).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .oneshot(get_request(&format!("{API}/earnings/history"), Some("c-1")))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["amount"], 80);
    assert_eq!(body["limit"], 50);
}

#[tokio::test]
async fn order_history_paginates() {
    let app = setup();
    for n in 0..5 {
        deliver(&app, "c-1", &format!("ORD-{n}"), 40).await;
    }

    let res = app
        .clone()
        .oneshot(get_request(
            &format!("{API}/orders/history?limit=2&offset=0"),
            Some("c-1"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 5);
    assert_eq!(body["hasNext"], true);
    assert_eq!(body["hasPrevious"], false);

    let res = app
        .clone()
        .oneshot(get_request(
            &format!("{API}/orders/history?limit=2&offset=4"),
            Some("c-1"),
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["hasNext"], false);
    assert_eq!(body["hasPrevious"], true);

    let res = app
        .oneshot(get_request(&format!("{API}/orders/history?limit=0"), Some("c-1")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn earnings_for_idle_courier_are_zero() {
    let app = setup();
    let res = app
        .clone()
        .oneshot(get_request(&format!("{API}/earnings"), Some("c-idle")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["totalEarnings"], 0);
    assert_eq!(body["deliveriesCount"], 0);
    assert_eq!(body["avgPerDelivery"], 0);
    assert_eq!(body["period"], "week");

    let res = app
        .oneshot(get_request(&format!("{API}/earnings?period=year"), Some("c-idle")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dispatch_then_courier_picks_up() {
    let app = setup();
    register_courier(&app, "c-1").await;
    let id = create_job(&app, "ORD-1", 40).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{API}/jobs/{id}/dispatch"),
            None,
            json!({ "courierId": "c-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = post(&app, &format!("{API}/orders/{id}/accept"), "c-2", json!({})).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = post(
        &app,
        &format!("{API}/orders/{id}/status"),
        "c-1",
        json!({ "status": "picked_up" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn profile_patch_location_and_availability() {
    let app = setup();
    register_courier(&app, "c-1").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("{API}/profile"),
            Some("c-1"),
            json!({ "vehicleType": "bike", "vehicleNumber": "KA-05-7788" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = post(
        &app,
        &format!("{API}/availability"),
        "c-1",
        json!({ "isAvailable": true }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["message"], "You are now online");

    let res = post(
        &app,
        &format!("{API}/location"),
        "c-1",
        json!({ "latitude": 200.0, "longitude": 77.6 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(get_request(&format!("{API}/profile"), Some("c-1")))
        .await
        .unwrap();
    let profile = body_json(res).await["profile"].clone();
    assert_eq!(profile["name"], "Arjun");
    assert_eq!(profile["vehicleType"], "bike");
    assert_eq!(profile["vehicleNumber"], "KA-05-7788");
    assert_eq!(profile["isAvailable"], true);
    assert!(profile["location"].is_null());
}

#[tokio::test]
async fn unknown_courier_profile_returns_404() {
    let app = setup();
    let res = app
        .oneshot(get_request(&format!("{API}/profile"), Some("nobody")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
