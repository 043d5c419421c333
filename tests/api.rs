//! End-to-end tests against the router backed by the in-memory store.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use mahakal_store::domain::value_objects::Phone;
use mahakal_store::otp::SmsSender;
use mahakal_store::payments::{self, GatewayOrder, PaymentGateway};
use mahakal_store::store::MemoryStore;
use mahakal_store::{build_router, AppState, Config, EventPublisher, Result, ShopError};

const ADMIN: &str = "admin-secret";
const KEY_SECRET: &str = "rzp_test_secret";
const WEBHOOK_SECRET: &str = "whsec_test";
const PHONE: &str = "9876543210";

/// Issues a new gateway order id on every call, like Razorpay.
#[derive(Default)]
struct FakeGateway {
    issued: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn key_id(&self) -> &str {
        "rzp_test_key"
    }

    async fn create_order(&self, amount_paise: i64, receipt: &str) -> Result<GatewayOrder> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder { id: format!("order_{receipt}_{n}"), amount: amount_paise, currency: "INR".into() })
    }

    fn verify_payment(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
        payments::verify_payment_signature(KEY_SECRET, gateway_order_id, payment_id, signature)
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        payments::verify_webhook_signature(WEBHOOK_SECRET, body, signature)
    }
}

struct DownGateway;

#[async_trait]
impl PaymentGateway for DownGateway {
    fn key_id(&self) -> &str {
        "rzp_test_key"
    }

    async fn create_order(&self, _amount_paise: i64, _receipt: &str) -> Result<GatewayOrder> {
        Err(ShopError::Gateway("razorpay returned 503 Service Unavailable".into()))
    }

    fn verify_payment(&self, _gateway_order_id: &str, _payment_id: &str, _signature: &str) -> bool {
        false
    }

    fn verify_webhook(&self, _body: &[u8], _signature: &str) -> bool {
        false
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<(String, String)>>);

#[async_trait]
impl SmsSender for Inbox {
    async fn send_otp(&self, phone: &Phone, code: &str) -> Result<()> {
        self.0.lock().unwrap().push((phone.to_string(), code.to_string()));
        Ok(())
    }
}

impl Inbox {
    fn last_code(&self) -> String {
        self.0.lock().unwrap().last().map(|(_, c)| c.clone()).expect("no otp sent")
    }
}

struct TestApp {
    router: Router,
    inbox: Arc<Inbox>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_gateway(Arc::new(FakeGateway::default()))
    }

    fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        let inbox = Arc::new(Inbox::default());
        let state = AppState::new(
            Config::for_tests(ADMIN),
            Arc::new(MemoryStore::new()),
            gateway,
            inbox.clone(),
            EventPublisher::disabled(),
        );
        Self { router: build_router(state), inbox }
    }

    async fn call(&self, method: Method, uri: &str, headers: &[(&str, &str)], body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        self.send(req.body(body).unwrap()).await
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        // axum's own rejections are plain text
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, &[], None).await
    }

    async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let auth = format!("Bearer {ADMIN}");
        self.call(method, uri, &[("authorization", auth.as_str())], body).await
    }

    async fn create_category(&self, name: &str) -> Value {
        let (status, body) = self.admin(Method::POST, "/admin/categories", Some(json!({"name": name}))).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    async fn create_product(&self, product: Value) -> Value {
        let (status, body) = self.admin(Method::POST, "/admin/products", Some(product)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    async fn verify_phone(&self, phone: &str) -> String {
        let (status, _) = self.call(Method::POST, "/otp/send", &[], Some(json!({"phone": phone}))).await;
        assert_eq!(status, StatusCode::OK);
        let code = self.inbox.last_code();
        let (status, body) = self.call(Method::POST, "/otp/verify", &[], Some(json!({"phone": phone, "code": code}))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn place(&self, token: &str, order: Value) -> (StatusCode, Value) {
        self.call(Method::POST, "/orders/create", &[("x-verification-token", token)], Some(order)).await
    }
}

fn address(phone: &str) -> Value {
    json!({
        "name": "Asha Verma",
        "phone": phone,
        "line1": "12 Mahakal Marg",
        "city": "Ujjain",
        "state": "Madhya Pradesh",
        "pincode": "456001"
    })
}

fn order_body(product_id: &Value, quantity: u32, method: &str) -> Value {
    json!({
        "items": [{"product_id": product_id, "quantity": quantity}],
        "shipping_address": address(PHONE),
        "payment_method": method
    })
}

async fn seeded() -> (TestApp, Value) {
    seeded_with(TestApp::new()).await
}

async fn seeded_with(app: TestApp) -> (TestApp, Value) {
    let category = app.create_category("Rudraksha").await;
    let product = app
        .create_product(json!({
            "name": "Panchmukhi Rudraksha Mala",
            "description": "108 bead mala from Nepal",
            "price": 1000,
            "category_id": category["id"],
            "images": ["/img/mala.jpg"]
        }))
        .await;
    (app, product)
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::POST, "/admin/categories", &[], Some(json!({"name": "Idols"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app
        .call(Method::POST, "/admin/categories", &[("authorization", "Bearer wrong")], Some(json!({"name": "Idols"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_listing_and_lookup() {
    let (app, product) = seeded().await;
    app.create_product(json!({"name": "Brass Diya", "price": 250, "available": false})).await;

    let (status, all) = app.get("/api/getproducts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, available) = app.get("/api/getproducts?available=true").await;
    assert_eq!(available.as_array().unwrap().len(), 1);

    let (_, by_category) = app.get("/api/getproducts?category=rudraksha").await;
    assert_eq!(by_category[0]["id"], product["id"]);

    let (status, _) = app.get("/api/getproducts?category=unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, fetched) = app.get(&format!("/api/getproductbyid/{}", product["id"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["slug"], "panchmukhi-rudraksha-mala");

    let (status, _) = app.get("/api/products/slug/panchmukhi-rudraksha-mala").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/getproductbyid/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (_, categories) = app.get("/api/categories").await;
    assert_eq!(categories[0]["product_count"], 1);

    let (_, data) = app.get("/api/getAllData").await;
    assert_eq!(data["products"].as_array().unwrap().len(), 2);
    assert_eq!(data["categories"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_product_update_and_delete() {
    let (app, product) = seeded().await;
    let uri = format!("/admin/products/{}", product["id"].as_str().unwrap());

    let (status, updated) = app.admin(Method::PUT, &uri, Some(json!({"discounted_price": 899}))).await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["discounted_price"].as_f64(), Some(899.0));

    let (status, body) = app.admin(Method::PUT, &uri, Some(json!({"discounted_price": 1200}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let category_uri = format!("/admin/categories/{}", product["category_id"].as_str().unwrap());
    let (status, _) = app.admin(Method::DELETE, &category_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.admin(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.admin(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.admin(Method::DELETE, &category_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_search_tolerates_typos() {
    let (app, _) = seeded().await;
    app.create_product(json!({"name": "Brass Diya", "price": 250})).await;

    let (status, hits) = app.get("/api/search?q=rudraksh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits[0]["name"], "Panchmukhi Rudraksha Mala");
    assert!(hits[0]["score"].as_f64().unwrap() > 0.0);

    let (_, none) = app.get("/api/search?q=zzzzzz").await;
    assert!(none.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_banners_are_ordered() {
    let app = TestApp::new();
    for (title, position) in [("Shravan Sale", 2), ("Mahashivratri", 1)] {
        let (status, _) = app
            .admin(Method::POST, "/admin/banners", Some(json!({"title": title, "image": "/b.jpg", "position": position})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, banners) = app.get("/api/getbanners").await;
    assert_eq!(banners[0]["title"], "Mahashivratri");
    assert_eq!(banners[1]["title"], "Shravan Sale");
}

#[tokio::test]
async fn test_reviews() {
    let (app, product) = seeded().await;
    let id = product["id"].as_str().unwrap();

    for rating in [5, 4] {
        let review = json!({"product_id": id, "name": "Ravi", "review": "Genuine beads", "rating": rating});
        let (status, body) = app.call(Method::POST, "/review/add", &[], Some(review)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
    let (status, summary) = app.get(&format!("/review/get/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["count"], 2);
    assert_eq!(summary["average_rating"].as_f64(), Some(4.5));

    let bad = json!({"product_id": id, "name": "Ravi", "review": "x", "rating": 7});
    let (status, _) = app.call(Method::POST, "/review/add", &[], Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let orphan = json!({"product_id": uuid::Uuid::new_v4(), "name": "Ravi", "review": "x", "rating": 3});
    let (status, _) = app.call(Method::POST, "/review/add", &[], Some(orphan)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quote_applies_online_discount() {
    let (app, product) = seeded().await;
    let quote = |method: &'static str| json!({"items": [{"product_id": product["id"], "quantity": 2}], "payment_method": method});

    let (status, cod) = app.call(Method::POST, "/orders/quote", &[], Some(quote("cod"))).await;
    assert_eq!(status, StatusCode::OK, "{cod}");
    assert_eq!(cod["total"].as_f64(), Some(2000.0));

    let (_, online) = app.call(Method::POST, "/orders/quote", &[], Some(quote("online"))).await;
    assert_eq!(online["discount"].as_f64(), Some(300.0));
    assert_eq!(online["total"].as_f64(), Some(1700.0));
}

#[tokio::test]
async fn test_order_requires_verified_phone() {
    let (app, product) = seeded().await;
    let (status, body) = app.call(Method::POST, "/orders/create", &[], Some(order_body(&product["id"], 1, "cod"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let token = app.verify_phone("9123456780").await;
    let (status, _) = app.place(&token, order_body(&product["id"], 1, "cod")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cod_order_lifecycle() {
    let (app, product) = seeded().await;
    let token = app.verify_phone(PHONE).await;

    let (status, placed) = app.place(&token, order_body(&product["id"], 2, "cod")).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");
    assert!(placed["payment"].is_null());
    let order = &placed["order"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"].as_f64(), Some(2000.0));
    assert!(order["order_number"].as_str().unwrap().starts_with("DM-"));
    let id = order["id"].as_str().unwrap();

    let (_, mine) = app.call(Method::GET, "/orders/my", &[("x-verification-token", &token)], None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let status_uri = format!("/orders/admin/{id}/status");
    let (status, body) = app.admin(Method::PATCH, &status_uri, Some(json!({"status": "delivered"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "illegal_transition");

    let (status, shipped) = app.admin(Method::PATCH, &status_uri, Some(json!({"status": "processing"}))).await;
    assert_eq!(status, StatusCode::OK, "{shipped}");
    let (_, shipped) = app.admin(Method::PATCH, &status_uri, Some(json!({"status": "shipped"}))).await;
    assert_eq!(shipped["status"], "shipped");

    let (status, _) = app.call(Method::POST, &format!("/orders/{id}/cancel"), &[("x-verification-token", &token)], None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, listed) = app.admin(Method::GET, "/orders/admin/all?status=shipped", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_orders_are_private_to_their_phone() {
    let (app, product) = seeded().await;
    let token = app.verify_phone(PHONE).await;
    let (_, placed) = app.place(&token, order_body(&product["id"], 1, "cod")).await;
    let id = placed["order"]["id"].as_str().unwrap();

    let other = app.verify_phone("9123456780").await;
    let (status, _) = app.call(Method::GET, &format!("/orders/{id}"), &[("x-verification-token", &other)], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call(Method::GET, &format!("/orders/{id}"), &[("x-verification-token", &token)], None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_online_payment_confirmation() {
    let (app, product) = seeded().await;
    let token = app.verify_phone(PHONE).await;

    let (status, placed) = app.place(&token, order_body(&product["id"], 1, "online")).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");
    assert_eq!(placed["order"]["total_amount"].as_f64(), Some(850.0));
    let intent = &placed["payment"];
    assert_eq!(intent["amount"], 85000);
    assert_eq!(intent["key_id"], "rzp_test_key");
    let gateway_id = intent["gateway_order_id"].as_str().unwrap();
    let order_id = placed["order"]["id"].as_str().unwrap();

    // processing before payment is refused
    let (status, body) = app.admin(Method::PATCH, &format!("/orders/admin/{order_id}/status"), Some(json!({"status": "processing"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "payment_state");

    let forged = json!({"order_id": order_id, "razorpay_order_id": gateway_id, "razorpay_payment_id": "pay_1", "razorpay_signature": "00ff"});
    let (status, body) = app.call(Method::POST, "/razorpay/verify", &[], Some(forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "payment_verification_failed");

    let signature = payments::sign(KEY_SECRET, format!("{gateway_id}|pay_1").as_bytes()).unwrap();
    let confirm = json!({"order_id": order_id, "razorpay_order_id": gateway_id, "razorpay_payment_id": "pay_1", "razorpay_signature": signature});
    let (status, paid) = app.call(Method::POST, "/razorpay/verify", &[], Some(confirm.clone())).await;
    assert_eq!(status, StatusCode::OK, "{paid}");
    assert_eq!(paid["payment_status"], "paid");
    assert_eq!(paid["gateway_payment_id"], "pay_1");

    // replaying the same confirmation is harmless
    let (status, _) = app.call(Method::POST, "/razorpay/verify", &[], Some(confirm)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, cancelled) = app.call(Method::POST, &format!("/orders/{order_id}/cancel"), &[("x-verification-token", &token)], None).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["payment_status"], "refund_pending");
}

#[tokio::test]
async fn test_webhook_marks_order_paid_once() {
    let (app, product) = seeded().await;
    let token = app.verify_phone(PHONE).await;
    let (_, placed) = app.place(&token, order_body(&product["id"], 1, "online")).await;
    let gateway_id = placed["payment"]["gateway_order_id"].as_str().unwrap();

    let body = json!({
        "event": "payment.captured",
        "payload": {"payment": {"entity": {"id": "pay_9", "order_id": gateway_id}}}
    })
    .to_string();
    let webhook = |signature: String| {
        Request::builder()
            .method(Method::POST)
            .uri("/razorpay/webhook")
            .header("content-type", "application/json")
            .header("x-razorpay-signature", signature)
            .body(Body::from(body.clone()))
            .unwrap()
    };

    let (status, _) = app.send(webhook("deadbeef".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let signature = payments::sign(WEBHOOK_SECRET, body.as_bytes()).unwrap();
    let (status, ack) = app.send(webhook(signature.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "applied");
    let (_, ack) = app.send(webhook(signature)).await;
    assert_eq!(ack["outcome"], "already_applied");

    let id = placed["order"]["id"].as_str().unwrap();
    let (_, order) = app.call(Method::GET, &format!("/orders/{id}"), &[("x-verification-token", &token)], None).await;
    assert_eq!(order["payment_status"], "paid");
}

#[tokio::test]
async fn test_payment_failure_report() {
    let (app, product) = seeded().await;
    let token = app.verify_phone(PHONE).await;
    let (_, placed) = app.place(&token, order_body(&product["id"], 1, "online")).await;
    let id = placed["order"]["id"].as_str().unwrap();

    let (status, failed) = app
        .call(Method::POST, "/razorpay/payment-failed", &[("x-verification-token", &token)], Some(json!({"order_id": id, "reason": "dismissed"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{failed}");
    assert_eq!(failed["payment_status"], "failed");
    assert_eq!(failed["status"], "failed");

    let (status, _) = app
        .call(Method::POST, "/razorpay/create-order", &[("x-verification-token", &token)], Some(json!({"order_id": id})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_hamper_needs_two_products() {
    let (app, product) = seeded().await;
    let diya = app.create_product(json!({"name": "Brass Diya", "price": 250})).await;
    let token = app.verify_phone(PHONE).await;

    let mut single = order_body(&product["id"], 3, "cod");
    single["kind"] = json!("hamper");
    let (status, _) = app.place(&token, single).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let hamper = json!({
        "kind": "hamper",
        "items": [{"product_id": product["id"], "quantity": 1}, {"product_id": diya["id"], "quantity": 2}],
        "shipping_address": address(PHONE),
        "payment_method": "cod",
        "hamper_note": "Om Namah Shivaya"
    });
    let (status, placed) = app.place(&token, hamper).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");
    assert_eq!(placed["order"]["total_amount"].as_f64(), Some(1500.0));
    assert_eq!(placed["order"]["hamper_note"], "Om Namah Shivaya");
}

fn signed_webhook(body: &str) -> Request<Body> {
    let signature = payments::sign(WEBHOOK_SECRET, body.as_bytes()).unwrap();
    Request::builder()
        .method(Method::POST)
        .uri("/razorpay/webhook")
        .header("content-type", "application/json")
        .header("x-razorpay-signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_payment_retry_reuses_gateway_order() {
    let (app, product) = seeded().await;
    let token = app.verify_phone(PHONE).await;
    let (_, placed) = app.place(&token, order_body(&product["id"], 1, "online")).await;
    let first = placed["payment"]["gateway_order_id"].as_str().unwrap().to_string();
    let id = placed["order"]["id"].as_str().unwrap();

    let (status, retry) = app
        .call(Method::POST, "/razorpay/create-order", &[("x-verification-token", &token)], Some(json!({"order_id": id})))
        .await;
    assert_eq!(status, StatusCode::OK, "{retry}");
    assert_eq!(retry["gateway_order_id"], first.as_str());
    assert_eq!(retry["amount"], 85000);

    // the shopper pays in the widget opened for the first gateway order
    let body = json!({
        "event": "payment.captured",
        "payload": {"payment": {"entity": {"id": "pay_first", "order_id": first}}}
    })
    .to_string();
    let (status, ack) = app.send(signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "applied");

    let (_, order) = app.call(Method::GET, &format!("/orders/{id}"), &[("x-verification-token", &token)], None).await;
    assert_eq!(order["payment_status"], "paid");
    assert_eq!(order["status"], "processing");
}

#[tokio::test]
async fn test_gateway_outage_fails_order() {
    let (app, product) = seeded_with(TestApp::with_gateway(Arc::new(DownGateway))).await;
    let token = app.verify_phone(PHONE).await;

    let (status, body) = app.place(&token, order_body(&product["id"], 1, "online")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY, "{body}");
    assert_eq!(body["error"]["code"], "gateway_error");

    let (_, orders) = app.call(Method::GET, "/orders/my", &[("x-verification-token", &token)], None).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "failed");
    assert_eq!(orders[0]["payment_status"], "failed");

    // cash on delivery does not touch the gateway
    let (status, _) = app.place(&token, order_body(&product["id"], 1, "cod")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_webhook_payment_failed() {
    let (app, product) = seeded().await;
    let token = app.verify_phone(PHONE).await;
    let (_, placed) = app.place(&token, order_body(&product["id"], 1, "online")).await;
    let gateway_id = placed["payment"]["gateway_order_id"].as_str().unwrap();
    let id = placed["order"]["id"].as_str().unwrap();

    let body = json!({
        "event": "payment.failed",
        "payload": {"payment": {"entity": {"id": "pay_x", "order_id": gateway_id, "error_description": "card declined"}}}
    })
    .to_string();
    let (status, ack) = app.send(signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "applied");
    let (_, ack) = app.send(signed_webhook(&body)).await;
    assert_eq!(ack["outcome"], "already_applied");

    let (_, order) = app.call(Method::GET, &format!("/orders/{id}"), &[("x-verification-token", &token)], None).await;
    assert_eq!(order["status"], "failed");
    assert_eq!(order["payment_status"], "failed");
}

#[tokio::test]
async fn test_direct_buy_takes_one_line() {
    let (app, product) = seeded().await;
    let diya = app.create_product(json!({"name": "Brass Diya", "price": 250})).await;
    let token = app.verify_phone(PHONE).await;

    let two_lines = json!({
        "kind": "direct_buy",
        "items": [{"product_id": product["id"], "quantity": 1}, {"product_id": diya["id"], "quantity": 1}],
        "shipping_address": address(PHONE),
        "payment_method": "cod"
    });
    let (status, _) = app.place(&token, two_lines).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut single = order_body(&diya["id"], 2, "cod");
    single["kind"] = json!("direct_buy");
    let (status, placed) = app.place(&token, single).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");
    assert_eq!(placed["order"]["kind"], "direct_buy");
    assert_eq!(placed["order"]["total_amount"].as_f64(), Some(500.0));
}

#[tokio::test]
async fn test_blank_text_is_rejected() {
    let (app, product) = seeded().await;
    let review = json!({"product_id": product["id"], "name": "   ", "review": "   ", "rating": 4});
    let (status, body) = app.call(Method::POST, "/review/add", &[], Some(review)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (_, summary) = app.get(&format!("/review/get/{}", product["id"].as_str().unwrap())).await;
    assert_eq!(summary["count"], 0);

    let token = app.verify_phone(PHONE).await;
    let mut order = order_body(&product["id"], 1, "cod");
    order["shipping_address"]["city"] = json!("  ");
    let (status, _) = app.place(&token, order).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
