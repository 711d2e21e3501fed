use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use mercato_api::app::services::AppServices;
use mercato_auth::JwtClaims;
use mercato_core::CustomerId;
use mercato_infra::notify::RecordingNotifier;
use mercato_sales::NotifyError;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    notifier: Arc<RecordingNotifier>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let notifier = Arc::new(RecordingNotifier::new());
        let app = mercato_api::app::build_app(AppServices::in_memory(notifier.clone()), JWT_SECRET);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            notifier,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, customer_id: u64, email: &str) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: CustomerId::new(customer_id),
        email: email.to_string(),
        email_verified: true,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn dec(v: &Value) -> Decimal {
    match v {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

async fn post_json(client: &reqwest::Client, url: String, token: &str, body: Value) -> reqwest::Response {
    client
        .post(url)
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

/// Category "Pantry" with A at 10.00 and B at 5.00. Returns (category, a, b) ids.
async fn seed_catalog(srv: &TestServer, client: &reqwest::Client, token: &str) -> (u64, u64, u64) {
    let res = post_json(client, srv.url("/categories"), token, json!({ "name": "Pantry" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let category: Value = res.json().await.unwrap();
    let cat = category["id"].as_u64().unwrap();

    let mut ids = Vec::new();
    for (name, price) in [("A", "10.00"), ("B", "5.00")] {
        let res = post_json(
            client,
            srv.url("/products"),
            token,
            json!({ "name": name, "price": price, "category_id": cat }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let product: Value = res.json().await.unwrap();
        ids.push(product["id"].as_u64().unwrap());
    }

    (cat, ids[0], ids[1])
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let forged = mint_jwt("other-secret", 1, "buyer@example.com");
    let res = client
        .post(srv.url("/orders"))
        .bearer_auth(forged)
        .json(&json!({ "items": [{ "product_id": 1, "quantity": 1 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(srv.notifier.sent().is_empty());
}

#[tokio::test]
async fn identity_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 42, "buyer@example.com");

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["customer_id"], 42);
    assert_eq!(body["email"], "buyer@example.com");
}

#[tokio::test]
async fn order_end_to_end_prices_persists_and_averages() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "buyer@example.com");
    let client = reqwest::Client::new();
    let (cat, a, b) = seed_catalog(&srv, &client, &token).await;

    let res = post_json(
        &client,
        srv.url("/orders"),
        &token,
        json!({ "items": [{ "product_id": a, "quantity": 2 }, { "product_id": b, "quantity": 3 }] }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();

    let prices: Vec<Decimal> = order["items"].as_array().unwrap().iter().map(|i| dec(&i["price"])).collect();
    assert_eq!(prices, vec![Decimal::new(2000, 2), Decimal::new(1500, 2)]);
    assert_eq!(dec(&order["total_price"]), Decimal::new(3500, 2));
    assert_eq!(order["notification"]["delivered"], true);

    let res = client
        .get(srv.url(&format!("/categories/{cat}/average-price")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec(&body["average_price"]), Decimal::new(750, 2));

    let id = order["id"].as_u64().unwrap();
    let res = client
        .get(srv.url(&format!("/orders/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["purchaser"]["email"], "buyer@example.com");
    assert_eq!(srv.notifier.sent().len(), 1);
}

#[tokio::test]
async fn unknown_product_is_rejected_and_nothing_is_created() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "buyer@example.com");
    let client = reqwest::Client::new();
    seed_catalog(&srv, &client, &token).await;

    let res = post_json(
        &client,
        srv.url("/orders"),
        &token,
        json!({ "items": [{ "product_id": 999, "quantity": 1 }] }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_product");

    let res = client.get(srv.url("/orders")).bearer_auth(&token).send().await.unwrap();
    let orders: Value = res.json().await.unwrap();
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_category_average_is_an_error() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "buyer@example.com");
    let client = reqwest::Client::new();

    let res = post_json(&client, srv.url("/categories"), &token, json!({ "name": "Empty" })).await;
    let category: Value = res.json().await.unwrap();
    let id = category["id"].as_u64().unwrap();

    let res = client
        .get(srv.url(&format!("/categories/{id}/average-price")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "empty_category");
}

#[tokio::test]
async fn failed_notification_still_returns_created_order() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "buyer@example.com");
    let client = reqwest::Client::new();
    let (_, a, _) = seed_catalog(&srv, &client, &token).await;
    srv.notifier.fail_with(NotifyError::Transport("smtp down".into()));

    let res = post_json(
        &client,
        srv.url("/orders"),
        &token,
        json!({ "items": [{ "product_id": a, "quantity": 1 }] }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["notification"]["delivered"], false);
    assert!(body["notification"]["reason"].as_str().unwrap().contains("smtp down"));

    let id = body["id"].as_u64().unwrap();
    let res = client
        .get(srv.url(&format!("/orders/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn product_price_change_does_not_touch_existing_orders() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "buyer@example.com");
    let client = reqwest::Client::new();
    let (_, a, _) = seed_catalog(&srv, &client, &token).await;

    let res = post_json(
        &client,
        srv.url("/orders"),
        &token,
        json!({ "items": [{ "product_id": a, "quantity": 1 }] }),
    )
    .await;
    let order: Value = res.json().await.unwrap();
    let id = order["id"].as_u64().unwrap();

    let res = client
        .put(srv.url(&format!("/products/{a}")))
        .bearer_auth(&token)
        .json(&json!({ "price": "20.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/orders/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(dec(&fetched["items"][0]["price"]), Decimal::new(1000, 2));
}

#[tokio::test]
async fn deleting_order_removes_it() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "buyer@example.com");
    let client = reqwest::Client::new();
    let (_, a, _) = seed_catalog(&srv, &client, &token).await;

    let res = post_json(
        &client,
        srv.url("/orders"),
        &token,
        json!({ "items": [{ "product_id": a, "quantity": 1 }] }),
    )
    .await;
    let id = res.json::<Value>().await.unwrap()["id"].as_u64().unwrap();

    let res = client
        .delete(srv.url(&format!("/orders/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/orders/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_update_cannot_remove_every_item() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "buyer@example.com");
    let client = reqwest::Client::new();
    let (_, a, _) = seed_catalog(&srv, &client, &token).await;

    let res = post_json(
        &client,
        srv.url("/orders"),
        &token,
        json!({ "items": [{ "product_id": a, "quantity": 1 }] }),
    )
    .await;
    let mut order: Value = res.json().await.unwrap();
    let id = order["id"].as_u64().unwrap();
    order.as_object_mut().unwrap().remove("notification");
    order["items"] = json!([]);

    let res = client
        .put(srv.url(&format!("/orders/{id}")))
        .bearer_auth(&token)
        .json(&order)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "empty_order");

    let res = client
        .get(srv.url(&format!("/orders/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let stored: Value = res.json().await.unwrap();
    assert_eq!(stored["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn bad_quantity_and_empty_order_are_client_errors() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "buyer@example.com");
    let client = reqwest::Client::new();
    let (_, a, _) = seed_catalog(&srv, &client, &token).await;

    let res = post_json(
        &client,
        srv.url("/orders"),
        &token,
        json!({ "items": [{ "product_id": a, "quantity": -1 }] }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "invalid_quantity");

    let res = post_json(&client, srv.url("/orders"), &token, json!({ "items": [] })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "empty_order");
}

#[tokio::test]
async fn customer_profile_is_keyed_by_token_email() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "Buyer@Example.com");
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/customers/me")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .put(srv.url("/customers/me"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Buyer", "phone": "+254700000001" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let customer: Value = res.json().await.unwrap();
    assert_eq!(customer["email"], "buyer@example.com");
    assert_eq!(customer["verified_email"], true);

    let res = client.get(srv.url("/customers/me")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap()["id"], customer["id"]);
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, 1, "buyer@example.com");
    let client = reqwest::Client::new();
    let (cat, _, _) = seed_catalog(&srv, &client, &token).await;

    let res = client
        .delete(srv.url(&format!("/categories/{cat}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}
