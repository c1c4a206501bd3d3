//! End-to-end tests for the HTTP handshake
//!
//! Each test drives the full router with `tower::ServiceExt::oneshot` and
//! signs challenges with a real secp256k1 key.

use std::sync::Arc;

use alloy_primitives::keccak256;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde_json::{json, Value};
use tower::ServiceExt;

use eth_nonce_auth::auth::{
    personal_message_hash, Address, AuthService, NonceGenerator, OsNonceGenerator,
};
use eth_nonce_auth::config::Config;
use eth_nonce_auth::routes::create_app;
use eth_nonce_auth::state::AppState;
use eth_nonce_auth::store::MemoryUserStore;

struct Wallet {
    secret: SecretKey,
    address: Address,
}

impl Wallet {
    fn new(byte: u8) -> Self {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_byte_array([byte; 32]).expect("valid secret");
        let public_key = PublicKey::from_secret_key(&secp, &secret);
        let hash = keccak256(&public_key.serialize_uncompressed()[1..]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self {
            secret,
            address: Address::from_bytes(&bytes),
        }
    }

    fn sign(&self, message: &str) -> String {
        let secp = Secp256k1::new();
        let msg = Message::from_digest(personal_message_hash(message.as_bytes()).0);
        let (recovery_id, sig) = secp
            .sign_ecdsa_recoverable(msg, &self.secret)
            .serialize_compact();
        let mut bytes = sig.to_vec();
        let rec: i32 = recovery_id.into();
        bytes.push((rec as u8) + 27);
        format!("0x{}", hex::encode(bytes))
    }
}

fn test_app() -> Router {
    let config = Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-secret".to_string()),
        _ => None,
    })
    .expect("default config");

    let nonces: Arc<dyn NonceGenerator> = Arc::new(OsNonceGenerator);
    let store = Arc::new(MemoryUserStore::new(nonces.clone(), config.nonce_ttl()));
    let auth_service = Arc::new(AuthService::new(
        store,
        nonces,
        config.jwt_secret.clone(),
        config.jwt_access_token_ttl_seconds,
    ));

    create_app(AppState::new(auth_service, Arc::new(config)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn register(app: &Router, address: &str) -> (StatusCode, Value) {
    send(app, post_json("/register", json!({ "address": address }))).await
}

async fn fetch_nonce(app: &Router, address: &str) -> String {
    let (status, body) = send(app, get(&format!("/users/{address}/nonce"))).await;
    assert_eq!(status, StatusCode::OK);
    body["nonce"].as_str().unwrap().to_string()
}

async fn signin(app: &Router, address: &str, nonce: &str, signature: &str) -> (StatusCode, Value) {
    send(
        app,
        post_json(
            "/signin",
            json!({ "address": address, "nonce": nonce, "signature": signature }),
        ),
    )
    .await
}

#[tokio::test]
async fn test_full_handshake_then_replay_rejected() {
    let app = test_app();
    let wallet = Wallet::new(0x21);
    let address = wallet.address.to_string();

    let (status, body) = register(&app, &address).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["address"], address);

    let nonce = fetch_nonce(&app, &address).await;
    assert!(nonce.chars().all(|c| c.is_ascii_digit()));

    let signature = wallet.sign(&nonce);
    let (status, body) = signin(&app, &address, &nonce, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["address"], address);
    assert_eq!(body["expires_in"], 900);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, body) = signin(&app, &address, &nonce, &signature).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "NONCE_MISMATCH");

    let fresh = fetch_nonce(&app, &address).await;
    assert_ne!(fresh, nonce);
}

#[tokio::test]
async fn test_register_is_case_insensitive_and_conflicts() {
    let app = test_app();
    let lower = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";
    let mixed = "0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD";

    let (status, body) = register(&app, mixed).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["address"], lower);

    let (status, body) = register(&app, lower).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // Both spellings resolve to the same nonce
    let a = fetch_nonce(&app, lower).await;
    let b = fetch_nonce(&app, mixed).await;
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_malformed_address_rejected_everywhere() {
    let app = test_app();

    let (status, body) = register(&app, "0x123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ADDRESS");

    let (status, body) = send(&app, get("/users/0x123/nonce")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ADDRESS");

    let (status, body) = signin(&app, "0x123", "1", "0x00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ADDRESS");
}

#[tokio::test]
async fn test_undecodable_path_uses_error_envelope() {
    let app = test_app();

    let (status, body) = send(&app, get("/users/%FF/nonce")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_unknown_address_not_found() {
    let app = test_app();
    let address = Wallet::new(0x22).address.to_string();

    let (status, body) = send(&app, get(&format!("/users/{address}/nonce"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = signin(&app, &address, "1", "0x00").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signature_from_other_key_rejected() {
    let app = test_app();
    let owner = Wallet::new(0x23);
    let intruder = Wallet::new(0x24);
    let address = owner.address.to_string();

    register(&app, &address).await;
    let nonce = fetch_nonce(&app, &address).await;

    let (status, body) = signin(&app, &address, &nonce, &intruder.sign(&nonce)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_SIGNATURE");

    // The failed attempt burned the nonce
    let (status, body) = signin(&app, &address, &nonce, &owner.sign(&nonce)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "NONCE_MISMATCH");
}

#[tokio::test]
async fn test_wrong_nonce_keeps_live_challenge() {
    let app = test_app();
    let wallet = Wallet::new(0x25);
    let address = wallet.address.to_string();

    register(&app, &address).await;
    let nonce = fetch_nonce(&app, &address).await;

    let (status, body) = signin(&app, &address, "12345", &wallet.sign("12345")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "NONCE_MISMATCH");

    assert_eq!(fetch_nonce(&app, &address).await, nonce);
    let (status, _) = signin(&app, &address, &nonce, &wallet.sign(&nonce)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"address\":"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send(&app, post_json("/signin", json!({ "address": "0x00" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_welcome_requires_session_token() {
    let app = test_app();
    let wallet = Wallet::new(0x26);
    let address = wallet.address.to_string();

    let (status, body) = send(&app, get("/welcome")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");

    let bogus = Request::builder()
        .uri("/welcome")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, bogus).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    register(&app, &address).await;
    let nonce = fetch_nonce(&app, &address).await;
    let (_, session) = signin(&app, &address, &nonce, &wallet.sign(&nonce)).await;
    let token = session["token"].as_str().unwrap();

    let authorized = Request::builder()
        .uri("/welcome")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, authorized).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], address);
    assert!(body["last_authenticated_at"].is_string());
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = test_app();
    register(&app, &Wallet::new(0x27).address.to_string()).await;

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["accounts"], 1);
}

#[tokio::test]
async fn test_cors_permissive_without_configured_origins() {
    let app = test_app();

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
