//! End-to-end tests for the composed middleware chain: authentication,
//! role gate, and best-effort auth, driven through a real router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use alumnet_core::{DeploymentMode, Environment};
use alumnet_server::db::{ConnectionProfile, Database, PgConnector};
use alumnet_server::http::auth::{self, Claims, JwtKeys};
use alumnet_server::http::routes::users;
use alumnet_server::store::{MemoryPrincipalStore, Principal, Role};
use alumnet_server::AppState;

const SECRET: &str = "gate-test-secret";

struct Fixture {
    app: Router,
    alumni: Uuid,
    moderator: Uuid,
    admin: Uuid,
    deactivated: Uuid,
}

fn principal(id: Uuid, name: &str, role: Role, active: bool) -> Principal {
    Principal {
        id,
        name: name.to_owned(),
        email: format!("{}@example.com", name),
        role,
        active,
    }
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryPrincipalStore::default());
    let (alumni, moderator, admin, deactivated) =
        (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    store.insert(principal(alumni, "ada", Role::Alumni, true));
    store.insert(principal(moderator, "mel", Role::Moderator, true));
    store.insert(principal(admin, "amx", Role::Admin, true));
    store.insert(principal(deactivated, "dee", Role::Alumni, false));

    // The connector URL is never dialed: every lookup goes through the
    // in-memory store and no route below touches the pool.
    let db = Arc::new(Database::new(
        PgConnector::new("postgres://localhost/never-dialed"),
        DeploymentMode::Persistent,
        ConnectionProfile::for_mode(DeploymentMode::Persistent, Environment::Development),
    ));
    let state = AppState::new(db, store, JwtKeys::new(SECRET), Environment::Development);

    let protected = users::router().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::authenticate_token,
    ));

    let admin_routes = Router::new()
        .route("/admin/ping", get(|| async { "pong" }))
        .layer(middleware::from_fn(
            |req: axum::extract::Request, next: Next| {
                auth::require_role(&[Role::Admin], req, next)
            },
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate_token,
        ));

    // A role gate with no authentication layer in front of it.
    let role_only = Router::new()
        .route("/role-only", get(|| async { "unreachable" }))
        .layer(middleware::from_fn(
            |req: axum::extract::Request, next: Next| {
                auth::require_role(&[Role::Admin], req, next)
            },
        ));

    let public = Router::new()
        .route("/feed", get(viewer))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::optional_auth,
        ));

    let app = Router::new()
        .merge(protected)
        .merge(admin_routes)
        .merge(role_only)
        .merge(public)
        .with_state(state);

    Fixture {
        app,
        alumni,
        moderator,
        admin,
        deactivated,
    }
}

async fn viewer(principal: Option<Extension<Principal>>) -> Json<Value> {
    Json(serde_json::json!({
        "viewer": principal.map(|ext| ext.0.name.clone()),
    }))
}

fn token_for(id: Uuid, exp_offset_secs: i64) -> String {
    let claims = Claims {
        sub: id,
        exp: (Utc::now().timestamp() + exp_offset_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(app: &Router, uri: &str, auth_value: Option<String>) -> Response {
    let builder = Request::builder().uri(uri);
    let builder = match auth_value {
        Some(value) => builder.header(header::AUTHORIZATION, value),
        None => builder,
    };
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn message(response: Response) -> String {
    json_body(response).await["message"]
        .as_str()
        .unwrap_or_default()
        .to_owned()
}

#[tokio::test]
async fn missing_header_is_401_access_token_required() {
    let fx = fixture();
    let response = send(&fx.app, "/users/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(response).await, "Access token required");
}

#[tokio::test]
async fn expired_token_is_401_token_expired() {
    let fx = fixture();
    let token = token_for(fx.alumni, -3600);
    let response = send(&fx.app, "/users/me", Some(format!("Bearer {token}"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(response).await, "Token expired");
}

#[tokio::test]
async fn malformed_token_is_403_invalid_token() {
    let fx = fixture();
    let response = send(&fx.app, "/users/me", Some("Bearer garbage".to_owned())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(message(response).await, "Invalid token");
}

#[tokio::test]
async fn wrong_signature_is_403_invalid_token() {
    let fx = fixture();
    let forged = encode(
        &Header::default(),
        &Claims {
            sub: fx.alumni,
            exp: (Utc::now().timestamp() + 3600) as usize,
        },
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();
    let response = send(&fx.app, "/users/me", Some(format!("Bearer {forged}"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(message(response).await, "Invalid token");
}

#[tokio::test]
async fn unknown_principal_is_401_invalid_token() {
    let fx = fixture();
    let token = token_for(Uuid::new_v4(), 3600);
    let response = send(&fx.app, "/users/me", Some(format!("Bearer {token}"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(response).await, "Invalid token");
}

#[tokio::test]
async fn deactivated_account_is_401() {
    let fx = fixture();
    let token = token_for(fx.deactivated, 3600);
    let response = send(&fx.app, "/users/me", Some(format!("Bearer {token}"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(response).await, "Account is deactivated");
}

#[tokio::test]
async fn valid_token_reaches_the_handler_with_the_principal() {
    let fx = fixture();
    let token = token_for(fx.alumni, 3600);
    let response = send(&fx.app, "/users/me", Some(format!("Bearer {token}"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["name"], "ada");
    assert_eq!(body["role"], "alumni");
    // The credential field never exists on the principal.
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn moderator_hitting_admin_route_is_403_insufficient_permissions() {
    let fx = fixture();
    let token = token_for(fx.moderator, 3600);
    let response = send(&fx.app, "/admin/ping", Some(format!("Bearer {token}"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(message(response).await, "Insufficient permissions");
}

#[tokio::test]
async fn admin_passes_the_role_gate() {
    let fx = fixture();
    let token = token_for(fx.admin, 3600);
    let response = send(&fx.app, "/admin/ping", Some(format!("Bearer {token}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn role_gate_without_authentication_is_401_authentication_required() {
    let fx = fixture();
    let response = send(&fx.app, "/role-only", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(response).await, "Authentication required");
}

#[tokio::test]
async fn optional_auth_swallows_an_expired_token() {
    let fx = fixture();
    let token = token_for(fx.alumni, -3600);
    let response = send(&fx.app, "/feed", Some(format!("Bearer {token}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["viewer"], Value::Null);
}

#[tokio::test]
async fn optional_auth_without_a_token_stays_anonymous() {
    let fx = fixture();
    let response = send(&fx.app, "/feed", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["viewer"], Value::Null);
}

#[tokio::test]
async fn optional_auth_attaches_a_valid_principal() {
    let fx = fixture();
    let token = token_for(fx.moderator, 3600);
    let response = send(&fx.app, "/feed", Some(format!("Bearer {token}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["viewer"], "mel");
}

#[tokio::test]
async fn optional_auth_ignores_a_deactivated_account() {
    let fx = fixture();
    let token = token_for(fx.deactivated, 3600);
    let response = send(&fx.app, "/feed", Some(format!("Bearer {token}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["viewer"], Value::Null);
}
