//! Auth gate: three composable request interceptors.
//!
//! `authenticate_token` rejects anything without a live, active
//! principal; `require_role` layers a role check on top of it;
//! `optional_auth` runs the same verify-and-lookup path but degrades
//! every failure to an anonymous request instead of rejecting.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use crate::store::{Principal, Role};

use super::error::ApiError;

/// Bearer token claims. `sub` is the principal id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

/// Decoding half of the shared-secret credential verifier.
pub struct JwtKeys {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Signature and expiry check. An expired token is distinguishable
    /// from one that fails verification outright.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::TokenInvalid,
            })
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

// Shared verify-then-lookup path. `Ok(None)` means no token was
// presented at all; every other miss is an error.
async fn resolve_principal(
    state: &AppState,
    token: Option<String>,
) -> Result<Option<Principal>, ApiError> {
    let Some(token) = token else {
        return Ok(None);
    };

    let claims = state.jwt().verify(&token)?;

    let principal = state
        .principals()
        .find_by_id(claims.sub)
        .await?
        .ok_or(ApiError::UnknownPrincipal)?;

    if !principal.active {
        return Err(ApiError::AccountInactive);
    }

    Ok(Some(principal))
}

/// Required authentication: verify the bearer token, load the principal
/// with its credential field stripped, and attach it to the request.
/// Rejections never reach the handler.
pub async fn authenticate_token(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).map(str::to_owned);
    let principal = resolve_principal(&state, token)
        .await?
        .ok_or(ApiError::TokenMissing)?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Role gate, layered after [`authenticate_token`]:
///
/// ```ignore
/// router.layer(middleware::from_fn(|req, next| {
///     auth::require_role(&[Role::Admin], req, next)
/// }))
/// ```
pub async fn require_role(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .ok_or(ApiError::AuthRequired)?;

    if !allowed.contains(&principal.role) {
        tracing::warn!(
            principal = %principal.id,
            role = principal.role.as_str(),
            "role gate rejected request"
        );
        return Err(ApiError::InsufficientRole);
    }

    Ok(next.run(req).await)
}

/// Best-effort authentication: on any failure the request simply
/// proceeds without a principal attached.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = bearer_token(&req).map(str::to_owned);
    if let Ok(Some(principal)) = resolve_principal(&state, token).await {
        req.extensions_mut().insert(principal);
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    const SECRET: &str = "test-secret";

    fn token(sub: Uuid, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub,
            exp: (Utc::now().timestamp() + exp_offset_secs) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn request_with_auth(value: Option<&str>) -> Request {
        let builder = Request::builder().uri("/");
        let builder = match value {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        };
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_extraction_requires_the_scheme() {
        let req = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));

        let req = request_with_auth(Some("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&req), None);

        let req = request_with_auth(None);
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn verify_accepts_a_fresh_token() {
        let keys = JwtKeys::new(SECRET);
        let sub = Uuid::new_v4();
        let claims = keys.verify(&token(sub, 3600)).unwrap();
        assert_eq!(claims.sub, sub);
    }

    #[test]
    fn verify_distinguishes_expired_from_invalid() {
        let keys = JwtKeys::new(SECRET);

        let expired = keys.verify(&token(Uuid::new_v4(), -3600)).unwrap_err();
        assert!(matches!(expired, ApiError::TokenExpired));

        let garbage = keys.verify("not.a.token").unwrap_err();
        assert!(matches!(garbage, ApiError::TokenInvalid));

        let wrong_key = encode(
            &Header::default(),
            &Claims {
                sub: Uuid::new_v4(),
                exp: (Utc::now().timestamp() + 3600) as usize,
            },
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();
        assert!(matches!(
            keys.verify(&wrong_key).unwrap_err(),
            ApiError::TokenInvalid
        ));
    }
}
