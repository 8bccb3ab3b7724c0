//! Identity Verifier: resolves the bearer credential on every task
//! request to a [`Principal`], or rejects with a classified 401.
//!
//! Applied as axum middleware ahead of every protected route. Handlers
//! behind it trust the attached principal and never re-verify.

pub mod credentials;
pub mod token;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ApiError, AuthFailure};
use crate::AppContext;

/// The resolved identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Authentication middleware for all task operations.
///
/// - Missing header / malformed prefix → 401 `no-credential`
/// - Bad signature, malformed token, expired → 401 `invalid-credential`
/// - Token valid but user gone → 401 `principal-missing`
/// - Store fault during lookup → 500, distinct from the 401 family
pub async fn require_auth(
    State(ctx): State<Arc<AppContext>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.to_string());

    let Some(raw_token) = bearer else {
        return Err(ApiError::Unauthenticated(AuthFailure::NoCredential));
    };

    let claims =
        token::verify(&raw_token, ctx.config.effective_jwt_secret()).map_err(|e| {
            debug!(error = %e, "bearer token verification failed");
            ApiError::Unauthenticated(AuthFailure::InvalidCredential)
        })?;

    // Store faults here are 500s, not 401s — "not authenticated" and
    // "verifier broke" must stay distinguishable.
    let user = ctx.storage.get_user(&claims.sub).await?;

    let Some(user) = user else {
        warn!(user_id = %claims.sub, "token subject no longer exists");
        return Err(ApiError::Unauthenticated(AuthFailure::PrincipalMissing));
    };

    request.extensions_mut().insert(Principal {
        id: user.id,
        username: user.username,
        email: user.email,
    });

    Ok(next.run(request).await)
}
