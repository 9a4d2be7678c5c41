//! Session middleware

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::header::AUTHORIZATION,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::models::User;
use crate::{AppError, AppResult, AppState};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "fraudguard_session";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // User ID
    pub username: String,
    pub exp: usize,       // Expiration timestamp
    pub iat: usize,       // Issued at
}

/// Identity of the signed-in user
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: i64,
    pub username: String,
}

/// Sign a session token for `user`
pub fn issue_session(user: &User, config: &Config) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(config.session_expiration_hours as i64);

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes())
    ).map_err(|e| AppError::InternalError(e.to_string()))
}

/// Session cookie holding `token`
pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.is_production())
        .build()
}

/// Cookie that clears the session on the client
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Middleware: require a valid session, otherwise redirect to the login page
pub async fn require_user_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| extract_bearer_token(&req))
        .ok_or(AppError::Unauthorized)?;

    let user_ctx = verify_session(&token, &state.config)?;

    req.extensions_mut().insert(user_ctx);

    Ok(next.run(req).await)
}

/// Decode and check a session token
pub fn verify_session(token: &str, config: &Config) -> AppResult<UserContext> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.session_secret.as_bytes()),
        &Validation::default()
    ).map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        AppError::Unauthorized
    })?;

    let claims = token_data.claims;

    Ok(UserContext {
        user_id: claims.sub.parse().map_err(|_| AppError::Unauthorized)?,
        username: claims.username,
    })
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

// Implement FromRequestParts for UserContext
#[axum::async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<UserContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
