use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::{Error as JwtError, ErrorKind},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ApiError,
    models::TokenPair,
    repository::RepositoryState,
};

/// TokenType
///
/// Distinguishes short-lived access tokens, which authenticate requests, from refresh tokens,
/// which are only accepted by the refresh endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims
///
/// The payload signed into every token issued by this service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    /// Primary key of the account the token was issued to.
    pub user_id: i64,
    /// Unique token id.
    pub jti: Uuid,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
}

/// Signs a token of the given type for `user_id`, using the lifetime configured for that type.
pub fn issue_token(
    config: &AppConfig,
    user_id: i64,
    token_type: TokenType,
) -> Result<String, JwtError> {
    let ttl = match token_type {
        TokenType::Access => config.access_token_ttl_secs,
        TokenType::Refresh => config.refresh_token_ttl_secs,
    };
    let now = Utc::now().timestamp();

    let claims = Claims {
        token_type,
        user_id,
        jti: Uuid::new_v4(),
        iat: now.max(0) as usize,
        exp: (now + ttl).max(0) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Issues the access/refresh pair returned by the login endpoint.
pub fn issue_token_pair(config: &AppConfig, user_id: i64) -> Result<TokenPair, JwtError> {
    Ok(TokenPair {
        refresh: issue_token(config, user_id, TokenType::Refresh)?,
        access: issue_token(config, user_id, TokenType::Access)?,
    })
}

/// Verifies signature and expiry, then checks that the token is of the `expected` type.
pub fn decode_token(
    config: &AppConfig,
    token: &str,
    expected: TokenType,
) -> Result<Claims, JwtError> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &decoding_key, &validation)?.claims;
    if claims.token_type != expected {
        return Err(ErrorKind::InvalidToken.into());
    }
    Ok(claims)
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::Internal(format!("token signing failed: {err}"))
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it directly when a
/// token is mandatory, or as `Option<AuthUser>` when anonymous access is allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Mandatory authentication.
///
/// Rejects with `NotAuthenticated` when no bearer token is sent, and with the token/user
/// errors of the optional extractor below otherwise.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        <AuthUser as OptionalFromRequestParts<S>>::from_request_parts(parts, state)
            .await?
            .ok_or(ApiError::NotAuthenticated)
    }
}

/// Optional authentication.
///
/// 1. No `Authorization` header, or a non-Bearer scheme: anonymous (`None`).
/// 2. Bearer token present: signature, expiry and token type must check out.
/// 3. The token's user must still exist and be active.
///
/// A token that is present but invalid is an error even on public routes. A user already
/// resolved by `auth_middleware` is taken from the request extensions instead.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(Some(user.clone()));
        }

        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(None);
        };
        let auth_header = auth_header.to_str().map_err(|_| ApiError::InvalidToken)?;

        let mut segments = auth_header.split_whitespace();
        if segments.next() != Some("Bearer") {
            return Ok(None);
        }
        let token = match (segments.next(), segments.next()) {
            (Some(token), None) => token,
            _ => return Err(ApiError::MalformedAuthHeader),
        };

        let config = AppConfig::from_ref(state);
        let claims = decode_token(&config, token, TokenType::Access).map_err(|e| {
            tracing::debug!("rejected bearer token: {e}");
            ApiError::InvalidToken
        })?;

        // The account may have been deleted or deactivated after the token was issued.
        let repo = RepositoryState::from_ref(state);
        let account = repo
            .get_account(claims.user_id)
            .await?
            .filter(|account| account.is_active)
            .ok_or(ApiError::UnknownTokenUser)?;

        Ok(Some(AuthUser {
            id: account.user.id,
            username: account.user.username,
        }))
    }
}
