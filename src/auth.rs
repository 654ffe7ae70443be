use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;

/// Cookie carrying the session access token
pub const SESSION_COOKIE: &str = "access_token";

/// JWT claims issued by the auth service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Email of the signed-in user
    #[serde(default)]
    pub email: Option<String>,
    /// Role (authenticated, anon, service_role, ...)
    #[serde(default)]
    pub role: Option<String>,
    /// Audience
    #[serde(default)]
    pub aud: Option<String>,
    /// Expiration time (as UTC timestamp)
    pub exp: usize,
    /// Issued at (as UTC timestamp)
    #[serde(default)]
    pub iat: usize,
}

/// Authenticated caller, attached to the request by the session middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

impl From<Claims> for SessionUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret for signing/verifying tokens
    pub jwt_secret: String,
    /// Required audience claim
    pub audience: String,
    /// Lifetime of tokens minted by [`AuthService::issue_token`]
    pub token_expiration_minutes: i64,
}

impl AuthConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            audience: config.jwt_audience.clone(),
            token_expiration_minutes: 60,
        }
    }
}

/// Authentication error
#[derive(Debug)]
pub enum AuthError {
    /// Token is missing
    MissingToken,
    /// Token is malformed, expired, or has a bad signature
    InvalidToken,
    /// Token could not be created
    Other(String),
}

impl From<AuthError> for ApiError {
    fn from(_: AuthError) -> Self {
        ApiError::Unauthenticated
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Extract the session token, preferring the cookie over the Authorization header
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Ok(cookie.value().to_string());
        }
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;

    let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidToken)?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token.to_string())
}

/// Auth service for token operations
pub struct AuthService {
    config: Arc<AuthConfig>,
}

impl AuthService {
    /// Create a new auth service
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Mint a token for `user_id`, signed with the shared secret
    pub fn issue_token(&self, user_id: &str, email: Option<&str>) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.config.token_expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            role: Some("authenticated".to_string()),
            aud: Some(self.config.audience.clone()),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Other(format!("Failed to generate token: {}", e)))
    }

    /// Validate a JWT token
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_audience(&[self.config.audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|token_data| token_data.claims)
        .map_err(|e| {
            debug!("JWT validation error: {:?}", e);
            AuthError::InvalidToken
        })
    }

    /// Resolve the caller from request headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<SessionUser, AuthError> {
        let token = extract_token(headers)?;
        self.validate_token(&token).map(SessionUser::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service(secret: &str) -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: secret.to_string(),
            audience: "authenticated".to_string(),
            token_expiration_minutes: 5,
        })
    }

    #[test]
    fn test_token_round_trip() {
        let auth = service("secret");
        let token = auth.issue_token("user-1", Some("ann@example.com")).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let user = auth.authenticate(&headers).unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("ann@example.com"));
    }

    #[test]
    fn test_cookie_preferred_over_header() {
        let auth = service("secret");
        let token = auth.issue_token("cookie-user", None).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", SESSION_COOKIE, token)).unwrap(),
        );
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer garbage"));

        assert_eq!(extract_token(&headers).unwrap(), token);
        assert_eq!(auth.authenticate(&headers).unwrap().id, "cookie-user");
    }

    #[test]
    fn test_rejects_missing_and_malformed() {
        let auth = service("secret");

        let headers = HeaderMap::new();
        assert!(matches!(
            auth.authenticate(&headers),
            Err(AuthError::MissingToken)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            auth.authenticate(&headers),
            Err(AuthError::InvalidToken)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer not.a.jwt"));
        assert!(matches!(
            auth.authenticate(&headers),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_rejects_wrong_secret_and_audience() {
        let token = service("other-secret").issue_token("user-1", None).unwrap();
        assert!(service("secret").validate_token(&token).is_err());

        let foreign = AuthService::new(AuthConfig {
            jwt_secret: "secret".to_string(),
            audience: "someone-else".to_string(),
            token_expiration_minutes: 5,
        });
        let token = foreign.issue_token("user-1", None).unwrap();
        assert!(service("secret").validate_token(&token).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let expired = AuthService::new(AuthConfig {
            jwt_secret: "secret".to_string(),
            audience: "authenticated".to_string(),
            token_expiration_minutes: -10,
        });
        let token = expired.issue_token("user-1", None).unwrap();
        assert!(service("secret").validate_token(&token).is_err());
    }
}
