//! Token service and auth middleware.
//!
//! Tokens are stateless HS256 JWTs over `{sub, iat, exp}`. Validation is
//! pure: only the read-only decoding key is shared, so it is safe for
//! unbounded concurrent calls. There is no server-side revocation list; a
//! token is valid iff its signature verifies and it has not expired.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::main_lib::AppState;

pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

#[derive(Debug)]
pub enum AuthError {
    /// No bearer credential on the request.
    MissingCredential,
    /// Signature did not verify against the service secret.
    BadSignature,
    /// The token's expiry is in the past.
    ExpiredToken,
    /// Valid token whose subject no longer exists.
    UnknownSubject,
    Internal(String),
}

impl AuthError {
    pub fn detail(&self) -> String {
        match self {
            Self::MissingCredential => "Not authenticated".to_string(),
            Self::BadSignature | Self::UnknownSubject => {
                "Could not validate credentials".to_string()
            }
            Self::ExpiredToken => "Token has expired".to_string(),
            Self::Internal(message) => message.clone(),
        }
    }
}

#[derive(Serialize)]
struct AuthErrorBody {
    detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

/// Authenticated caller, attached to request extensions by [`require_jwt`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl AuthManager {
    pub fn new(jwt_secret: &[u8], token_ttl: Duration) -> Self {
        let encoding_key = EncodingKey::from_secret(jwt_secret);
        let decoding_key = DecodingKey::from_secret(jwt_secret);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is exact: a token is invalid the moment `exp` passes.
        validation.leeway = 0;
        Self {
            encoding_key,
            decoding_key,
            validation,
            token_ttl,
        }
    }

    pub fn issue_token(&self, username: &str) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::Internal("System clock is before UNIX_EPOCH".into()))?;
        let exp = now + self.token_ttl;
        let claims = Claims {
            sub: username.to_string(),
            iat: now.as_secs() as usize,
            exp: exp.as_secs() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Validate a token and return its subject.
    pub fn validate_token(&self, token: &str) -> Result<String, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature
                | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_) => {
                    AuthError::BadSignature
                }
                other => AuthError::Internal(format!("Failed to validate token: {other:?}")),
            })
    }

    pub fn expires_in(&self) -> Duration {
        self.token_ttl
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = Json(AuthErrorBody {
            detail: self.detail(),
        });
        (status, body).into_response()
    }
}

pub fn decode_secret_key(raw: &str) -> anyhow::Result<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("JWT secret cannot be empty");
    }
    let decoded = match BASE64.decode(trimmed) {
        Ok(bytes) => bytes,
        Err(_) if trimmed.len() == 32 => trimmed.as_bytes().to_vec(),
        Err(_) => {
            anyhow::bail!("JWT secret must be base64 encoded or a 32-byte ASCII string")
        }
    };

    if decoded.len() != 32 {
        anyhow::bail!("JWT secret must decode to exactly 32 bytes");
    }

    Ok(decoded)
}

/// Middleware wrapping every protected route.
///
/// Rejects before any downstream work begins: no dispatch happens for an
/// unauthenticated request. On success the caller identity is attached to
/// the request extensions as [`CurrentUser`].
pub async fn require_jwt(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingCredential)?;

    let mut parts = header.splitn(2, ' ');
    let (Some(scheme), Some(token)) = (parts.next(), parts.next()) else {
        return Err(AuthError::MissingCredential);
    };

    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(AuthError::MissingCredential);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }

    let username = state.auth.validate_token(token)?;

    // Tokens are stateless and can outlive their user record.
    if state.user_store.find(&username).is_none() {
        return Err(AuthError::UnknownSubject);
    }

    request.extensions_mut().insert(CurrentUser(username));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn manager() -> AuthManager {
        AuthManager::new(SECRET, Duration::from_secs(1800))
    }

    fn unix_now() -> usize {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize
    }

    #[test]
    fn test_issue_then_validate_recovers_subject() {
        let auth = manager();
        let token = auth.issue_token("alice").unwrap();
        assert_eq!(auth.validate_token(&token).unwrap(), "alice");
    }

    #[test]
    fn test_expired_token_fails_with_expired_token() {
        let auth = manager();
        let issued = unix_now() - 3600;
        let claims = Claims {
            sub: "alice".to_string(),
            iat: issued,
            exp: issued + 60,
        };
        // Correctly signed, so only the expiry can fail it.
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            auth.validate_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_foreign_signature_fails_with_bad_signature() {
        let auth = manager();
        let foreign = AuthManager::new(b"ffffffffffffffffffffffffffffffff", auth.expires_in());
        let token = foreign.issue_token("alice").unwrap();

        assert!(matches!(
            auth.validate_token(&token),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn test_garbage_token_fails_with_bad_signature() {
        assert!(matches!(
            manager().validate_token("not-a-jwt"),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn test_decode_secret_key_accepts_base64_and_ascii() {
        // Dashes keep this out of the base64 alphabet, forcing the
        // 32-byte ASCII fallback.
        let ascii = "vngate-dev-secret-change-me-0123";
        assert_eq!(decode_secret_key(ascii).unwrap().len(), 32);

        let b64 = BASE64.encode([7u8; 32]);
        assert_eq!(decode_secret_key(&b64).unwrap(), vec![7u8; 32]);

        assert!(decode_secret_key("short").is_err());
        assert!(decode_secret_key("").is_err());
    }
}
