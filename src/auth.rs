use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::ApiError, repository::RepositoryState};

/// Token lifetime. Tokens are stateless: validity is determined purely by
/// signature and this expiry at verification time.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 30;

/// Generic 401 detail. The same string is used for every authentication
/// failure mode so the client cannot distinguish reasons.
const CREDENTIALS_DETAIL: &str = "Could not validate credentials";

/// Claims
///
/// The signed payload carried inside every bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username, re-resolved against the credential store on
    /// every authenticated request.
    pub sub: String,
    /// Role claim, either "admin" or "user".
    pub role: String,
    /// Expiration timestamp (seconds since epoch). Tokens past this instant
    /// must not be accepted.
    pub exp: usize,
    /// Issued-at timestamp.
    pub iat: usize,
}

// --- Password hashing ---

/// One-way salted hash of a plaintext password (argon2id, PHC string format).
/// The encoded format is self-describing, so hashes generated by any prior
/// version keep verifying.
pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Validation(format!("password hashing failed: {e}")))
}

/// True only when `plain` matches `hash`. A malformed stored hash verifies
/// as false rather than erroring.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// --- Token issue/verify ---

/// Signs a bearer token embedding the subject and role, expiring
/// ACCESS_TOKEN_TTL_MINUTES from now.
pub fn issue_token(subject: &str, role: &str, secret: &str) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_string(),
        exp: (now + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Validation(format!("token signing failed: {e}")))
}

/// Decodes and validates a bearer token. Pure and stateless: no I/O. Any
/// structural, signature, or expiry failure yields None -- callers treat all
/// of them uniformly as unauthenticated.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .ok()
}

// --- Request extractors ---

/// AuthUser
///
/// The resolved identity of an authenticated request: extracts the bearer
/// token from the Authorization header, verifies it, then re-resolves the
/// subject against the credential store. The store lookup means deleting a
/// credential revokes access immediately even though tokens are stateless.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub role: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated(CREDENTIALS_DETAIL))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated(CREDENTIALS_DETAIL))?;

        let claims = verify_token(token, &config.jwt_secret)
            .ok_or(ApiError::Unauthenticated(CREDENTIALS_DETAIL))?;

        // Re-resolve the subject: a deleted user's token is dead even if
        // the signature and expiry still check out.
        let user = repo
            .find_user(&claims.sub)
            .await?
            .ok_or(ApiError::Unauthenticated(CREDENTIALS_DETAIL))?;

        Ok(AuthUser {
            username: user.username,
            role: user.role,
        })
    }
}

/// AdminUser
///
/// Role gate layered on top of AuthUser: authenticates first, then rejects
/// any identity whose role is not "admin" with 403. Every mutating record
/// endpoint takes this extractor.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != "admin" {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn issue_then_verify_round_trips_identity_and_role() {
        let token = issue_token("admin", "admin", SECRET).unwrap();
        let claims = verify_token(&token, SECRET).expect("fresh token must verify");
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn tampered_token_is_invalid() {
        let token = issue_token("admin", "admin", SECRET).unwrap();
        // Flip one byte in the payload segment.
        let mut bytes = token.into_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] = if bytes[mid] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(verify_token(&tampered, SECRET).is_none());
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issue_token("admin", "admin", SECRET).unwrap();
        assert!(verify_token(&token, "a-rotated-secret").is_none());
    }

    #[test]
    fn expired_token_is_invalid() {
        // Sign claims whose expiry is already in the past.
        let now = Utc::now();
        let claims = Claims {
            sub: "admin".to_string(),
            role: "admin".to_string(),
            exp: (now - Duration::minutes(5)).timestamp() as usize,
            iat: (now - Duration::minutes(35)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(verify_token(&token, SECRET).is_none());
    }
}
