use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::core::config::Settings;

const ARGON2_MEMORY_KIB: u32 = 19_456;
const ARGON2_TIME: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("password hashing failed")]
    Hashing,
    #[error("password verification failed")]
    Verification,
    #[error("jwt encoding failed")]
    JwtEncoding,
    #[error("jwt decoding failed")]
    JwtDecoding,
    #[error("unsupported jwt algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// `sub` is the user id, `sid` the login session the token belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) sid: String,
    pub(crate) exp: i64,
}

impl Claims {
    pub(crate) fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

pub(crate) struct IssuedToken {
    pub(crate) token: String,
    pub(crate) session_id: String,
    pub(crate) expires_at: OffsetDateTime,
}

fn argon2() -> Result<Argon2<'static>, argon2::Error> {
    let params = argon2::Params::new(ARGON2_MEMORY_KIB, ARGON2_TIME, ARGON2_PARALLELISM, None)?;
    Ok(Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
}

/// Argon2id PHC string for `password` with a fresh salt.
pub(crate) fn hash_password(password: &str) -> Result<String, SecurityError> {
    let salt = SaltString::generate(&mut OsRng);
    let hasher = argon2().map_err(|_| SecurityError::Hashing)?;
    hasher
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| SecurityError::Hashing)
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unusable.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, SecurityError> {
    let stored = PasswordHash::new(hash).map_err(|_| SecurityError::Verification)?;
    let verifier = argon2().map_err(|_| SecurityError::Verification)?;

    match verifier.verify_password(password.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err(SecurityError::Verification),
    }
}

/// Starts a new login session and signs a token for it.
pub(crate) fn issue_access_token(
    user_id: i64,
    settings: &Settings,
    expires_in: Option<Duration>,
) -> Result<IssuedToken, SecurityError> {
    let (algorithm, secret) = signing_key(settings)?;
    let default_minutes = settings.security().access_token_expire_minutes as i64;
    let lifetime = expires_in.unwrap_or_else(|| Duration::minutes(default_minutes));
    let expires_at = OffsetDateTime::now_utc() + lifetime;
    let session_id = Uuid::new_v4().to_string();

    let claims = Claims {
        sub: user_id.to_string(),
        sid: session_id.clone(),
        exp: expires_at.unix_timestamp(),
    };
    let token = encode(
        &jsonwebtoken::Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|_| SecurityError::JwtEncoding)?;

    Ok(IssuedToken { token, session_id, expires_at })
}

/// Signature, expiry and the `sub`/`exp` claims are all checked.
pub(crate) fn verify_token(token: &str, settings: &Settings) -> Result<Claims, SecurityError> {
    let (algorithm, secret) = signing_key(settings)?;
    let mut validation = Validation::new(algorithm);
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|_| SecurityError::JwtDecoding)
}

/// Remaining lifetime of a token, used as the revocation TTL on logout.
pub(crate) fn remaining_lifetime(claims: &Claims) -> std::time::Duration {
    let remaining = claims.exp - OffsetDateTime::now_utc().unix_timestamp();
    std::time::Duration::from_secs(remaining.max(1) as u64)
}

fn signing_key(settings: &Settings) -> Result<(Algorithm, &[u8]), SecurityError> {
    let security = settings.security();
    let algorithm = match security.algorithm.as_str() {
        "HS256" => Algorithm::HS256,
        "HS384" => Algorithm::HS384,
        "HS512" => Algorithm::HS512,
        other => return Err(SecurityError::UnsupportedAlgorithm(other.to_string())),
    };
    Ok((algorithm, security.secret_key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("correct-horse-battery-staple").expect("hash");
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn issued_token_carries_user_and_session() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");

        let issued = issue_access_token(42, &settings, Some(Duration::minutes(1))).expect("token");
        let claims = verify_token(&issued.token, &settings).expect("claims");

        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.sid, issued.session_id);
        assert!(remaining_lifetime(&claims).as_secs() <= 60);
    }

    #[tokio::test]
    async fn two_logins_get_distinct_sessions() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");

        let first = issue_access_token(1, &settings, None).expect("token");
        let second = issue_access_token(1, &settings, None).expect("token");

        assert_ne!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");

        let issued = issue_access_token(7, &settings, None).expect("token");
        let tampered = format!("{}x", issued.token);

        assert!(verify_token(&tampered, &settings).is_err());
    }
}
