//! HS256 token issuance and verification.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::JwtConfig;
use crate::error::Result;

const ISSUER: &str = "vget-auth";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

pub fn generate_access_token(cfg: &JwtConfig, user_id: &str, email: &str, role: &str) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        iat: now,
        exp: now + cfg.access_ttl_secs,
        iss: ISSUER.to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_access_token(cfg: &JwtConfig, token: &str) -> Result<Claims> {
    let mut validation = Validation::default();
    validation.set_issuer(&[ISSUER]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Sessions and the gateway cache key tokens by digest, never by value.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// High-entropy opaque refresh token.
pub fn generate_refresh_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key".into(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604800,
        }
    }

    #[test]
    fn token_round_trip() {
        let cfg = cfg();
        let token = generate_access_token(&cfg, "u1", "u@x.co", "user").unwrap();
        let claims = verify_access_token(&cfg, &token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "u@x.co");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = generate_access_token(&cfg(), "u1", "u@x.co", "user").unwrap();
        let other = JwtConfig {
            secret: "different".into(),
            ..cfg()
        };
        assert!(verify_access_token(&other, &token).is_err());
    }

    #[test]
    fn token_hash_is_stable() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
        assert_eq!(hash_token("abc").len(), 64);
    }

    #[test]
    fn refresh_tokens_are_unique() {
        assert_ne!(generate_refresh_token(), generate_refresh_token());
        assert_eq!(generate_refresh_token().len(), 64);
    }
}
