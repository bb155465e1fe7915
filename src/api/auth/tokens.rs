//! Stateless bearer tokens: HS256 JWTs carrying the account id and role,
//! valid for 24 hours.

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::models::User;

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    /// Role at mint time — informational only; authorization re-reads the
    /// account on every request.
    pub role: String,
    pub exp: usize,
}

pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn new(secret: &str) -> Self {
        AuthKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Random secret for deployments that don't pin JWT_SECRET. Tokens stop
    /// working across restarts, which is acceptable for a fresh setup.
    pub fn generate_secret() -> Result<String> {
        let mut buf = [0u8; 32];
        getrandom::fill(&mut buf).context("failed to gather randomness for JWT secret")?;
        Ok(URL_SAFE_NO_PAD.encode(buf))
    }

    pub fn mint(&self, user: &User) -> Result<String> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role.as_str().to_string(),
            exp: exp as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).context("failed to sign token")
    }

    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn sample_user() -> User {
        User {
            id: "u1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
            role: Role::User,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_mint_then_verify() {
        let keys = AuthKeys::new("test-secret");
        let token = keys.mint(&sample_user()).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, "USER");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let keys = AuthKeys::new("test-secret");
        let token = keys.mint(&sample_user()).unwrap();
        let other = AuthKeys::new("different-secret");
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let keys = AuthKeys::new("test-secret");
        assert!(keys.verify("not.a.token").is_none());
    }

    #[test]
    fn test_generated_secrets_differ() {
        let a = AuthKeys::generate_secret().unwrap();
        let b = AuthKeys::generate_secret().unwrap();
        assert_ne!(a, b);
        assert!(a.len() >= 32);
    }
}
