use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

/// Authenticates the single administrator configured through the
/// environment and issues session tokens.
#[derive(Clone)]
pub struct AuthService {
    admin_email: String,
    admin_password_hash: String,
    jwt_secret: String,
    jwt_maxage: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: usize,
    exp: usize,
}

impl AuthService {
    pub fn new(
        admin_email: String,
        admin_password_hash: String,
        jwt_secret: String,
        jwt_maxage: i64,
    ) -> Self {
        Self {
            admin_email,
            admin_password_hash,
            jwt_secret,
            jwt_maxage,
        }
    }

    pub fn login(&self, email: &str, password: &str) -> Result<String> {
        let argon2 = Argon2::default();
        let parsed_hash = PasswordHash::new(&self.admin_password_hash)?;

        let password_ok = argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();

        if !password_ok || !email.trim().eq_ignore_ascii_case(&self.admin_email) {
            warn!("rejected admin login");
            return Err(Error::Unauthorized);
        }

        info!("admin logged in");
        self.generate_token(&self.admin_email)
    }

    fn generate_token(&self, subject: &str) -> Result<String> {
        let now = Utc::now();
        let exp = (now + Duration::minutes(self.jwt_maxage)).timestamp() as usize;
        let iat = now.timestamp() as usize;
        let claims = Claims {
            sub: subject.to_string(),
            iat,
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|_| Error::InternalServerError)
    }

    /// Subject of a valid, unexpired token issued by this service.
    pub fn decode_token<T: Into<String>>(&self, token: T) -> Result<String> {
        let decoded = decode::<Claims>(
            &token.into(),
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| Error::Unauthorized)?;

        if !decoded.claims.sub.eq_ignore_ascii_case(&self.admin_email) {
            return Err(Error::Unauthorized);
        }

        Ok(decoded.claims.sub)
    }

    pub fn jwt_maxage(&self) -> i64 {
        self.jwt_maxage
    }
}

/// PHC string suitable for `ADMIN_PASSWORD_HASH`.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(
            "admin@example.com".into(),
            hash_password("hunter22").unwrap(),
            "test-secret".into(),
            60,
        )
    }

    #[test]
    fn login_issues_a_decodable_token() {
        let auth = service();
        let token = auth.login("Admin@Example.com", "hunter22").unwrap();
        assert_eq!(auth.decode_token(token).unwrap(), "admin@example.com");
    }

    #[test]
    fn wrong_credentials_are_unauthorized() {
        let auth = service();
        assert!(matches!(
            auth.login("admin@example.com", "nope"),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            auth.login("someone@example.com", "hunter22"),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let auth = service();
        let other = AuthService::new(
            "admin@example.com".into(),
            hash_password("x").unwrap(),
            "other-secret".into(),
            60,
        );
        let token = other.login("admin@example.com", "x").unwrap();

        assert!(matches!(auth.decode_token(token), Err(Error::Unauthorized)));
        assert!(matches!(auth.decode_token("garbage"), Err(Error::Unauthorized)));
    }

    #[test]
    fn malformed_hash_is_a_server_error() {
        let auth = AuthService::new("a@b.c".into(), "not-a-phc".into(), "s".into(), 60);
        assert!(matches!(
            auth.login("a@b.c", "x"),
            Err(Error::InvalidHashFormat(_))
        ));
    }
}
