use crate::types::{AppError, Claims, Result, SessionIdentity, TokenError, UserId};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

/// Well-formed Argon2id hash with default parameters that no password
/// matches. Verified against when sign-in finds no usable account.
const DECOY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Authentication service for session tokens and password hashing.
///
/// Provides salted password hashing using Argon2id and stateless session
/// token issuance/verification using HS256. Tokens are never revoked
/// server-side; they stay valid until `exp`.
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    /// Creates a new AuthService.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for signing tokens (should be at least 32 chars)
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    /// Hashes a password using Argon2id.
    ///
    /// Returns a PHC-formatted hash string.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Verifies a password against a stored Argon2 hash.
    ///
    /// Fails closed: a stored value that is not a parseable PHC string never
    /// verifies.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            tracing::debug!("stored password hash is not a PHC string");
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Runs a full Argon2 verification that always fails.
    ///
    /// Keeps the unknown-account path of sign-in as slow as a wrong password.
    pub fn verify_decoy(&self, password: &str) -> bool {
        self.verify_password(password, DECOY_HASH)
    }

    /// Issues a session token for a user, valid for `ttl_seconds`.
    pub fn issue(&self, user_id: UserId, username: &str, ttl_seconds: i64) -> Result<String> {
        let now = Utc::now();
        let exp = Duration::try_seconds(ttl_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AppError::Internal(format!("Token lifetime out of range: {}s", ttl_seconds))
            })?;
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a session token and returns the identity it binds.
    pub fn decode(&self, token: &str) -> std::result::Result<SessionIdentity, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })?;

        let user_id = claims.sub.parse().map_err(|_| TokenError::Malformed)?;

        Ok(SessionIdentity {
            user_id,
            username: claims.username,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}
