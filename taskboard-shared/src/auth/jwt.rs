/// Session token signing and verification
///
/// Tokens are HS256-signed JWTs carrying the identity (`sub`), the active
/// organization, the role at issue time and the email. They expire after
/// [`SESSION_TTL_HOURS`] and are verified for signature, issuer, `exp` and
/// `nbf`; any failure is a rejection.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use taskboard_shared::auth::permissions::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-signing-secret-of-at-least-32-bytes";
/// let claims = Claims::new(Uuid::new_v4(), Uuid::new_v4(), Role::Member, "ana@school.test");
/// let token = create_token(&claims, secret)?;
///
/// let verified = validate_token(&token, secret)?;
/// assert_eq!(verified.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::permissions::Role;

/// Issuer stamped into and required from every token
pub const ISSUER: &str = "taskboard";

/// Session lifetime
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token issuer")]
    InvalidIssuer,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Session claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,

    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,

    /// Organization the session is scoped to
    pub org_id: Uuid,

    pub role: Role,
    pub email: String,
}

impl Claims {
    /// Claims valid for [`SESSION_TTL_HOURS`] from now
    pub fn new(user_id: Uuid, org_id: Uuid, role: Role, email: impl Into<String>) -> Self {
        Self::with_expiration(user_id, org_id, role, email, Duration::hours(SESSION_TTL_HOURS))
    }

    pub fn with_expiration(
        user_id: Uuid,
        org_id: Uuid,
        role: Role,
        email: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            org_id,
            role,
            email: email.into(),
        }
    }

    /// `exp` as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Signs `claims` with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Verifies signature, issuer, expiry and not-before, returning the claims
///
/// # Errors
///
/// - [`JwtError::Expired`] once `exp` has passed
/// - [`JwtError::InvalidIssuer`] for tokens minted by someone else
/// - [`JwtError::Invalid`] for everything else (bad signature, malformed, ...)
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            _ => JwtError::Invalid(e.to_string()),
        })
}
