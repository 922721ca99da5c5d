//! HS256 JWTs for dashboard sessions.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vidplane_core::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Organization id
    pub org: Uuid,
    /// User id
    pub sub: Uuid,
    /// Role within the organization: owner, admin, or member
    pub role: String,
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Issued at, seconds since epoch
    pub iat: i64,
}

pub fn issue_token(
    secret: &str,
    org_id: Uuid,
    user_id: Uuid,
    role: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        org: org_id,
        sub: user_id,
        role: role.to_string(),
        exp: (now + Duration::hours(expiry_hours)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to issue token: {}", e)))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_issue_and_verify_round_trip() {
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        let token = issue_token(SECRET, org, user, "owner", 24).unwrap();

        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.org, org);
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, "owner");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(SECRET, Uuid::new_v4(), Uuid::new_v4(), "member", 24).unwrap();
        let result = verify_token("another_secret_another_secret!!!", &token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(SECRET, Uuid::new_v4(), Uuid::new_v4(), "member", -1).unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(verify_token(SECRET, "not.a.jwt").is_err());
    }
}
