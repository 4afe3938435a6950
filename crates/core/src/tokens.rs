//! Session tokens.
//!
//! Tokens are HS256 JWTs signed with the configured secret. The claims carry enough of the
//! account for the gateway to forward an identity without calling back into the auth service.

use crate::config::CoreConfig;
use crate::identity::Identity;
use crate::models::{Role, User};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use healthcure_uuid::RecordId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> CoreResult<Identity> {
        let user_id = RecordId::parse(&self.sub)
            .map_err(|_| CoreError::Unauthenticated("invalid or expired token"))?;
        let patient_id = self
            .patient_id
            .as_deref()
            .map(RecordId::parse)
            .transpose()
            .map_err(|_| CoreError::Unauthenticated("invalid or expired token"))?;
        Ok(Identity::new(user_id, self.role, patient_id))
    }
}

#[derive(Clone)]
pub struct TokenService {
    cfg: Arc<CoreConfig>,
}

impl TokenService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    pub fn issue(&self, user: &User) -> CoreResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.to_string(),
            phone: user.phone.as_ref().map(ToString::to_string),
            role: user.role,
            name: user.name.to_string(),
            patient_id: user.patient_id.map(|id| id.to_string()),
            iat: now.timestamp(),
            exp: (now + self.cfg.token_ttl()).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.cfg.jwt_secret().as_bytes()),
        )
        .map_err(CoreError::TokenIssue)
    }

    /// Verifies signature and expiry.
    pub fn verify(&self, token: &str) -> CoreResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.cfg.jwt_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("token rejected: {}", e);
            CoreError::Unauthenticated("invalid or expired token")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use healthcure_types::{EmailAddress, NonEmptyText, PhoneNumber};

    fn service(secret: &str, ttl: Duration) -> TokenService {
        TokenService::new(Arc::new(
            CoreConfig::new(None, secret.into(), ttl, true).unwrap(),
        ))
    }

    fn user() -> User {
        User {
            id: RecordId::new(),
            email: EmailAddress::parse("siti@example.com").unwrap(),
            phone: Some(PhoneNumber::parse("081234567890").unwrap()),
            name: NonEmptyText::new("Siti").unwrap(),
            password_hash: String::new(),
            role: Role::User,
            is_verified: false,
            patient_id: Some(RecordId::new()),
            verified_at: None,
            verified_by: None,
            rejection_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service("secret", Duration::hours(1));
        let user = user();
        let claims = tokens.verify(&tokens.issue(&user).unwrap()).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.phone.as_deref(), Some("081234567890"));
        assert_eq!(claims.role, Role::User);

        let who = claims.identity().unwrap();
        assert_eq!(who.user_id, user.id);
        assert_eq!(who.patient_id, user.patient_id);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = service("secret", Duration::hours(1)).issue(&user()).unwrap();
        let err = service("other", Duration::hours(1)).verify(&token).unwrap_err();
        assert!(matches!(err, CoreError::Unauthenticated(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service("secret", Duration::hours(1));
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: RecordId::new().to_string(),
            email: "a@example.com".into(),
            phone: None,
            role: Role::Admin,
            name: "Admin".into(),
            patient_id: None,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(tokens.verify(&token).is_err());
    }
}
