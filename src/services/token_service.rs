use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    dto::auth::Claims,
    error::{AppError, AppResult},
    models::Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret(self, config: &JwtConfig) -> &str {
        match self {
            TokenKind::Access => &config.access_secret,
            TokenKind::Refresh => &config.refresh_secret,
        }
    }

    fn ttl(self, config: &JwtConfig) -> Duration {
        match self {
            TokenKind::Access => Duration::minutes(config.access_ttl_minutes),
            TokenKind::Refresh => Duration::days(config.refresh_ttl_days),
        }
    }
}

pub fn issue_token(
    config: &JwtConfig,
    kind: TokenKind,
    user_id: Uuid,
    role: Role,
) -> AppResult<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(kind.ttl(config))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(kind.secret(config).as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Verify signature and expiry; any failure is reported as `None`.
pub fn verify_token(config: &JwtConfig, kind: TokenKind, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(kind.secret(config).as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

pub fn subject(claims: &Claims) -> Option<Uuid> {
    Uuid::parse_str(&claims.sub).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
        }
    }

    #[test]
    fn access_token_round_trip() {
        let config = config();
        let user_id = Uuid::new_v4();
        let token = issue_token(&config, TokenKind::Access, user_id, Role::Admin).unwrap();

        let claims = verify_token(&config, TokenKind::Access, &token).expect("valid token");
        assert_eq!(subject(&claims), Some(user_id));
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let config = config();
        let token = issue_token(&config, TokenKind::Refresh, Uuid::new_v4(), Role::User).unwrap();

        assert!(verify_token(&config, TokenKind::Access, &token).is_none());
        assert!(verify_token(&config, TokenKind::Refresh, &token).is_some());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let mut config = config();
        config.access_ttl_minutes = -5;
        let token = issue_token(&config, TokenKind::Access, Uuid::new_v4(), Role::User).unwrap();
        assert!(verify_token(&config, TokenKind::Access, &token).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_token(&config(), TokenKind::Access, "not-a-jwt").is_none());
    }
}
