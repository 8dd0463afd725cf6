use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    entity::Users,
    error::AppError,
    models::{Capability, Role},
    services::token_service::{TokenKind, subject, verify_token},
    state::AppState,
};

/// The caller behind a valid access token. Role comes from the users table, not the token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

pub fn ensure_capability(user: &AuthUser, capability: Capability) -> Result<(), AppError> {
    if !user.role.allows(capability) {
        return Err(AppError::forbidden(format!(
            "User role {} is not authorized to access this route",
            user.role
        )));
    }
    Ok(())
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| AppError::unauthorized("Not authorized, no token"))?;

        let user_id = verify_token(&state.config.jwt, TokenKind::Access, token)
            .as_ref()
            .and_then(subject)
            .ok_or_else(|| AppError::unauthorized("Not authorized, token failed"))?;

        let user = Users::find_by_id(user_id)
            .one(&state.orm)
            .await?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| AppError::unauthorized("User not found"))?;

        if user.is_blocked {
            return Err(AppError::forbidden("Your account has been blocked."));
        }

        Ok(AuthUser {
            user_id: user.id,
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header_value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/users/me");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_requires_scheme() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn capability_check_uses_role_table() {
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(ensure_capability(&admin, Capability::ManageCatalog).is_ok());

        let err = ensure_capability(&admin, Capability::PlaceOrders).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
        assert_eq!(
            err.to_string(),
            "User role Admin is not authorized to access this route"
        );
    }
}
