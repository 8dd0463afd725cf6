use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::{OsRng, RngCore};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    cache::{REGISTER_OTP_TTL, RESET_OTP_TTL, register_otp_key, reset_otp_key},
    dto::auth::{
        AccessTokenResponse, AuthSession, ForgotPasswordRequest, LoginRequest,
        PendingRegistration, RegisterRequest, ResetPasswordRequest, VerifyOtpRequest,
    },
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    mailer::OutgoingMail,
    models::Role,
    response::{ApiResponse, Meta},
    services::token_service::{TokenKind, issue_token, subject, verify_token},
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Six digits, zero padded.
pub fn generate_otp() -> String {
    format!("{:06}", OsRng.next_u32() % 1_000_000)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Match a submitted code against the cached registration payload.
pub fn check_pending_otp(cached: Option<&str>, otp: &str) -> AppResult<PendingRegistration> {
    let raw = cached.ok_or_else(|| AppError::bad_request("OTP expired or invalid"))?;
    let pending: PendingRegistration = serde_json::from_str(raw)
        .map_err(|_| AppError::bad_request("OTP expired or invalid"))?;
    if pending.otp != otp {
        return Err(AppError::bad_request("Invalid OTP"));
    }
    Ok(pending)
}

/// Login checks in order: account present, email confirmed, password, not blocked.
pub fn check_login(user: Option<UserModel>, password: &str) -> AppResult<UserModel> {
    let user = user
        .filter(|u| !u.is_deleted)
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !user.is_confirm_email {
        return Err(AppError::forbidden(
            "Email not verified. Please verify your email.",
        ));
    }

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    if user.is_blocked {
        return Err(AppError::forbidden("Your account has been blocked."));
    }

    Ok(user)
}

pub(crate) async fn find_by_email(state: &AppState, email: &str) -> AppResult<Option<UserModel>> {
    Ok(Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?)
}

fn start_session(state: &AppState, user: UserModel) -> AppResult<AuthSession> {
    let jwt = &state.config.jwt;
    let access_token = issue_token(jwt, TokenKind::Access, user.id, user.role)?;
    let refresh_token = issue_token(jwt, TokenKind::Refresh, user.id, user.role)?;
    Ok(AuthSession {
        user: user.into(),
        access_token,
        refresh_token,
    })
}

pub async fn register(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    if find_by_email(state, &email).await?.is_some() {
        return Err(AppError::conflict("User already exists"));
    }

    let otp = generate_otp();
    let pending = PendingRegistration {
        email: email.clone(),
        password_hash: hash_password(&payload.password)?,
        name: payload.name.trim().to_string(),
        phone: payload.phone,
        otp: otp.clone(),
    };
    let encoded =
        serde_json::to_string(&pending).map_err(|e| AppError::Internal(e.into()))?;

    let key = register_otp_key(&email);
    state.cache.set(&key, &encoded, REGISTER_OTP_TTL).await?;

    if let Err(err) = state
        .mailer
        .send(OutgoingMail::registration_otp(&email, &otp))
        .await
    {
        tracing::warn!(error = %err, email = %email, "registration otp mail failed");
        state.cache.delete(&key).await?;
        return Err(err);
    }

    tracing::info!(email = %email, "registration pending otp");
    Ok(ApiResponse::success(
        "OTP sent to your email. Please verify to complete registration.",
        serde_json::json!({ "email": email }),
        Some(Meta::empty()),
    ))
}

pub async fn verify_otp(state: &AppState, payload: VerifyOtpRequest) -> AppResult<AuthSession> {
    let email = normalize_email(&payload.email);
    let key = register_otp_key(&email);
    let cached = state.cache.get(&key).await?;
    let pending = check_pending_otp(cached.as_deref(), &payload.otp)?;

    if find_by_email(state, &pending.email).await?.is_some() {
        state.cache.delete(&key).await?;
        return Err(AppError::conflict("User already exists"));
    }

    let now = Utc::now().fixed_offset();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(pending.email),
        password_hash: Set(pending.password_hash),
        name: Set(pending.name),
        phone: Set(pending.phone),
        role: Set(Role::User),
        is_blocked: Set(false),
        is_deleted: Set(false),
        is_confirm_email: Set(true),
        avatar_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    state.cache.delete(&key).await?;
    tracing::info!(user_id = %user.id, "user registered");

    start_session(state, user)
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<AuthSession> {
    let email = normalize_email(&payload.email);
    let user = check_login(find_by_email(state, &email).await?, &payload.password)?;
    tracing::info!(user_id = %user.id, "user logged in");
    start_session(state, user)
}

/// Exchange a refresh token for a new access token. The refresh token itself is not rotated.
pub async fn refresh(
    state: &AppState,
    refresh_token: Option<&str>,
) -> AppResult<ApiResponse<AccessTokenResponse>> {
    let token =
        refresh_token.ok_or_else(|| AppError::unauthorized("Not authorized, no refresh token"))?;

    let jwt = &state.config.jwt;
    let user_id = verify_token(jwt, TokenKind::Refresh, token)
        .as_ref()
        .and_then(subject)
        .ok_or_else(|| AppError::unauthorized("Not authorized, invalid refresh token"))?;

    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .filter(|u| !u.is_deleted)
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    let access_token = issue_token(jwt, TokenKind::Access, user.id, user.role)?;
    Ok(ApiResponse::success(
        "Access token refreshed",
        AccessTokenResponse { access_token },
        Some(Meta::empty()),
    ))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    find_by_email(state, &email)
        .await?
        .filter(|u| !u.is_deleted)
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let otp = generate_otp();
    state
        .cache
        .set(&reset_otp_key(&email), &otp, RESET_OTP_TTL)
        .await?;
    state
        .mailer
        .send(OutgoingMail::password_reset_otp(&email, &otp))
        .await?;

    Ok(ApiResponse::message("Password reset OTP sent to your email."))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    let key = reset_otp_key(&email);

    match state.cache.get(&key).await? {
        Some(stored) if stored == payload.otp => {}
        _ => return Err(AppError::bad_request("Invalid or expired OTP")),
    }

    let user = find_by_email(state, &email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let mut active: UserActive = user.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.updated_at = Set(Utc::now().fixed_offset());
    let user = active.update(&state.orm).await?;

    state.cache.delete(&key).await?;
    tracing::info!(user_id = %user.id, "password reset");

    Ok(ApiResponse::message("Password has been reset successfully."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(confirmed: bool, blocked: bool, deleted: bool) -> UserModel {
        let now = Utc::now().fixed_offset();
        UserModel {
            id: Uuid::new_v4(),
            email: "jane@example.com".into(),
            password_hash: hash_password("secret1").unwrap(),
            name: "Jane".into(),
            phone: "0123456789".into(),
            role: Role::User,
            is_blocked: blocked,
            is_deleted: deleted,
            is_confirm_email: confirmed,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn message(result: AppResult<UserModel>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..50 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn pending_otp_checks() {
        let pending = PendingRegistration {
            email: "jane@example.com".into(),
            password_hash: "hash".into(),
            name: "Jane".into(),
            phone: "0123456789".into(),
            otp: "123456".into(),
        };
        let raw = serde_json::to_string(&pending).unwrap();

        assert_eq!(
            check_pending_otp(None, "123456").unwrap_err().to_string(),
            "OTP expired or invalid"
        );
        assert_eq!(
            check_pending_otp(Some(&raw), "654321").unwrap_err().to_string(),
            "Invalid OTP"
        );
        assert_eq!(check_pending_otp(Some(&raw), "123456").unwrap(), pending);
    }

    #[test]
    fn unconfirmed_email_wins_over_wrong_password() {
        assert_eq!(
            message(check_login(Some(user(false, false, false)), "wrong-password")),
            "Email not verified. Please verify your email."
        );
    }

    #[test]
    fn login_rejections() {
        assert_eq!(message(check_login(None, "secret1")), "Invalid credentials");
        assert_eq!(
            message(check_login(Some(user(true, false, true)), "secret1")),
            "Invalid credentials"
        );
        assert_eq!(
            message(check_login(Some(user(true, false, false)), "nope")),
            "Invalid credentials"
        );
        assert_eq!(
            message(check_login(Some(user(true, true, false)), "secret1")),
            "Your account has been blocked."
        );
        assert!(check_login(Some(user(true, false, false)), "secret1").is_ok());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }
}
