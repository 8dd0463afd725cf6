use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    config::AppConfig,
    dto::auth::{
        AccessTokenResponse, AuthResponse, AuthSession, ForgotPasswordRequest, LoginRequest,
        RegisterRequest, ResetPasswordRequest, VerifyOtpRequest,
    },
    error::AppResult,
    middleware::{auth::AuthUser, validate::ValidatedJson},
    response::{ApiResponse, Meta},
    services::auth_service,
    state::AppState,
};

pub const REFRESH_COOKIE: &str = "refreshToken";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-otp", post(verify_otp))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub fn refresh_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .secure(config.is_production())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(config.jwt.refresh_ttl_days))
        .build()
}

fn session_response(
    state: &AppState,
    jar: CookieJar,
    session: AuthSession,
    message: &str,
) -> (CookieJar, Json<ApiResponse<AuthResponse>>) {
    let jar = jar.add(refresh_cookie(session.refresh_token, &state.config));
    let data = AuthResponse {
        user: session.user,
        access_token: session.access_token,
    };
    (
        jar,
        Json(ApiResponse::success(message, data, Some(Meta::empty()))),
    )
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "OTP sent"),
        (status = 409, description = "User already exists")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    let resp = auth_service::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified, refresh cookie set", body = ApiResponse<AuthResponse>),
        (status = 400, description = "OTP expired or invalid")
    ),
    tag = "Auth"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<VerifyOtpRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<AuthResponse>>)> {
    let session = auth_service::verify_otp(&state, payload).await?;
    Ok(session_response(
        &state,
        jar,
        session,
        "Email verified and user registered successfully",
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, refresh cookie set", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email not verified or account blocked")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<AuthResponse>>)> {
    let session = auth_service::login(&state, payload).await?;
    Ok(session_response(&state, jar, session, "Logged in successfully"))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New access token", body = ApiResponse<AccessTokenResponse>),
        (status = 401, description = "Missing or invalid refresh token")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<Json<ApiResponse<AccessTokenResponse>>> {
    let token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    let resp = auth_service::refresh(&state, token.as_deref()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Refresh cookie cleared")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    user: AuthUser,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<serde_json::Value>>) {
    let mut cookie = Cookie::from(REFRESH_COOKIE);
    cookie.set_path("/");
    tracing::info!(user_id = %user.user_id, "user logged out");
    (
        jar.remove(cookie),
        Json(ApiResponse::message("Logged out successfully")),
    )
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset OTP sent"),
        (status = 404, description = "User not found")
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::forgot_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired OTP")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::reset_password(&state, payload).await?;
    Ok(Json(resp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JwtConfig, MailConfig};

    fn config(environment: &str) -> AppConfig {
        AppConfig {
            database_url: String::new(),
            redis_url: String::new(),
            host: "127.0.0.1".into(),
            port: 3000,
            environment: environment.into(),
            jwt: JwtConfig {
                access_secret: "a".into(),
                refresh_secret: "r".into(),
                access_ttl_minutes: 15,
                refresh_ttl_days: 7,
            },
            mail: MailConfig {
                host: "localhost".into(),
                port: 1025,
                username: String::new(),
                password: String::new(),
                from: "shop@example.com".into(),
            },
            upload_dir: "uploads".into(),
            client_url: "http://localhost:3000".into(),
        }
    }

    #[test]
    fn refresh_cookie_attributes() {
        let cookie = refresh_cookie("tok".into(), &config("development"));
        assert_eq!(cookie.name(), REFRESH_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn refresh_cookie_is_secure_in_production() {
        let cookie = refresh_cookie("tok".into(), &config("production"));
        assert_eq!(cookie.secure(), Some(true));
    }
}
