mod common;

use storefront_api::{
    dto::auth::{
        ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
        VerifyOtpRequest,
    },
    error::AppError,
    mailer::extract_otp,
    models::Role,
    services::auth_service,
};

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn register_verify_and_login() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, mailer) = common::setup_state(&database_url).await?;
    let email = common::unique_email("newcomer");

    let pending = auth_service::register(
        &state,
        RegisterRequest {
            email: format!("  {}  ", email.to_uppercase()),
            password: "secret1".into(),
            name: "Newcomer".into(),
            phone: "0812345678".into(),
        },
    )
    .await?;
    assert_eq!(
        pending.message,
        "OTP sent to your email. Please verify to complete registration."
    );

    // No account exists until the code is confirmed.
    let err = auth_service::login(&state, login(&email, "secret1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let mail = mailer.last_to(&email).await.expect("otp mail");
    let otp = extract_otp(&mail).expect("otp in mail");
    let wrong = if otp == "000000" { "111111" } else { "000000" };

    let err = auth_service::verify_otp(
        &state,
        VerifyOtpRequest {
            email: email.clone(),
            otp: wrong.into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid OTP");

    let session = auth_service::verify_otp(
        &state,
        VerifyOtpRequest {
            email: email.clone(),
            otp,
        },
    )
    .await?;
    assert_eq!(session.user.email, email);
    assert_eq!(session.user.role, Role::User);
    assert!(session.user.is_confirm_email);
    assert!(!session.access_token.is_empty());
    assert!(!session.refresh_token.is_empty());

    let refreshed = auth_service::refresh(&state, Some(&session.refresh_token)).await?;
    assert!(refreshed.data.is_some());

    let again = auth_service::login(&state, login(&email, "secret1")).await?;
    assert_eq!(again.user.id, session.user.id);

    let err = auth_service::login(&state, login(&email, "wrong-pass"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    Ok(())
}

#[tokio::test]
async fn unverified_account_cannot_log_in() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _mailer) = common::setup_state(&database_url).await?;
    let email = common::unique_email("unverified");
    common::create_user(&state, Role::User, &email, "secret1", false).await?;

    let err = auth_service::login(&state, login(&email, "secret1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(err.to_string(), "Email not verified. Please verify your email.");

    Ok(())
}

#[tokio::test]
async fn forgot_and_reset_password() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, mailer) = common::setup_state(&database_url).await?;
    let email = common::unique_email("forgetful");
    common::create_user(&state, Role::User, &email, "old-secret", true).await?;

    auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: email.clone(),
        },
    )
    .await?;
    let otp = mailer
        .last_to(&email)
        .await
        .as_ref()
        .and_then(extract_otp)
        .expect("reset otp");

    let err = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            email: email.clone(),
            otp: if otp == "000000" { "111111" } else { "000000" }.into(),
            new_password: "new-secret".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid or expired OTP");

    auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            email: email.clone(),
            otp: otp.clone(),
            new_password: "new-secret".into(),
        },
    )
    .await?;

    auth_service::login(&state, login(&email, "new-secret")).await?;
    let err = auth_service::login(&state, login(&email, "old-secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    // The code is single use.
    let err = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            email,
            otp,
            new_password: "third-secret".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn forgot_password_for_unknown_email_is_not_found() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, mailer) = common::setup_state(&database_url).await?;
    let email = common::unique_email("ghost");

    let err = auth_service::forgot_password(&state, ForgotPasswordRequest { email: email.clone() })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(mailer.last_to(&email).await.is_none());

    Ok(())
}
