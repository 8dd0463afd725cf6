#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use storefront_api::{
    cache::MemoryCache,
    config::{AppConfig, JwtConfig, MailConfig},
    db::{create_pool, run_migrations},
    entity::{items::ActiveModel as ItemActive, users::ActiveModel as UserActive},
    mailer::MemoryMailer,
    middleware::auth::AuthUser,
    models::Role,
    services::auth_service::hash_password,
    state::AppState,
};
use uuid::Uuid;

/// Database URL for integration tests, or `None` when the run should be skipped.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        redis_url: "redis://127.0.0.1:6379".into(),
        host: "127.0.0.1".into(),
        port: 0,
        environment: "test".into(),
        jwt: JwtConfig {
            access_secret: "test-access-secret".into(),
            refresh_secret: "test-refresh-secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
        },
        mail: MailConfig {
            host: "localhost".into(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            from: "noreply@localhost".into(),
        },
        upload_dir: std::env::temp_dir()
            .join("storefront-api-tests")
            .to_string_lossy()
            .into_owned(),
        client_url: "http://localhost:3000".into(),
    }
}

/// State backed by the real database with in-memory cache and mailer.
pub async fn setup_state(database_url: &str) -> anyhow::Result<(AppState, Arc<MemoryMailer>)> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;

    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::new(
        pool,
        Arc::new(MemoryCache::new()),
        mailer.clone(),
        test_config(database_url),
    );
    Ok((state, mailer))
}

/// Unique address so parallel tests never collide on the email index.
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

pub async fn create_user(
    state: &AppState,
    role: Role,
    email: &str,
    password: &str,
    confirmed: bool,
) -> anyhow::Result<AuthUser> {
    let now = Utc::now().fixed_offset();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        name: Set("Test User".into()),
        phone: Set("0812345678".into()),
        role: Set(role),
        is_blocked: Set(false),
        is_deleted: Set(false),
        is_confirm_email: Set(confirmed),
        avatar_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_item(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let now = Utc::now().fixed_offset();
    let item = ItemActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(Some("Integration test item".into())),
        price: Set(price),
        stock: Set(stock),
        category: Set("Testing".into()),
        images: Set(Vec::new()),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;
    Ok(item.id)
}
