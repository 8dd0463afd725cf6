use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db::{OrmConn, create_pool, orm_from_pool, run_migrations},
    entity::{
        items::{ActiveModel as ItemActive, Column as ItemCol, Entity as Items},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    models::Role,
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    let orm = orm_from_pool(pool);

    let manager_id = ensure_user(&orm, "manager@example.com", "Store Manager", "manager123", Role::Manager).await?;
    let admin_id = ensure_user(&orm, "admin@example.com", "Store Admin", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&orm, "user@example.com", "Sample Shopper", "user123", Role::User).await?;
    seed_items(&orm).await?;

    println!("Seed completed. Manager ID: {manager_id}, Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    email: &str,
    name: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        let mut active: UserActive = existing.into();
        active.role = Set(role);
        let user = active.update(orm).await?;
        println!("Updated user {email} (role={role:?})");
        return Ok(user.id);
    }

    let now = Utc::now().fixed_offset();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        name: Set(name.to_string()),
        phone: Set("0000000000".to_string()),
        role: Set(role),
        is_blocked: Set(false),
        is_deleted: Set(false),
        is_confirm_email: Set(true),
        avatar_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(orm)
    .await?;

    println!("Created user {email} (role={role:?})");
    Ok(user.id)
}

async fn seed_items(orm: &OrmConn) -> anyhow::Result<()> {
    let items = [
        ("Canvas Backpack", "Water resistant, fits a 15 inch laptop", 450_000, 40, "Bags"),
        ("Ceramic Mug", "350ml, dishwasher safe", 85_000, 120, "Kitchen"),
        ("Wireless Mouse", "Silent clicks, 18 month battery", 199_000, 60, "Electronics"),
        ("Linen Notebook", "A5 dotted, 160 pages", 65_000, 200, "Stationery"),
    ];

    let now = Utc::now().fixed_offset();
    for (name, description, price, stock, category) in items {
        let exists = Items::find()
            .filter(ItemCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        ItemActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(description.to_string())),
            price: Set(price),
            stock: Set(stock),
            category: Set(category.to_string()),
            images: Set(Vec::new()),
            is_deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded items");
    Ok(())
}
