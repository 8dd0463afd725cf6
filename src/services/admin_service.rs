use chrono::Utc;
use sea_orm::sea_query::{Expr, extension::postgres::PgExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::{
        auth::RegisterRequest,
        users::{AdminList, UpdateProfileRequest, UserList},
    },
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_capability},
    models::{Capability, Role, User},
    response::{ApiResponse, Meta, total_pages},
    routes::params::{Pagination, UserQuery, UserSortBy, search_term},
    services::{
        auth_service::{find_by_email, hash_password, normalize_email},
        order_of,
        user_service::{apply_profile_update, load_user},
    },
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_capability(user, Capability::ManageUsers)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(pattern) = search_term(query.search.as_ref()) {
        condition = condition.add(
            Condition::any()
                .add(Expr::col(UserCol::Name).ilike(pattern.clone()))
                .add(Expr::col(UserCol::Email).ilike(pattern.clone()))
                .add(Expr::col(UserCol::Phone).ilike(pattern)),
        );
    }
    if let Some(role) = query.role {
        condition = condition.add(UserCol::Role.eq(role));
    }
    if let Some(is_blocked) = query.is_blocked {
        condition = condition.add(UserCol::IsBlocked.eq(is_blocked));
    }
    if let Some(is_deleted) = query.is_deleted {
        condition = condition.add(UserCol::IsDeleted.eq(is_deleted));
    }

    let sort_col = match query.sort_by.unwrap_or_default() {
        UserSortBy::CreatedAt => UserCol::CreatedAt,
        UserSortBy::Name => UserCol::Name,
        UserSortBy::Email => UserCol::Email,
    };
    let finder = Users::find()
        .filter(condition)
        .order_by(sort_col, order_of(query.sort_order));

    let total = finder.clone().count(&state.orm).await?;
    let users = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let data = UserList {
        users,
        total_pages: total_pages(total, limit),
        current_page: page,
    };
    Ok(ApiResponse::success(
        "Users fetched successfully",
        data,
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_capability(user, Capability::ManageUsers)?;
    let model = load_user(state, id).await?;
    Ok(ApiResponse::success(
        "User fetched successfully",
        model.into(),
        Some(Meta::empty()),
    ))
}

async fn update_user<F>(state: &AppState, id: Uuid, change: F) -> AppResult<UserModel>
where
    F: FnOnce(&mut UserActive),
{
    let model = load_user(state, id).await?;
    let mut active: UserActive = model.into();
    change(&mut active);
    active.updated_at = Set(Utc::now().fixed_offset());
    Ok(active.update(&state.orm).await?)
}

pub async fn block_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::ManageUsers)?;
    update_user(state, id, |active| active.is_blocked = Set(true)).await?;
    tracing::info!(target_user = %id, by = %user.user_id, "user blocked");
    Ok(ApiResponse::message("User blocked successfully"))
}

pub async fn unblock_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::ManageUsers)?;
    update_user(state, id, |active| active.is_blocked = Set(false)).await?;
    tracing::info!(target_user = %id, by = %user.user_id, "user unblocked");
    Ok(ApiResponse::message("User unblocked successfully"))
}

/// Only a Manager may hand out or take away the Manager role.
pub fn check_role_grant(actor: Role, current: Role, requested: Role) -> AppResult<()> {
    let touches_manager = current == Role::Manager || requested == Role::Manager;
    if touches_manager && !actor.allows(Capability::ManageAdmins) {
        return Err(AppError::forbidden(
            "Only a Manager can grant or revoke the Manager role",
        ));
    }
    Ok(())
}

pub async fn change_user_role(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    role: Role,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::ManageUsers)?;
    let current = load_user(state, id).await?.role;
    check_role_grant(user.role, current, role)?;

    update_user(state, id, |active| active.role = Set(role)).await?;
    tracing::info!(target_user = %id, role = %role, "user role changed");
    Ok(ApiResponse::message(format!("User role changed to {role}")))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::ManageUsers)?;
    update_user(state, id, |active| active.is_deleted = Set(true)).await?;
    tracing::info!(target_user = %id, by = %user.user_id, "user soft-deleted");
    Ok(ApiResponse::message("User soft-deleted successfully"))
}

pub async fn update_admin_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_capability(user, Capability::ManageUsers)?;
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Admin not found"))?;
    let model = apply_profile_update(state, model, payload).await?;
    Ok(ApiResponse::success(
        "Admin profile updated successfully",
        model.into(),
        Some(Meta::empty()),
    ))
}

pub async fn list_admins(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<AdminList>> {
    ensure_capability(user, Capability::ManageAdmins)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find()
        .filter(UserCol::Role.eq(Role::Admin))
        .order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await?;
    let admins = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let data = AdminList {
        admins,
        total_pages: total_pages(total, limit),
        current_page: page,
    };
    Ok(ApiResponse::success(
        "Admins fetched successfully",
        data,
        Some(Meta::new(page, limit, total)),
    ))
}

/// Admin accounts are created already confirmed; no OTP round trip.
pub async fn add_admin(
    state: &AppState,
    user: &AuthUser,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_capability(user, Capability::ManageAdmins)?;
    let email = normalize_email(&payload.email);
    if find_by_email(state, &email).await?.is_some() {
        return Err(AppError::conflict("User with this email already exists"));
    }

    let now = Utc::now().fixed_offset();
    let admin = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        name: Set(payload.name.trim().to_string()),
        phone: Set(payload.phone),
        role: Set(Role::Admin),
        is_blocked: Set(false),
        is_deleted: Set(false),
        is_confirm_email: Set(true),
        avatar_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(admin_id = %admin.id, by = %user.user_id, "admin added");
    Ok(ApiResponse::success(
        "Admin added successfully",
        admin.into(),
        Some(Meta::empty()),
    ))
}

async fn load_admin(state: &AppState, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|u| u.role == Role::Admin)
        .ok_or_else(|| AppError::not_found("Admin not found"))
}

/// Removes the row outright, unlike user deletion.
pub async fn delete_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::ManageAdmins)?;
    let admin = load_admin(state, id).await?;
    admin.delete(&state.orm).await?;
    tracing::info!(admin_id = %id, by = %user.user_id, "admin deleted");
    Ok(ApiResponse::message("Admin deleted successfully"))
}

pub async fn change_admin_role(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    role: Role,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::ManageAdmins)?;
    let admin = load_admin(state, id).await?;

    let mut active: UserActive = admin.into();
    active.role = Set(role);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&state.orm).await?;

    Ok(ApiResponse::message(format!("Admin role changed to {role}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_cannot_touch_manager_role() {
        assert!(check_role_grant(Role::Admin, Role::User, Role::Admin).is_ok());
        assert!(check_role_grant(Role::Admin, Role::User, Role::Manager).is_err());
        assert!(check_role_grant(Role::Admin, Role::Manager, Role::User).is_err());
        assert!(check_role_grant(Role::Manager, Role::User, Role::Manager).is_ok());
    }
}
