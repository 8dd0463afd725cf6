use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    dto::users::{AvatarResponse, ChangePasswordRequest, UpdateProfileRequest},
    entity::users::{ActiveModel as UserActive, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_capability},
    models::{Capability, User},
    response::{ApiResponse, Meta},
    services::auth_service::{hash_password, verify_password},
    state::AppState,
    upload::{UploadKind, UploadedFile, store_files},
};

pub(crate) async fn load_user(state: &AppState, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// Apply name/phone/password changes shared by the user and admin profile endpoints.
pub(crate) async fn apply_profile_update(
    state: &AppState,
    user: UserModel,
    payload: UpdateProfileRequest,
) -> AppResult<UserModel> {
    let mut active: UserActive = user.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone);
    }
    if let Some(password) = payload.password {
        active.password_hash = Set(hash_password(&password)?);
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    Ok(active.update(&state.orm).await?)
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let model = load_user(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "User profile fetched successfully",
        model.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let model = load_user(state, user.user_id).await?;
    let model = apply_profile_update(state, model, payload).await?;
    Ok(ApiResponse::success(
        "User profile updated successfully",
        model.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_profile(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::DeleteOwnAccount)?;
    let model = load_user(state, user.user_id).await?;
    let mut active: UserActive = model.into();
    active.is_deleted = Set(true);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&state.orm).await?;

    tracing::info!(user_id = %user.user_id, "profile soft-deleted");
    Ok(ApiResponse::message("Profile soft-deleted successfully"))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let model = load_user(state, user.user_id).await?;
    if !verify_password(&payload.old_password, &model.password_hash)? {
        return Err(AppError::bad_request("Invalid old password"));
    }

    let mut active: UserActive = model.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&state.orm).await?;

    Ok(ApiResponse::message("Password changed successfully"))
}

pub async fn upload_avatar(
    state: &AppState,
    user: &AuthUser,
    file: Option<UploadedFile>,
) -> AppResult<ApiResponse<AvatarResponse>> {
    let file = file.ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    let model = load_user(state, user.user_id).await?;

    let avatar_url = store_files(&state.config.upload_dir, UploadKind::Avatar, &[file])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("avatar was not stored")))?;

    let mut active: UserActive = model.into();
    active.avatar_url = Set(Some(avatar_url.clone()));
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Avatar uploaded successfully",
        AvatarResponse { avatar_url },
        Some(Meta::empty()),
    ))
}
