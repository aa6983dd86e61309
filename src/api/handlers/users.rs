//! User account handlers.
//!
//! Listing and deletion are admin-only; reading and updating a profile is
//! allowed to its owner and to admins.

use crate::{
    api::extract::{PathParam, ValidatedBody},
    auth::{
        middleware::AuthUser,
        policy::{self, Action},
    },
    types::{AppError, Envelope, Result, Role, UpdateUserRequest, UserId, UserProfile},
    AppState,
};
use axum::{
    extract::State,
    Json,
};

/// List every user.
#[utoipa::path(
    get,
    path = "/user/getAll",
    responses(
        (status = 200, description = "All users", body = Envelope<Vec<UserProfile>>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_all_users(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Envelope<Vec<UserProfile>>>> {
    policy::require(Some(&actor), Action::GetAllUsers, None)?;

    let users = state.turso.list_users().await?;

    Ok(Json(Envelope::new(
        "Users found",
        users.iter().map(|u| u.profile()).collect(),
    )))
}

/// Get a user's profile.
#[utoipa::path(
    get,
    path = "/user/get/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile", body = Envelope<UserProfile>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<UserId>,
) -> Result<Json<Envelope<UserProfile>>> {
    policy::require(Some(&actor), Action::GetUser, Some(id))?;

    let user = state
        .turso
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(Envelope::new("User found", user.profile())))
}

/// Update a user's display name or profile image.
#[utoipa::path(
    put,
    path = "/user/update/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = Envelope<UserProfile>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<UserId>,
    ValidatedBody(payload): ValidatedBody<UpdateUserRequest>,
) -> Result<Json<Envelope<UserProfile>>> {
    policy::require(Some(&actor), Action::UpdateUser, Some(id))?;

    let user = state
        .turso
        .update_user_profile(
            id,
            payload.name.as_deref(),
            payload.profile_image.as_deref(),
        )
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = id, actor_id = actor.id, "user updated");

    Ok(Json(Envelope::new("User updated", user.profile())))
}

/// Delete a user. The guest identity cannot be deleted.
#[utoipa::path(
    delete,
    path = "/user/delete/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = Envelope<UserProfile>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User is the guest identity or still owns classrooms")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<UserId>,
) -> Result<Json<Envelope<UserProfile>>> {
    policy::require(Some(&actor), Action::DeleteUser, None)?;

    let user = state
        .turso
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.role == Role::Guest {
        return Err(AppError::Conflict(
            "The guest identity cannot be deleted".to_string(),
        ));
    }

    if !state.turso.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = id, actor_id = actor.id, "user deleted");

    Ok(Json(Envelope::new("User deleted", user.profile())))
}
