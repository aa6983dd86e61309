//! Classroom handlers.
//!
//! Any role from applier upward may open a classroom; its creator owns it.
//! Updating or deleting a classroom is allowed to the owner and to admins,
//! so those handlers load the row first to learn who owns it.

use crate::{
    api::extract::{PathParam, ValidatedBody},
    auth::{
        middleware::AuthUser,
        policy::{self, Action},
    },
    types::{AppError, Classroom, ClassroomRequest, Envelope, Result},
    AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

fn not_found() -> AppError {
    AppError::NotFound("Classroom not found".to_string())
}

/// Create a classroom owned by the caller.
#[utoipa::path(
    post,
    path = "/classroom/create",
    request_body = ClassroomRequest,
    responses(
        (status = 201, description = "Classroom created", body = Envelope<Classroom>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Role below applier"),
        (status = 404, description = "Institution or member does not exist")
    ),
    security(("bearer_auth" = [])),
    tag = "classrooms"
)]
pub async fn create_classroom(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedBody(payload): ValidatedBody<ClassroomRequest>,
) -> Result<(StatusCode, Json<Envelope<Classroom>>)> {
    policy::require(Some(&actor), Action::CreateClassroom, None)?;

    let classroom = state
        .turso
        .create_classroom(
            &payload.name,
            payload.institution_id,
            actor.id,
            &payload.user_ids,
        )
        .await?;

    tracing::info!(classroom_id = classroom.id, creator_id = actor.id, "classroom created");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Classroom created", classroom)),
    ))
}

/// Replace a classroom's name, institution and members.
#[utoipa::path(
    put,
    path = "/classroom/update/{id}",
    params(("id" = i64, Path, description = "Classroom id")),
    request_body = ClassroomRequest,
    responses(
        (status = 200, description = "Classroom updated", body = Envelope<Classroom>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Classroom, institution or member not found")
    ),
    security(("bearer_auth" = [])),
    tag = "classrooms"
)]
pub async fn update_classroom(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
    ValidatedBody(payload): ValidatedBody<ClassroomRequest>,
) -> Result<Json<Envelope<Classroom>>> {
    let existing = state.turso.get_classroom(id).await?.ok_or_else(not_found)?;
    policy::require(Some(&actor), Action::UpdateClassroom, Some(existing.creator_id))?;

    let classroom = state
        .turso
        .update_classroom(id, &payload.name, payload.institution_id, &payload.user_ids)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(Envelope::new("Classroom updated", classroom)))
}

/// List every classroom.
#[utoipa::path(
    get,
    path = "/classroom/getAll",
    responses(
        (status = 200, description = "All classrooms", body = Envelope<Vec<Classroom>>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "classrooms"
)]
pub async fn get_all_classrooms(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Envelope<Vec<Classroom>>>> {
    policy::require(Some(&actor), Action::GetAllClassrooms, None)?;

    let classrooms = state.turso.list_classrooms(None).await?;

    Ok(Json(Envelope::new("Classrooms found", classrooms)))
}

/// Get a classroom by id.
#[utoipa::path(
    get,
    path = "/classroom/get/{id}",
    params(("id" = i64, Path, description = "Classroom id")),
    responses(
        (status = 200, description = "Classroom", body = Envelope<Classroom>),
        (status = 404, description = "Classroom not found")
    ),
    security(("bearer_auth" = [])),
    tag = "classrooms"
)]
pub async fn get_classroom(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Envelope<Classroom>>> {
    policy::require(Some(&actor), Action::GetClassroom, None)?;

    let classroom = state.turso.get_classroom(id).await?.ok_or_else(not_found)?;

    Ok(Json(Envelope::new("Classroom found", classroom)))
}

/// List the classrooms of one institution.
#[utoipa::path(
    get,
    path = "/classroom/getByInstitution/{id}",
    params(("id" = i64, Path, description = "Institution id")),
    responses((status = 200, description = "Classrooms of the institution", body = Envelope<Vec<Classroom>>)),
    security(("bearer_auth" = [])),
    tag = "classrooms"
)]
pub async fn get_classrooms_by_institution(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(institution_id): PathParam<i64>,
) -> Result<Json<Envelope<Vec<Classroom>>>> {
    policy::require(Some(&actor), Action::GetClassroomsByInstitution, None)?;

    let classrooms = state.turso.list_classrooms(Some(institution_id)).await?;

    Ok(Json(Envelope::new("Classrooms found", classrooms)))
}

/// Delete a classroom and its memberships.
#[utoipa::path(
    delete,
    path = "/classroom/delete/{id}",
    params(("id" = i64, Path, description = "Classroom id")),
    responses(
        (status = 200, description = "Classroom deleted", body = Envelope<Classroom>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Classroom not found")
    ),
    security(("bearer_auth" = [])),
    tag = "classrooms"
)]
pub async fn delete_classroom(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Envelope<Classroom>>> {
    let existing = state.turso.get_classroom(id).await?.ok_or_else(not_found)?;
    policy::require(Some(&actor), Action::DeleteClassroom, Some(existing.creator_id))?;

    if !state.turso.delete_classroom(id).await? {
        return Err(not_found());
    }

    tracing::info!(classroom_id = id, actor_id = actor.id, "classroom deleted");

    Ok(Json(Envelope::new("Classroom deleted", existing)))
}
