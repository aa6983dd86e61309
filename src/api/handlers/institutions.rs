use crate::{
    api::extract::{PathParam, ValidatedBody},
    auth::{
        middleware::AuthUser,
        policy::{self, Action},
    },
    types::{AppError, Envelope, Institution, InstitutionRequest, Result},
    AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

fn not_found() -> AppError {
    AppError::NotFound("Institution not found".to_string())
}

/// Create an institution.
#[utoipa::path(
    post,
    path = "/institution/create",
    request_body = InstitutionRequest,
    responses(
        (status = 201, description = "Institution created", body = Envelope<Institution>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Address does not exist"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "institutions"
)]
pub async fn create_institution(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedBody(payload): ValidatedBody<InstitutionRequest>,
) -> Result<(StatusCode, Json<Envelope<Institution>>)> {
    policy::require(Some(&actor), Action::CreateInstitution, None)?;

    let institution = state.turso.create_institution(&payload).await?;
    tracing::info!(
        institution_id = institution.id,
        actor_id = actor.id,
        "institution created"
    );

    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Institution created", institution)),
    ))
}

/// Replace an institution.
#[utoipa::path(
    put,
    path = "/institution/update/{id}",
    params(("id" = i64, Path, description = "Institution id")),
    request_body = InstitutionRequest,
    responses(
        (status = 200, description = "Institution updated", body = Envelope<Institution>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Institution or address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "institutions"
)]
pub async fn update_institution(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
    ValidatedBody(payload): ValidatedBody<InstitutionRequest>,
) -> Result<Json<Envelope<Institution>>> {
    policy::require(Some(&actor), Action::UpdateInstitution, None)?;

    let institution = state
        .turso
        .update_institution(id, &payload)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(Envelope::new("Institution updated", institution)))
}

/// List every institution.
#[utoipa::path(
    get,
    path = "/institution/getAll",
    responses((status = 200, description = "All institutions", body = Envelope<Vec<Institution>>)),
    security(("bearer_auth" = [])),
    tag = "institutions"
)]
pub async fn get_all_institutions(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Envelope<Vec<Institution>>>> {
    policy::require(Some(&actor), Action::GetAllInstitutions, None)?;

    let institutions = state.turso.list_institutions().await?;

    Ok(Json(Envelope::new("Institutions found", institutions)))
}

/// Get an institution by id.
#[utoipa::path(
    get,
    path = "/institution/get/{id}",
    params(("id" = i64, Path, description = "Institution id")),
    responses(
        (status = 200, description = "Institution", body = Envelope<Institution>),
        (status = 404, description = "Institution not found")
    ),
    security(("bearer_auth" = [])),
    tag = "institutions"
)]
pub async fn get_institution(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Envelope<Institution>>> {
    policy::require(Some(&actor), Action::GetInstitution, None)?;

    let institution = state
        .turso
        .get_institution(id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(Envelope::new("Institution found", institution)))
}

/// Delete an institution.
#[utoipa::path(
    delete,
    path = "/institution/delete/{id}",
    params(("id" = i64, Path, description = "Institution id")),
    responses(
        (status = 200, description = "Institution deleted", body = Envelope<Institution>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Institution not found"),
        (status = 409, description = "Institution still has users or classrooms")
    ),
    security(("bearer_auth" = [])),
    tag = "institutions"
)]
pub async fn delete_institution(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Envelope<Institution>>> {
    policy::require(Some(&actor), Action::DeleteInstitution, None)?;

    let institution = state
        .turso
        .get_institution(id)
        .await?
        .ok_or_else(not_found)?;

    if !state.turso.delete_institution(id).await? {
        return Err(not_found());
    }

    tracing::info!(institution_id = id, actor_id = actor.id, "institution deleted");

    Ok(Json(Envelope::new("Institution deleted", institution)))
}
