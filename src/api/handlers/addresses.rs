//! Address handlers.
//!
//! Reads are public. Writes are admin-only.

use crate::{
    api::extract::{PathParam, ValidatedBody},
    auth::{
        middleware::{AuthUser, MaybeAuthUser},
        policy::{self, Action},
    },
    types::{Address, AddressId, AddressRequest, AppError, Envelope, Result},
    AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

fn not_found() -> AppError {
    AppError::NotFound("Address not found".to_string())
}

/// Create an address.
#[utoipa::path(
    post,
    path = "/address/create",
    request_body = AddressRequest,
    responses(
        (status = 201, description = "Address created", body = Envelope<Address>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Address already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "addresses"
)]
pub async fn create_address(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedBody(payload): ValidatedBody<AddressRequest>,
) -> Result<(StatusCode, Json<Envelope<Address>>)> {
    policy::require(Some(&actor), Action::CreateAddress, None)?;

    let address = state.turso.create_address(&payload).await?;
    tracing::info!(address_id = address.id, actor_id = actor.id, "address created");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Address created", address)),
    ))
}

/// Replace an address.
#[utoipa::path(
    put,
    path = "/address/update/{id}",
    params(("id" = i64, Path, description = "Address id")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address updated", body = Envelope<Address>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Address not found"),
        (status = 409, description = "Address already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "addresses"
)]
pub async fn update_address(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
    ValidatedBody(payload): ValidatedBody<AddressRequest>,
) -> Result<Json<Envelope<Address>>> {
    policy::require(Some(&actor), Action::UpdateAddress, None)?;

    let address = state
        .turso
        .update_address(id, &payload)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(Envelope::new("Address updated", address)))
}

/// List every address.
#[utoipa::path(
    get,
    path = "/address/getAll",
    responses((status = 200, description = "All addresses", body = Envelope<Vec<Address>>)),
    tag = "addresses"
)]
pub async fn get_all_addresses(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
) -> Result<Json<Envelope<Vec<Address>>>> {
    policy::require(actor.as_ref(), Action::GetAllAddresses, None)?;

    let addresses = state.turso.list_addresses(None).await?;

    Ok(Json(Envelope::new("Addresses found", addresses)))
}

/// Get an address by id.
#[utoipa::path(
    get,
    path = "/address/get/{id}",
    params(("id" = i64, Path, description = "Address id")),
    responses(
        (status = 200, description = "Address", body = Envelope<Address>),
        (status = 404, description = "Address not found")
    ),
    tag = "addresses"
)]
pub async fn get_address(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Envelope<Address>>> {
    policy::require(actor.as_ref(), Action::GetAddress, None)?;

    let address = state.turso.get_address(id).await?.ok_or_else(not_found)?;

    Ok(Json(Envelope::new("Address found", address)))
}

/// Look up an address id by city, state and country.
#[utoipa::path(
    post,
    path = "/address/getId",
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address id", body = Envelope<AddressId>),
        (status = 404, description = "Address not found")
    ),
    tag = "addresses"
)]
pub async fn get_address_id(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    ValidatedBody(payload): ValidatedBody<AddressRequest>,
) -> Result<Json<Envelope<AddressId>>> {
    policy::require(actor.as_ref(), Action::GetAddressId, None)?;

    let id = state
        .turso
        .find_address_id(&payload)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(Envelope::new("Address found", AddressId { id })))
}

/// List the addresses in one state.
#[utoipa::path(
    get,
    path = "/address/getByState/{state}",
    params(("state" = String, Path, description = "State name")),
    responses((status = 200, description = "Addresses in the state", body = Envelope<Vec<Address>>)),
    tag = "addresses"
)]
pub async fn get_addresses_by_state(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    PathParam(region): PathParam<String>,
) -> Result<Json<Envelope<Vec<Address>>>> {
    policy::require(actor.as_ref(), Action::GetAddressesByState, None)?;

    let addresses = state.turso.list_addresses(Some(&region)).await?;

    Ok(Json(Envelope::new("Addresses found", addresses)))
}

/// Delete an address.
#[utoipa::path(
    delete,
    path = "/address/delete/{id}",
    params(("id" = i64, Path, description = "Address id")),
    responses(
        (status = 200, description = "Address deleted", body = Envelope<AddressId>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Address not found"),
        (status = 409, description = "Address is still referenced by an institution")
    ),
    security(("bearer_auth" = [])),
    tag = "addresses"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Envelope<AddressId>>> {
    policy::require(Some(&actor), Action::DeleteAddress, None)?;

    if !state.turso.delete_address(id).await? {
        return Err(not_found());
    }

    tracing::info!(address_id = id, actor_id = actor.id, "address deleted");

    Ok(Json(Envelope::new("Address deleted", AddressId { id })))
}
