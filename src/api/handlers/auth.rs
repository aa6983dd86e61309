use crate::{
    api::extract::ValidatedBody,
    auth::{
        middleware::AuthUser,
        policy::{self, Action},
    },
    db::NewUser,
    types::{
        AcceptTermsResponse, AppError, CheckSignInResponse, Envelope, Result, Role,
        SignInRequest, SignInResponse, SignUpRequest, SignUpResponse, TokenResponse,
    },
    AppState,
};
use axum::{extract::State, http::StatusCode, Json};

/// Create an account and sign it in
#[utoipa::path(
    post,
    path = "/auth/signUp",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User created", body = Envelope<SignUpResponse>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Sign-up disabled or role not self-assignable"),
        (status = 404, description = "Referenced institution or classroom does not exist"),
        (status = 409, description = "Username already taken")
    ),
    tag = "auth"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedBody(payload): ValidatedBody<SignUpRequest>,
) -> Result<(StatusCode, Json<Envelope<SignUpResponse>>)> {
    let config = state.config_manager.config();

    if !config.auth.allow_sign_up {
        return Err(AppError::Unauthorized("Sign-up is disabled".to_string()));
    }

    if !policy::may_self_register_as(payload.role) {
        tracing::warn!(role = %payload.role, "sign-up refused for role");
        return Err(AppError::Unauthorized(format!(
            "Role {} cannot be requested at sign-up",
            payload.role
        )));
    }

    // Never store the plaintext secret
    let password_hash = state.auth_service.hash_password(&payload.secret)?;

    let user = state
        .turso
        .create_user(
            NewUser {
                name: &payload.name,
                username: &payload.username,
                password_hash: &password_hash,
                role: payload.role,
                institution_id: payload.institution_id,
            },
            &payload.classroom_ids,
        )
        .await?;

    let token = state
        .auth_service
        .issue(user.id, &user.username, config.auth.token_expiry)?;

    tracing::info!(user_id = user.id, role = %user.role, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::new(
            "User created",
            SignUpResponse {
                id: user.id,
                role: user.role,
                token,
                expires_in: config.auth.token_expiry,
                institution_id: user.institution_id,
            },
        )),
    ))
}

/// Sign in with username and secret
#[utoipa::path(
    post,
    path = "/auth/signIn",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = Envelope<SignInResponse>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    ValidatedBody(payload): ValidatedBody<SignInRequest>,
) -> Result<Json<Envelope<SignInResponse>>> {
    // Unknown user, guest row and wrong secret all look the same to the caller
    let user = match state.turso.get_user_by_username(&payload.username).await? {
        Some(user) if user.role != Role::Guest => user,
        _ => {
            state.auth_service.verify_decoy(&payload.secret);
            tracing::warn!("sign-in failed: no such user");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !state
        .auth_service
        .verify_password(&payload.secret, &user.password_hash)
    {
        tracing::warn!(user_id = user.id, "sign-in failed: wrong secret");
        return Err(AppError::InvalidCredentials);
    }

    let expiry = state.config_manager.config().auth.token_expiry;
    let token = state.auth_service.issue(user.id, &user.username, expiry)?;

    tracing::info!(user_id = user.id, "user signed in");

    Ok(Json(Envelope::new(
        "Signed in",
        SignInResponse {
            id: user.id,
            role: user.role,
            accepted_terms: user.accepted_terms,
            token,
            expires_in: expiry,
            institution_id: user.institution_id,
            profile_image: user.profile_image,
        },
    )))
}

/// Open an anonymous session bound to the guest identity
#[utoipa::path(
    get,
    path = "/auth/passwordlessSignIn",
    responses(
        (status = 200, description = "Guest session issued", body = Envelope<TokenResponse>)
    ),
    tag = "auth"
)]
pub async fn passwordless_sign_in(
    State(state): State<AppState>,
) -> Result<Json<Envelope<TokenResponse>>> {
    let guest = state
        .turso
        .get_user_by_role(Role::Guest)
        .await?
        .ok_or_else(|| AppError::Internal("Guest identity is missing".to_string()))?;

    let expiry = state.config_manager.config().auth.token_expiry;
    let token = state.auth_service.issue(guest.id, &guest.username, expiry)?;

    tracing::debug!(user_id = guest.id, "guest session issued");

    Ok(Json(Envelope::new(
        "Signed in as guest",
        TokenResponse {
            id: guest.id,
            role: guest.role,
            token,
            expires_in: expiry,
        },
    )))
}

/// Issue a fresh token for the current session
#[utoipa::path(
    post,
    path = "/auth/renewSignIn",
    responses(
        (status = 200, description = "Token renewed", body = Envelope<TokenResponse>),
        (status = 401, description = "Missing, expired or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn renew_sign_in(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Envelope<TokenResponse>>> {
    policy::require(Some(&actor), Action::RenewSignIn, None)?;

    // The middleware already verified the previous token; no secret re-check.
    let expiry = state.config_manager.config().auth.token_expiry;
    let token = state.auth_service.issue(actor.id, &actor.username, expiry)?;

    Ok(Json(Envelope::new(
        "Session renewed",
        TokenResponse {
            id: actor.id,
            role: actor.role,
            token,
            expires_in: expiry,
        },
    )))
}

/// Check that the bearer token is still valid
#[utoipa::path(
    get,
    path = "/auth/checkSignIn",
    responses(
        (status = 200, description = "Session is valid", body = Envelope<CheckSignInResponse>),
        (status = 401, description = "Missing, expired or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn check_sign_in(
    AuthUser(actor): AuthUser,
) -> Result<Json<Envelope<CheckSignInResponse>>> {
    policy::require(Some(&actor), Action::CheckSignIn, None)?;

    Ok(Json(Envelope::new(
        "Session is valid",
        CheckSignInResponse { id: actor.id },
    )))
}

/// Record that the current user accepted the terms of use
#[utoipa::path(
    get,
    path = "/auth/acceptTerms",
    responses(
        (status = 200, description = "Terms accepted", body = Envelope<AcceptTermsResponse>),
        (status = 401, description = "Missing, expired or invalid token"),
        (status = 403, description = "Guest sessions cannot accept terms")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn accept_terms(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Envelope<AcceptTermsResponse>>> {
    policy::require(Some(&actor), Action::AcceptTerms, None)?;

    if !state.turso.accept_terms(actor.id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = actor.id, "terms accepted");

    Ok(Json(Envelope::new(
        "Terms accepted",
        AcceptTermsResponse {
            id: actor.id,
            accepted_terms: true,
        },
    )))
}
