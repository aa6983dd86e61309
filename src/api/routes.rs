use crate::api::handlers::{addresses, auth, classrooms, institutions, users};
use crate::auth::middleware::{auth_middleware, optional_auth_middleware};
use crate::AppState;
use crate::types::AppError;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

pub fn create_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        // Public routes (no auth required)
        .route("/auth/signUp", post(auth::sign_up))
        .route("/auth/signIn", post(auth::sign_in))
        .route("/auth/passwordlessSignIn", get(auth::passwordless_sign_in));

    let optional_auth_routes = Router::new()
        // Public reads; a bearer token is resolved when present
        .route("/address/getAll", get(addresses::get_all_addresses))
        .route("/address/get/{id}", get(addresses::get_address))
        .route("/address/getId", post(addresses::get_address_id))
        .route(
            "/address/getByState/{state}",
            get(addresses::get_addresses_by_state),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let protected_routes = Router::new()
        // Session routes
        .route("/auth/renewSignIn", post(auth::renew_sign_in))
        .route("/auth/checkSignIn", get(auth::check_sign_in))
        .route("/auth/acceptTerms", get(auth::accept_terms))
        // User routes
        .route("/user/getAll", get(users::get_all_users))
        .route("/user/get/{id}", get(users::get_user))
        .route("/user/update/{id}", put(users::update_user))
        .route("/user/delete/{id}", delete(users::delete_user))
        // Address writes
        .route("/address/create", post(addresses::create_address))
        .route("/address/update/{id}", put(addresses::update_address))
        .route("/address/delete/{id}", delete(addresses::delete_address))
        // Institution routes
        .route("/institution/create", post(institutions::create_institution))
        .route(
            "/institution/update/{id}",
            put(institutions::update_institution),
        )
        .route("/institution/getAll", get(institutions::get_all_institutions))
        .route("/institution/get/{id}", get(institutions::get_institution))
        .route(
            "/institution/delete/{id}",
            delete(institutions::delete_institution),
        )
        // Classroom routes
        .route("/classroom/create", post(classrooms::create_classroom))
        .route("/classroom/update/{id}", put(classrooms::update_classroom))
        .route("/classroom/getAll", get(classrooms::get_all_classrooms))
        .route("/classroom/get/{id}", get(classrooms::get_classroom))
        .route(
            "/classroom/getByInstitution/{id}",
            get(classrooms::get_classrooms_by_institution),
        )
        .route(
            "/classroom/delete/{id}",
            delete(classrooms::delete_classroom),
        )
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    public_routes
        .merge(optional_auth_routes)
        .merge(protected_routes)
        .fallback(route_not_found)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
