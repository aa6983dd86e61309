//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer of the PICCE API, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::extract`](crate::api::extract) - Validating body extractor (JSON or form)
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each entity
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Authentication (`/auth`)
//! - `POST /auth/signUp` - Create an account (when `auth.allow_sign_up` is set)
//! - `POST /auth/signIn` - Sign in with username and secret
//! - `GET /auth/passwordlessSignIn` - Anonymous guest session
//! - `POST /auth/renewSignIn` - Fresh token for the current session
//! - `GET /auth/checkSignIn` - Validate the current token
//! - `GET /auth/acceptTerms` - Accept the terms of use (not for guests)
//!
//! ## Users (`/user`)
//! - `GET /user/getAll`, `GET /user/get/{id}`, `PUT /user/update/{id}`, `DELETE /user/delete/{id}`
//!
//! ## Addresses (`/address`)
//! - `POST /address/create`, `PUT /address/update/{id}`, `DELETE /address/delete/{id}` - admin only
//! - `GET /address/getAll`, `GET /address/get/{id}`, `POST /address/getId`,
//!   `GET /address/getByState/{state}` - public
//!
//! ## Institutions (`/institution`)
//! - `POST create`, `PUT update/{id}`, `GET getAll`, `GET get/{id}`, `DELETE delete/{id}`
//!
//! ## Classrooms (`/classroom`)
//! - `POST create`, `PUT update/{id}`, `GET getAll`, `GET get/{id}`,
//!   `GET getByInstitution/{id}`, `DELETE delete/{id}`
//!
//! # Authentication
//!
//! Protected endpoints require a valid session token in the `Authorization` header:
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Validating body extractor for JSON and form requests.
pub mod extract;
/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "PICCE API", description = "Authentication and resource management"),
    paths(
        handlers::auth::sign_up,
        handlers::auth::sign_in,
        handlers::auth::passwordless_sign_in,
        handlers::auth::renew_sign_in,
        handlers::auth::check_sign_in,
        handlers::auth::accept_terms,
        handlers::users::get_all_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::addresses::create_address,
        handlers::addresses::update_address,
        handlers::addresses::get_all_addresses,
        handlers::addresses::get_address,
        handlers::addresses::get_address_id,
        handlers::addresses::get_addresses_by_state,
        handlers::addresses::delete_address,
        handlers::institutions::create_institution,
        handlers::institutions::update_institution,
        handlers::institutions::get_all_institutions,
        handlers::institutions::get_institution,
        handlers::institutions::delete_institution,
        handlers::classrooms::create_classroom,
        handlers::classrooms::update_classroom,
        handlers::classrooms::get_all_classrooms,
        handlers::classrooms::get_classroom,
        handlers::classrooms::get_classrooms_by_institution,
        handlers::classrooms::delete_classroom,
    ),
    components(schemas(crate::types::Role, crate::types::FieldViolation)),
    tags(
        (name = "auth", description = "Sign-up, sign-in and session management"),
        (name = "users", description = "User accounts"),
        (name = "addresses", description = "Addresses"),
        (name = "institutions", description = "Institutions"),
        (name = "classrooms", description = "Classrooms and their members")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_entity() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        for path in [
            "/auth/signUp",
            "/auth/passwordlessSignIn",
            "/user/get/{id}",
            "/address/getByState/{state}",
            "/institution/getAll",
            "/classroom/getByInstitution/{id}",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }

        let components = openapi.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("SignUpRequest"));
    }
}
