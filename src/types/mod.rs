use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Primary key of a user row.
pub type UserId = i64;

// ============= Roles =============

/// Global user role. Variants are declared in ascending order of privilege so
/// the derived ordering is the role hierarchy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Guest,
    User,
    Applier,
    Publisher,
    Coordinator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Guest,
        Role::User,
        Role::Applier,
        Role::Publisher,
        Role::Coordinator,
        Role::Admin,
    ];

    /// Wire names, in the same order as [`Role::ALL`].
    pub const NAMES: [&'static str; 6] = [
        "GUEST",
        "USER",
        "APPLIER",
        "PUBLISHER",
        "COORDINATOR",
        "ADMIN",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::User => "USER",
            Role::Applier => "APPLIER",
            Role::Publisher => "PUBLISHER",
            Role::Coordinator => "COORDINATOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown role: {}", s)))
    }
}

/// The acting identity of a request, resolved from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub institution_id: Option<i64>,
}

// ============= Session Tokens =============

/// Claim set carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a decimal string.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity recovered from a valid session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: UserId,
    pub username: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Why a session token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is malformed")]
    Malformed,
}

// ============= Response Envelope =============

/// Uniform success wrapper: `{"message": ..., "data": ...}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

// ============= Authentication Types =============

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 3, max = 20))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub secret: String,
    pub role: Role,
    #[validate(range(min = 1))]
    pub institution_id: Option<i64>,
    #[serde(default)]
    #[validate(custom(function = "validate_ids"))]
    pub classroom_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    #[validate(length(min = 3, max = 20))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub secret: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub id: UserId,
    pub role: Role,
    pub token: String,
    pub expires_in: i64,
    pub institution_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub id: UserId,
    pub role: Role,
    pub accepted_terms: bool,
    pub token: String,
    pub expires_in: i64,
    pub institution_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub id: UserId,
    pub role: Role,
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckSignInResponse {
    pub id: UserId,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptTermsResponse {
    pub id: UserId,
    pub accepted_terms: bool,
}

// ============= User Types =============

/// Public view of a user; the password hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub institution_id: Option<i64>,
    pub accepted_terms: bool,
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub profile_image: Option<String>,
}

// ============= Address Types =============

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: i64,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Body for address create/update and for the compound-key lookup.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AddressRequest {
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddressId {
    pub id: i64,
}

// ============= Institution Types =============

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: i64,
    pub name: String,
    pub address_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstitutionRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1))]
    pub address_id: Option<i64>,
}

// ============= Classroom Types =============

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: i64,
    pub name: String,
    pub institution_id: i64,
    pub creator_id: UserId,
    pub user_ids: Vec<UserId>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClassroomRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1))]
    pub institution_id: i64,
    #[serde(default)]
    #[validate(custom(function = "validate_ids"))]
    pub user_ids: Vec<UserId>,
}

fn validate_ids(ids: &[i64]) -> std::result::Result<(), ValidationError> {
    if ids.iter().any(|id| *id < 1) {
        return Err(ValidationError::new("range")
            .with_message("every id must be a positive integer".into()));
    }
    Ok(())
}

// ============= Error Types =============

/// One schema violation in a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {} violation(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid session token: {0}")]
    Token(#[from] TokenError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AppError::Validation(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Auth(_) | AppError::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        let body = match self {
            AppError::Validation(details) => serde_json::json!({
                "error": "Validation failed",
                "details": details,
            }),
            AppError::Database(msg) | AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                serde_json::json!({ "error": "Internal server error" })
            }
            AppError::InvalidInput(msg)
            | AppError::Auth(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => serde_json::json!({ "error": msg }),
            AppError::InvalidCredentials => serde_json::json!({ "error": "Invalid credentials" }),
            AppError::Token(e) => serde_json::json!({ "error": e.to_string() }),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
