//! Request-body schema validation.
//!
//! Every request DTO declares a field table ([`RequestSchema::FIELDS`]) covering
//! presence and JSON type, and `validator` attributes covering bounds.
//! [`ValidatedBody`] runs both passes and reports every violation at once.
//! Bodies may be JSON or `multipart/form-data`; form values are coerced to
//! the declared field kinds before checking.

use crate::types::{
    AddressRequest, AppError, ClassroomRequest, FieldViolation, InstitutionRequest, Result, Role,
    SignInRequest, SignUpRequest, UpdateUserRequest,
};
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

/// JSON type expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    IntegerArray,
    /// A string drawn from a fixed set of names.
    OneOf(&'static [&'static str]),
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::OneOf(names) => value.as_str().is_some_and(|v| names.contains(&v)),
            FieldKind::Integer => value.is_i64(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::IntegerArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_i64)),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            FieldKind::OneOf(_) => "enum",
            _ => "type",
        }
    }

    fn describe(&self) -> String {
        match self {
            FieldKind::String => "a string".to_string(),
            FieldKind::Integer => "an integer".to_string(),
            FieldKind::Boolean => "a boolean".to_string(),
            FieldKind::IntegerArray => "an array of integers".to_string(),
            FieldKind::OneOf(names) => format!("one of {}", names.join(", ")),
        }
    }

    /// A well-typed stand-in for a rejected required field.
    fn placeholder(&self) -> Value {
        match self {
            FieldKind::String => Value::String(String::new()),
            FieldKind::Integer => Value::from(1),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::IntegerArray => Value::Array(Vec::new()),
            FieldKind::OneOf(names) => names
                .first()
                .map_or(Value::Null, |name| Value::String((*name).to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Declared wire shape of a request body.
pub trait RequestSchema {
    const FIELDS: &'static [FieldSpec];
}

impl RequestSchema for SignUpRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::required("username", FieldKind::String),
        FieldSpec::required("secret", FieldKind::String),
        FieldSpec::required("role", FieldKind::OneOf(&Role::NAMES)),
        FieldSpec::optional("institutionId", FieldKind::Integer),
        FieldSpec::optional("classroomIds", FieldKind::IntegerArray),
    ];
}

impl RequestSchema for SignInRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("username", FieldKind::String),
        FieldSpec::required("secret", FieldKind::String),
    ];
}

impl RequestSchema for UpdateUserRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("name", FieldKind::String),
        FieldSpec::optional("profileImage", FieldKind::String),
    ];
}

impl RequestSchema for AddressRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("city", FieldKind::String),
        FieldSpec::required("state", FieldKind::String),
        FieldSpec::required("country", FieldKind::String),
    ];
}

impl RequestSchema for InstitutionRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::optional("addressId", FieldKind::Integer),
    ];
}

impl RequestSchema for ClassroomRequest {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::required("institutionId", FieldKind::Integer),
        FieldSpec::optional("userIds", FieldKind::IntegerArray),
    ];
}

/// Checks presence, type and unknown fields against a field table.
pub fn check_structure(body: &Map<String, Value>, fields: &[FieldSpec]) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    for spec in fields {
        match body.get(spec.name) {
            None | Some(Value::Null) if spec.required => violations.push(FieldViolation::new(
                spec.name,
                "required",
                format!("{} is required", spec.name),
            )),
            None | Some(Value::Null) => {}
            Some(value) if !spec.kind.matches(value) => violations.push(FieldViolation::new(
                spec.name,
                spec.kind.code(),
                format!("{} must be {}", spec.name, spec.kind.describe()),
            )),
            Some(_) => {}
        }
    }

    for key in body.keys() {
        if !fields.iter().any(|spec| spec.name == key) {
            violations.push(FieldViolation::new(
                key.as_str(),
                "unknown",
                format!("{} is not an accepted field", key),
            ));
        }
    }

    violations
}

/// Flattens `validator` errors into violations keyed by wire field name.
pub fn bound_violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations: Vec<FieldViolation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            let wire_name = camel_case(&field);
            field_errors.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| describe_bound(&wire_name, e));
                FieldViolation::new(wire_name.clone(), &e.code, message)
            })
        })
        .collect();

    violations.sort_by(|a, b| a.field.cmp(&b.field));
    violations
}

fn describe_bound(field: &str, error: &validator::ValidationError) -> String {
    let min = error.params.get("min");
    let max = error.params.get("max");
    match (min, max) {
        (Some(min), Some(max)) => format!("{} must be between {} and {}", field, min, max),
        (Some(min), None) => format!("{} must be at least {}", field, min),
        (None, Some(max)) => format!("{} must be at most {}", field, max),
        (None, None) => format!("{} is invalid", field),
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Parses and fully validates a JSON body.
pub fn validate_body<T>(bytes: &[u8]) -> Result<T>
where
    T: DeserializeOwned + Validate + RequestSchema,
{
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::InvalidInput(format!("Malformed JSON body: {}", e)))?;

    let Value::Object(body) = value else {
        return Err(AppError::InvalidInput(
            "Request body must be a JSON object".to_string(),
        ));
    };

    validate_map(body)
}

/// Runs the structural, type and bound checks on an already-decoded body.
///
/// Violations from both passes are reported together. A field rejected by
/// the structural pass is not checked again for bounds.
pub fn validate_map<T>(mut body: Map<String, Value>) -> Result<T>
where
    T: DeserializeOwned + Validate + RequestSchema,
{
    let mut violations = check_structure(&body, T::FIELDS);

    for violation in &violations {
        body.remove(&violation.field);
        let required = T::FIELDS
            .iter()
            .find(|spec| spec.required && spec.name == violation.field);
        if let Some(spec) = required {
            body.insert(violation.field.clone(), spec.kind.placeholder());
        }
    }
    // Remaining nulls belong to optional fields.
    body.retain(|_, value| !value.is_null());

    let parsed: T = serde_json::from_value(Value::Object(body))
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    if let Err(errors) = parsed.validate() {
        let bounds: Vec<FieldViolation> = bound_violations(&errors)
            .into_iter()
            .filter(|b| !violations.iter().any(|v| v.field == b.field))
            .collect();
        violations.extend(bounds);
    }

    if !violations.is_empty() {
        violations.sort_by(|a, b| a.field.cmp(&b.field));
        return Err(AppError::Validation(violations));
    }

    Ok(parsed)
}

fn coerce(kind: FieldKind, raw: &str) -> Value {
    // Text fields are kept verbatim; secrets may carry meaningful whitespace.
    if matches!(kind, FieldKind::String | FieldKind::OneOf(_)) {
        return Value::String(raw.to_string());
    }

    let raw = raw.trim();
    let parsed = match kind {
        FieldKind::String | FieldKind::OneOf(_) => None,
        FieldKind::Integer => raw.parse::<i64>().ok().map(Value::from),
        FieldKind::Boolean => raw.parse::<bool>().ok().map(Value::from),
        FieldKind::IntegerArray => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i64>().ok().map(Value::from))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
    };
    // Unparseable values stay strings so the type check reports them.
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Builds a body from form fields, typed after the field table.
///
/// Array fields may repeat (`userIds=1&userIds=2`), use a `[]` suffix,
/// or carry a comma-separated list.
pub fn form_to_map(entries: Vec<(String, String)>, fields: &[FieldSpec]) -> Map<String, Value> {
    let mut body = Map::new();

    for (name, raw) in entries {
        let name = name.strip_suffix("[]").unwrap_or(&name).to_string();
        let kind = fields
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.kind)
            .unwrap_or(FieldKind::String);

        let value = coerce(kind, &raw);
        match body.get_mut(&name) {
            Some(Value::Array(existing)) if kind == FieldKind::IntegerArray => match value {
                Value::Array(more) => existing.extend(more),
                other => existing.push(other),
            },
            _ => {
                body.insert(name, value);
            }
        }
    }

    body
}

/// Extractor yielding a body that passed [`validate_map`].
pub struct ValidatedBody<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedBody<T>
where
    T: DeserializeOwned + Validate + RequestSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidInput(format!("Unreadable request body: {}", e)))?;

            return validate_body(&bytes).map(ValidatedBody);
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::InvalidInput(format!("Unreadable form body: {}", e)))?;

        let mut entries = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Unreadable form field: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let text = field
                .text()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Unreadable form field: {}", e)))?;
            entries.push((name, text));
        }

        validate_map(form_to_map(entries, T::FIELDS)).map(ValidatedBody)
    }
}

/// [`Path`] with rejections reported as JSON [`AppError`]s.
pub struct PathParam<T>(pub T);

impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| PathParam(value))
            .map_err(|e| {
                AppError::InvalidInput(format!("Invalid path parameter: {}", e.body_text()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn violations_of<T>(body: Value) -> Vec<FieldViolation>
    where
        T: DeserializeOwned + Validate + RequestSchema,
    {
        match validate_body::<T>(body.to_string().as_bytes()) {
            Err(AppError::Validation(v)) => v,
            Err(other) => panic!("expected validation error, got {other:?}"),
            Ok(_) => panic!("expected validation error, body was accepted"),
        }
    }

    #[test]
    fn test_valid_sign_in_passes() {
        let body = json!({"username": "johndoe", "secret": "hunter2"});
        let parsed: SignInRequest = validate_body(body.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.username, "johndoe");
    }

    #[test]
    fn test_reports_all_structural_violations() {
        let violations = violations_of::<SignUpRequest>(json!({
            "username": 42,
            "role": "USER",
            "classroomIds": [1, "two"],
            "nickname": "jd"
        }));

        let mut fields: Vec<(&str, &str)> = violations
            .iter()
            .map(|v| (v.field.as_str(), v.code.as_str()))
            .collect();
        fields.sort();

        assert_eq!(
            fields,
            vec![
                ("classroomIds", "type"),
                ("name", "required"),
                ("nickname", "unknown"),
                ("secret", "required"),
                ("username", "type"),
            ]
        );
    }

    #[test]
    fn test_reports_all_bound_violations_with_wire_names() {
        let violations = violations_of::<SignUpRequest>(json!({
            "name": "",
            "username": "jo",
            "secret": "pw",
            "role": "USER",
            "institutionId": 0
        }));

        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["institutionId", "name", "username"]);
        assert!(violations.iter().all(|v| v.code == "length" || v.code == "range"));
    }

    #[test]
    fn test_null_optional_field_is_accepted() {
        let body = json!({"name": "School", "addressId": null});
        let parsed: InstitutionRequest = validate_body(body.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.address_id, None);
    }

    #[test]
    fn test_unknown_role_is_an_enum_violation() {
        let violations = violations_of::<SignUpRequest>(json!({
            "name": "John",
            "username": "johndoe",
            "secret": "pw",
            "role": "ROOT"
        }));

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "role");
        assert_eq!(violations[0].code, "enum");
        assert!(violations[0].message.contains("COORDINATOR"));
    }

    #[test]
    fn test_role_names_are_case_sensitive() {
        let violations = violations_of::<SignUpRequest>(json!({
            "name": "John",
            "username": "johndoe",
            "secret": "pw",
            "role": "user"
        }));

        assert_eq!(violations[0].code, "enum");
    }

    #[test]
    fn test_structural_and_bound_violations_are_merged() {
        let violations = violations_of::<SignUpRequest>(json!({
            "name": "",
            "username": "jo",
            "role": "ROOT"
        }));

        let fields: Vec<(&str, &str)> = violations
            .iter()
            .map(|v| (v.field.as_str(), v.code.as_str()))
            .collect();

        assert_eq!(
            fields,
            vec![
                ("name", "length"),
                ("role", "enum"),
                ("secret", "required"),
                ("username", "length"),
            ]
        );
    }

    #[test]
    fn test_null_optional_array_is_accepted() {
        let body = json!({"name": "Room", "institutionId": 2, "userIds": null});
        let parsed: ClassroomRequest = validate_body(body.to_string().as_bytes()).unwrap();
        assert!(parsed.user_ids.is_empty());
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        let result = validate_body::<AddressRequest>(b"[1, 2, 3]");
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let result = validate_body::<AddressRequest>(b"not json");
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_form_fields_are_coerced_to_declared_kinds() {
        let entries = vec![
            ("name".to_string(), "Room 1".to_string()),
            ("institutionId".to_string(), "7".to_string()),
            ("userIds[]".to_string(), "3".to_string()),
            ("userIds[]".to_string(), "4, 5".to_string()),
        ];

        let body = form_to_map(entries, ClassroomRequest::FIELDS);
        let parsed: ClassroomRequest = validate_map(body).unwrap();

        assert_eq!(parsed.name, "Room 1");
        assert_eq!(parsed.institution_id, 7);
        assert_eq!(parsed.user_ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_form_text_is_kept_verbatim() {
        let entries = vec![
            ("username".to_string(), " johndoe ".to_string()),
            ("secret".to_string(), "  pass  ".to_string()),
        ];

        let body = form_to_map(entries, SignInRequest::FIELDS);
        assert_eq!(body["secret"], json!("  pass  "));
        assert_eq!(body["username"], json!(" johndoe "));
    }

    #[test]
    fn test_form_integers_tolerate_padding() {
        let entries = vec![
            ("name".to_string(), "Room 1".to_string()),
            ("institutionId".to_string(), " 7 ".to_string()),
        ];

        let parsed: ClassroomRequest =
            validate_map(form_to_map(entries, ClassroomRequest::FIELDS)).unwrap();
        assert_eq!(parsed.institution_id, 7);
    }

    #[test]
    fn test_unparseable_form_integer_is_a_type_violation() {
        let entries = vec![
            ("name".to_string(), "Room 1".to_string()),
            ("institutionId".to_string(), "seven".to_string()),
        ];

        let body = form_to_map(entries, ClassroomRequest::FIELDS);
        match validate_map::<ClassroomRequest>(body) {
            Err(AppError::Validation(v)) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].field, "institutionId");
                assert_eq!(v[0].code, "type");
            }
            other => panic!("expected a type violation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("institution_id"), "institutionId");
        assert_eq!(camel_case("classroom_ids"), "classroomIds");
        assert_eq!(camel_case("name"), "name");
    }
}
