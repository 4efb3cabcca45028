//! Error handling for the REST API server.
//!
//! Errors are rendered as `application/problem+json` documents.

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use registry_core::RegistryError;
use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

/// A single failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub rule: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub title: String,
    pub detail: String,
    pub validation_errors: Vec<FieldViolation>,
}

impl ApiError {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: detail.into(),
            validation_errors: Vec::new(),
        }
    }

    // Common error constructors
    pub fn bad_request(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, title, detail)
    }

    pub fn not_found(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, title, detail)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "token authentication failed",
            "a valid Bearer token is required",
        )
    }

    pub fn internal(title: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, title, "internal server error")
    }

    /// Convert a core error, labelling it with the failed operation.
    pub fn from_registry(title: impl Into<String>, err: RegistryError) -> Self {
        let title = title.into();
        match err {
            RegistryError::NotFound { resource, .. } => {
                Self::not_found(title, format!("{} was not found", resource))
            }
            RegistryError::Validation { message, .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, title, message)
            }
            RegistryError::Conflict { message, .. } => {
                Self::new(StatusCode::CONFLICT, title, message)
            }
            other => {
                tracing::error!(error = %other, code = other.code().as_str(), "Request failed");
                Self::internal(title)
            }
        }
    }

    /// Reject a request body that failed validation.
    pub fn validation(title: impl Into<String>, errors: &ValidationErrors) -> Self {
        let violations = field_violations(errors);
        let details: Vec<String> = violations.iter().map(describe).collect();

        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            title: title.into(),
            detail: format!("invalid format: {}", details.join(", ")),
            validation_errors: violations,
        }
    }

    /// Reject a body that could not be decoded.
    pub fn invalid_json(title: impl Into<String>, rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        Self::bad_request(title, "invalid json")
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let title = match &err {
            RegistryError::NotFound { .. } => "resource not found",
            RegistryError::Validation { .. } => "invalid request",
            RegistryError::Conflict { .. } => "conflict",
            _ => "internal error",
        };
        Self::from_registry(title, err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.title, self.detail)
    }
}

impl std::error::Error for ApiError {}

/// Problem details body.
#[derive(Debug, Serialize)]
pub struct ProblemJson {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detail: String,
    pub status: u16,
    #[serde(rename = "validationErrors", skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<FieldViolation>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemJson {
            title: self.title,
            detail: self.detail,
            status: self.status.as_u16(),
            validation_errors: self.validation_errors,
        };

        let mut response = (self.status, Json(body)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Flatten validator errors, keeping the first failed rule per field.
fn field_violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    collect_violations("", errors, &mut violations);
    violations.sort_by(|a, b| a.field.cmp(&b.field));
    violations
}

fn collect_violations(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        let path = format!("{}{}", prefix, camel_case(field));
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                if let Some(first) = field_errors.first() {
                    out.push(FieldViolation {
                        field: path,
                        rule: first.code.to_string(),
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                collect_violations(&format!("{}.", path), inner, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_violations(&format!("{}[{}].", path, index), inner, out);
                }
            }
        }
    }
}

fn describe(violation: &FieldViolation) -> String {
    match violation.rule.as_str() {
        "required" => format!("{} is required", violation.field),
        "email" => format!("{} is not a valid email", violation.field),
        "url" => format!("{} is not a valid URL", violation.field),
        "length" => format!("{} does not meet its size limits", violation.field),
        _ => format!("{} is invalid", violation.field),
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
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
