/// Error handling for the API server
///
/// All handlers return [`ApiResult`]; every library error converts into an
/// [`ApiError`] with `?`, which renders as a JSON [`ErrorResponse`].
/// Internal errors are logged here and answered with a generic message.
///
/// # Example
///
/// ```
/// use taskboard_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(id: Option<u32>) -> ApiResult<Json<serde_json::Value>> {
///     let id = id.ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
///     Ok(Json(json!({ "id": id })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskboard_shared::auth::{
    jwt::JwtError, middleware::AuthError, password::PasswordError, session::LoginError,
};
use taskboard_shared::error::StoreError;
use validator::{Validate, ValidationErrors};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404); also used for records the caller may not see
    NotFound(String),

    /// Conflict (409): duplicate email or code, stale task version
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Runs `validator` rules on a request body
pub fn validate_request<T: Validate>(req: &T) -> ApiResult<()> {
    req.validate().map_err(ApiError::from)
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => ApiError::BadRequest(msg),
            StoreError::Forbidden => ApiError::Forbidden(err.to_string()),
            StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
            StoreError::Password(e) => {
                ApiError::InternalError(format!("Password operation failed: {}", e))
            }
            StoreError::Token(e) => ApiError::InternalError(format!("Token signing failed: {}", e)),
        }
    }
}

/// Credential failures share one message so responses do not reveal
/// which accounts exist
impl From<LoginError> for ApiError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            LoginError::OrganizationInactive => ApiError::Forbidden(err.to_string()),
            LoginError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
            LoginError::Token(e) => ApiError::InternalError(format!("Token signing failed: {}", e)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials
            | AuthError::InvalidFormat
            | AuthError::InvalidToken(_)
            | AuthError::AccountInactive => ApiError::Unauthorized(err.to_string()),
            AuthError::OrganizationInactive => ApiError::Forbidden(err.to_string()),
            AuthError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            other => AuthError::from(other).into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ApiError::from(StoreError::Forbidden),
            ApiError::Forbidden(msg) if msg == "Insufficient permissions"
        ));
        assert!(matches!(
            ApiError::from(StoreError::NotFound("Task")),
            ApiError::NotFound(msg) if msg == "Task not found"
        ));
        assert!(matches!(
            ApiError::from(StoreError::Conflict("Email already registered".to_string())),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::validation("Title is required")),
            ApiError::BadRequest(_)
        ));
    }

    #[test]
    fn test_login_errors_are_generic() {
        let err = ApiError::from(LoginError::InvalidCredentials);
        assert_eq!(err.to_string(), "Unauthorized: Invalid email or password");
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        assert!(matches!(
            ApiError::from(JwtError::Expired),
            ApiError::Unauthorized(msg) if msg == "Token expired"
        ));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::BadRequest(String::new()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized(String::new()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden(String::new()), StatusCode::FORBIDDEN),
            (ApiError::NotFound(String::new()), StatusCode::NOT_FOUND),
            (ApiError::Conflict(String::new()), StatusCode::CONFLICT),
            (ApiError::InternalError("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password is required".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }
}
