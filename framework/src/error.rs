//! Framework-wide error types
//!
//! Provides a unified error type that can be used throughout the framework
//! and automatically converts to appropriate HTTP responses.

use std::collections::HashMap;
use thiserror::Error;
use validator::ValidationErrorsKind;

/// Trait for errors that can be converted to HTTP responses
///
/// Implement this trait on your domain errors to customize the HTTP status code
/// and message that will be returned when the error is converted to a response.
///
/// # Example
///
/// ```rust,ignore
/// use kit::HttpError;
///
/// #[derive(Debug)]
/// struct OutOfStock { product_id: i32 }
///
/// impl std::fmt::Display for OutOfStock {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "Product {} is out of stock", self.product_id)
///     }
/// }
///
/// impl std::error::Error for OutOfStock {}
///
/// impl HttpError for OutOfStock {
///     fn status_code(&self) -> u16 { 422 }
/// }
/// ```
pub trait HttpError: std::error::Error + Send + Sync + 'static {
    /// HTTP status code (default: 500)
    fn status_code(&self) -> u16 {
        500
    }

    /// Error message for HTTP response (default: error's Display)
    fn error_message(&self) -> String {
        self.to_string()
    }
}

/// Simple wrapper for creating one-off domain errors
///
/// # Example
///
/// ```rust,ignore
/// use kit::{AppError, FrameworkError};
///
/// pub async fn process() -> Result<(), FrameworkError> {
///     if invalid {
///         return Err(AppError::bad_request("Invalid input").into());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AppError {
    message: String,
    status_code: u16,
}

impl AppError {
    /// Create a new AppError with status 500 (Internal Server Error)
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: 500,
        }
    }

    /// Set the HTTP status code
    pub fn status(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message).status(404)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message).status(400)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message).status(401)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(message).status(403)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(message).status(422)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(message).status(409)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl HttpError for AppError {
    fn status_code(&self) -> u16 {
        self.status_code
    }

    fn error_message(&self) -> String {
        self.message.clone()
    }
}

impl From<AppError> for FrameworkError {
    fn from(e: AppError) -> Self {
        FrameworkError::Domain {
            message: e.message,
            status_code: e.status_code,
        }
    }
}

/// Validation errors keyed by field
///
/// # Response Format
///
/// ```json
/// {
///     "message": "The given data was invalid.",
///     "errors": {
///         "email": ["email must be a valid email address"],
///         "price": ["price must not be negative"]
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    /// Map of field names to their validation error messages
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error for a specific field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert from validator crate's ValidationErrors
    ///
    /// Nested structs and lists are flattened into paths such as
    /// `items[1].quantity`.
    pub fn from_validator(errors: validator::ValidationErrors) -> Self {
        let mut result = Self::new();
        result.collect(None, &errors);
        result
    }

    fn collect(&mut self, prefix: Option<&str>, errors: &validator::ValidationErrors) {
        for (field, kind) in errors.errors() {
            let path = match prefix {
                Some(prefix) => format!("{}.{}", prefix, field),
                None => field.to_string(),
            };
            match kind {
                ValidationErrorsKind::Field(field_errors) => {
                    for error in field_errors {
                        let message = error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Validation failed for field '{}'", path));
                        self.add(path.clone(), message);
                    }
                }
                ValidationErrorsKind::Struct(nested) => self.collect(Some(&path), nested),
                ValidationErrorsKind::List(entries) => {
                    for (index, nested) in entries {
                        self.collect(Some(&format!("{}[{}]", path, index)), nested);
                    }
                }
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "message": "The given data was invalid.",
            "errors": self.errors
        })
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: {:?}", self.errors)
    }
}

impl std::error::Error for ValidationErrors {}

/// Framework-wide error type
///
/// Every variant maps to an HTTP status through [`FrameworkError::status_code`] and
/// converts into an `HttpResponse`, so handlers can propagate it with `?`.
///
/// ```rust,ignore
/// pub async fn show(req: Request) -> Response {
///     let id: i32 = req.param_as("id")?;
///     let category = category::Entity::find_by_id(id)
///         .one(req.db()?.conn())
///         .await?                                   // DbErr converts automatically
///         .ok_or_else(|| FrameworkError::model_not_found("Category"))?;
///     Ok(HttpResponse::json(serde_json::json!(category)))
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// Route parameter missing
    #[error("Missing required parameter: {param_name}")]
    ParamError { param_name: String },

    /// Path parameter could not be parsed to the expected type
    #[error("Invalid parameter '{param}': expected {expected_type}")]
    ParamParse {
        param: String,
        expected_type: &'static str,
    },

    /// Request body is not valid JSON
    #[error("Malformed JSON body: {message}")]
    MalformedBody { message: String },

    /// Query string does not match the expected shape
    #[error("Invalid query string: {message}")]
    InvalidQuery { message: String },

    /// Request body exceeded the configured limit
    #[error("Payload too large: body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Single field validation error
    #[error("Validation error for '{field}': {message}")]
    ValidationError { field: String, message: String },

    /// Field validation errors (422 Unprocessable Entity)
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// Missing or wrong credentials (401)
    #[error("{message}")]
    Unauthorized { message: String },

    /// Access to the resource is not allowed (403)
    #[error("Forbidden")]
    Forbidden,

    /// Request origin is outside the CORS allow-list (403)
    #[error("Not allowed by CORS")]
    CorsRejected { origin: String },

    /// No route, static file or other stage claimed the request
    #[error("Resource not found!")]
    NotFound,

    /// Model lookup by key failed (404)
    #[error("{model_name} not found")]
    ModelNotFound { model_name: String },

    /// Domain/application error with custom status code
    #[error("{message}")]
    Domain { message: String, status_code: u16 },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl FrameworkError {
    pub fn param(name: impl Into<String>) -> Self {
        Self::ParamError {
            param_name: name.into(),
        }
    }

    pub fn param_parse(param: impl Into<String>, expected_type: &'static str) -> Self {
        Self::ParamParse {
            param: param.into(),
            expected_type,
        }
    }

    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self::MalformedBody {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn validation_errors(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn cors_rejected(origin: impl Into<String>) -> Self {
        Self::CorsRejected {
            origin: origin.into(),
        }
    }

    pub fn model_not_found(name: impl Into<String>) -> Self {
        Self::ModelNotFound {
            model_name: name.into(),
        }
    }

    pub fn domain(message: impl Into<String>, status_code: u16) -> Self {
        Self::Domain {
            message: message.into(),
            status_code,
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ParamError { .. } => 400,
            Self::ParamParse { .. } => 400,
            Self::MalformedBody { .. } => 400,
            Self::InvalidQuery { .. } => 400,
            Self::PayloadTooLarge { .. } => 413,
            Self::ValidationError { .. } => 422,
            Self::Validation(_) => 422,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden => 403,
            Self::CorsRejected { .. } => 403,
            Self::NotFound => 404,
            Self::ModelNotFound { .. } => 404,
            Self::Domain { status_code, .. } => *status_code,
            Self::Database(_) => 500,
            Self::Internal { .. } => 500,
        }
    }

    /// Whether the detail of this error must stay out of the response body
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<sea_orm::DbErr> for FrameworkError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for FrameworkError {
    fn from(e: bcrypt::BcryptError) -> Self {
        Self::internal(format!("Password hashing failed: {}", e))
    }
}

impl From<validator::ValidationErrors> for FrameworkError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(ValidationErrors::from_validator(e))
    }
}

/// Configuration loading errors
///
/// Raised while building [`crate::config::Settings`]; any of these aborts startup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Required environment variable {key} is not set")]
    Missing { key: String },

    #[error("Environment variable {key} is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
