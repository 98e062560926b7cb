//! Request body validation.
//!
//! [`ValidJson`] deserializes a JSON body and runs its `validator` rules,
//! turning every failure into a `field -> [messages]` map.

use authapi_core::error::{FieldErrors, NON_FIELD_ERRORS};
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// Message used when a required field is absent.
pub const REQUIRED: &str = "This field is required.";
/// Message used for a malformed email address.
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// JSON body extractor that also enforces the type's [`Validate`] rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate().map_err(into_field_errors)?;
        Ok(Self(value))
    }
}

/// Flatten `validator` errors into [`FieldErrors`].
///
/// Struct-level failures (`__all__`) are reported under `non_field_errors`.
pub fn into_field_errors(errors: ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, failures) in errors.field_errors() {
        let key = if field == "__all__" {
            NON_FIELD_ERRORS
        } else {
            field.as_ref()
        };
        for failure in failures {
            let message = failure
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| failure.code.to_string());
            fields.add(key, message);
        }
    }
    fields
}

/// The value of a field already checked by a `required` rule.
pub fn present(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}
