use axum::{
    extract::{FromRequest, Request},
    Json,
};
use garde::Validate;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Rejects strings made only of whitespace.
pub fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("must not be blank"));
    }
    Ok(())
}

/// A JSON body that has been deserialized and validated.
///
/// Both malformed JSON and failed validation become `AppError::Validation`,
/// so the client always gets the same `{"error": ...}` shape.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    T::Context: Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|report| AppError::Validation(report.to_string().trim().to_string()))?;

        Ok(Self(value))
    }
}
