//! Request extractors shared by the route handlers.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use axum_valid::{Valid, ValidRejection};

use crate::error::AppError;

/// Validated JSON body whose rejections use the common `{code, message}` error body.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    Valid<Json<T>>: FromRequest<S, Rejection = ValidRejection<JsonRejection>>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Valid(Json(payload)) = Valid::<Json<T>>::from_request(req, state).await?;
        Ok(Self(payload))
    }
}
