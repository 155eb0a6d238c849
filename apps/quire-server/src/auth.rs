//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the verified account
//! id in a header and this service trusts it.

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;
use quire_storage::AccountId;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ServiceError;

pub const ACCOUNT_HEADER: &str = "x-account-id";

/// The authenticated account making the request.
#[derive(Clone, Debug)]
pub struct Caller(pub AccountId);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACCOUNT_HEADER)
            .ok_or_else(|| ServiceError::Unauthenticated(format!("missing {ACCOUNT_HEADER} header")))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::try_parse(s.trim()).ok())
            .ok_or_else(|| ServiceError::Unauthenticated("malformed account id".into()))?;
        Ok(Caller(AccountId(id)))
    }
}

/// JSON request body whose rejections render as `InvalidArgument`.
pub struct Rpc<T>(pub T);

impl<T, S> FromRequest<S> for Rpc<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Rpc(value))
    }
}
