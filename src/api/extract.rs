use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use crate::api::errors::ApiError;
use crate::domain::DomainAssertionError;

/// Checks of a request that go beyond its deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), DomainAssertionError>;
}

pub struct ValidJson<T>(pub T);
pub struct ValidQuery<T>(pub T);
pub struct ValidPath<T>(pub T);

/// Bearer token of the current session, if the client sent one.
pub struct BearerToken(pub Option<String>);

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::Validation(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::Validation(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        Self::Validation(value.body_text())
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts.headers.get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer);
        Ok(Self(token))
    }
}

fn parse_bearer(header: &str) -> Option<String> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_owned())
}

pub(super) fn ensure_in_range<T: PartialOrd>(field: &'static str, value: Option<T>, range: std::ops::RangeInclusive<T>, message: &'static str) -> Result<(), DomainAssertionError> {
    match value {
        Some(v) if !range.contains(&v) => Err(DomainAssertionError::new(field, message)),
        _ => Ok(())
    }
}

pub(super) fn ensure_positive<T: PartialOrd + Default>(field: &'static str, value: Option<T>) -> Result<(), DomainAssertionError> {
    match value {
        Some(v) if v <= T::default() => Err(DomainAssertionError::new(field, "must be positive")),
        _ => Ok(())
    }
}
