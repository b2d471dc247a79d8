use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use crate::domain::DomainAssertionError;

pub const INTERNAL_ERROR_MESSAGE: &str = "Внутренняя ошибка сервера";
pub const UNAUTHORIZED_MESSAGE: &str = "Требуется авторизация";
const VALIDATION_ERROR_MESSAGE: &str = "Некорректные данные запроса";
const MISSING_REFERENCE_MESSAGE: &str = "Связанная запись не найдена";

const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, derive_more::Display)]
pub enum ApiError {
    #[display("validation failed: {_0}")]
    Validation(String),
    #[display("unauthorized")]
    Unauthorized,
    #[display("not found: {_0}")]
    NotFound(&'static str),
    #[display("internal error ({message}): {source:#}")]
    Internal {
        message: &'static str,
        source: anyhow::Error,
    },
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    pub fn internal(message: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::from_anyhow(source, message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Foreign key violations mean the request referenced a missing row.
    fn from_anyhow(source: anyhow::Error, message: &'static str) -> Self {
        let missing_reference = source.downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .and_then(|e| e.code())
            .is_some_and(|code| code == PG_FOREIGN_KEY_VIOLATION);
        if missing_reference {
            log::debug!("foreign key violation: {source}");
            Self::Validation(MISSING_REFERENCE_MESSAGE.to_owned())
        } else {
            Self::Internal { message, source }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::from_anyhow(value, INTERNAL_ERROR_MESSAGE)
    }
}

impl From<DomainAssertionError> for ApiError {
    fn from(value: DomainAssertionError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(details) => {
                log::debug!("bad request: {details}");
                ErrorBody { error: VALIDATION_ERROR_MESSAGE, details: Some(details.as_str()) }
            }
            ApiError::Unauthorized => ErrorBody { error: UNAUTHORIZED_MESSAGE, details: None },
            ApiError::NotFound(message) => ErrorBody { error: message, details: None },
            ApiError::Internal { message, source } => {
                log::error!("{message}: {source:?}");
                ErrorBody { error: message, details: None }
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod test {
    use anyhow::anyhow;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use crate::domain::DomainAssertionError;
    use super::ApiError;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::Validation("x".to_owned()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("Район не найден").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(anyhow!("boom")).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn domain_errors_are_validation_errors() {
        let err: ApiError = DomainAssertionError::new("aoId", "must be a positive integer").into();
        assert!(matches!(err, ApiError::Validation(ref msg) if msg == "aoId: must be a positive integer"));
    }

    #[test]
    fn internal_message_is_kept() {
        let err = ApiError::internal("custom")(anyhow!("details"));
        assert!(matches!(err, ApiError::Internal { message: "custom", .. }));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
