use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{BearerToken, Validate, ValidJson};
use crate::api::AppState;
use crate::auth::TelegramLoginData;
use crate::domain::DomainAssertionError;
use crate::metrics;
use crate::repo::User;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Validate for TelegramLoginData {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        if self.id <= 0 {
            Err(DomainAssertionError::new("id", "must be a positive integer"))
        } else if self.first_name.trim().is_empty() {
            Err(DomainAssertionError::new("first_name", "must not be empty"))
        } else if self.hash.trim().is_empty() {
            Err(DomainAssertionError::new("hash", "must not be empty"))
        } else {
            Ok(())
        }
    }
}

pub async fn telegram_login_handler(State(state): State<AppState>, ValidJson(data): ValidJson<TelegramLoginData>) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    if let Err(e) = state.telegram_auth.verify(&data, Utc::now()) {
        log::warn!("rejected login attempt of the Telegram user {}: {e}", data.id);
        return Err(ApiError::Unauthorized)
    }
    let user = state.repos.users.create_or_update(data.into()).await?;
    let session = state.repos.sessions.create(user.id, state.config.session_ttl_days).await?;
    log::info!("a new session was opened for the user {}", user.id);
    metrics::LOGINS_COUNTER.inc();
    Ok((StatusCode::CREATED, Json(SessionResponse {
        token: Some(session.token),
        expires_at: session.expires_at,
        user,
    })))
}

pub async fn current_session_handler(State(state): State<AppState>, BearerToken(token): BearerToken) -> ApiResult<Json<SessionResponse>> {
    let token = token.ok_or(ApiError::Unauthorized)?;
    let session = state.repos.sessions.find_valid(&token).await?
        .ok_or(ApiError::Unauthorized)?;
    let user = state.repos.users.get(session.user_id).await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(SessionResponse {
        token: None,
        expires_at: session.expires_at,
        user,
    }))
}

pub async fn logout_handler(State(state): State<AppState>, BearerToken(token): BearerToken) -> ApiResult<StatusCode> {
    let token = token.ok_or(ApiError::Unauthorized)?;
    if !state.repos.sessions.delete(&token).await? {
        log::debug!("logout with an unknown session token");
    }
    Ok(StatusCode::NO_CONTENT)
}
