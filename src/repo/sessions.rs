use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use crate::domain::UserId;
use crate::repository;

const TOKEN_BYTES: usize = 32;

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

repository!(Sessions,
    pub async fn create(&self, user_id: UserId, ttl_days: u16) -> anyhow::Result<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (user_id, token, expires_at)
                VALUES ($1, $2, current_timestamp + make_interval(days => $3))
                RETURNING token, user_id, created_at, expires_at")
            .bind(user_id)
            .bind(generate_token())
            .bind(i32::from(ttl_days))
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }
,
    pub async fn find_valid(&self, token: &str) -> anyhow::Result<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT token, user_id, created_at, expires_at FROM sessions
                WHERE token = $1 AND expires_at > current_timestamp")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }
,
    pub async fn delete(&self, token: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
,
    pub async fn delete_expired(&self) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= current_timestamp")
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
);

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
