use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::domain::{FlatId, UserId};
use crate::repository;

#[derive(Debug, Clone)]
pub struct TelegramProfile {
    pub tg_user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub language_code: Option<String>,
    pub auth_date: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub tg_user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub language_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Who should be told about changes of ads attached to a flat.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct NotificationTarget {
    pub tg_user_id: i64,
    pub language_code: Option<String>,
}

const USER_COLUMNS: &str = "u.id, t.tg_user_id, t.username, t.first_name, t.last_name, t.photo_url, t.language_code, u.created_at";

repository!(Users,
    pub async fn create_or_update(&self, profile: TelegramProfile) -> anyhow::Result<User> {
        let mut tx = self.pool.begin().await?;
        // serializes concurrent first logins of the same account
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(profile.tg_user_id)
            .execute(&mut *tx)
            .await?;
        let existing: Option<UserId> = sqlx::query_scalar("SELECT user_id FROM telegram_users WHERE tg_user_id = $1")
            .bind(profile.tg_user_id)
            .fetch_optional(&mut *tx)
            .await?;
        let user_id = match existing {
            Some(user_id) => user_id,
            None => {
                log::info!("registering a new user for the Telegram account {}", profile.tg_user_id);
                sqlx::query_scalar("INSERT INTO users DEFAULT VALUES RETURNING id")
                    .fetch_one(&mut *tx)
                    .await?
            }
        };
        sqlx::query(
            "INSERT INTO telegram_users (user_id, tg_user_id, username, first_name, last_name, photo_url, language_code, auth_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (tg_user_id) DO UPDATE SET
                    username = EXCLUDED.username,
                    first_name = EXCLUDED.first_name,
                    last_name = EXCLUDED.last_name,
                    photo_url = EXCLUDED.photo_url,
                    language_code = EXCLUDED.language_code,
                    auth_date = EXCLUDED.auth_date,
                    updated_at = current_timestamp")
            .bind(user_id)
            .bind(profile.tg_user_id)
            .bind(profile.username)
            .bind(profile.first_name)
            .bind(profile.last_name)
            .bind(profile.photo_url)
            .bind(profile.language_code)
            .bind(profile.auth_date)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.get(user_id).await?
            .ok_or_else(|| anyhow::anyhow!("the user {user_id} has disappeared right after the upsert"))
    }
,
    pub async fn get(&self, user_id: UserId) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u JOIN telegram_users t ON t.user_id = u.id WHERE u.id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }
,
    pub async fn find_notification_target(&self, flat_id: FlatId) -> anyhow::Result<Option<NotificationTarget>> {
        sqlx::query_as::<_, NotificationTarget>(
            "SELECT t.tg_user_id, t.language_code FROM user_flats uf
                JOIN telegram_users t ON t.user_id = uf.user_id
                WHERE uf.id = $1
                ORDER BY t.updated_at DESC
                LIMIT 1")
            .bind(flat_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }
);
