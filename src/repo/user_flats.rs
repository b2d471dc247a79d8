use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::domain::{FlatId, HouseId, UserId};
use crate::repo::ads::lock_ads;
use crate::repository;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserFlat {
    pub id: FlatId,
    pub user_id: UserId,
    pub address: String,
    pub house_id: Option<HouseId>,
    pub floor: i32,
    pub rooms: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUserFlat {
    pub user_id: UserId,
    pub address: String,
    pub house_id: Option<HouseId>,
    pub floor: i32,
    pub rooms: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UserFlatPatch {
    pub address: Option<String>,
    pub house_id: Option<HouseId>,
    pub floor: Option<i32>,
    pub rooms: Option<i32>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeletedFlat {
    pub ads: u64,
    pub history_entries: u64,
}

const FLAT_COLUMNS: &str = "id, user_id, address, house_id, floor, rooms, created_at, updated_at";

repository!(UserFlats,
    pub async fn list(&self, user_id: UserId) -> anyhow::Result<Vec<UserFlat>> {
        let sql = format!("SELECT {FLAT_COLUMNS} FROM user_flats WHERE user_id = $1 ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, UserFlat>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }
,
    pub async fn get(&self, id: FlatId) -> anyhow::Result<Option<UserFlat>> {
        let sql = format!("SELECT {FLAT_COLUMNS} FROM user_flats WHERE id = $1");
        sqlx::query_as::<_, UserFlat>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }
,
    /// The stored function lives in the public schema, hence the search path.
    pub async fn create(&self, flat: NewUserFlat) -> anyhow::Result<UserFlat> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET LOCAL search_path TO public")
            .execute(&mut *tx)
            .await?;
        let sql = format!("SELECT {FLAT_COLUMNS} FROM create_user_flat($1, $2, $3, $4, $5)");
        let created = sqlx::query_as::<_, UserFlat>(&sql)
            .bind(flat.user_id)
            .bind(flat.address)
            .bind(flat.house_id)
            .bind(flat.floor)
            .bind(flat.rooms)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(created)
    }
,
    pub async fn update(&self, id: FlatId, patch: UserFlatPatch) -> anyhow::Result<Option<UserFlat>> {
        let sql = format!(
            "UPDATE user_flats SET
                address = COALESCE($2, address),
                house_id = COALESCE($3, house_id),
                floor = COALESCE($4, floor),
                rooms = COALESCE($5, rooms),
                updated_at = current_timestamp
            WHERE id = $1
            RETURNING {FLAT_COLUMNS}");
        sqlx::query_as::<_, UserFlat>(&sql)
            .bind(id)
            .bind(patch.address)
            .bind(patch.house_id)
            .bind(patch.floor)
            .bind(patch.rooms)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }
,
    /// Deletes the history of every ad of the flat, the ads and the flat itself.
    pub async fn delete(&self, id: FlatId) -> anyhow::Result<Option<DeletedFlat>> {
        let mut tx = self.pool.begin().await?;
        lock_ads(&mut tx, "flat_id = $1", id.value()).await?;
        let history_entries = sqlx::query("DELETE FROM ad_history WHERE ad_id IN (SELECT id FROM ads WHERE flat_id = $1)")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let ads = sqlx::query("DELETE FROM ads WHERE flat_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let flats = sqlx::query("DELETE FROM user_flats WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if flats == 0 {
            tx.rollback().await?;
            return Ok(None)
        }
        tx.commit().await?;
        log::info!("the flat {id} was deleted along with {ads} ads and {history_entries} history entries");
        Ok(Some(DeletedFlat { ads, history_entries }))
    }
);
