use anyhow::{anyhow, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Postgres, Transaction};
use crate::domain::{AdId, AdStatus, FlatId, ListingSnapshot};
use crate::repo::ensure_only_one_row_updated;
use crate::repo::ad_history::{AdHistoryEntity, AdHistoryEntry, INSERT_ENTRY_SQL};
use crate::repository;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: AdId,
    pub flat_id: FlatId,
    pub url: String,
    pub price: Option<i64>,
    pub rooms: Option<i32>,
    pub floor: Option<i32>,
    pub area: Option<f64>,
    pub kitchen_area: Option<f64>,
    pub status: AdStatus,
    pub views_today: Option<i32>,
    pub total_views: Option<i32>,
    pub source_id: Option<i32>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AdEntity {
    id: AdId,
    flat_id: FlatId,
    url: String,
    price: Option<i64>,
    rooms: Option<i32>,
    floor: Option<i32>,
    area: Option<f64>,
    kitchen_area: Option<f64>,
    status: String,
    views_today: Option<i32>,
    total_views: Option<i32>,
    source_id: Option<i32>,
    last_checked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AdEntity> for Ad {
    fn from(value: AdEntity) -> Self {
        Self {
            id: value.id,
            flat_id: value.flat_id,
            url: value.url,
            price: value.price,
            rooms: value.rooms,
            floor: value.floor,
            area: value.area,
            kitchen_area: value.kitchen_area,
            status: AdStatus::from_db(&value.status),
            views_today: value.views_today,
            total_views: value.total_views,
            source_id: value.source_id,
            last_checked_at: value.last_checked_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAd {
    pub flat_id: FlatId,
    pub url: String,
    pub price: Option<i64>,
    pub rooms: Option<i32>,
    pub floor: Option<i32>,
    pub area: Option<f64>,
    pub kitchen_area: Option<f64>,
    pub status: AdStatus,
    pub source_id: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct AdPatch {
    pub url: Option<String>,
    pub price: Option<i64>,
    pub rooms: Option<i32>,
    pub floor: Option<i32>,
    pub area: Option<f64>,
    pub kitchen_area: Option<f64>,
    pub status: Option<AdStatus>,
    pub source_id: Option<i32>,
}

const AD_COLUMNS: &str = "id, flat_id, url, price, rooms, floor, area, kitchen_area, status, \
    views_today, total_views, source_id, last_checked_at, created_at, updated_at";

repository!(Ads,
    pub async fn list(&self, flat_id: Option<FlatId>) -> anyhow::Result<Vec<Ad>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE $1::bigint IS NULL OR flat_id = $1 ORDER BY created_at DESC, id DESC");
        let ads = sqlx::query_as::<_, AdEntity>(&sql)
            .bind(flat_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Ad::from)
            .collect();
        Ok(ads)
    }
,
    pub async fn get(&self, id: AdId) -> anyhow::Result<Option<Ad>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE id = $1");
        let ad = sqlx::query_as::<_, AdEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Ad::from);
        Ok(ad)
    }
,
    pub async fn create(&self, ad: NewAd) -> anyhow::Result<Ad> {
        let sql = format!(
            "INSERT INTO ads (flat_id, url, price, rooms, floor, area, kitchen_area, status, source_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {AD_COLUMNS}");
        sqlx::query_as::<_, AdEntity>(&sql)
            .bind(ad.flat_id)
            .bind(ad.url)
            .bind(ad.price)
            .bind(ad.rooms)
            .bind(ad.floor)
            .bind(ad.area)
            .bind(ad.kitchen_area)
            .bind(ad.status.to_string())
            .bind(ad.source_id)
            .fetch_one(&self.pool)
            .await
            .map(Ad::from)
            .map_err(Into::into)
    }
,
    /// Only the given fields are changed.
    pub async fn patch(&self, id: AdId, patch: AdPatch) -> anyhow::Result<Option<Ad>> {
        let sql = format!(
            "UPDATE ads SET
                url = COALESCE($2, url),
                price = COALESCE($3, price),
                rooms = COALESCE($4, rooms),
                floor = COALESCE($5, floor),
                area = COALESCE($6, area),
                kitchen_area = COALESCE($7, kitchen_area),
                status = COALESCE($8, status),
                source_id = COALESCE($9, source_id),
                updated_at = current_timestamp
            WHERE id = $1
            RETURNING {AD_COLUMNS}");
        let ad = sqlx::query_as::<_, AdEntity>(&sql)
            .bind(id)
            .bind(patch.url)
            .bind(patch.price)
            .bind(patch.rooms)
            .bind(patch.floor)
            .bind(patch.area)
            .bind(patch.kitchen_area)
            .bind(patch.status.map(|status| status.to_string()))
            .bind(patch.source_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Ad::from);
        Ok(ad)
    }
,
    /// Overwrites every editable field, absent values included.
    pub async fn replace(&self, id: AdId, ad: NewAd) -> anyhow::Result<Option<Ad>> {
        let sql = format!(
            "UPDATE ads SET
                flat_id = $2, url = $3, price = $4, rooms = $5, floor = $6,
                area = $7, kitchen_area = $8, status = $9, source_id = $10,
                updated_at = current_timestamp
            WHERE id = $1
            RETURNING {AD_COLUMNS}");
        let ad = sqlx::query_as::<_, AdEntity>(&sql)
            .bind(id)
            .bind(ad.flat_id)
            .bind(ad.url)
            .bind(ad.price)
            .bind(ad.rooms)
            .bind(ad.floor)
            .bind(ad.area)
            .bind(ad.kitchen_area)
            .bind(ad.status.to_string())
            .bind(ad.source_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Ad::from);
        Ok(ad)
    }
,
    pub async fn delete(&self, id: AdId) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;
        lock_ads(&mut tx, "id = $1", id.value()).await?;
        sqlx::query("DELETE FROM ad_history WHERE ad_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM ads WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }
,
    /// Ads that are still worth asking their sources about.
    pub async fn list_for_polling(&self) -> anyhow::Result<Vec<Ad>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE status <> 'inactive' AND url <> '' ORDER BY id");
        let ads = sqlx::query_as::<_, AdEntity>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Ad::from)
            .collect();
        Ok(ads)
    }
,
    /// Records the snapshot in the history and applies it to the ad as one change.
    /// Known values replace the current ones; an unknown status keeps the old status.
    pub async fn apply_check(&self, id: AdId, snapshot: &ListingSnapshot) -> anyhow::Result<AdHistoryEntry> {
        let mut tx = self.pool.begin().await?;
        if lock_ads(&mut tx, "id = $1", id.value()).await?.is_empty() {
            bail!("the ad {id} no longer exists")
        }
        let entry = sqlx::query_as::<_, AdHistoryEntity>(INSERT_ENTRY_SQL)
            .bind(id)
            .bind(snapshot.price)
            .bind(snapshot.views_today)
            .bind(snapshot.total_views)
            .bind(snapshot.status.to_string())
            .fetch_one(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE ads SET
                price = COALESCE($2, price),
                views_today = COALESCE($3, views_today),
                total_views = COALESCE($4, total_views),
                status = CASE WHEN $5 = 'unknown' THEN status ELSE $5 END,
                last_checked_at = current_timestamp,
                updated_at = current_timestamp
            WHERE id = $1")
            .bind(id)
            .bind(snapshot.price)
            .bind(snapshot.views_today)
            .bind(snapshot.total_views)
            .bind(snapshot.status.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))
            .and_then(ensure_only_one_row_updated)?;
        tx.commit().await?;
        Ok(entry.into())
    }
);

/// Locks the matching ads so that checks and deletions of them don't interleave.
pub(super) async fn lock_ads(tx: &mut Transaction<'_, Postgres>, condition: &str, value: i64) -> anyhow::Result<Vec<AdId>> {
    let sql = format!("SELECT id FROM ads WHERE {condition} ORDER BY id FOR UPDATE");
    sqlx::query_scalar(&sql)
        .bind(value)
        .fetch_all(&mut **tx)
        .await
        .map_err(Into::into)
}
