use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::domain::{AdId, AdStatus, ListingSnapshot};
use crate::repository;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdHistoryEntry {
    pub id: i64,
    pub ad_id: AdId,
    pub price: Option<i64>,
    pub views_today: Option<i32>,
    pub total_views: Option<i32>,
    pub status: AdStatus,
    pub recorded_at: DateTime<Utc>,
}

pub(super) const INSERT_ENTRY_SQL: &str =
    "INSERT INTO ad_history (ad_id, price, views_today, total_views, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, ad_id, price, views_today, total_views, status, recorded_at";

#[derive(sqlx::FromRow)]
pub(super) struct AdHistoryEntity {
    id: i64,
    ad_id: AdId,
    price: Option<i64>,
    views_today: Option<i32>,
    total_views: Option<i32>,
    status: String,
    recorded_at: DateTime<Utc>,
}

impl From<AdHistoryEntity> for AdHistoryEntry {
    fn from(value: AdHistoryEntity) -> Self {
        Self {
            id: value.id,
            ad_id: value.ad_id,
            price: value.price,
            views_today: value.views_today,
            total_views: value.total_views,
            status: AdStatus::from_db(&value.status),
            recorded_at: value.recorded_at,
        }
    }
}

repository!(AdHistory,
    pub async fn list(&self, ad_id: AdId) -> anyhow::Result<Vec<AdHistoryEntry>> {
        let entries = sqlx::query_as::<_, AdHistoryEntity>(
            "SELECT id, ad_id, price, views_today, total_views, status, recorded_at FROM ad_history
                WHERE ad_id = $1
                ORDER BY recorded_at DESC, id DESC")
            .bind(ad_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AdHistoryEntry::from)
            .collect();
        Ok(entries)
    }
,
    pub async fn record(&self, ad_id: AdId, snapshot: &ListingSnapshot) -> anyhow::Result<AdHistoryEntry> {
        sqlx::query_as::<_, AdHistoryEntity>(INSERT_ENTRY_SQL)
            .bind(ad_id)
            .bind(snapshot.price)
            .bind(snapshot.views_today)
            .bind(snapshot.total_views)
            .bind(snapshot.status.to_string())
            .fetch_one(&self.pool)
            .await
            .map(AdHistoryEntry::from)
            .map_err(Into::into)
    }
);
