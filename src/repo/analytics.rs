use chrono::{DateTime, Utc};
use num_traits::ToPrimitive;
use serde::Serialize;
use sqlx::FromRow;
use crate::domain::{AoId, ListingId, compose_address, source_name};
use crate::repository;

pub const REPRESENTATIVE_LISTINGS_LIMIT: i64 = 5;

/// Actual listings of a district joined with their flats; `ppsqm` is the exact price per square meter.
const BASE_LISTINGS: &str = r#"
    SELECT fh.id, fh.url, fh.price, fh.rooms, fh.floor, f.area, f.kitchen_area,
           h.street, h.house_number, fh.time_source_updated, fh.source_id, s.name AS source_name,
           fh.price::numeric / f.area::numeric AS ppsqm
    FROM flats_history fh
    JOIN flats f ON f.house_id = fh.house_id AND f.floor = fh.floor AND f.rooms = fh.rooms
    JOIN houses h ON h.id = fh.house_id
    LEFT JOIN sources s ON s.id = fh.source_id
    WHERE h.ao_id = $1
      AND fh.is_actual
      AND fh.price > 0
      AND f.area > 0
"#;

const LISTING_COLUMNS: &str = "b.id, b.url, b.price, b.rooms, b.floor, b.area, b.kitchen_area, \
    b.street, b.house_number, b.time_source_updated, b.source_id, b.source_name, \
    round(b.ppsqm)::bigint AS price_per_sqm";

#[derive(FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct District {
    pub id: AoId,
    pub name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistrictStats {
    pub district: District,
    pub summary: PriceSummary,
    pub room_stats: Vec<RoomStats>,
    pub cheapest_listings: Vec<Listing>,
    pub average_listings: Vec<Listing>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    pub total_listings: u64,
    pub avg_price_per_sqm: Option<i64>,
    pub min_price_per_sqm: Option<i64>,
    pub max_price_per_sqm: Option<i64>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub rooms: i32,
    pub count: u64,
    pub avg_price_per_sqm: Option<i64>,
    pub min_price_per_sqm: Option<i64>,
    pub max_price_per_sqm: Option<i64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub url: Option<String>,
    pub price: i64,
    pub rooms: i32,
    pub floor: i32,
    pub price_per_sqm: i64,
    pub area: f64,
    pub kitchen_area: Option<f64>,
    pub address: String,
    pub time_source_updated: Option<DateTime<Utc>>,
    pub source_id: Option<i32>,
    pub source_name: String,
}

#[derive(FromRow)]
struct SummaryEntity {
    total_listings: i64,
    avg_price_per_sqm: Option<i64>,
    min_price_per_sqm: Option<i64>,
    max_price_per_sqm: Option<i64>,
}

#[derive(FromRow)]
struct RoomStatsEntity {
    rooms: i32,
    count: i64,
    avg_price_per_sqm: Option<i64>,
    min_price_per_sqm: Option<i64>,
    max_price_per_sqm: Option<i64>,
}

#[derive(FromRow)]
struct ListingEntity {
    id: ListingId,
    url: Option<String>,
    price: i64,
    rooms: i32,
    floor: i32,
    area: f64,
    kitchen_area: Option<f64>,
    street: Option<String>,
    house_number: Option<String>,
    time_source_updated: Option<DateTime<Utc>>,
    source_id: Option<i32>,
    source_name: Option<String>,
    price_per_sqm: i64,
}

impl From<SummaryEntity> for PriceSummary {
    fn from(value: SummaryEntity) -> Self {
        Self {
            total_listings: value.total_listings.to_u64().unwrap_or_default(),
            avg_price_per_sqm: value.avg_price_per_sqm,
            min_price_per_sqm: value.min_price_per_sqm,
            max_price_per_sqm: value.max_price_per_sqm,
        }
    }
}

impl From<RoomStatsEntity> for RoomStats {
    fn from(value: RoomStatsEntity) -> Self {
        Self {
            rooms: value.rooms,
            count: value.count.to_u64().unwrap_or_default(),
            avg_price_per_sqm: value.avg_price_per_sqm,
            min_price_per_sqm: value.min_price_per_sqm,
            max_price_per_sqm: value.max_price_per_sqm,
        }
    }
}

impl From<ListingEntity> for Listing {
    fn from(value: ListingEntity) -> Self {
        Self {
            address: compose_address(value.street.as_deref(), value.house_number.as_deref()),
            source_name: source_name(value.source_name),
            id: value.id,
            url: value.url,
            price: value.price,
            rooms: value.rooms,
            floor: value.floor,
            price_per_sqm: value.price_per_sqm,
            area: value.area,
            kitchen_area: value.kitchen_area,
            time_source_updated: value.time_source_updated,
            source_id: value.source_id,
        }
    }
}

repository!(Analytics,
    pub async fn districts(&self) -> anyhow::Result<Vec<District>> {
        sqlx::query_as::<_, District>("SELECT id, name FROM districts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }
,
    /// `None` when there is no such district.
    pub async fn district_stats(&self, ao_id: AoId) -> anyhow::Result<Option<DistrictStats>> {
        let district = sqlx::query_as::<_, District>("SELECT id, name FROM districts WHERE id = $1")
            .bind(ao_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(district) = district else {
            return Ok(None)
        };

        let summary = self.summary(ao_id).await?;
        let room_stats = self.room_stats(ao_id).await?;
        let cheapest_listings = self.cheapest_listings(ao_id).await?;
        let average_listings = self.average_listings(ao_id).await?;
        Ok(Some(DistrictStats { district, summary, room_stats, cheapest_listings, average_listings }))
    }
,
    async fn summary(&self, ao_id: AoId) -> anyhow::Result<PriceSummary> {
        let sql = format!(
            "WITH base AS ({BASE_LISTINGS})
            SELECT count(*) AS total_listings,
                   round(avg(ppsqm))::bigint AS avg_price_per_sqm,
                   round(min(ppsqm))::bigint AS min_price_per_sqm,
                   round(max(ppsqm))::bigint AS max_price_per_sqm
            FROM base");
        sqlx::query_as::<_, SummaryEntity>(&sql)
            .bind(ao_id)
            .fetch_one(&self.pool)
            .await
            .map(PriceSummary::from)
            .map_err(Into::into)
    }
,
    async fn room_stats(&self, ao_id: AoId) -> anyhow::Result<Vec<RoomStats>> {
        let sql = format!(
            "WITH base AS ({BASE_LISTINGS})
            SELECT rooms,
                   count(*) AS count,
                   round(avg(ppsqm))::bigint AS avg_price_per_sqm,
                   round(min(ppsqm))::bigint AS min_price_per_sqm,
                   round(max(ppsqm))::bigint AS max_price_per_sqm
            FROM base
            GROUP BY rooms
            ORDER BY rooms");
        let stats = sqlx::query_as::<_, RoomStatsEntity>(&sql)
            .bind(ao_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(RoomStats::from)
            .collect();
        Ok(stats)
    }
,
    async fn cheapest_listings(&self, ao_id: AoId) -> anyhow::Result<Vec<Listing>> {
        let sql = format!(
            "WITH base AS ({BASE_LISTINGS})
            SELECT {LISTING_COLUMNS}
            FROM base b
            ORDER BY b.ppsqm, b.price, b.id
            LIMIT $2");
        self.fetch_listings(&sql, ao_id).await
    }
,
    async fn average_listings(&self, ao_id: AoId) -> anyhow::Result<Vec<Listing>> {
        let sql = format!(
            "WITH base AS ({BASE_LISTINGS}),
                 overall AS (SELECT avg(ppsqm) AS avg_ppsqm FROM base)
            SELECT {LISTING_COLUMNS}
            FROM base b CROSS JOIN overall o
            ORDER BY abs(b.ppsqm - o.avg_ppsqm), b.ppsqm, b.id
            LIMIT $2");
        self.fetch_listings(&sql, ao_id).await
    }
,
    async fn fetch_listings(&self, sql: &str, ao_id: AoId) -> anyhow::Result<Vec<Listing>> {
        let listings = sqlx::query_as::<_, ListingEntity>(sql)
            .bind(ao_id)
            .bind(REPRESENTATIVE_LISTINGS_LIMIT)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Listing::from)
            .collect();
        Ok(listings)
    }
);
