use serde::Serialize;
use sqlx::FromRow;
use crate::domain::{AoId, BoundingBox, HouseId, Point, Radius, UserId, compose_address};
use crate::repository;

pub const MAP_HOUSES_LIMIT: i64 = 500;
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

const ACTUAL_LISTINGS_COUNT: &str =
    "(SELECT count(*) FROM flats_history fh WHERE fh.house_id = h.id AND fh.is_actual) AS actual_listings";

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapHouse {
    pub id: HouseId,
    pub ao_id: Option<AoId>,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub actual_listings: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

#[derive(FromRow, Serialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MapBounds {
    pub min_lat: Option<f64>,
    pub min_lng: Option<f64>,
    pub max_lat: Option<f64>,
    pub max_lng: Option<f64>,
}

#[derive(FromRow)]
struct MapHouseEntity {
    id: HouseId,
    ao_id: Option<AoId>,
    street: Option<String>,
    house_number: Option<String>,
    lat: f64,
    lng: f64,
    actual_listings: i64,
}

#[derive(FromRow)]
struct NearbyHouseEntity {
    #[sqlx(flatten)]
    house: MapHouseEntity,
    distance: f64,
}

impl From<MapHouseEntity> for MapHouse {
    fn from(value: MapHouseEntity) -> Self {
        Self {
            address: compose_address(value.street.as_deref(), value.house_number.as_deref()),
            id: value.id,
            ao_id: value.ao_id,
            lat: value.lat,
            lng: value.lng,
            actual_listings: value.actual_listings,
            distance: None,
        }
    }
}

impl From<NearbyHouseEntity> for MapHouse {
    fn from(value: NearbyHouseEntity) -> Self {
        Self {
            distance: Some(value.distance),
            ..value.house.into()
        }
    }
}

repository!(Map,
    pub async fn houses_in_bounds(&self, bbox: BoundingBox) -> anyhow::Result<Vec<MapHouse>> {
        let sql = format!(
            "SELECT h.id, h.ao_id, h.street, h.house_number, h.lat, h.lng, {ACTUAL_LISTINGS_COUNT}
            FROM houses h
            WHERE h.lat BETWEEN $1 AND $2 AND h.lng BETWEEN $3 AND $4
            ORDER BY h.id
            LIMIT $5");
        let houses = sqlx::query_as::<_, MapHouseEntity>(&sql)
            .bind(bbox.min.lat)
            .bind(bbox.max.lat)
            .bind(bbox.min.lng)
            .bind(bbox.max.lng)
            .bind(MAP_HOUSES_LIMIT)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(MapHouse::from)
            .collect();
        Ok(houses)
    }
,
    /// Great-circle (haversine) distance; the enclosing box only narrows the scan.
    pub async fn houses_near(&self, center: Point, radius: Radius) -> anyhow::Result<Vec<MapHouse>> {
        let (lat_delta, lng_delta) = radius.degree_deltas(center);
        let sql = format!(
            "SELECT * FROM (
                SELECT h.id, h.ao_id, h.street, h.house_number, h.lat, h.lng, {ACTUAL_LISTINGS_COUNT},
                       2 * $7::float8 * asin(least(1.0, sqrt(
                           power(sin(radians(h.lat - $1) / 2), 2) +
                           cos(radians($1)) * cos(radians(h.lat)) * power(sin(radians(h.lng - $2) / 2), 2)
                       ))) AS distance
                FROM houses h
                WHERE h.lat BETWEEN $1 - $4 AND $1 + $4
                  AND (h.lng BETWEEN $2 - $5 AND $2 + $5
                       OR h.lng - 360 BETWEEN $2 - $5 AND $2 + $5
                       OR h.lng + 360 BETWEEN $2 - $5 AND $2 + $5)
            ) AS nearby
            WHERE distance <= $3
            ORDER BY distance, id
            LIMIT $6");
        let houses = sqlx::query_as::<_, NearbyHouseEntity>(&sql)
            .bind(center.lat)
            .bind(center.lng)
            .bind(radius.meters())
            .bind(lat_delta)
            .bind(lng_delta)
            .bind(MAP_HOUSES_LIMIT)
            .bind(EARTH_RADIUS_METERS)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(MapHouse::from)
            .collect();
        Ok(houses)
    }
,
    pub async fn user_flats_bounds(&self, user_id: UserId) -> anyhow::Result<MapBounds> {
        sqlx::query_as::<_, MapBounds>(
            "SELECT min(h.lat) AS min_lat, min(h.lng) AS min_lng, max(h.lat) AS max_lat, max(h.lng) AS max_lng
                FROM user_flats uf
                JOIN houses h ON h.id = uf.house_id
                WHERE uf.user_id = $1 AND h.lat IS NOT NULL AND h.lng IS NOT NULL")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }
);
