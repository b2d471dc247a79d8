use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use crate::api::errors::ApiResult;
use crate::api::extract::{Validate, ValidQuery};
use crate::api::AppState;
use crate::domain::{BoundingBox, DomainAssertionError, Point, Radius, UserId};
use crate::repo::{MapBounds, MapHouse};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BoundsQuery {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

#[derive(Deserialize, Debug)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBoundsQuery {
    pub user_id: UserId,
}

impl BoundsQuery {
    fn bounding_box(&self) -> Result<BoundingBox, DomainAssertionError> {
        let min = Point::new(self.min_lat, self.min_lng)?;
        let max = Point::new(self.max_lat, self.max_lng)?;
        BoundingBox::new(min, max)
    }
}

impl NearbyQuery {
    fn center_and_radius(&self) -> Result<(Point, Radius), DomainAssertionError> {
        let center = Point::new(self.lat, self.lng)?;
        let radius = self.radius
            .map(Radius::new)
            .transpose()?
            .unwrap_or_default();
        Ok((center, radius))
    }
}

impl Validate for BoundsQuery {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        self.bounding_box().map(|_| ())
    }
}

impl Validate for NearbyQuery {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        self.center_and_radius().map(|_| ())
    }
}

impl Validate for UserBoundsQuery {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        Ok(())
    }
}

pub async fn houses_handler(State(state): State<AppState>, ValidQuery(query): ValidQuery<BoundsQuery>) -> ApiResult<Json<Vec<MapHouse>>> {
    let houses = state.repos.map.houses_in_bounds(query.bounding_box()?).await?;
    Ok(Json(houses))
}

pub async fn nearby_handler(State(state): State<AppState>, ValidQuery(query): ValidQuery<NearbyQuery>) -> ApiResult<Json<Vec<MapHouse>>> {
    let (center, radius) = query.center_and_radius()?;
    let houses = state.repos.map.houses_near(center, radius).await?;
    log::debug!("{} houses found within {} meters of {center}", houses.len(), radius.meters());
    Ok(Json(houses))
}

pub async fn bounds_handler(State(state): State<AppState>, ValidQuery(query): ValidQuery<UserBoundsQuery>) -> ApiResult<Json<MapBounds>> {
    let bounds = state.repos.map.user_flats_bounds(query.user_id).await?;
    Ok(Json(bounds))
}
