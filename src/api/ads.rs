use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use reqwest::Url;
use serde::Deserialize;
use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{ensure_in_range, ensure_positive, Validate, ValidJson, ValidPath, ValidQuery};
use crate::api::user_flats::{FLAT_NOT_FOUND, FLOOR_RANGE, ROOMS_RANGE};
use crate::api::AppState;
use crate::domain::{AdId, AdStatus, DomainAssertionError, FlatId, ListingSnapshot};
use crate::metrics;
use crate::repo::{Ad, AdHistoryEntry, AdPatch, NewAd};

pub const AD_NOT_FOUND: &str = "Объявление не найдено";

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdsQuery {
    pub flat_id: Option<FlatId>,
}

/// Body of both POST and PUT requests.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdRequest {
    pub flat_id: FlatId,
    pub url: String,
    pub price: Option<i64>,
    pub rooms: Option<i32>,
    pub floor: Option<i32>,
    pub area: Option<f64>,
    pub kitchen_area: Option<f64>,
    pub status: Option<AdStatus>,
    pub source_id: Option<i32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdPatchRequest {
    pub url: Option<String>,
    pub price: Option<i64>,
    pub rooms: Option<i32>,
    pub floor: Option<i32>,
    pub area: Option<f64>,
    pub kitchen_area: Option<f64>,
    pub status: Option<AdStatus>,
    pub source_id: Option<i32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryRequest {
    pub price: Option<i64>,
    pub views_today: Option<i32>,
    pub total_views: Option<i32>,
    #[serde(default)]
    pub status: AdStatus,
}

impl Validate for AdsQuery {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        Ok(())
    }
}

impl Validate for AdRequest {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        validate_url(Some(&self.url))?;
        validate_values(self.price, self.rooms, self.floor, self.area, self.kitchen_area)
    }
}

impl Validate for AdPatchRequest {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        validate_url(self.url.as_deref())?;
        validate_values(self.price, self.rooms, self.floor, self.area, self.kitchen_area)
    }
}

impl Validate for HistoryEntryRequest {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        ensure_positive("price", self.price)?;
        ensure_in_range("viewsToday", self.views_today, 0..=i32::MAX, "must not be negative")?;
        ensure_in_range("totalViews", self.total_views, 0..=i32::MAX, "must not be negative")
    }
}

fn validate_url(url: Option<&str>) -> Result<(), DomainAssertionError> {
    let Some(url) = url else {
        return Ok(())
    };
    match Url::parse(url.trim()) {
        Ok(url) if ["http", "https"].contains(&url.scheme()) => Ok(()),
        _ => Err(DomainAssertionError::new("url", "must be a valid http(s) URL")),
    }
}

fn validate_values(price: Option<i64>, rooms: Option<i32>, floor: Option<i32>, area: Option<f64>, kitchen_area: Option<f64>) -> Result<(), DomainAssertionError> {
    ensure_positive("price", price)?;
    ensure_positive("area", area)?;
    ensure_positive("kitchenArea", kitchen_area)?;
    ensure_in_range("rooms", rooms, ROOMS_RANGE, "must be between 0 and 20")?;
    ensure_in_range("floor", floor, FLOOR_RANGE, "must be between -5 and 200")?;
    match (area, kitchen_area) {
        (Some(area), Some(kitchen)) if kitchen > area => Err(DomainAssertionError::new("kitchenArea", "must not exceed the total area")),
        _ => Ok(())
    }
}

impl From<AdRequest> for NewAd {
    fn from(value: AdRequest) -> Self {
        Self {
            flat_id: value.flat_id,
            url: value.url.trim().to_owned(),
            price: value.price,
            rooms: value.rooms,
            floor: value.floor,
            area: value.area,
            kitchen_area: value.kitchen_area,
            status: value.status.unwrap_or_default(),
            source_id: value.source_id,
        }
    }
}

impl From<AdPatchRequest> for AdPatch {
    fn from(value: AdPatchRequest) -> Self {
        Self {
            url: value.url.map(|url| url.trim().to_owned()),
            price: value.price,
            rooms: value.rooms,
            floor: value.floor,
            area: value.area,
            kitchen_area: value.kitchen_area,
            status: value.status,
            source_id: value.source_id,
        }
    }
}

pub async fn list_handler(State(state): State<AppState>, ValidQuery(query): ValidQuery<AdsQuery>) -> ApiResult<Json<Vec<Ad>>> {
    let ads = state.repos.ads.list(query.flat_id).await?;
    Ok(Json(ads))
}

pub async fn get_handler(State(state): State<AppState>, ValidPath(id): ValidPath<AdId>) -> ApiResult<Json<Ad>> {
    state.repos.ads.get(id).await?
        .map(Json)
        .ok_or(ApiError::NotFound(AD_NOT_FOUND))
}

pub async fn history_handler(State(state): State<AppState>, ValidPath(id): ValidPath<AdId>) -> ApiResult<Json<Vec<AdHistoryEntry>>> {
    ensure_ad_exists(&state, id).await?;
    let history = state.repos.ad_history.list(id).await?;
    Ok(Json(history))
}

pub async fn record_history_handler(State(state): State<AppState>, ValidPath(id): ValidPath<AdId>, ValidJson(req): ValidJson<HistoryEntryRequest>) -> ApiResult<(StatusCode, Json<AdHistoryEntry>)> {
    ensure_ad_exists(&state, id).await?;
    let snapshot = ListingSnapshot {
        price: req.price,
        views_today: req.views_today,
        total_views: req.total_views,
        status: req.status,
    };
    let entry = state.repos.ad_history.record(id, &snapshot).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn create_handler(State(state): State<AppState>, ValidJson(req): ValidJson<AdRequest>) -> ApiResult<(StatusCode, Json<Ad>)> {
    ensure_flat_exists(&state, req.flat_id).await?;
    let ad = state.repos.ads.create(req.into()).await?;
    log::info!("the ad {} was attached to the flat {}", ad.id, ad.flat_id);
    metrics::ADS_COUNTER.created.inc();
    Ok((StatusCode::CREATED, Json(ad)))
}

pub async fn patch_handler(State(state): State<AppState>, ValidPath(id): ValidPath<AdId>, ValidJson(req): ValidJson<AdPatchRequest>) -> ApiResult<Json<Ad>> {
    state.repos.ads.patch(id, req.into()).await?
        .map(Json)
        .ok_or(ApiError::NotFound(AD_NOT_FOUND))
}

pub async fn replace_handler(State(state): State<AppState>, ValidPath(id): ValidPath<AdId>, ValidJson(req): ValidJson<AdRequest>) -> ApiResult<Json<Ad>> {
    ensure_flat_exists(&state, req.flat_id).await?;
    state.repos.ads.replace(id, req.into()).await?
        .map(Json)
        .ok_or(ApiError::NotFound(AD_NOT_FOUND))
}

pub async fn delete_handler(State(state): State<AppState>, ValidPath(id): ValidPath<AdId>) -> ApiResult<StatusCode> {
    if state.repos.ads.delete(id).await? {
        metrics::ADS_COUNTER.deleted.inc();
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(AD_NOT_FOUND))
    }
}

async fn ensure_flat_exists(state: &AppState, id: FlatId) -> ApiResult<()> {
    state.repos.user_flats.get(id).await?
        .map(|_| ())
        .ok_or(ApiError::NotFound(FLAT_NOT_FOUND))
}

async fn ensure_ad_exists(state: &AppState, id: AdId) -> ApiResult<()> {
    state.repos.ads.get(id).await?
        .map(|_| ())
        .ok_or(ApiError::NotFound(AD_NOT_FOUND))
}
