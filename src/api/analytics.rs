use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{Validate, ValidQuery};
use crate::api::AppState;
use crate::domain::{AoId, DomainAssertionError};
use crate::metrics;
use crate::repo::{District, DistrictStats};

pub const DISTRICT_NOT_FOUND: &str = "Район не найден";
const DISTRICTS_ERROR: &str = "Ошибка при получении списка районов";
const DISTRICT_STATS_ERROR: &str = "Ошибка при получении статистики района";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictStatsQuery {
    pub ao_id: AoId,
}

impl Validate for DistrictStatsQuery {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        Ok(())
    }
}

pub async fn districts_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<District>>> {
    let districts = state.repos.analytics.districts().await
        .map_err(ApiError::internal(DISTRICTS_ERROR))?;
    Ok(Json(districts))
}

pub async fn district_stats_handler(State(state): State<AppState>, ValidQuery(query): ValidQuery<DistrictStatsQuery>) -> ApiResult<Json<DistrictStats>> {
    metrics::DISTRICT_STATS_COUNTER.invoked();
    let stats = state.repos.analytics.district_stats(query.ao_id).await
        .map_err(ApiError::internal(DISTRICT_STATS_ERROR))?
        .ok_or(ApiError::NotFound(DISTRICT_NOT_FOUND))?;
    log::debug!("district {} has {} actual listings", query.ao_id, stats.summary.total_listings);
    metrics::DISTRICT_STATS_COUNTER.finished();
    Ok(Json(stats))
}
