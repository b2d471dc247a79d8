use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{ensure_in_range, Validate, ValidJson, ValidPath, ValidQuery};
use crate::api::AppState;
use crate::domain::{DomainAssertionError, FlatId, HouseId, UserId};
use crate::metrics;
use crate::repo::{Ad, NewUserFlat, UserFlat, UserFlatPatch};

pub const FLAT_NOT_FOUND: &str = "Квартира не найдена";
const MAX_ADDRESS_LENGTH: usize = 500;
pub(super) const ROOMS_RANGE: std::ops::RangeInclusive<i32> = 0..=20;
pub(super) const FLOOR_RANGE: std::ops::RangeInclusive<i32> = -5..=200;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFlatsQuery {
    pub user_id: UserId,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserFlatRequest {
    pub user_id: UserId,
    pub address: String,
    pub house_id: Option<HouseId>,
    pub floor: i32,
    pub rooms: i32,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserFlatRequest {
    pub address: Option<String>,
    pub house_id: Option<HouseId>,
    pub floor: Option<i32>,
    pub rooms: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFlatWithAds {
    #[serde(flatten)]
    pub flat: UserFlat,
    pub ads: Vec<Ad>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFlatResponse {
    pub id: FlatId,
    pub deleted_ads: u64,
    pub deleted_history_entries: u64,
}

impl Validate for UserFlatsQuery {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        Ok(())
    }
}

impl Validate for CreateUserFlatRequest {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        validate_address(Some(&self.address))?;
        validate_layout(Some(self.floor), Some(self.rooms))
    }
}

impl Validate for UpdateUserFlatRequest {
    fn validate(&self) -> Result<(), DomainAssertionError> {
        validate_address(self.address.as_deref())?;
        validate_layout(self.floor, self.rooms)
    }
}

fn validate_address(address: Option<&str>) -> Result<(), DomainAssertionError> {
    match address.map(str::trim) {
        Some("") => Err(DomainAssertionError::new("address", "must not be empty")),
        Some(a) if a.chars().count() > MAX_ADDRESS_LENGTH => Err(DomainAssertionError::new("address", "is too long")),
        _ => Ok(())
    }
}

fn validate_layout(floor: Option<i32>, rooms: Option<i32>) -> Result<(), DomainAssertionError> {
    ensure_in_range("floor", floor, FLOOR_RANGE, "must be between -5 and 200")?;
    ensure_in_range("rooms", rooms, ROOMS_RANGE, "must be between 0 and 20")
}

pub async fn list_handler(State(state): State<AppState>, ValidQuery(query): ValidQuery<UserFlatsQuery>) -> ApiResult<Json<Vec<UserFlat>>> {
    let flats = state.repos.user_flats.list(query.user_id).await?;
    Ok(Json(flats))
}

pub async fn get_handler(State(state): State<AppState>, ValidPath(id): ValidPath<FlatId>) -> ApiResult<Json<UserFlatWithAds>> {
    let flat = state.repos.user_flats.get(id).await?
        .ok_or(ApiError::NotFound(FLAT_NOT_FOUND))?;
    let ads = state.repos.ads.list(Some(id)).await?;
    Ok(Json(UserFlatWithAds { flat, ads }))
}

pub async fn create_handler(State(state): State<AppState>, ValidJson(req): ValidJson<CreateUserFlatRequest>) -> ApiResult<(StatusCode, Json<UserFlat>)> {
    let flat = state.repos.user_flats.create(NewUserFlat {
        user_id: req.user_id,
        address: req.address,
        house_id: req.house_id,
        floor: req.floor,
        rooms: req.rooms,
    }).await?;
    log::info!("the user {} started tracking the flat {} (house: {:?})", flat.user_id, flat.id, flat.house_id);
    metrics::FLATS_COUNTER.created.inc();
    Ok((StatusCode::CREATED, Json(flat)))
}

pub async fn update_handler(State(state): State<AppState>, ValidPath(id): ValidPath<FlatId>, ValidJson(req): ValidJson<UpdateUserFlatRequest>) -> ApiResult<Json<UserFlat>> {
    let patch = UserFlatPatch {
        address: req.address.map(|a| a.trim().to_owned()),
        house_id: req.house_id,
        floor: req.floor,
        rooms: req.rooms,
    };
    state.repos.user_flats.update(id, patch).await?
        .map(Json)
        .ok_or(ApiError::NotFound(FLAT_NOT_FOUND))
}

pub async fn delete_handler(State(state): State<AppState>, ValidPath(id): ValidPath<FlatId>) -> ApiResult<Json<DeleteFlatResponse>> {
    let deleted = state.repos.user_flats.delete(id).await?
        .ok_or(ApiError::NotFound(FLAT_NOT_FOUND))?;
    metrics::FLATS_COUNTER.deleted.inc();
    Ok(Json(DeleteFlatResponse {
        id,
        deleted_ads: deleted.ads,
        deleted_history_entries: deleted.history_entries,
    }))
}

#[cfg(test)]
mod test {
    use crate::api::extract::Validate;
    use crate::domain::UserId;
    use super::{CreateUserFlatRequest, UpdateUserFlatRequest};

    fn request(address: &str, floor: i32, rooms: i32) -> CreateUserFlatRequest {
        CreateUserFlatRequest {
            user_id: UserId::new(1),
            address: address.to_owned(),
            house_id: None,
            floor,
            rooms,
        }
    }

    #[test]
    fn create_request_validation() {
        assert!(request("ул. Лесная, 5", 3, 2).validate().is_ok());
        assert_eq!(request("   ", 3, 2).validate().unwrap_err().field(), "address");
        assert_eq!(request("ул. Лесная, 5", 201, 2).validate().unwrap_err().field(), "floor");
        assert_eq!(request("ул. Лесная, 5", 3, 21).validate().unwrap_err().field(), "rooms");
        assert_eq!(request(&"д".repeat(501), 3, 2).validate().unwrap_err().field(), "address");
    }

    #[test]
    fn update_request_validation() {
        assert!(UpdateUserFlatRequest::default().validate().is_ok());
        let req = UpdateUserFlatRequest { rooms: Some(-1), ..Default::default() };
        assert_eq!(req.validate().unwrap_err().field(), "rooms");
    }
}
