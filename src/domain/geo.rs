use derive_more::Display;
use crate::domain::DomainAssertionError;

pub const DEFAULT_RADIUS_METERS: f64 = 1000.0;
pub const MAX_RADIUS_METERS: f64 = 10_000.0;

#[derive(Copy, Clone, Debug, PartialEq, Display)]
#[display("({lat}, {lng})")]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

#[derive(Copy, Clone, Debug, PartialEq, Display)]
pub struct Radius(f64);

impl Point {
    pub fn new(lat: f64, lng: f64) -> Result<Self, DomainAssertionError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(DomainAssertionError::new("lat", "must be between -90 and 90"))
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(DomainAssertionError::new("lng", "must be between -180 and 180"))
        }
        Ok(Self { lat, lng })
    }
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Result<Self, DomainAssertionError> {
        if min.lat > max.lat {
            Err(DomainAssertionError::new("minLat", "must not be greater than maxLat"))
        } else if min.lng > max.lng {
            Err(DomainAssertionError::new("minLng", "must not be greater than maxLng"))
        } else {
            Ok(Self { min, max })
        }
    }
}

impl Radius {
    pub fn new(meters: f64) -> Result<Self, DomainAssertionError> {
        if meters > 0.0 && meters <= MAX_RADIUS_METERS {
            Ok(Self(meters))
        } else {
            Err(DomainAssertionError::new("radius", "must be greater than 0 and not greater than 10000 meters"))
        }
    }

    pub fn meters(&self) -> f64 {
        self.0
    }

    /// Half-sizes of a box enclosing the circle around `center`, in degrees.
    pub fn degree_deltas(&self, center: Point) -> (f64, f64) {
        const METERS_PER_DEGREE: f64 = 111_320.0;
        let lat_delta = self.0 / METERS_PER_DEGREE;
        let cos_lat = center.lat.to_radians().cos().abs().max(0.01);
        let lng_delta = (self.0 / (METERS_PER_DEGREE * cos_lat)).min(180.0);
        (lat_delta, lng_delta)
    }
}

impl Default for Radius {
    fn default() -> Self {
        Self(DEFAULT_RADIUS_METERS)
    }
}
