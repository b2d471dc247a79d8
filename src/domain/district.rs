use derive_more::Display;
use serde::{Deserialize, Serialize};
use crate::domain::DomainAssertionError;

/// Identifier of an administrative district (okrug). Always positive.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(try_from = "i64", into = "i32")]
pub struct AoId(i32);

impl AoId {
    pub fn new(value: i64) -> Result<Self, DomainAssertionError> {
        match i32::try_from(value) {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(DomainAssertionError::new("aoId", "must be a positive integer"))
        }
    }
}

impl TryFrom<i64> for AoId {
    type Error = DomainAssertionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AoId> for i32 {
    fn from(value: AoId) -> Self {
        value.0
    }
}
