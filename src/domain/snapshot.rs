use crate::domain::AdStatus;

/// Current state of an ad as reported by its source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingSnapshot {
    pub price: Option<i64>,
    pub views_today: Option<i32>,
    pub total_views: Option<i32>,
    pub status: AdStatus,
}

impl ListingSnapshot {
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.views_today.is_none() && self.total_views.is_none()
            && self.status == AdStatus::Unknown
    }
}
