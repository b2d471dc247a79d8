use crate::id;

id! {
    UserId,
    HouseId,
    FlatId,
    AdId,
    ListingId
}
