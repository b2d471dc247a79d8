pub const UNKNOWN_SOURCE: &str = "Неизвестный источник";
pub const UNKNOWN_ADDRESS: &str = "Адрес не указан";

/// Builds a human-readable address of a house; blank parts count as missing.
pub fn compose_address(street: Option<&str>, house: Option<&str>) -> String {
    let street = street.map(str::trim).filter(|s| !s.is_empty());
    let house = house.map(str::trim).filter(|s| !s.is_empty());
    match (street, house) {
        (Some(street), Some(house)) => format!("{street}, {house}"),
        (Some(street), None) => street.to_owned(),
        (None, Some(house)) => format!("дом {house}"),
        (None, None) => UNKNOWN_ADDRESS.to_owned(),
    }
}

pub fn source_name(name: Option<String>) -> String {
    name.filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_owned())
}
