use testcontainers::clients;
use crate::domain::{BoundingBox, HouseId, Point, Radius};
use crate::repo;
use crate::repo::test::{create_district, create_house, create_listing, create_user, create_user_flat, profile, start_postgres, ListingParams, DISTRICT_ID, TG_UID};

#[tokio::test]
async fn test_houses_in_bounds() {
    let docker = clients::Cli::default();
    let (_container, db) = start_postgres(&docker).await;
    let map = repo::Map::new(db.clone());
    let [center, north, _far] = fill_houses(&db).await;

    let bbox = BoundingBox::new(
        Point::new(55.70, 37.60).unwrap(),
        Point::new(55.76, 37.63).unwrap()
    ).unwrap();
    let houses = map.houses_in_bounds(bbox)
        .await.expect("couldn't fetch the houses");
    let ids: Vec<HouseId> = houses.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![center, north]);
    assert_eq!(houses[0].address, "ул. Тверская, 7");
    assert_eq!(houses[0].actual_listings, 2);
    assert_eq!(houses[1].actual_listings, 0);
    assert!(houses.iter().all(|h| h.distance.is_none()));

    let empty = BoundingBox::new(
        Point::new(-10.0, -10.0).unwrap(),
        Point::new(-9.0, -9.0).unwrap()
    ).unwrap();
    assert!(map.houses_in_bounds(empty).await.expect("couldn't fetch the houses").is_empty());
}

#[tokio::test]
async fn test_houses_near() {
    let docker = clients::Cli::default();
    let (_container, db) = start_postgres(&docker).await;
    let map = repo::Map::new(db.clone());
    let [center, north, far] = fill_houses(&db).await;
    let point = Point::new(55.75, 37.62).unwrap();

    let houses = map.houses_near(point, Radius::default())
        .await.expect("couldn't fetch the houses");
    let ids: Vec<HouseId> = houses.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![center, north]);

    let distances: Vec<f64> = houses.iter().filter_map(|h| h.distance).collect();
    assert!(distances[0] < 1.0, "{distances:?}");
    assert!((distances[1] - 556.0).abs() < 5.0, "{distances:?}");

    let houses = map.houses_near(point, Radius::new(10_000.0).unwrap())
        .await.expect("couldn't fetch the houses");
    let ids: Vec<HouseId> = houses.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![center, north, far]);
    assert!(houses.iter().all(|h| h.distance.unwrap() <= 10_000.0));
}

#[tokio::test]
async fn test_houses_near_antimeridian() {
    let docker = clients::Cli::default();
    let (_container, db) = start_postgres(&docker).await;
    let map = repo::Map::new(db.clone());
    create_district(&db, DISTRICT_ID, "Чукотка").await;
    let west = create_house(&db, DISTRICT_ID, Some("ул. Берингова"), Some("1"), Some((65.0, -179.999))).await;
    let east = create_house(&db, DISTRICT_ID, Some("ул. Берингова"), Some("2"), Some((65.0, 179.9995))).await;

    let houses = map.houses_near(Point::new(65.0, 179.999).unwrap(), Radius::default())
        .await.expect("couldn't fetch the houses");
    let ids: Vec<HouseId> = houses.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![east, west]);
    let distances: Vec<f64> = houses.iter().filter_map(|h| h.distance).collect();
    assert!(distances[1] < 100.0, "{distances:?}");
}

#[tokio::test]
async fn test_user_flats_bounds() {
    let docker = clients::Cli::default();
    let (_container, db) = start_postgres(&docker).await;
    let map = repo::Map::new(db.clone());
    let [center, _north, far] = fill_houses(&db).await;
    let user_id = create_user(&db).await;
    create_user_flat(&db, user_id, Some(center)).await;
    create_user_flat(&db, user_id, Some(far)).await;

    let bounds = map.user_flats_bounds(user_id)
        .await.expect("couldn't compute the bounds");
    assert_eq!(bounds, repo::MapBounds {
        min_lat: Some(55.75),
        min_lng: Some(37.62),
        max_lat: Some(55.80),
        max_lng: Some(37.62),
    });

    let stranger = repo::Users::new(db.clone())
        .create_or_update(profile(TG_UID + 1, None))
        .await.expect("couldn't create a user");
    create_user_flat(&db, stranger.id, None).await;
    let bounds = map.user_flats_bounds(stranger.id)
        .await.expect("couldn't compute the bounds");
    assert_eq!(bounds, repo::MapBounds::default());
}

async fn fill_houses(db: &sqlx::Pool<sqlx::Postgres>) -> [HouseId; 3] {
    create_district(db, DISTRICT_ID, "ЦАО").await;
    let center = create_house(db, DISTRICT_ID, Some("ул. Тверская"), Some("7"), Some((55.75, 37.62))).await;
    let north = create_house(db, DISTRICT_ID, Some("ул. Тверская"), Some("9"), Some((55.755, 37.62))).await;
    let far = create_house(db, DISTRICT_ID, Some("ул. Тверская"), Some("30"), Some((55.80, 37.62))).await;
    create_house(db, DISTRICT_ID, Some("ул. Тверская"), Some("11"), None).await;

    for (floor, is_actual) in [(1, true), (2, true), (3, false)] {
        create_listing(db, ListingParams { house_id: center, floor, rooms: 2, price: Some(10_000_000), is_actual, source_id: None }).await;
    }
    [center, north, far]
}
