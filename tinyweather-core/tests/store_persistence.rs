use tinyweather_core::{Coordinate, FileStore, KeyValueStore, LocationStore, store};

#[test]
fn favorites_and_active_location_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut locations = LocationStore::load(FileStore::new(dir.path()));
        locations.add_favorite(Coordinate::new(51.5074, -0.1278), Some("London".into()));
        locations.add_favorite(Coordinate::new(48.8566, 2.3522), Some("Paris".into()));
        locations.add_favorite(Coordinate::new(-33.8688, 151.2093), None);
        locations.set_active_location(Coordinate::new(48.8566, 2.3522));
    }

    let reloaded = LocationStore::load(FileStore::new(dir.path()));
    let names: Vec<_> = reloaded.favorites().iter().map(|f| f.name.clone()).collect();

    assert_eq!(
        names,
        vec![Some("London".to_string()), Some("Paris".to_string()), None]
    );
    assert_eq!(reloaded.favorites()[2].coordinate(), Coordinate::new(-33.8688, 151.2093));
    assert_eq!(reloaded.active_location(), Some(Coordinate::new(48.8566, 2.3522)));
}

#[test]
fn cleared_location_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut locations = LocationStore::load(FileStore::new(dir.path()));

    locations.set_active_location(Coordinate::new(1.0, 2.0));
    assert!(dir.path().join("active_location.json").exists());

    locations.clear_active_location();
    assert!(!dir.path().join("active_location.json").exists());
    assert_eq!(
        locations.backend().get(store::FAVORITES_KEY).as_deref(),
        Some("[]")
    );
}

#[test]
fn corrupt_files_do_not_prevent_startup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("active_location.json"), "\"lat\": oops").unwrap();
    std::fs::write(dir.path().join("favorite_locations.json"), "{}").unwrap();

    let locations = LocationStore::load(FileStore::new(dir.path()));

    assert_eq!(locations.active_location(), None);
    assert!(locations.favorites().is_empty());
}
