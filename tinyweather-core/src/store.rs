//! Active location and favorites, persisted to a string-keyed store.

use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
};

use crate::model::{Coordinate, FavoriteLocation};

pub const ACTIVE_LOCATION_KEY: &str = "active_location";
pub const FAVORITES_KEY: &str = "favorite_locations";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable get/set/remove string store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(key);
        fs::write(&path, value).map_err(|source| StoreError::Io { path, source })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Holds the active coordinate and the favorites list and writes every
/// change through to the backing store.
///
/// Writes are best-effort: a failing store is logged and the in-memory value
/// still changes.
#[derive(Debug)]
pub struct LocationStore<S: KeyValueStore> {
    backend: S,
    active: Option<Coordinate>,
    favorites: Vec<FavoriteLocation>,
}

impl<S: KeyValueStore> LocationStore<S> {
    /// Read both keys once. Missing or corrupt values load as absent/empty.
    ///
    /// The favorites key is rewritten immediately so it always exists.
    pub fn load(backend: S) -> Self {
        let active = read_json::<Coordinate>(&backend, ACTIVE_LOCATION_KEY);
        let favorites = read_json::<Vec<FavoriteLocation>>(&backend, FAVORITES_KEY).unwrap_or_default();

        tracing::debug!(
            "Loaded location store: active={:?}, {} favorite(s)",
            active,
            favorites.len()
        );

        let mut store = Self {
            backend,
            active,
            favorites,
        };
        store.persist_favorites();
        store
    }

    pub fn active_location(&self) -> Option<Coordinate> {
        self.active
    }

    pub fn favorites(&self) -> &[FavoriteLocation] {
        &self.favorites
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Replace the active coordinate. Returns `true` when it differs from the
    /// previous value.
    pub fn set_active_location(&mut self, coordinate: Coordinate) -> bool {
        let changed = self.active != Some(coordinate);
        self.active = Some(coordinate);
        self.persist_active();
        changed
    }

    pub fn clear_active_location(&mut self) {
        self.active = None;
        self.persist_active();
    }

    /// Insert a favorite unless one already exists at the same coordinate.
    pub fn add_favorite(&mut self, coordinate: Coordinate, name: Option<String>) -> bool {
        if self.favorites.iter().any(|f| f.is_at(coordinate)) {
            tracing::debug!("Favorite {} already saved; ignoring", coordinate);
            return false;
        }

        self.favorites.push(FavoriteLocation::new(coordinate, name));
        self.persist_favorites();
        true
    }

    /// Remove every favorite at `coordinate`. Returns how many were removed.
    pub fn remove_favorite(&mut self, coordinate: Coordinate) -> usize {
        let before = self.favorites.len();
        self.favorites.retain(|f| !f.is_at(coordinate));
        let removed = before - self.favorites.len();

        if removed > 0 {
            self.persist_favorites();
        }
        removed
    }

    pub fn select_favorite(&mut self, favorite: &FavoriteLocation) -> bool {
        self.set_active_location(favorite.coordinate())
    }

    /// Case-insensitive lookup by favorite name.
    pub fn find_favorite(&self, name: &str) -> Option<&FavoriteLocation> {
        let wanted = name.trim().to_lowercase();
        self.favorites
            .iter()
            .find(|f| f.name.as_deref().is_some_and(|n| n.to_lowercase() == wanted))
    }

    fn persist_active(&mut self) {
        let result = match self.active {
            Some(coordinate) => write_json(&mut self.backend, ACTIVE_LOCATION_KEY, &coordinate),
            None => self.backend.remove(ACTIVE_LOCATION_KEY),
        };

        if let Err(e) = result {
            tracing::warn!("Failed to persist active location: {}", e);
        }
    }

    fn persist_favorites(&mut self) {
        if let Err(e) = write_json(&mut self.backend, FAVORITES_KEY, &self.favorites) {
            tracing::warn!("Failed to persist favorites: {}", e);
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(backend: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = backend.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring unparsable stored value for '{}': {}", key, e);
            None
        }
    }
}

fn write_json<T: serde::Serialize + ?Sized>(
    backend: &mut impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })?;
    backend.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london() -> Coordinate {
        Coordinate::new(51.5074, -0.1278)
    }

    #[test]
    fn add_favorite_twice_keeps_one_entry() {
        let mut store = LocationStore::load(MemoryStore::new());

        assert!(store.add_favorite(london(), Some("London".into())));
        assert!(!store.add_favorite(london(), Some("Other name".into())));

        assert_eq!(store.favorites().len(), 1);
        assert_eq!(store.favorites()[0].name.as_deref(), Some("London"));
    }

    #[test]
    fn remove_favorite_is_noop_the_second_time() {
        let mut store = LocationStore::load(MemoryStore::new());
        store.add_favorite(london(), None);
        store.add_favorite(Coordinate::new(48.8566, 2.3522), Some("Paris".into()));

        assert_eq!(store.remove_favorite(london()), 1);
        assert!(store.favorites().iter().all(|f| !f.is_at(london())));

        assert_eq!(store.remove_favorite(london()), 0);
        assert_eq!(store.favorites().len(), 1);
    }

    #[test]
    fn favorites_round_trip_through_backend() {
        let mut store = LocationStore::load(MemoryStore::new());
        store.add_favorite(london(), Some("London".into()));
        store.add_favorite(Coordinate::new(40.7128, -74.006), None);
        store.add_favorite(Coordinate::new(35.6762, 139.6503), Some("Tokyo".into()));
        let expected = store.favorites().to_vec();

        let reloaded = LocationStore::load(store.backend().clone());
        assert_eq!(reloaded.favorites(), expected.as_slice());
    }

    #[test]
    fn clearing_active_location_deletes_key() {
        let mut store = LocationStore::load(MemoryStore::new());
        store.set_active_location(london());
        assert!(store.backend().get(ACTIVE_LOCATION_KEY).is_some());

        store.clear_active_location();
        assert_eq!(store.active_location(), None);
        assert!(store.backend().get(ACTIVE_LOCATION_KEY).is_none());
    }

    #[test]
    fn set_active_location_reports_change() {
        let mut store = LocationStore::load(MemoryStore::new());
        assert!(store.set_active_location(london()));
        assert!(!store.set_active_location(london()));
        assert!(store.set_active_location(Coordinate::new(0.0, 0.0)));
    }

    #[test]
    fn corrupt_values_load_as_empty() {
        let mut backend = MemoryStore::new();
        backend.set(ACTIVE_LOCATION_KEY, "{not json").unwrap();
        backend.set(FAVORITES_KEY, "[1, 2").unwrap();

        let store = LocationStore::load(backend);
        assert_eq!(store.active_location(), None);
        assert!(store.favorites().is_empty());
        assert_eq!(store.backend().get(FAVORITES_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn select_favorite_sets_active() {
        let mut store = LocationStore::load(MemoryStore::new());
        store.add_favorite(london(), Some("London".into()));
        let fav = store.find_favorite("london").cloned().unwrap();

        assert!(store.select_favorite(&fav));
        assert_eq!(store.active_location(), Some(london()));
    }

    #[test]
    fn file_store_missing_key_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs_store = FileStore::new(dir.path().join("nested"));

        assert_eq!(fs_store.get(FAVORITES_KEY), None);
        fs_store.remove(ACTIVE_LOCATION_KEY).expect("removing a missing key is fine");

        fs_store.set(FAVORITES_KEY, "[]").unwrap();
        assert_eq!(fs_store.get(FAVORITES_KEY).as_deref(), Some("[]"));
    }
}
