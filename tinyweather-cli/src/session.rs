//! Loaded config + dashboard, and the user actions shared by one-shot
//! commands and the `watch` prompt.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tinyweather_core::{
    Config, Dashboard, FavoriteLocation, FetchTicket, FileStore, LocationStore, TemperatureUnit,
    parse_coordinate, present,
};

use crate::cli::FavCommand;

const INVALID_COORDINATE: &str = "Please enter valid latitude and longitude values.";

#[derive(Debug)]
pub struct Session {
    config: Config,
    config_path: PathBuf,
    dashboard: Dashboard<FileStore>,
}

impl Session {
    pub fn open(config_path: Option<&Path>, data_dir: Option<&Path>, unit: Option<&str>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => Config::config_file_path()?,
        };
        let config = Config::load_from(&config_path)?;

        let unit = match unit {
            Some(u) => TemperatureUnit::try_from(u)?,
            None => config.unit,
        };

        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => Config::data_dir()?,
        };
        tracing::debug!("Using data directory {}", data_dir.display());

        let store = LocationStore::load(FileStore::new(data_dir));

        Ok(Self {
            config,
            config_path,
            dashboard: Dashboard::new(store, unit),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dashboard(&self) -> &Dashboard<FileStore> {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard<FileStore> {
        &mut self.dashboard
    }

    /// Validate and apply a typed coordinate. Returns the ticket for the
    /// immediate fetch if the location changed.
    pub fn set_location(&mut self, lat: &str, lon: &str) -> Result<Option<FetchTicket>> {
        let coordinate =
            parse_coordinate(lat, lon).map_err(|e| anyhow!("{INVALID_COORDINATE} ({e})"))?;

        let ticket = self.dashboard.set_location(coordinate);
        println!("Active location: {}", self.display_name(coordinate));
        Ok(ticket)
    }

    pub fn clear_location(&mut self) {
        self.dashboard.clear_location();
        println!("Active location cleared.");
    }

    /// `interactive` allows opening a picker when `fav select` has no argument.
    pub fn favorite(&mut self, cmd: FavCommand, interactive: bool) -> Result<Option<FetchTicket>> {
        match cmd {
            FavCommand::Add { coordinate, name } => {
                let parsed = parse_coordinate(&coordinate.lat, &coordinate.lon)
                    .map_err(|e| anyhow!("{INVALID_COORDINATE} ({e})"))?;
                let name = Some(name.join(" ")).filter(|n| !n.is_empty());

                if self.dashboard.add_favorite(parsed, name) {
                    println!("Saved favorite {}", self.display_name(parsed));
                } else {
                    println!("{parsed} is already a favorite.");
                }
                Ok(None)
            }
            FavCommand::Remove(coordinate) => {
                let parsed = parse_coordinate(&coordinate.lat, &coordinate.lon)
                    .map_err(|e| anyhow!("{INVALID_COORDINATE} ({e})"))?;

                match self.dashboard.remove_favorite(parsed) {
                    0 => println!("No favorite at {parsed}."),
                    _ => println!("Removed favorite {parsed}."),
                }
                Ok(None)
            }
            FavCommand::List => {
                let list = present::render_favorites(
                    self.dashboard.favorites(),
                    self.dashboard.active_location(),
                );
                println!("{}", list.trim_end());
                Ok(None)
            }
            FavCommand::Select { name } => {
                let query = name.join(" ");
                let favorite = if query.is_empty() {
                    if !interactive {
                        return Err(anyhow!("Usage: fav select <name or number>"));
                    }
                    match self.pick_favorite()? {
                        Some(f) => f,
                        None => return Ok(None),
                    }
                } else {
                    self.lookup_favorite(&query)
                        .ok_or_else(|| anyhow!("No favorite named '{query}'."))?
                };

                let ticket = self.dashboard.select_favorite(&favorite);
                println!("Active location: {}", self.display_name(favorite.coordinate()));
                Ok(ticket)
            }
        }
    }

    /// Persist a new preferred unit and use it from now on.
    pub fn save_unit(&mut self, unit: &str) -> Result<()> {
        let unit = TemperatureUnit::try_from(unit)?;
        self.config.unit = unit;
        self.config
            .save_to(&self.config_path)
            .with_context(|| format!("Failed to save unit preference '{unit}'"))?;
        self.dashboard.set_unit(unit);

        println!("Temperature unit set to {unit}.");
        Ok(())
    }

    /// Name lookup first, then a 1-based position in the favorites list.
    fn lookup_favorite(&self, query: &str) -> Option<FavoriteLocation> {
        self.dashboard.find_favorite(query).or_else(|| {
            let n: usize = query.trim().parse().ok()?;
            self.dashboard.favorites().get(n.checked_sub(1)?).cloned()
        })
    }

    fn pick_favorite(&self) -> Result<Option<FavoriteLocation>> {
        let favorites = self.dashboard.favorites();
        if favorites.is_empty() {
            println!("No favorites saved.");
            return Ok(None);
        }

        let choices: Vec<FavoriteChoice> = favorites
            .iter()
            .enumerate()
            .map(|(index, f)| FavoriteChoice {
                index,
                label: present::resolve_display_name(f.coordinate(), favorites),
            })
            .collect();

        let choice = inquire::Select::new("Select a favorite location:", choices)
            .prompt_skippable()
            .context("Failed to read favorite selection")?;

        Ok(choice.and_then(|c| favorites.get(c.index).cloned()))
    }

    fn display_name(&self, coordinate: tinyweather_core::Coordinate) -> String {
        present::resolve_display_name(coordinate, self.dashboard.favorites())
    }
}

struct FavoriteChoice {
    index: usize,
    label: String,
}

impl std::fmt::Display for FavoriteChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.index + 1, self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CoordinateArgs;

    fn session(dir: &Path) -> Session {
        let config = dir.join("config.toml");
        let data = dir.join("data");
        Session::open(Some(config.as_path()), Some(data.as_path()), None).unwrap()
    }

    fn coordinate(lat: &str, lon: &str) -> CoordinateArgs {
        CoordinateArgs {
            lat: lat.into(),
            lon: lon.into(),
        }
    }

    #[test]
    fn invalid_coordinate_never_reaches_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        let err = s.set_location("abc", "1").unwrap_err();
        assert!(err.to_string().contains(INVALID_COORDINATE));
        assert_eq!(s.dashboard().active_location(), None);
    }

    #[test]
    fn select_by_name_or_number() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        s.favorite(
            FavCommand::Add {
                coordinate: coordinate("51.5074", "-0.1278"),
                name: vec!["London".into()],
            },
            false,
        )
        .unwrap();
        s.favorite(
            FavCommand::Add {
                coordinate: coordinate("48.8566", "2.3522"),
                name: vec![],
            },
            false,
        )
        .unwrap();

        let ticket = s
            .favorite(FavCommand::Select { name: vec!["2".into()] }, false)
            .unwrap();
        assert!(ticket.is_some());
        assert_eq!(
            s.dashboard().active_location(),
            Some(tinyweather_core::Coordinate::new(48.8566, 2.3522))
        );

        s.favorite(FavCommand::Select { name: vec!["LONDON".into()] }, false)
            .unwrap();
        assert_eq!(
            s.dashboard().active_location(),
            Some(tinyweather_core::Coordinate::new(51.5074, -0.1278))
        );

        assert!(s.favorite(FavCommand::Select { name: vec![] }, false).is_err());
        assert!(s.favorite(FavCommand::Select { name: vec!["9".into()] }, false).is_err());
    }

    #[test]
    fn unit_preference_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        s.save_unit("f").unwrap();

        assert_eq!(s.dashboard().unit(), TemperatureUnit::Fahrenheit);
        let reloaded = session(dir.path());
        assert_eq!(reloaded.dashboard().unit(), TemperatureUnit::Fahrenheit);
    }
}
