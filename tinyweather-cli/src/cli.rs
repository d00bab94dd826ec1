use std::{path::PathBuf, sync::Arc};

use clap::{Args, Parser, Subcommand};
use tinyweather_core::{Trigger, WeatherProvider, present, provider_from_config};

use crate::{session::Session, watch};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "tinyweather", version, about = "Terminal weather dashboard")]
pub struct Cli {
    /// Display unit for this run ("celsius"/"c" or "fahrenheit"/"f").
    #[arg(long, global = true)]
    pub unit: Option<String>,

    /// Directory holding the saved location and favorites.
    #[arg(long, global = true, env = "TINYWEATHER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to config.toml.
    #[arg(long, global = true, env = "TINYWEATHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and print the forecast for the active location.
    Show {
        /// Switch to this latitude first (requires --lon).
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<String>,

        /// Switch to this longitude first (requires --lat).
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<String>,
    },

    /// Set the active location.
    Set(CoordinateArgs),

    /// Forget the active location.
    Clear,

    /// Manage favorite locations.
    #[command(subcommand)]
    Fav(FavCommand),

    /// Persist the preferred display unit.
    Unit {
        /// "celsius" or "fahrenheit".
        unit: String,
    },

    /// Live dashboard that refreshes hourly and when resumed from the background.
    Watch,
}

#[derive(Debug, Clone, Args)]
pub struct CoordinateArgs {
    #[arg(allow_negative_numbers = true)]
    pub lat: String,
    #[arg(allow_negative_numbers = true)]
    pub lon: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum FavCommand {
    /// Save a location.
    Add {
        #[command(flatten)]
        coordinate: CoordinateArgs,

        /// Optional display name.
        #[arg(long, num_args = 1..)]
        name: Vec<String>,
    },

    /// Delete the favorite at a coordinate.
    Remove(CoordinateArgs),

    /// List saved favorites.
    List,

    /// Make a favorite the active location, by name or list number.
    /// Without an argument an interactive picker opens.
    Select { name: Vec<String> },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut session = Session::open(
            self.config.as_deref(),
            self.data_dir.as_deref(),
            self.unit.as_deref(),
        )?;

        match self.command {
            Command::Show { lat, lon } => {
                let provider = provider_from_config(session.config())?;

                let mut ticket = None;
                if let (Some(lat), Some(lon)) = (lat, lon) {
                    ticket = session.set_location(&lat, &lon)?;
                }
                let ticket = ticket.or_else(|| session.dashboard_mut().request_refresh(Trigger::Manual));

                match ticket {
                    Some(ticket) => {
                        let result = provider.get_weather(&ticket.request()).await;
                        session.dashboard_mut().apply(ticket, result);
                        println!("{}", session.dashboard().render());
                    }
                    None => println!("{}", present::NO_DATA_MESSAGE),
                }
            }
            Command::Set(coordinate) => {
                session.set_location(&coordinate.lat, &coordinate.lon)?;
            }
            Command::Clear => {
                session.clear_location();
            }
            Command::Fav(cmd) => {
                session.favorite(cmd, true)?;
            }
            Command::Unit { unit } => {
                session.save_unit(&unit)?;
            }
            Command::Watch => {
                let provider = Arc::from(provider_from_config(session.config())?);
                watch::run(session, provider).await?;
            }
        }

        Ok(())
    }
}
