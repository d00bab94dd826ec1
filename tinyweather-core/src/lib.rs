//! Core library for the `tinyweather` dashboard.
//!
//! This crate defines:
//! - The active location / favorites store and its persistence
//! - Fetching current and daily forecasts from Open-Meteo
//! - Unit conversion, condition classification and text rendering
//! - The dashboard state that ties them together
//!
//! It is used by `tinyweather-cli`, but can also be embedded elsewhere.

pub mod config;
pub mod dashboard;
pub mod model;
pub mod present;
pub mod provider;
pub mod store;

pub use config::Config;
pub use dashboard::{ApplyOutcome, Dashboard, FetchTicket, Trigger};
pub use model::{
    Coordinate, CoordinateError, DailyForecast, FavoriteLocation, TemperatureUnit, TodayWeather,
    WeatherReport, WeatherRequest, parse_coordinate,
};
pub use provider::{FetchError, WeatherProvider, open_meteo::OpenMeteoProvider, provider_from_config};
pub use store::{FileStore, KeyValueStore, LocationStore, MemoryStore, StoreError};
