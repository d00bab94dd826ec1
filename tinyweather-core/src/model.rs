use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic point. Two coordinates are the same location only when both
/// fields are exactly equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// Rejected user input for a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("invalid latitude '{0}'")]
    InvalidLatitude(String),
    #[error("invalid longitude '{0}'")]
    InvalidLongitude(String),
}

/// Parse user-typed latitude/longitude text. Both values must be finite numbers.
pub fn parse_coordinate(lat: &str, lon: &str) -> Result<Coordinate, CoordinateError> {
    let parse = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());

    let lat_value = parse(lat).ok_or_else(|| CoordinateError::InvalidLatitude(lat.to_string()))?;
    let lon_value = parse(lon).ok_or_else(|| CoordinateError::InvalidLongitude(lon.to_string()))?;

    Ok(Coordinate::new(lat_value, lon_value))
}

/// What to fetch: a coordinate plus the local hour used to pick the "today"
/// slot out of the hourly arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherRequest {
    pub coordinate: Coordinate,
    /// 0-23.
    pub local_hour: u32,
}

impl WeatherRequest {
    /// Request using the current hour of the local wall clock.
    pub fn now(coordinate: Coordinate) -> Self {
        Self::at_hour(coordinate, Local::now().hour())
    }

    pub fn at_hour(coordinate: Coordinate, local_hour: u32) -> Self {
        Self {
            coordinate,
            local_hour,
        }
    }
}

/// A saved location shortcut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FavoriteLocation {
    pub fn new(coordinate: Coordinate, name: Option<String>) -> Self {
        Self {
            lat: coordinate.lat,
            lon: coordinate.lon,
            name: name.filter(|n| !n.trim().is_empty()),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    pub fn is_at(&self, coordinate: Coordinate) -> bool {
        self.coordinate() == coordinate
    }
}

/// Display unit preference. Fahrenheit mode also switches wind to mph and
/// visibility to miles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow::anyhow!(
                "Unknown unit '{value}'. Supported units: celsius, fahrenheit."
            )),
        }
    }
}

/// Conditions for the current hour, in the provider's metric units
/// (°C, km/h, mm, cm of snow, %, meters, degrees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayWeather {
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub dewpoint: f64,
    pub precipitation: f64,
    pub rain: f64,
    pub snowfall: f64,
    pub precipitation_probability: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub cloud_cover: f64,
    pub visibility: f64,
    pub humidity: f64,
    pub weather_code: i32,
    pub time: NaiveDateTime,
}

/// One day of aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
    pub precipitation_sum: f64,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
    pub wind_speed_max: f64,
    pub weather_code: i32,
}

/// Result of one successful fetch. Today and the daily list always travel
/// together so neither can go stale on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub today: TodayWeather,
    pub daily: Vec<DailyForecast>,
    /// IANA zone the provider resolved for the coordinate, if reported.
    pub timezone: Option<String>,
}
