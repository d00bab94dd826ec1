//! Turning weather records into text.
//!
//! Everything here is a pure function of its inputs. Records stay in the
//! provider's metric units until the moment they are formatted.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write as _;

use crate::model::{Coordinate, FavoriteLocation, TemperatureUnit, WeatherReport};

pub const NO_DATA_MESSAGE: &str = "No weather data available. Set a location to get started.";

const KM_PER_MILE: f64 = 1.609344;
const METERS_PER_MILE: f64 = 1609.344;

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

pub fn convert_temperature(celsius: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        TemperatureUnit::Celsius => celsius,
    }
}

/// km/h in Celsius mode, mph in Fahrenheit mode.
pub fn convert_wind_speed(kmh: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Fahrenheit => kmh / KM_PER_MILE,
        TemperatureUnit::Celsius => kmh,
    }
}

/// Kilometers in Celsius mode, miles in Fahrenheit mode.
pub fn convert_visibility(meters: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Fahrenheit => meters / METERS_PER_MILE,
        TemperatureUnit::Celsius => meters / 1000.0,
    }
}

/// Suffixes that go with the converted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitLabels {
    pub temperature: &'static str,
    pub wind_speed: &'static str,
    pub distance: &'static str,
}

pub fn unit_labels(unit: TemperatureUnit) -> UnitLabels {
    match unit {
        TemperatureUnit::Celsius => UnitLabels {
            temperature: "°C",
            wind_speed: "km/h",
            distance: "km",
        },
        TemperatureUnit::Fahrenheit => UnitLabels {
            temperature: "°F",
            wind_speed: "mph",
            distance: "mi",
        },
    }
}

/// Condition buckets for the small WMO subset we recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherIcon {
    Sunny,
    Cloudy,
    Fog,
    Rain,
    Snow,
    Unknown,
}

impl WeatherIcon {
    pub fn name(&self) -> &'static str {
        match self {
            WeatherIcon::Sunny => "sunny",
            WeatherIcon::Cloudy => "cloudy",
            WeatherIcon::Fog => "fog",
            WeatherIcon::Rain => "rain",
            WeatherIcon::Snow => "snow",
            WeatherIcon::Unknown => "unknown",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            WeatherIcon::Sunny => "☀",
            WeatherIcon::Cloudy => "☁",
            WeatherIcon::Fog => "≋",
            WeatherIcon::Rain => "☂",
            WeatherIcon::Snow => "❄",
            WeatherIcon::Unknown => "?",
        }
    }
}

pub fn classify_weather_icon(code: i32) -> WeatherIcon {
    match code {
        0 => WeatherIcon::Sunny,
        1..=3 => WeatherIcon::Cloudy,
        45 | 48 => WeatherIcon::Fog,
        61 | 63 | 65 => WeatherIcon::Rain,
        71 | 73 | 75 => WeatherIcon::Snow,
        _ => WeatherIcon::Unknown,
    }
}

/// Unmapped codes fall through to "Unknown".
pub fn classify_weather_code(code: i32) -> &'static str {
    match classify_weather_icon(code) {
        WeatherIcon::Sunny => "Clear sky",
        WeatherIcon::Cloudy => "Partly cloudy",
        WeatherIcon::Fog => "Fog",
        WeatherIcon::Rain => "Rain",
        WeatherIcon::Snow => "Snow",
        WeatherIcon::Unknown => "Unknown",
    }
}

/// 8-point compass label for a bearing in degrees.
pub fn wind_direction_label(degrees: f64) -> &'static str {
    let index = ((degrees / 45.0).round() as i64).rem_euclid(8);
    COMPASS[index as usize]
}

/// Name of the favorite saved at exactly `coordinate`, else `"(lat, lon)"`.
pub fn resolve_display_name(coordinate: Coordinate, favorites: &[FavoriteLocation]) -> String {
    favorites
        .iter()
        .find(|f| f.is_at(coordinate))
        .and_then(|f| f.name.clone())
        .unwrap_or_else(|| coordinate.to_string())
}

pub fn format_time_of_day(ts: NaiveDateTime) -> String {
    ts.format("%H:%M").to_string()
}

/// e.g. `Tuesday, Mar 18`.
pub fn format_day_label(date: NaiveDate) -> String {
    date.format("%A, %b %-d").to_string()
}

/// Everything the dashboard needs to draw itself.
#[derive(Debug, Clone, Copy)]
pub struct DashboardView<'a> {
    pub report: Option<&'a WeatherReport>,
    pub location: Option<Coordinate>,
    pub unit: TemperatureUnit,
    pub favorites: &'a [FavoriteLocation],
}

pub fn render_dashboard(view: &DashboardView<'_>) -> String {
    let (report, location, first_day) = match (view.report, view.location) {
        (Some(report), Some(location)) => match report.daily.first() {
            Some(first_day) => (report, location, first_day),
            None => return NO_DATA_MESSAGE.to_string(),
        },
        _ => return NO_DATA_MESSAGE.to_string(),
    };

    let unit = view.unit;
    let labels = unit_labels(unit);
    let temp = |c: f64| format!("{:.1}{}", convert_temperature(c, unit), labels.temperature);
    let wind = |kmh: f64| format!("{:.1} {}", convert_wind_speed(kmh, unit), labels.wind_speed);
    let conditions =
        |code: i32| format!("{} {}", classify_weather_icon(code).glyph(), classify_weather_code(code));

    let today = &report.today;
    let mut out = String::new();

    let _ = writeln!(out, "Today at {}", resolve_display_name(location, view.favorites));
    field(&mut out, "Temperature", &temp(today.temperature));
    field(&mut out, "Feels Like", &temp(today.apparent_temperature));
    field(&mut out, "Dew Point", &temp(today.dewpoint));
    field(&mut out, "Conditions", &conditions(today.weather_code));
    field(
        &mut out,
        "Precipitation",
        &format!(
            "{} mm (Rain: {} mm, Snow: {} cm)",
            today.precipitation, today.rain, today.snowfall
        ),
    );
    field(
        &mut out,
        "Precipitation Chance",
        &format!("{}%", today.precipitation_probability),
    );
    field(
        &mut out,
        "Wind",
        &format!(
            "{} {}",
            wind(today.wind_speed),
            wind_direction_label(today.wind_direction)
        ),
    );
    field(&mut out, "Cloud Cover", &format!("{}%", today.cloud_cover));
    field(
        &mut out,
        "Visibility",
        &format!(
            "{:.1} {}",
            convert_visibility(today.visibility, unit),
            labels.distance
        ),
    );
    field(&mut out, "Humidity", &format!("{}%", today.humidity));
    field(&mut out, "High", &temp(first_day.temp_max));
    field(&mut out, "Low", &temp(first_day.temp_min));
    field(&mut out, "Sunrise", &format_time_of_day(first_day.sunrise));
    field(&mut out, "Sunset", &format_time_of_day(first_day.sunset));
    field(&mut out, "Updated", &format_time_of_day(today.time));

    let _ = writeln!(out);
    let _ = writeln!(out, "Next {} Days", report.daily.len());
    for day in &report.daily {
        let _ = writeln!(out, "{}", format_day_label(day.date));
        field(&mut out, "High", &temp(day.temp_max));
        field(&mut out, "Low", &temp(day.temp_min));
        field(&mut out, "Precipitation", &format!("{} mm", day.precipitation_sum));
        field(&mut out, "Wind Max", &wind(day.wind_speed_max));
        field(&mut out, "Conditions", &conditions(day.weather_code));
        field(&mut out, "Sunrise", &format_time_of_day(day.sunrise));
        field(&mut out, "Sunset", &format_time_of_day(day.sunset));
    }

    out
}

/// Numbered favorites list; the active location is marked with `*`.
pub fn render_favorites(favorites: &[FavoriteLocation], active: Option<Coordinate>) -> String {
    if favorites.is_empty() {
        return "No favorites saved.".to_string();
    }

    let mut out = String::new();
    for (i, fav) in favorites.iter().enumerate() {
        let marker = if active == Some(fav.coordinate()) { '*' } else { ' ' };
        let coordinate = fav.coordinate();
        let _ = match &fav.name {
            Some(name) => writeln!(out, "{marker} {}. {name} {coordinate}", i + 1),
            None => writeln!(out, "{marker} {}. {coordinate}", i + 1),
        };
    }
    out
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {:<22}{}", format!("{label}:"), value);
}
