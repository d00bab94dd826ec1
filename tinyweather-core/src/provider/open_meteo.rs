use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    model::{DailyForecast, TodayWeather, WeatherReport, WeatherRequest},
    provider::{FetchError, truncate_body},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("tinyweather/", env!("CARGO_PKG_VERSION"));

pub const HOURLY_FIELDS: &[&str] = &[
    "temperature_2m",
    "apparent_temperature",
    "dewpoint_2m",
    "precipitation",
    "rain",
    "snowfall",
    "precipitation_probability",
    "windspeed_10m",
    "winddirection_10m",
    "cloudcover",
    "visibility",
    "relativehumidity_2m",
    "weather_code",
];

pub const DAILY_FIELDS: &[&str] = &[
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "sunrise",
    "sunset",
    "windspeed_10m_max",
    "weathercode",
];

/// Open-Meteo forecast client. No API key is needed.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    async fn fetch_forecast(&self, request: &WeatherRequest) -> Result<OmResponse, FetchError> {
        let lat = request.coordinate.lat.to_string();
        let lon = request.coordinate.lon.to_string();
        let hourly = HOURLY_FIELDS.join(",");
        let daily = DAILY_FIELDS.join(",");

        tracing::debug!("Requesting forecast for {} from {}", request.coordinate, self.base_url);

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", lat.as_str()),
                ("longitude", lon.as_str()),
                ("hourly", hourly.as_str()),
                ("daily", daily.as_str()),
                ("timezone", "auto"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherReport, FetchError> {
        let parsed = self.fetch_forecast(request).await?;
        let report = parsed.into_report(request.local_hour)?;

        tracing::info!(
            "Fetched forecast for {}: {} day(s), current slot {}",
            request.coordinate,
            report.daily.len(),
            report.today.time
        );

        Ok(report)
    }
}

/// Open-Meteo reports missing samples as `null`, so every series is
/// nullable; only the slots actually read have to be present.
#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    apparent_temperature: Vec<Option<f64>>,
    dewpoint_2m: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
    rain: Vec<Option<f64>>,
    snowfall: Vec<Option<f64>>,
    precipitation_probability: Vec<Option<f64>>,
    windspeed_10m: Vec<Option<f64>>,
    winddirection_10m: Vec<Option<f64>>,
    cloudcover: Vec<Option<f64>>,
    visibility: Vec<Option<f64>>,
    relativehumidity_2m: Vec<Option<f64>>,
    weather_code: Vec<Option<i32>>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    sunrise: Vec<String>,
    sunset: Vec<String>,
    windspeed_10m_max: Vec<Option<f64>>,
    weathercode: Vec<Option<i32>>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    #[serde(default)]
    timezone: Option<String>,
    hourly: OmHourly,
    daily: OmDaily,
}

impl OmResponse {
    fn into_report(self, local_hour: u32) -> Result<WeatherReport, FetchError> {
        Ok(WeatherReport {
            today: self.hourly.slot(local_hour as usize)?,
            daily: self.daily.days()?,
            timezone: self.timezone,
        })
    }
}

impl OmHourly {
    /// Pick element `idx` from every hourly array. The index is the local
    /// hour of day, not a lookup of the provider's "now" timestamp.
    fn slot(&self, idx: usize) -> Result<TodayWeather, FetchError> {
        Ok(TodayWeather {
            temperature: value_at(&self.temperature_2m, idx, "hourly.temperature_2m")?,
            apparent_temperature: value_at(&self.apparent_temperature, idx, "hourly.apparent_temperature")?,
            dewpoint: value_at(&self.dewpoint_2m, idx, "hourly.dewpoint_2m")?,
            precipitation: value_at(&self.precipitation, idx, "hourly.precipitation")?,
            rain: value_at(&self.rain, idx, "hourly.rain")?,
            snowfall: value_at(&self.snowfall, idx, "hourly.snowfall")?,
            precipitation_probability: value_at(
                &self.precipitation_probability,
                idx,
                "hourly.precipitation_probability",
            )?,
            wind_speed: value_at(&self.windspeed_10m, idx, "hourly.windspeed_10m")?,
            wind_direction: value_at(&self.winddirection_10m, idx, "hourly.winddirection_10m")?,
            cloud_cover: value_at(&self.cloudcover, idx, "hourly.cloudcover")?,
            visibility: value_at(&self.visibility, idx, "hourly.visibility")?,
            humidity: value_at(&self.relativehumidity_2m, idx, "hourly.relativehumidity_2m")?,
            weather_code: value_at(&self.weather_code, idx, "hourly.weather_code")?,
            time: parse_timestamp(time_at(&self.time, idx, "hourly.time")?)?,
        })
    }
}

impl OmDaily {
    fn days(&self) -> Result<Vec<DailyForecast>, FetchError> {
        let n = self.time.len();
        let lengths = [
            ("daily.temperature_2m_max", self.temperature_2m_max.len()),
            ("daily.temperature_2m_min", self.temperature_2m_min.len()),
            ("daily.precipitation_sum", self.precipitation_sum.len()),
            ("daily.sunrise", self.sunrise.len()),
            ("daily.sunset", self.sunset.len()),
            ("daily.windspeed_10m_max", self.windspeed_10m_max.len()),
            ("daily.weathercode", self.weathercode.len()),
        ];

        if let Some((field, len)) = lengths.iter().find(|(_, len)| *len != n) {
            return Err(FetchError::shape(format!(
                "{field} has {len} entries but daily.time has {n}"
            )));
        }

        (0..n)
            .map(|i| {
                Ok(DailyForecast {
                    date: parse_date(&self.time[i])?,
                    temp_max: value_at(&self.temperature_2m_max, i, "daily.temperature_2m_max")?,
                    temp_min: value_at(&self.temperature_2m_min, i, "daily.temperature_2m_min")?,
                    precipitation_sum: value_at(&self.precipitation_sum, i, "daily.precipitation_sum")?,
                    sunrise: parse_timestamp(&self.sunrise[i])?,
                    sunset: parse_timestamp(&self.sunset[i])?,
                    wind_speed_max: value_at(&self.windspeed_10m_max, i, "daily.windspeed_10m_max")?,
                    weather_code: value_at(&self.weathercode, i, "daily.weathercode")?,
                })
            })
            .collect()
    }
}

fn value_at<T: Copy>(values: &[Option<T>], idx: usize, field: &str) -> Result<T, FetchError> {
    match values.get(idx) {
        Some(Some(value)) => Ok(*value),
        Some(None) => Err(FetchError::shape(format!("{field}[{idx}] is null"))),
        None => Err(missing_slot(field, values.len(), idx)),
    }
}

fn time_at<'a>(values: &'a [String], idx: usize, field: &str) -> Result<&'a str, FetchError> {
    values
        .get(idx)
        .map(String::as_str)
        .ok_or_else(|| missing_slot(field, values.len(), idx))
}

fn missing_slot(field: &str, len: usize, idx: usize) -> FetchError {
    FetchError::shape(format!(
        "{field} has {len} entries, no slot for hour index {idx}"
    ))
}

/// Open-Meteo returns local timestamps without an offset, e.g. `2025-03-18T14:00`.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime, FetchError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| FetchError::shape(format!("bad timestamp '{s}': {e}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, FetchError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| FetchError::shape(format!("bad date '{s}': {e}")))
}
