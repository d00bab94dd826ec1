use crate::{
    Config, WeatherReport, WeatherRequest, provider::open_meteo::OpenMeteoProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

/// Why a fetch produced no data. Callers treat every variant the same way:
/// drop whatever was displayed and wait for the next trigger.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Forecast request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse forecast JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected forecast shape: {0}")]
    Shape(String),
}

impl FetchError {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        FetchError::Shape(message.into())
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherReport, FetchError>;
}

/// Construct the forecast provider described by `config`.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider = OpenMeteoProvider::with_base_url(
        config.api_base_url.clone(),
        config.request_timeout(),
    )?;

    Ok(Box::new(provider))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
