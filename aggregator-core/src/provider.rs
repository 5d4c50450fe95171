use crate::{Config, FetchError, RawProviderPayload, provider::openweather::OpenWeatherFetcher};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Fetches the current weather for a city from an upstream provider.
///
/// Implementations make exactly one attempt per call; retrying is left to
/// the caller.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, city: &str) -> Result<RawProviderPayload, FetchError>;
}

/// Construct the OpenWeatherMap fetcher from config.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<OpenWeatherFetcher> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeatherMap API key configured.\n\
                 Hint: run `weather-aggregator configure` or set {}.",
            crate::config::API_KEY_ENV
        )
    })?;

    let fetcher = OpenWeatherFetcher::with_base_url(
        api_key.to_owned(),
        config.base_url.clone(),
        config.request_timeout(),
    )?;

    Ok(fetcher)
}
