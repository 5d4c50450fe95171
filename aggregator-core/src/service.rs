//! Fetch-or-serve decision over the record store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::{
    FetchError, RawProviderPayload, WeatherError, WeatherRecord, WeatherView,
    provider::WeatherFetcher, store::WeatherStore,
};

/// Serves city weather from the store while it is fresh, refetching otherwise.
///
/// Cloning is cheap; clones share the same store and fetcher. Concurrent
/// misses for the same city may each fetch and append a record; readers then
/// see whichever has the later timestamp.
#[derive(Clone)]
pub struct WeatherService {
    store: Arc<dyn WeatherStore>,
    fetcher: Arc<dyn WeatherFetcher>,
    ttl: Duration,
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService")
            .field("fetcher", &self.fetcher)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl WeatherService {
    pub fn new(
        store: Arc<dyn WeatherStore>,
        fetcher: Arc<dyn WeatherFetcher>,
        ttl: Duration,
    ) -> Self {
        Self { store, fetcher, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current weather for `city`, from cache when fresh.
    pub async fn get_weather(&self, city: &str) -> Result<WeatherRecord, WeatherError> {
        self.get_weather_at(city, Utc::now()).await
    }

    /// Same as [`WeatherService::get_weather`], judging freshness against `now`.
    /// A refetched record is stamped with `now`.
    pub async fn get_weather_at(
        &self,
        city: &str,
        now: DateTime<Utc>,
    ) -> Result<WeatherRecord, WeatherError> {
        let city = city.trim();

        if let Some(cached) = self.store.find_latest(city).await? {
            if is_fresh(&cached, now, self.ttl) {
                debug!(city, last_updated = %cached.last_updated, "serving cached weather");
                return Ok(cached);
            }
            debug!(city, last_updated = %cached.last_updated, "cached weather is stale");
        }

        let payload = self.fetcher.fetch(city).await.inspect_err(|err| {
            warn!(city, error = %err, "weather fetch failed");
        })?;
        let record = normalize(payload, now)?;
        let saved = self.store.save(record).await?;

        info!(
            city = %saved.city_name,
            temperature = saved.temperature_celsius,
            "refreshed weather"
        );
        Ok(saved)
    }

    /// The query-facing projection of [`WeatherService::get_weather`].
    pub async fn view(&self, city: &str) -> Result<WeatherView, WeatherError> {
        self.get_weather(city).await.map(WeatherView::from)
    }
}

/// A record is fresh while `last_updated` is strictly after `now - ttl`.
///
/// A TTL reaching past the earliest representable instant never expires.
pub fn is_fresh(record: &WeatherRecord, now: DateTime<Utc>, ttl: Duration) -> bool {
    match now.checked_sub_signed(ttl) {
        Some(cutoff) => record.last_updated > cutoff,
        None => true,
    }
}

/// Turn a provider payload into a new, unsaved record stamped with `now`.
///
/// Wind speed and condition stay `None` when the provider omits them; any
/// other missing field makes the payload malformed.
pub fn normalize(
    payload: RawProviderPayload,
    now: DateTime<Utc>,
) -> Result<WeatherRecord, FetchError> {
    let city_name = payload
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| missing("name"))?;
    let coord = payload.coord.ok_or_else(|| missing("coord"))?;
    let main = payload.main.ok_or_else(|| missing("main"))?;

    let condition_summary = payload
        .weather
        .and_then(|conditions| conditions.into_iter().next())
        .and_then(|first| first.description);

    Ok(WeatherRecord {
        id: None,
        city_name,
        latitude: Some(coord.lat.ok_or_else(|| missing("coord.lat"))?),
        longitude: Some(coord.lon.ok_or_else(|| missing("coord.lon"))?),
        temperature_celsius: main.temp.ok_or_else(|| missing("main.temp"))?,
        wind_speed: payload.wind.and_then(|wind| wind.speed),
        humidity_percentage: main.humidity.ok_or_else(|| missing("main.humidity"))?,
        condition_summary,
        last_updated: now,
    })
}

fn missing(field: &str) -> FetchError {
    FetchError::Malformed(format!("missing required field `{field}`"))
}
