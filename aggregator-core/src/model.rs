use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored observation for a city.
///
/// Records are never updated in place: every refresh appends a new one and
/// lookups pick the record with the latest `last_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Surrogate id assigned by the store on save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub city_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature_celsius: f64,
    pub wind_speed: Option<f64>,
    pub humidity_percentage: u8,
    pub condition_summary: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl WeatherRecord {
    /// Whether this record belongs to `city` (trimmed, ASCII case-insensitive).
    pub fn is_for_city(&self, city: &str) -> bool {
        self.city_name.trim().eq_ignore_ascii_case(city.trim())
    }
}

/// Response body of the OpenWeatherMap current-weather endpoint.
///
/// Every field is optional here; required fields are checked during
/// normalization so the error can name what is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProviderPayload {
    pub name: Option<String>,
    pub coord: Option<RawCoord>,
    pub main: Option<RawMain>,
    pub wind: Option<RawWind>,
    pub weather: Option<Vec<RawCondition>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCoord {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMain {
    pub temp: Option<f64>,
    pub humidity: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWind {
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCondition {
    pub description: Option<String>,
    pub main: Option<String>,
}

/// What the query surface hands back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherView {
    pub city: String,
    pub temperature: f64,
    pub wind_speed: Option<f64>,
    pub humidity: u8,
    pub condition: Option<String>,
}

impl From<&WeatherRecord> for WeatherView {
    fn from(record: &WeatherRecord) -> Self {
        Self {
            city: record.city_name.clone(),
            temperature: record.temperature_celsius,
            wind_speed: record.wind_speed,
            humidity: record.humidity_percentage,
            condition: record.condition_summary.clone(),
        }
    }
}

impl From<WeatherRecord> for WeatherView {
    fn from(record: WeatherRecord) -> Self {
        Self {
            city: record.city_name,
            temperature: record.temperature_celsius,
            wind_speed: record.wind_speed,
            humidity: record.humidity_percentage,
            condition: record.condition_summary,
        }
    }
}
