//! Core library for the `weather-aggregator` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap fetcher and the fetcher abstraction
//! - Append-only record stores
//! - The cache-or-fetch weather service and the priority refresh scheduler
//!
//! It is used by `aggregator-cli`, but an HTTP layer can sit on
//! [`WeatherService::view`] just as well.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod scheduler;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{FetchError, StorageError, WeatherError};
pub use model::{
    RawCondition, RawCoord, RawMain, RawProviderPayload, RawWind, WeatherRecord, WeatherView,
};
pub use provider::{WeatherFetcher, fetcher_from_config, openweather::OpenWeatherFetcher};
pub use scheduler::RefreshScheduler;
pub use service::WeatherService;
pub use store::{FileStore, MemoryStore, WeatherStore};
