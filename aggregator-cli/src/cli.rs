use std::{path::PathBuf, sync::Arc};

use aggregator_core::{
    Config, FileStore, RefreshScheduler, WeatherRecord, WeatherService, WeatherView,
    config::{MAX_DURATION_MINUTES, interval_from_minutes},
    fetcher_from_config,
};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-aggregator", version, about = "Cached city weather from OpenWeatherMap")]
pub struct Cli {
    /// Record store file; defaults to the platform data directory.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key and priority cities.
    Configure,

    /// Show current weather for a city, using the cache when fresh.
    Show {
        /// City name, e.g. "London".
        city: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Refresh every priority city once.
    Refresh,

    /// Keep priority cities warm until interrupted.
    Watch {
        /// Override the configured refresh interval.
        #[arg(long)]
        interval_minutes: Option<u64>,
    },

    /// Print the location of the config file.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
            Command::Show { city, json } => {
                let cfg = Config::load()?;
                let service = build_service(&cfg, self.store)?;

                let record = service
                    .get_weather(&city)
                    .await
                    .with_context(|| format!("No weather available for '{city}' right now"))?;

                if json {
                    let view = WeatherView::from(&record);
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    print_record(&record);
                }
                Ok(())
            }
            Command::Refresh => {
                let cfg = Config::load()?;
                let service = build_service(&cfg, self.store)?;
                RefreshScheduler::from_config(service, &cfg).refresh_once().await;
                Ok(())
            }
            Command::Watch { interval_minutes } => {
                let cfg = Config::load()?;
                if !cfg.refresh_enabled {
                    info!("refresh_enabled is off in config; running because `watch` was requested");
                }

                let service = build_service(&cfg, self.store)?;
                let interval = match interval_minutes {
                    Some(0) => bail!("--interval-minutes must be greater than zero"),
                    Some(minutes) if minutes > MAX_DURATION_MINUTES => {
                        bail!("--interval-minutes must be at most {MAX_DURATION_MINUTES}")
                    }
                    Some(minutes) => interval_from_minutes(minutes),
                    None => cfg.refresh_interval(),
                };
                let scheduler = RefreshScheduler::new(service, cfg.priority_cities.clone(), interval);

                info!(
                    cities = ?scheduler.cities(),
                    interval_secs = interval.as_secs(),
                    "starting refresh loop, press Ctrl-C to stop"
                );

                let cancel = CancellationToken::new();
                let handle = scheduler.spawn(cancel.clone());

                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for Ctrl-C")?;
                info!("shutting down after the current refresh completes");
                cancel.cancel();
                handle.await.context("Refresh loop panicked")?;
                Ok(())
            }
        }
    }
}

fn build_service(cfg: &Config, store_override: Option<PathBuf>) -> Result<WeatherService> {
    let fetcher = fetcher_from_config(cfg)?;

    let path = match store_override {
        Some(path) => path,
        None => Config::default_store_path()?,
    };
    let store = FileStore::new(path);

    Ok(WeatherService::new(
        Arc::new(store),
        Arc::new(fetcher),
        cfg.cache_ttl(),
    ))
}

fn configure() -> Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Password::new("OpenWeatherMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    cfg.set_api_key(api_key.trim().to_string());

    let current = cfg.priority_cities.join(", ");
    let cities = Text::new("Priority cities (comma separated):")
        .with_default(&current)
        .prompt()
        .context("Failed to read priority cities")?;
    cfg.priority_cities = parse_city_list(&cities);

    cfg.validate()?;
    cfg.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn parse_city_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

fn print_record(record: &WeatherRecord) {
    println!("{}", record.city_name);
    println!("  Temperature: {:.1} °C", record.temperature_celsius);
    println!("  Humidity:    {}%", record.humidity_percentage);
    match record.wind_speed {
        Some(speed) => println!("  Wind:        {speed:.1} m/s"),
        None => println!("  Wind:        n/a"),
    }
    println!(
        "  Condition:   {}",
        record.condition_summary.as_deref().unwrap_or("n/a")
    );
    let age = Utc::now().signed_duration_since(record.last_updated);
    println!(
        "  Updated:     {} ({} min ago)",
        record.last_updated.format("%Y-%m-%d %H:%M:%S UTC"),
        age.num_minutes().max(0)
    );
}
