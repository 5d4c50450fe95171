//! Periodic cache warm-up for priority cities.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{Config, WeatherService};

#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    service: WeatherService,
    cities: Arc<[String]>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(service: WeatherService, cities: Vec<String>, interval: Duration) -> Self {
        Self {
            service,
            cities: cities.into(),
            interval,
        }
    }

    pub fn from_config(service: WeatherService, config: &Config) -> Self {
        Self::new(
            service,
            config.priority_cities.clone(),
            config.refresh_interval(),
        )
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Refresh every priority city once, in list order.
    ///
    /// A failing city is logged and skipped; it never stops the rest.
    pub async fn refresh_once(&self) {
        info!(cities = self.cities.len(), "starting scheduled weather refresh");

        for city in self.cities.iter() {
            match self.service.get_weather(city).await {
                Ok(record) => info!(
                    city = %city,
                    last_updated = %record.last_updated,
                    "refreshed weather"
                ),
                Err(err) => warn!(city = %city, error = %err, "failed to refresh weather"),
            }
        }
    }

    /// Tick every `interval` until `cancel` fires. The first tick is immediate.
    ///
    /// Cancellation is only checked between ticks, so a tick in progress
    /// always finishes its city list.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.refresh_once().await;
        }

        info!("weather refresh loop stopped");
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        FetchError, RawCoord, RawMain, RawProviderPayload, provider::WeatherFetcher,
        store::{MemoryStore, WeatherStore},
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    /// Fails for the cities in `broken`, succeeds for everything else.
    /// A fetch for `held` signals `entered` and waits for `release`.
    #[derive(Debug, Default)]
    struct ScriptedFetcher {
        broken: Vec<String>,
        held: Option<String>,
        entered: Notify,
        release: Notify,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn failing_for(cities: &[&str]) -> Self {
            Self {
                broken: cities.iter().map(|c| c.to_string()).collect(),
                ..Self::default()
            }
        }

        fn holding(city: &str) -> Self {
            Self {
                held: Some(city.to_string()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl WeatherFetcher for ScriptedFetcher {
        async fn fetch(&self, city: &str) -> Result<RawProviderPayload, FetchError> {
            self.calls.lock().push(city.to_string());
            if self.held.as_deref() == Some(city) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            if self.broken.iter().any(|b| b == city) {
                return Err(FetchError::Timeout);
            }
            Ok(RawProviderPayload {
                name: Some(city.to_string()),
                coord: Some(RawCoord {
                    lat: Some(0.0),
                    lon: Some(0.0),
                }),
                main: Some(RawMain {
                    temp: Some(15.0),
                    humidity: Some(40),
                }),
                wind: None,
                weather: None,
            })
        }
    }

    fn scheduler(
        cities: &[&str],
        fetcher: &Arc<ScriptedFetcher>,
        store: &Arc<MemoryStore>,
        interval: Duration,
    ) -> RefreshScheduler {
        let service = WeatherService::new(
            store.clone(),
            fetcher.clone(),
            chrono::Duration::minutes(30),
        );
        RefreshScheduler::new(
            service,
            cities.iter().map(|c| c.to_string()).collect(),
            interval,
        )
    }

    #[tokio::test]
    async fn one_failing_city_does_not_stop_the_others() {
        let fetcher = Arc::new(ScriptedFetcher::failing_for(&["B"]));
        let store = Arc::new(MemoryStore::new());
        let sched = scheduler(&["A", "B", "C"], &fetcher, &store, Duration::from_secs(60));

        sched.refresh_once().await;

        assert_eq!(fetcher.calls(), vec!["A", "B", "C"]);
        assert!(store.find_latest("A").await.unwrap().is_some());
        assert!(store.find_latest("B").await.unwrap().is_none());
        assert!(store.find_latest("C").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn fresh_cities_are_not_refetched_within_ttl() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = Arc::new(MemoryStore::new());
        let sched = scheduler(&["A", "B"], &fetcher, &store, Duration::from_secs(60));

        sched.refresh_once().await;
        sched.refresh_once().await;

        assert_eq!(fetcher.calls().len(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn from_config_takes_cities_and_interval() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = Arc::new(MemoryStore::new());
        let service = WeatherService::new(store, fetcher, chrono::Duration::minutes(30));

        let cfg = Config::default();
        let sched = RefreshScheduler::from_config(service, &cfg);

        assert_eq!(sched.cities(), ["New York", "London", "Tokyo"]);
        assert_eq!(sched.interval(), Duration::from_secs(30 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ticks_immediately_and_stops_on_cancel() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = Arc::new(MemoryStore::new());
        let sched = scheduler(&["A"], &fetcher, &store, Duration::from_secs(60));

        let cancel = CancellationToken::new();
        let handle = sched.spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fetcher.calls(), vec!["A"]);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_during_a_tick_lets_it_finish_every_city() {
        let fetcher = Arc::new(ScriptedFetcher::holding("A"));
        let store = Arc::new(MemoryStore::new());
        let sched = scheduler(&["A", "B", "C"], &fetcher, &store, Duration::from_secs(60));

        let cancel = CancellationToken::new();
        let handle = sched.spawn(cancel.clone());

        fetcher.entered.notified().await;
        cancel.cancel();
        fetcher.release.notify_one();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("refresh loop should stop after the tick")
            .unwrap();

        assert_eq!(fetcher.calls(), vec!["A", "B", "C"]);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn cancelled_before_start_never_ticks() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = Arc::new(MemoryStore::new());
        let sched = scheduler(&["A"], &fetcher, &store, Duration::from_secs(60));

        let cancel = CancellationToken::new();
        cancel.cancel();
        sched.run(cancel).await;

        assert!(fetcher.calls().is_empty());
    }
}
