use std::time::Duration;

use chrono::Utc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::LivenessRegistry;

/// Periodically checks the registry for sensors that have gone silent.
pub struct LivenessScanner {
    registry: LivenessRegistry,
    interval: Duration,
}

impl LivenessScanner {
    pub fn new(registry: LivenessRegistry, interval_secs: u64) -> Self {
        Self {
            registry,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Runs the scan loop indefinitely.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            offline_after_mins = self.registry.policy().offline_after.num_minutes(),
            "Offline detection started"
        );
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    async fn run_once(&self) -> usize {
        let transitions = self.registry.scan_and_notify(Utc::now()).await;
        if transitions > 0 {
            debug!(transitions, "Offline scan finished");
        }
        transitions
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{FixedOffset, TimeDelta};

    use super::*;
    use crate::{
        catalog::Catalog,
        liveness::{LivenessPolicy, SensorRef},
        notify::Notifier,
    };

    fn registry() -> LivenessRegistry {
        LivenessRegistry::new(
            LivenessPolicy::default(),
            Arc::new(Catalog::default()),
            Notifier::disabled(),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    #[tokio::test]
    async fn run_once_marks_stale_sensors_offline() {
        let reg = registry();
        let sensor = SensorRef::Humidity { area_id: 13, sensor_no: 2 };
        reg.register(sensor, Utc::now() - TimeDelta::minutes(30)).await;

        let scanner = LivenessScanner::new(reg.clone(), 60);
        assert_eq!(scanner.run_once().await, 1);
        assert_eq!(scanner.run_once().await, 0);
        assert!(reg.snapshot("humidity-13-2").await.unwrap().is_offline);
    }

    #[tokio::test]
    async fn run_once_leaves_fresh_sensors_alone() {
        let reg = registry();
        reg.register(SensorRef::Proximity { door_id: 1 }, Utc::now()).await;

        let scanner = LivenessScanner::new(reg.clone(), 60);
        assert_eq!(scanner.run_once().await, 0);
        assert!(!reg.snapshot("prox-1").await.unwrap().is_offline);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_scans_on_each_tick() {
        let reg = registry();
        reg.register(SensorRef::Proximity { door_id: 4 }, Utc::now() - TimeDelta::minutes(11))
            .await;

        let handle = tokio::spawn(LivenessScanner::new(reg.clone(), 60).run());
        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(reg.snapshot("prox-4").await.unwrap().is_offline);
        handle.abort();
    }
}
