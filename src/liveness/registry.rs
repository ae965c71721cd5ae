use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::Mutex;
use tracing::info;

use super::{LivenessEvent, LivenessPolicy, SensorRef};
use crate::{catalog::Catalog, notify::Notifier};

/// Last known liveness of one sensor. Callers only ever see clones.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorLivenessState {
    pub key: String,
    pub sensor: SensorRef,
    pub last_seen: DateTime<Utc>,
    pub is_offline: bool,
    pub last_offline_notification_at: Option<DateTime<Utc>>,
}

/// In-memory online/offline tracker for every sensor that has ever reported.
///
/// Entries are created on the first reading and never removed. All mutation
/// goes through one registry-wide lock; notifications are rendered and queued
/// only after it has been released.
#[derive(Debug, Clone)]
pub struct LivenessRegistry {
    sensors: Arc<Mutex<HashMap<String, SensorLivenessState>>>,
    policy: LivenessPolicy,
    catalog: Arc<Catalog>,
    notifier: Notifier,
    display_offset: FixedOffset,
}

impl LivenessRegistry {
    pub fn new(
        policy: LivenessPolicy,
        catalog: Arc<Catalog>,
        notifier: Notifier,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            sensors: Arc::default(),
            policy,
            catalog,
            notifier,
            display_offset,
        }
    }

    pub fn policy(&self) -> LivenessPolicy {
        self.policy
    }

    /// Records a reading from `sensor` and returns the transition it caused, if any.
    pub async fn register(&self, sensor: SensorRef, seen_at: DateTime<Utc>) -> Option<LivenessEvent> {
        let key = sensor.key();
        let mut sensors = self.sensors.lock().await;

        let Some(state) = sensors.get_mut(&key) else {
            sensors.insert(
                key.clone(),
                SensorLivenessState {
                    key,
                    sensor,
                    last_seen: seen_at,
                    is_offline: false,
                    last_offline_notification_at: None,
                },
            );
            return None;
        };

        // Late, out-of-order readings must not move the clock backwards.
        state.last_seen = state.last_seen.max(seen_at);
        if state.is_offline {
            state.is_offline = false;
            Some(LivenessEvent::BackOnline { sensor, seen_at })
        } else {
            None
        }
    }

    /// Walks every sensor once and returns the offline / reminder transitions.
    pub async fn scan(&self, now: DateTime<Utc>) -> Vec<LivenessEvent> {
        let mut sensors = self.sensors.lock().await;
        let mut events = Vec::new();

        for state in sensors.values_mut() {
            let silent_for = now - state.last_seen;
            if silent_for <= self.policy.offline_after {
                continue;
            }

            match (state.is_offline, state.last_offline_notification_at) {
                (false, _) => {
                    state.is_offline = true;
                    state.last_offline_notification_at = Some(now);
                    events.push(LivenessEvent::WentOffline {
                        sensor: state.sensor,
                        last_seen: state.last_seen,
                        silent_for,
                    });
                }
                (true, Some(previous)) if now - previous >= self.policy.remind_every => {
                    state.last_offline_notification_at = Some(now);
                    events.push(LivenessEvent::StillOffline {
                        sensor: state.sensor,
                        last_seen: state.last_seen,
                        silent_for,
                        previous_notification: previous,
                    });
                }
                (true, _) => {}
            }
        }

        events
    }

    /// [`register`](Self::register), then announce the transition.
    pub async fn register_or_update(&self, sensor: SensorRef, seen_at: DateTime<Utc>) {
        if let Some(event) = self.register(sensor, seen_at).await {
            self.announce(&event);
        }
    }

    /// [`scan`](Self::scan), then announce every transition. Returns how many there were.
    pub async fn scan_and_notify(&self, now: DateTime<Utc>) -> usize {
        let events = self.scan(now).await;
        for event in &events {
            self.announce(event);
        }
        events.len()
    }

    pub async fn snapshot(&self, key: &str) -> Option<SensorLivenessState> {
        self.sensors.lock().await.get(key).cloned()
    }

    /// Every known sensor, ordered by key.
    pub async fn snapshot_all(&self) -> Vec<SensorLivenessState> {
        let mut all: Vec<_> = self.sensors.lock().await.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    fn announce(&self, event: &LivenessEvent) {
        let key = event.sensor().key();
        match event {
            LivenessEvent::WentOffline { silent_for, .. } => {
                info!(sensor = %key, silent_mins = silent_for.num_minutes(), "Sensor went offline")
            }
            LivenessEvent::StillOffline { silent_for, .. } => {
                info!(sensor = %key, silent_mins = silent_for.num_minutes(), "Sensor still offline")
            }
            LivenessEvent::BackOnline { .. } => info!(sensor = %key, "Sensor back online"),
        }
        self.notifier
            .notify(event.render(&self.catalog.sites, self.display_offset));
    }
}
