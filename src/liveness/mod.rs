//! Sensor liveness: which sensors have gone silent, and telling people about it.

pub mod registry;
pub mod scanner;

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};

use crate::{db::models::SensorKind, sites::SiteDirectory};

pub use registry::{LivenessRegistry, SensorLivenessState};
pub use scanner::LivenessScanner;

/// Identity of one physical sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorRef {
    Temperature { area_id: i32, sensor_no: i32 },
    Humidity { area_id: i32, sensor_no: i32 },
    Proximity { door_id: i32 },
}

impl SensorRef {
    /// Builds a temperature or humidity reference. Returns `None` for proximity.
    pub fn climate(kind: SensorKind, area_id: i32, sensor_no: i32) -> Option<Self> {
        match kind {
            SensorKind::Temperature => Some(SensorRef::Temperature { area_id, sensor_no }),
            SensorKind::Humidity => Some(SensorRef::Humidity { area_id, sensor_no }),
            SensorKind::Proximity => None,
        }
    }

    pub fn kind(&self) -> SensorKind {
        match self {
            SensorRef::Temperature { .. } => SensorKind::Temperature,
            SensorRef::Humidity { .. } => SensorKind::Humidity,
            SensorRef::Proximity { .. } => SensorKind::Proximity,
        }
    }

    /// Registry key: `temperature-{area}-{no}`, `humidity-{area}-{no}` or `prox-{door}`.
    pub fn key(&self) -> String {
        match self {
            SensorRef::Temperature { area_id, sensor_no }
            | SensorRef::Humidity { area_id, sensor_no } => {
                format!("{}-{area_id}-{sensor_no}", self.kind())
            }
            SensorRef::Proximity { door_id } => format!("prox-{door_id}"),
        }
    }

    /// Human-readable description, e.g. "Temperature in area 2 sensor 1 (Meat/Pawn Storage)".
    pub fn friendly_name(&self, sites: &SiteDirectory) -> String {
        match *self {
            SensorRef::Temperature { area_id, sensor_no } => format!(
                "Temperature in area {area_id} sensor {sensor_no} ({})",
                sites.area_name(area_id)
            ),
            SensorRef::Humidity { area_id, sensor_no } => format!(
                "Humidity in area {area_id} sensor {sensor_no} ({})",
                sites.area_name(area_id)
            ),
            SensorRef::Proximity { door_id } => {
                let door = sites.door_info(door_id);
                format!(
                    "Proximity at door {door_id} ({}) in {}",
                    door.name, door.area_name
                )
            }
        }
    }
}

/// How long a sensor may stay silent, and how often to repeat the alarm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivenessPolicy {
    pub offline_after: TimeDelta,
    pub remind_every: TimeDelta,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            offline_after: TimeDelta::minutes(10),
            remind_every: TimeDelta::hours(1),
        }
    }
}

/// A state transition worth telling someone about.
#[derive(Debug, Clone, PartialEq)]
pub enum LivenessEvent {
    WentOffline {
        sensor: SensorRef,
        last_seen: DateTime<Utc>,
        silent_for: TimeDelta,
    },
    StillOffline {
        sensor: SensorRef,
        last_seen: DateTime<Utc>,
        silent_for: TimeDelta,
        previous_notification: DateTime<Utc>,
    },
    BackOnline {
        sensor: SensorRef,
        seen_at: DateTime<Utc>,
    },
}

impl LivenessEvent {
    pub fn sensor(&self) -> SensorRef {
        match self {
            LivenessEvent::WentOffline { sensor, .. }
            | LivenessEvent::StillOffline { sensor, .. }
            | LivenessEvent::BackOnline { sensor, .. } => *sensor,
        }
    }

    /// Markdown text for the notification channel.
    pub fn render(&self, sites: &SiteDirectory, offset: FixedOffset) -> String {
        let sensor = self.sensor();
        let name = sensor.friendly_name(sites);
        let key = sensor.key();

        match self {
            LivenessEvent::WentOffline { last_seen, silent_for, .. } => format!(
                "⚠️ **Sensor offline**\nSensor {name} ({key}) has not sent data for {} minutes.\nLast seen: {}",
                silent_for.num_minutes(),
                display_time(*last_seen, offset),
            ),
            LivenessEvent::StillOffline {
                last_seen,
                silent_for,
                previous_notification,
                ..
            } => format!(
                "🕒 **Sensor still offline (reminder)**\nSensor {name} ({key}) is still not sending data.\n\
                 Total time offline: {} minutes.\nPrevious notification sent {}.\nLast seen: {}",
                silent_for.num_minutes(),
                display_time(*previous_notification, offset),
                display_time(*last_seen, offset),
            ),
            LivenessEvent::BackOnline { seen_at, .. } => format!(
                "✅ **Sensor online**\nSensor {name} ({key}) is sending data again.\nLatest data at: {}",
                display_time(*seen_at, offset),
            ),
        }
    }
}

/// RFC 1123 style timestamp in the display offset.
pub fn display_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset)
        .format("%a, %d %b %Y %H:%M:%S %:z")
        .to_string()
}
