use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Sensor category. Each kind is persisted to its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Proximity,
}

impl SensorKind {
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Proximity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Proximity => "proximity",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown sensor kind: {s}"))
    }
}

/// A temperature (°C) or relative humidity (%) observation from one area sensor.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ClimateReading {
    pub area_id: i32,
    pub sensor_no: i32,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// A door-proximity observation.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ProximityReading {
    pub door_id: i32,
    pub value: i32,
    pub recorded_at: DateTime<Utc>,
}

/// All readings of one kind collected from a single submission.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingBatch {
    Temperature(Vec<ClimateReading>),
    Humidity(Vec<ClimateReading>),
    Proximity(Vec<ProximityReading>),
}

impl ReadingBatch {
    pub fn kind(&self) -> SensorKind {
        match self {
            ReadingBatch::Temperature(_) => SensorKind::Temperature,
            ReadingBatch::Humidity(_) => SensorKind::Humidity,
            ReadingBatch::Proximity(_) => SensorKind::Proximity,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReadingBatch::Temperature(rows) | ReadingBatch::Humidity(rows) => rows.len(),
            ReadingBatch::Proximity(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Most recent reading of one climate sensor, together with the reading before it.
#[derive(Debug, Clone, FromRow)]
pub struct LatestClimateRow {
    pub kind: String,
    pub area_id: i32,
    pub sensor_no: i32,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub previous_value: Option<f64>,
}
