use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::SensorKind,
    liveness::{SensorLivenessState, SensorRef},
};

/// Body of a successful `POST /data`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    /// Always `success`.
    pub status: String,
    pub message: String,
}

impl IngestResponse {
    pub fn processed(items: usize) -> Self {
        Self {
            status: "success".into(),
            message: format!("Successfully processed {items} data items."),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `error`.
    pub status: String,
    pub message: String,
    /// Per-kind storage failures, present only when persisting failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

/// Liveness record of one sensor.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorLivenessDto {
    /// e.g. `temperature-1-1` or `prox-7`.
    pub key: String,
    pub kind: SensorKind,
    pub area_id: Option<i32>,
    pub sensor_no: Option<i32>,
    pub door_id: Option<i32>,
    pub last_seen: DateTime<Utc>,
    pub is_offline: bool,
    pub last_offline_notification_at: Option<DateTime<Utc>>,
}

impl From<SensorLivenessState> for SensorLivenessDto {
    fn from(s: SensorLivenessState) -> Self {
        let (area_id, sensor_no, door_id) = match s.sensor {
            SensorRef::Temperature { area_id, sensor_no } | SensorRef::Humidity { area_id, sensor_no } => {
                (Some(area_id), Some(sensor_no), None)
            }
            SensorRef::Proximity { door_id } => (None, None, Some(door_id)),
        };
        Self {
            key: s.key,
            kind: s.sensor.kind(),
            area_id,
            sensor_no,
            door_id,
            last_seen: s.last_seen,
            is_offline: s.is_offline,
            last_offline_notification_at: s.last_offline_notification_at,
        }
    }
}
