//! Read-side views: what every climate sensor looks like right now, and which
//! sensors have been alerting today.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    db::{
        models::{LatestClimateRow, SensorKind},
        queries,
    },
    liveness::{LivenessRegistry, SensorRef},
    thresholds::{evaluator::Evaluator, Severity},
};

/// Latest value of one side (temperature or humidity) of a sensor position.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SideStatus {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    /// `offline`, `normal`, `warning` or `danger`.
    pub status: String,
    pub severity: Severity,
}

/// Current state of one `(area, sensor_no)` position.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SensorStatus {
    pub area_id: i32,
    pub area_name: String,
    pub sensor_no: i32,
    pub temperature: Option<SideStatus>,
    pub humidity: Option<SideStatus>,
}

/// A sensor whose latest reading today breaches its ladder.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AlertEntry {
    pub kind: SensorKind,
    pub area_id: i32,
    pub area_name: String,
    pub sensor_no: i32,
    pub value: f64,
    pub previous_value: Option<f64>,
    pub recorded_at: DateTime<Utc>,
    pub severity: Severity,
    pub threshold: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct StatusService {
    pool: PgPool,
    evaluator: Evaluator,
    registry: LivenessRegistry,
    display_offset: FixedOffset,
}

impl StatusService {
    pub fn new(
        pool: PgPool,
        evaluator: Evaluator,
        registry: LivenessRegistry,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            pool,
            evaluator,
            registry,
            display_offset,
        }
    }

    pub async fn current_status(&self, now: DateTime<Utc>) -> Result<Vec<SensorStatus>, sqlx::Error> {
        let rows = queries::latest_climate_readings(&self.pool, None).await?;
        let offline: HashSet<String> = self
            .registry
            .snapshot_all()
            .await
            .into_iter()
            .filter(|s| s.is_offline)
            .map(|s| s.key)
            .collect();

        Ok(compose_status(
            &self.evaluator,
            rows,
            &offline,
            self.registry.policy().offline_after,
            now,
        ))
    }

    pub async fn todays_alerts(&self, now: DateTime<Utc>) -> Result<Vec<AlertEntry>, sqlx::Error> {
        let since = local_midnight(now, self.display_offset);
        let rows = queries::latest_climate_readings(&self.pool, Some(since)).await?;
        Ok(alerts_from_rows(&self.evaluator, rows))
    }
}

/// Start of the current day in `offset`, as UTC.
pub fn local_midnight(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_date = now.with_timezone(&offset).date_naive();
    let midnight = local_date.and_time(NaiveTime::MIN);
    // Fixed offsets have no gaps, so the conversion is always unambiguous.
    (midnight - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

fn row_kind(row: &LatestClimateRow) -> Option<SensorKind> {
    match row.kind.parse() {
        Ok(kind) => Some(kind),
        Err(e) => {
            warn!(error = %e, "Skipping row with unexpected kind");
            None
        }
    }
}

fn compose_status(
    evaluator: &Evaluator,
    rows: Vec<LatestClimateRow>,
    offline: &HashSet<String>,
    offline_after: TimeDelta,
    now: DateTime<Utc>,
) -> Vec<SensorStatus> {
    let sites = &evaluator.catalog().sites;
    let mut positions: BTreeMap<(i32, i32), SensorStatus> = BTreeMap::new();

    for row in rows {
        if !sites.contains_area(row.area_id) {
            continue;
        }
        let Some(kind) = row_kind(&row) else { continue };
        let Some(sensor) = SensorRef::climate(kind, row.area_id, row.sensor_no) else {
            continue;
        };

        let severity = evaluator.evaluate(kind, row.area_id, row.sensor_no, row.value).severity;
        let stale = now - row.recorded_at > offline_after;
        let status = if stale || offline.contains(&sensor.key()) {
            "offline"
        } else {
            severity.status_label()
        };
        let side = SideStatus {
            value: row.value,
            recorded_at: row.recorded_at,
            status: status.to_owned(),
            severity,
        };

        let entry = positions
            .entry((row.area_id, row.sensor_no))
            .or_insert_with(|| SensorStatus {
                area_id: row.area_id,
                area_name: sites.area_name(row.area_id),
                sensor_no: row.sensor_no,
                temperature: None,
                humidity: None,
            });
        match kind {
            SensorKind::Temperature => entry.temperature = Some(side),
            SensorKind::Humidity => entry.humidity = Some(side),
            SensorKind::Proximity => {}
        }
    }

    positions.into_values().collect()
}

fn alerts_from_rows(evaluator: &Evaluator, rows: Vec<LatestClimateRow>) -> Vec<AlertEntry> {
    rows.into_iter()
        .filter_map(|row| {
            let kind = row_kind(&row)?;
            let status = evaluator.evaluate(kind, row.area_id, row.sensor_no, row.value);
            status.is_alert.then(|| AlertEntry {
                kind,
                area_id: row.area_id,
                area_name: evaluator.catalog().sites.area_name(row.area_id),
                sensor_no: row.sensor_no,
                value: row.value,
                previous_value: row.previous_value,
                recorded_at: row.recorded_at,
                severity: status.severity,
                threshold: status.threshold,
                message: status.message,
            })
        })
        .collect()
}
