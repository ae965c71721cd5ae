//! Wire format of `POST /data` and its validation into per-kind batches.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use super::IngestError;
use crate::{
    db::models::{ClimateReading, ProximityReading, ReadingBatch},
    liveness::SensorRef,
};

/// One device report. A single report may carry temperature, humidity and
/// proximity at once; they share `area`, `door`, `no` and `ts`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct RawReading {
    pub area: Option<i32>,
    pub door: Option<i32>,
    /// Sensor index inside the area. Defaults to 1.
    pub no: Option<i32>,
    /// RFC 3339 timestamp. Ingestion time when absent or empty.
    pub ts: Option<String>,
    /// Temperature in °C.
    pub temp: Option<f64>,
    /// Relative humidity in %.
    pub rh: Option<f64>,
    /// Door proximity state.
    pub prox: Option<i32>,
}

/// `POST /data` accepts either one report or an array of them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Submission {
    Many(Vec<RawReading>),
    One(RawReading),
}

impl Submission {
    pub fn from_slice(body: &[u8]) -> Result<Self, IngestError> {
        serde_json::from_slice(body).map_err(IngestError::Malformed)
    }

    pub fn into_items(self) -> Vec<RawReading> {
        match self {
            Submission::Many(items) => items,
            Submission::One(item) => vec![item],
        }
    }
}

/// A validated submission, split by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitioned {
    /// Number of reports in the submission.
    pub items: usize,
    pub temperature: Vec<ClimateReading>,
    pub humidity: Vec<ClimateReading>,
    pub proximity: Vec<ProximityReading>,
    /// Liveness updates in submission order.
    pub seen: Vec<(SensorRef, DateTime<Utc>)>,
}

impl Partitioned {
    /// Non-empty batches in insertion order: temperature, humidity, proximity.
    pub fn into_batches(self) -> Vec<ReadingBatch> {
        [
            ReadingBatch::Temperature(self.temperature),
            ReadingBatch::Humidity(self.humidity),
            ReadingBatch::Proximity(self.proximity),
        ]
        .into_iter()
        .filter(|b| !b.is_empty())
        .collect()
    }
}

/// Validates every report and splits the readings by kind.
///
/// Nothing is returned unless the whole submission is valid.
pub fn partition(items: Vec<RawReading>, now: DateTime<Utc>) -> Result<Partitioned, IngestError> {
    if items.is_empty() {
        return Err(IngestError::Empty);
    }

    let mut out = Partitioned {
        items: items.len(),
        ..Partitioned::default()
    };

    for (index, item) in items.into_iter().enumerate() {
        let recorded_at = parse_ts(index, item.ts.as_deref(), now)?;
        let sensor_no = item.no.unwrap_or(1);

        if item.temp.is_none() && item.rh.is_none() && item.prox.is_none() {
            return Err(IngestError::NoReading { index });
        }

        if item.temp.is_some() || item.rh.is_some() {
            let area_id = item.area.ok_or(IngestError::MissingArea {
                index,
                kind: if item.temp.is_some() { "temperature" } else { "humidity" },
            })?;

            if let Some(value) = item.temp {
                out.temperature.push(ClimateReading { area_id, sensor_no, value, recorded_at });
                out.seen.push((SensorRef::Temperature { area_id, sensor_no }, recorded_at));
            }
            if let Some(value) = item.rh {
                out.humidity.push(ClimateReading { area_id, sensor_no, value, recorded_at });
                out.seen.push((SensorRef::Humidity { area_id, sensor_no }, recorded_at));
            }
        }

        if let Some(value) = item.prox {
            let door_id = item.door.ok_or(IngestError::MissingDoor { index })?;
            out.proximity.push(ProximityReading { door_id, value, recorded_at });
            out.seen.push((SensorRef::Proximity { door_id }, recorded_at));
        }
    }

    Ok(out)
}

fn parse_ts(index: usize, ts: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>, IngestError> {
    match ts.map(str::trim) {
        None | Some("") => Ok(now),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| IngestError::InvalidTimestamp {
                index,
                value: raw.to_owned(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn parse(json: &str) -> Result<Partitioned, IngestError> {
        partition(Submission::from_slice(json.as_bytes())?.into_items(), now())
    }

    #[test]
    fn single_object_equals_one_element_array() {
        let one = parse(r#"{"area":1,"no":2,"temp":12.0}"#).unwrap();
        let many = parse(r#"[{"area":1,"no":2,"temp":12.0}]"#).unwrap();
        assert_eq!(one, many);
        assert_eq!(one.items, 1);
    }

    #[test]
    fn defaults_sensor_no_and_timestamp() {
        let p = parse(r#"{"area":3,"rh":55.5}"#).unwrap();
        assert_eq!(
            p.humidity,
            vec![ClimateReading { area_id: 3, sensor_no: 1, value: 55.5, recorded_at: now() }]
        );
        assert_eq!(p.seen, vec![(SensorRef::Humidity { area_id: 3, sensor_no: 1 }, now())]);
    }

    #[test]
    fn empty_ts_means_now() {
        let p = parse(r#"{"door":2,"prox":1,"ts":""}"#).unwrap();
        assert_eq!(p.proximity[0].recorded_at, now());
    }

    #[test]
    fn rfc3339_with_nanos_and_offset_is_accepted() {
        let p = parse(r#"{"area":1,"temp":1.0,"ts":"2024-05-01T15:30:00.123456789+07:00"}"#).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
            + chrono::TimeDelta::nanoseconds(123_456_789);
        assert_eq!(p.temperature[0].recorded_at, expected);
    }

    #[test]
    fn one_report_can_carry_all_kinds() {
        let p = parse(r#"{"area":4,"door":4,"no":2,"temp":-19.0,"rh":40.0,"prox":0}"#).unwrap();
        assert_eq!(p.temperature.len(), 1);
        assert_eq!(p.humidity.len(), 1);
        assert_eq!(p.proximity.len(), 1);
        assert_eq!(p.seen.len(), 3);

        let kinds: Vec<_> = p.into_batches().iter().map(|b| b.kind()).collect();
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn into_batches_skips_empty_kinds() {
        let p = parse(r#"[{"door":1,"prox":1},{"door":2,"prox":0}]"#).unwrap();
        let batches = p.into_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[test]
    fn empty_array_is_rejected() {
        assert!(matches!(parse("[]"), Err(IngestError::Empty)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(parse("{not json"), Err(IngestError::Malformed(_))));
        assert!(matches!(parse(r#"{"area":"one","temp":1}"#), Err(IngestError::Malformed(_))));
        assert!(matches!(parse("42"), Err(IngestError::Malformed(_))));
    }

    #[test]
    fn bad_timestamp_names_the_item() {
        let err = parse(r#"[{"area":1,"temp":1},{"area":1,"temp":2,"ts":"yesterday"}]"#).unwrap_err();
        match err {
            IngestError::InvalidTimestamp { index, value } => {
                assert_eq!(index, 1);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn climate_reading_without_area_is_rejected() {
        assert!(matches!(
            parse(r#"{"rh":50}"#),
            Err(IngestError::MissingArea { index: 0, kind: "humidity" })
        ));
    }

    #[test]
    fn proximity_without_door_is_rejected() {
        assert!(matches!(
            parse(r#"{"area":1,"prox":1}"#),
            Err(IngestError::MissingDoor { index: 0 })
        ));
    }

    #[test]
    fn report_without_reading_is_rejected() {
        assert!(matches!(parse(r#"{"area":1}"#), Err(IngestError::NoReading { index: 0 })));
        assert!(matches!(parse("{}"), Err(IngestError::NoReading { index: 0 })));
    }
}
