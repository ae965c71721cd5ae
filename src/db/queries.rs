use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::LatestClimateRow;

/// Latest temperature and humidity reading per `(area_id, sensor_no)`, with the
/// value recorded just before it. When `since` is set only readings at or after
/// it are considered, for both the latest and the previous value.
pub async fn latest_climate_readings(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<LatestClimateRow>, sqlx::Error> {
    sqlx::query_as::<_, LatestClimateRow>(
        r#"
        WITH ranked AS (
            SELECT 'temperature' AS kind,
                   area_id,
                   sensor_no,
                   value,
                   recorded_at,
                   LAG(value) OVER (PARTITION BY area_id, sensor_no ORDER BY recorded_at) AS previous_value,
                   ROW_NUMBER() OVER (PARTITION BY area_id, sensor_no ORDER BY recorded_at DESC) AS rn
            FROM temperature_readings
            WHERE $1::timestamptz IS NULL OR recorded_at >= $1
            UNION ALL
            SELECT 'humidity' AS kind,
                   area_id,
                   sensor_no,
                   value,
                   recorded_at,
                   LAG(value) OVER (PARTITION BY area_id, sensor_no ORDER BY recorded_at) AS previous_value,
                   ROW_NUMBER() OVER (PARTITION BY area_id, sensor_no ORDER BY recorded_at DESC) AS rn
            FROM humidity_readings
            WHERE $1::timestamptz IS NULL OR recorded_at >= $1
        )
        SELECT kind, area_id, sensor_no, value, recorded_at, previous_value
        FROM ranked
        WHERE rn = 1
        ORDER BY area_id, sensor_no, kind DESC
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
}
