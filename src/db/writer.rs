use sqlx::PgConnection;
use tracing::debug;

use super::models::{ReadingBatch, SensorKind};

#[derive(Debug, thiserror::Error)]
#[error("failed to insert {kind} readings: {source}")]
pub struct StorageError {
    pub kind: SensorKind,
    #[source]
    pub source: sqlx::Error,
}

const INSERT_TEMPERATURE: &str =
    "INSERT INTO temperature_readings (area_id, sensor_no, value, recorded_at) VALUES ($1, $2, $3, $4)";
const INSERT_HUMIDITY: &str =
    "INSERT INTO humidity_readings (area_id, sensor_no, value, recorded_at) VALUES ($1, $2, $3, $4)";
const INSERT_PROXIMITY: &str =
    "INSERT INTO proximity_readings (door_id, value, recorded_at) VALUES ($1, $2, $3)";

/// Inserts every row of `batch` on `conn`, which is expected to be inside a
/// transaction owned by the caller. Never commits or rolls back.
///
/// The statement for each kind is prepared once per connection and cached by
/// sqlx, then executed once per row. The first failing row aborts the batch.
pub async fn batch_insert(conn: &mut PgConnection, batch: &ReadingBatch) -> Result<u64, StorageError> {
    let kind = batch.kind();
    if batch.is_empty() {
        return Ok(0);
    }

    let wrap = |source| StorageError { kind, source };
    let mut inserted = 0;

    match batch {
        ReadingBatch::Temperature(rows) | ReadingBatch::Humidity(rows) => {
            let sql = if kind == SensorKind::Temperature {
                INSERT_TEMPERATURE
            } else {
                INSERT_HUMIDITY
            };
            for row in rows {
                inserted += sqlx::query(sql)
                    .bind(row.area_id)
                    .bind(row.sensor_no)
                    .bind(row.value)
                    .bind(row.recorded_at)
                    .execute(&mut *conn)
                    .await
                    .map_err(wrap)?
                    .rows_affected();
            }
        }
        ReadingBatch::Proximity(rows) => {
            for row in rows {
                inserted += sqlx::query(INSERT_PROXIMITY)
                    .bind(row.door_id)
                    .bind(row.value)
                    .bind(row.recorded_at)
                    .execute(&mut *conn)
                    .await
                    .map_err(wrap)?
                    .rows_affected();
            }
        }
    }

    debug!(kind = %kind, rows = inserted, "Batch inserted");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::{Connection, PgPool};

    use super::*;
    use crate::db::models::{ClimateReading, ProximityReading};

    async fn seed_sites(pool: &PgPool) {
        sqlx::query("INSERT INTO area (area_id, name) VALUES (1, 'Repacking')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO door (door_id, name, area_id) VALUES (1, 'Dock', 1)")
            .execute(pool)
            .await
            .unwrap();
    }

    fn climate(area_id: i32, value: f64) -> ClimateReading {
        ClimateReading {
            area_id,
            sensor_no: 1,
            value,
            recorded_at: Utc::now(),
        }
    }

    async fn count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn empty_batch_is_a_noop(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let n = batch_insert(&mut conn, &ReadingBatch::Humidity(vec![])).await.unwrap();
        assert_eq!(n, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn inserts_all_kinds_inside_caller_transaction(pool: PgPool) {
        seed_sites(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut tx = conn.begin().await.unwrap();

        let temps = ReadingBatch::Temperature(vec![climate(1, 4.5), climate(1, 5.0)]);
        let prox = ReadingBatch::Proximity(vec![ProximityReading {
            door_id: 1,
            value: 1,
            recorded_at: Utc::now(),
        }]);
        assert_eq!(batch_insert(&mut tx, &temps).await.unwrap(), 2);
        assert_eq!(batch_insert(&mut tx, &prox).await.unwrap(), 1);

        // Nothing is visible until the caller commits.
        assert_eq!(count(&pool, "temperature_readings").await, 0);
        tx.commit().await.unwrap();
        assert_eq!(count(&pool, "temperature_readings").await, 2);
        assert_eq!(count(&pool, "proximity_readings").await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn failing_row_reports_kind(pool: PgPool) {
        seed_sites(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let batch = ReadingBatch::Humidity(vec![climate(1, 50.0), climate(99, 50.0)]);

        let err = batch_insert(&mut conn, &batch).await.unwrap_err();
        assert_eq!(err.kind, SensorKind::Humidity);
        assert!(err.to_string().starts_with("failed to insert humidity readings"));
    }
}
