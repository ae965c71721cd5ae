pub mod models;
pub mod queries;
pub mod writer;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::sites::SiteDirectory;

pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to the database")?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}

/// Upserts the catalog's areas and doors so reading rows can reference them.
pub async fn sync_sites(pool: &PgPool, sites: &SiteDirectory) -> Result<()> {
    let mut tx = pool.begin().await?;

    for area in sites.areas() {
        sqlx::query(
            "INSERT INTO area (area_id, name) VALUES ($1, $2)
             ON CONFLICT (area_id) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(area.id)
        .bind(&area.name)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to upsert area {}", area.id))?;
    }

    for door in sites.doors() {
        sqlx::query(
            "INSERT INTO door (door_id, name, area_id) VALUES ($1, $2, $3)
             ON CONFLICT (door_id) DO UPDATE SET name = EXCLUDED.name, area_id = EXCLUDED.area_id",
        )
        .bind(door.id)
        .bind(&door.name)
        .bind(door.area)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to upsert door {}", door.id))?;
    }

    tx.commit().await?;
    info!(
        areas = sites.areas().len(),
        doors = sites.doors().len(),
        "Site directory synced to database"
    );
    Ok(())
}
