use anyhow::{Context, Result};
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::common::types::LoadStats;
use crate::common::Config;
use crate::preprocess::NormalizedRecord;

const TABLE_NAME: &str = "crossref_works";

const CREATE_TABLE_QUERY: &str = "\
CREATE TABLE IF NOT EXISTS crossref_works (
    id SERIAL PRIMARY KEY,
    title TEXT,
    authors TEXT,
    published_date DATE,
    doi TEXT NOT NULL UNIQUE,
    journal TEXT,
    publisher TEXT,
    is_referenced_by_count BIGINT,
    reference_count BIGINT
)";

const INSERT_QUERY: &str = "\
INSERT INTO crossref_works
    (title, authors, published_date, doi, journal, publisher, is_referenced_by_count, reference_count)
VALUES ($1, $2, NULLIF($3, '')::date, $4, $5, $6, $7, $8)
ON CONFLICT (doi) DO NOTHING";

/// Loads normalized records into Postgres.
///
/// The `doi` uniqueness constraint plus `ON CONFLICT DO NOTHING` makes the
/// load idempotent; the in-memory deduplicator upstream is only a first
/// line of defense.
pub struct Loader {
    pool: PgPool,
}

impl Loader {
    /// Connect to the database described by the configuration.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url())
            .await
            .context("Failed to connect to the database")?;

        info!("Connected to the database successfully.");
        Ok(Self { pool })
    }

    /// Create the works table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE_QUERY)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create table {}", TABLE_NAME))?;
        info!("Ensured table {} exists.", TABLE_NAME);
        Ok(())
    }

    /// Insert a batch inside one transaction; records whose DOI is already
    /// present are skipped by the conflict clause.
    pub async fn load(&self, records: &[NormalizedRecord]) -> Result<LoadStats> {
        let mut stats = LoadStats {
            records_received: records.len(),
            ..Default::default()
        };

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for record in records {
            let result = sqlx::query(INSERT_QUERY)
                .bind(&record.title)
                .bind(&record.authors)
                .bind(record.published_date.as_deref().unwrap_or(""))
                .bind(&record.doi)
                .bind(&record.journal)
                .bind(&record.publisher)
                .bind(record.is_referenced_by_count)
                .bind(record.reference_count)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert record with DOI {}", record.doi))?;

            if result.rows_affected() > 0 {
                stats.records_inserted += 1;
            } else {
                stats.records_skipped += 1;
            }
        }

        tx.commit().await.context("Failed to commit transaction")?;
        info!(
            "Loaded {} records ({} inserted, {} already present).",
            stats.records_received, stats.records_inserted, stats.records_skipped
        );

        Ok(stats)
    }
}
