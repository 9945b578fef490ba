use crate::storage::traits::{
    HistoryStore, PersistenceSink, SessionStore, StorageError, StorageResult,
};
use async_trait::async_trait;
use chrono::Utc;
use eeg_core::{
    BandPowerRecord, BandPowers, IngestMode, RawBlockId, RawBlockRecord, Sample, SessionId,
    SessionRecord, SessionRequest,
};
use sqlx::mysql::{MySqlConnection, MySqlPoolOptions, MySqlQueryResult, MySqlRow};
use sqlx::{MySqlPool, Row};
use tracing::info;

/// MySQL implementation of the record store
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to MySQL ({} max connections)", max_connections);
        Ok(Self::new(pool))
    }

    /// Initialize database schema
    pub async fn initialize(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                first_name VARCHAR(255) NOT NULL,
                last_name VARCHAR(255) NOT NULL,
                activity VARCHAR(255) NOT NULL,
                started_at TIMESTAMP(3) NOT NULL,
                INDEX idx_sessions_started (started_at)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS raw_blocks (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                sample_rate INT UNSIGNED NOT NULL,
                samples LONGTEXT NOT NULL,
                session_id BIGINT NULL,
                created_at TIMESTAMP(3) NOT NULL DEFAULT CURRENT_TIMESTAMP(3),
                INDEX idx_raw_blocks_session (session_id),
                CONSTRAINT fk_raw_blocks_session
                    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE SET NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS band_powers (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                raw_block_id BIGINT NOT NULL,
                delta DOUBLE NOT NULL,
                theta DOUBLE NOT NULL,
                alpha DOUBLE NOT NULL,
                beta DOUBLE NOT NULL,
                gamma DOUBLE NOT NULL,
                created_at TIMESTAMP(3) NOT NULL DEFAULT CURRENT_TIMESTAMP(3),
                INDEX idx_band_powers_created (created_at),
                CONSTRAINT fk_band_powers_raw_block
                    FOREIGN KEY (raw_block_id) REFERENCES raw_blocks(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS eeg_data (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                delta DOUBLE NOT NULL,
                theta DOUBLE NOT NULL,
                alpha DOUBLE NOT NULL,
                beta DOUBLE NOT NULL,
                gamma DOUBLE NOT NULL,
                session_id BIGINT NULL,
                created_at TIMESTAMP(3) NOT NULL DEFAULT CURRENT_TIMESTAMP(3),
                INDEX idx_eeg_data_created (created_at),
                INDEX idx_eeg_data_session (session_id),
                CONSTRAINT fk_eeg_data_session
                    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE SET NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

async fn insert_raw_block(
    conn: &mut MySqlConnection,
    sample_rate: u32,
    samples: &[Sample],
    session: Option<SessionId>,
) -> StorageResult<RawBlockId> {
    let samples_json = serde_json::to_string(samples)?;

    let result = sqlx::query(
        "INSERT INTO raw_blocks (sample_rate, samples, session_id) VALUES (?, ?, ?)",
    )
    .bind(sample_rate)
    .bind(samples_json)
    .bind(session)
    .execute(&mut *conn)
    .await?;

    inserted_id(&result)
}

async fn insert_band_powers(
    conn: &mut MySqlConnection,
    raw_block_id: RawBlockId,
    powers: &BandPowers,
) -> StorageResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO band_powers (raw_block_id, delta, theta, alpha, beta, gamma)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(raw_block_id)
    .bind(powers.delta)
    .bind(powers.theta)
    .bind(powers.alpha)
    .bind(powers.beta)
    .bind(powers.gamma)
    .execute(&mut *conn)
    .await?;

    inserted_id(&result)
}

fn inserted_id(result: &MySqlQueryResult) -> StorageResult<i64> {
    let id = result.last_insert_id();
    i64::try_from(id).map_err(|_| StorageError::InvalidId(id))
}

fn powers_from_row(row: &MySqlRow) -> StorageResult<BandPowers> {
    Ok(BandPowers {
        delta: row.try_get("delta")?,
        theta: row.try_get("theta")?,
        alpha: row.try_get("alpha")?,
        beta: row.try_get("beta")?,
        gamma: row.try_get("gamma")?,
    })
}

fn record_from_row(row: &MySqlRow, mode: IngestMode) -> StorageResult<BandPowerRecord> {
    let raw_block_id = match mode {
        IngestMode::Samples => Some(row.try_get("raw_block_id")?),
        IngestMode::Bands => None,
    };

    Ok(BandPowerRecord {
        id: row.try_get("id")?,
        raw_block_id,
        powers: powers_from_row(row)?,
        created_at: row.try_get("created_at")?,
    })
}

fn session_from_row(row: &MySqlRow) -> StorageResult<SessionRecord> {
    Ok(SessionRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        activity: row.try_get("activity")?,
        started_at: row.try_get("started_at")?,
    })
}

fn history_query(mode: IngestMode, latest_only: bool) -> &'static str {
    match (mode, latest_only) {
        (IngestMode::Samples, false) => {
            "SELECT id, raw_block_id, delta, theta, alpha, beta, gamma, created_at \
             FROM band_powers ORDER BY created_at DESC, id DESC"
        }
        (IngestMode::Samples, true) => {
            "SELECT id, raw_block_id, delta, theta, alpha, beta, gamma, created_at \
             FROM band_powers ORDER BY created_at DESC, id DESC LIMIT 1"
        }
        (IngestMode::Bands, false) => {
            "SELECT id, delta, theta, alpha, beta, gamma, created_at \
             FROM eeg_data ORDER BY created_at DESC, id DESC"
        }
        (IngestMode::Bands, true) => {
            "SELECT id, delta, theta, alpha, beta, gamma, created_at \
             FROM eeg_data ORDER BY created_at DESC, id DESC LIMIT 1"
        }
    }
}

fn session_records_query(mode: IngestMode) -> &'static str {
    match mode {
        IngestMode::Samples => {
            "SELECT bp.id, bp.raw_block_id, bp.delta, bp.theta, bp.alpha, bp.beta, bp.gamma, \
             bp.created_at \
             FROM band_powers bp JOIN raw_blocks rb ON rb.id = bp.raw_block_id \
             WHERE rb.session_id = ? ORDER BY bp.created_at ASC, bp.id ASC"
        }
        IngestMode::Bands => {
            "SELECT id, delta, theta, alpha, beta, gamma, created_at \
             FROM eeg_data WHERE session_id = ? ORDER BY created_at ASC, id ASC"
        }
    }
}

#[async_trait]
impl PersistenceSink for MySqlStore {
    async fn persist_block(
        &self,
        sample_rate: u32,
        samples: &[Sample],
        powers: &BandPowers,
        session: Option<SessionId>,
    ) -> StorageResult<RawBlockId> {
        let mut tx = self.pool.begin().await?;

        let raw_block_id = insert_raw_block(&mut tx, sample_rate, samples, session).await?;
        insert_band_powers(&mut tx, raw_block_id, powers).await?;

        tx.commit().await?;
        Ok(raw_block_id)
    }

    async fn persist_device_bands(
        &self,
        powers: &BandPowers,
        session: Option<SessionId>,
    ) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO eeg_data (delta, theta, alpha, beta, gamma, session_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(powers.delta)
        .bind(powers.theta)
        .bind(powers.alpha)
        .bind(powers.beta)
        .bind(powers.gamma)
        .bind(session)
        .execute(&self.pool)
        .await?;

        inserted_id(&result)
    }
}

#[async_trait]
impl HistoryStore for MySqlStore {
    async fn band_history(&self, mode: IngestMode) -> StorageResult<Vec<BandPowerRecord>> {
        let rows = sqlx::query(history_query(mode, false))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|row| record_from_row(row, mode)).collect()
    }

    async fn latest_band_powers(&self, mode: IngestMode) -> StorageResult<Option<BandPowerRecord>> {
        let row = sqlx::query(history_query(mode, true))
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| record_from_row(&row, mode)).transpose()
    }

    async fn raw_block(&self, id: RawBlockId) -> StorageResult<Option<RawBlockRecord>> {
        let row = sqlx::query(
            "SELECT id, sample_rate, samples, session_id, created_at FROM raw_blocks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let samples: String = row.try_get("samples")?;
        Ok(Some(RawBlockRecord {
            id: row.try_get("id")?,
            sample_rate: row.try_get("sample_rate")?,
            samples: serde_json::from_str(&samples)?,
            session_id: row.try_get("session_id")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

#[async_trait]
impl SessionStore for MySqlStore {
    async fn create_session(&self, request: &SessionRequest) -> StorageResult<SessionRecord> {
        let started_at = Utc::now();
        let name = request.session_name(started_at);

        let result = sqlx::query(
            r#"
            INSERT INTO sessions (name, first_name, last_name, activity, started_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&name)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.activity)
        .bind(started_at)
        .execute(&self.pool)
        .await?;

        Ok(SessionRecord {
            id: inserted_id(&result)?,
            name,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            activity: request.activity.clone(),
            started_at,
        })
    }

    async fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, first_name, last_name, activity, started_at \
             FROM sessions ORDER BY started_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(session_from_row).collect()
    }

    async fn session_by_name(&self, name: &str) -> StorageResult<Option<SessionRecord>> {
        let row = sqlx::query(
            "SELECT id, name, first_name, last_name, activity, started_at \
             FROM sessions WHERE name = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn session_records(
        &self,
        id: SessionId,
        mode: IngestMode,
    ) -> StorageResult<Vec<BandPowerRecord>> {
        let rows = sqlx::query(session_records_query(mode))
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|row| record_from_row(row, mode)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_queries_target_mode_tables() {
        assert!(history_query(IngestMode::Samples, false).contains("FROM band_powers"));
        assert!(history_query(IngestMode::Bands, false).contains("FROM eeg_data"));
        assert!(history_query(IngestMode::Bands, true).ends_with("LIMIT 1"));
        assert!(!history_query(IngestMode::Samples, false).contains("LIMIT"));
    }

    #[test]
    fn test_session_queries_follow_raw_block_link() {
        let samples = session_records_query(IngestMode::Samples);
        assert!(samples.contains("JOIN raw_blocks"));
        assert!(samples.contains("rb.session_id = ?"));
        let bands = session_records_query(IngestMode::Bands);
        assert!(bands.contains("FROM eeg_data WHERE session_id = ?"));
    }
}
