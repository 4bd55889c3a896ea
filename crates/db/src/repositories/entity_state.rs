use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row};

use carepath_core::domain::entity::{EntityRef, VersionedState};
use carepath_core::domain::status::Status;
use carepath_core::errors::{ApplicationError, DomainError};
use carepath_core::ports::EntityStateStore;

use super::{ensure_kind, RepositoryError};
use crate::DbPool;

/// Writers take the database write lock before reading the version they compare against,
/// so a lost race shows up as a version conflict rather than `SQLITE_BUSY`.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// One row of `entity_transition`. `from` is `None` for the row written on create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub from: Option<Status>,
    pub to: Status,
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SqlEntityStateStore {
    pool: DbPool,
}

impl SqlEntityStateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn history(
        &self,
        entity: &EntityRef,
    ) -> Result<Vec<TransitionRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT from_status, to_status, version, occurred_at
             FROM entity_transition
             WHERE entity_kind = ? AND entity_id = ?
             ORDER BY version ASC",
        )
        .bind(entity.kind.as_str())
        .bind(&entity.id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| transition_from_row(entity, row)).collect()
    }

    async fn create_state(
        &self,
        entity: &EntityRef,
        initial: Status,
    ) -> Result<VersionedState, RepositoryError> {
        ensure_kind(entity, initial)?;
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;

        let existing = sqlx::query(
            "SELECT COUNT(*) AS count FROM entity_state WHERE entity_kind = ? AND entity_id = ?",
        )
        .bind(entity.kind.as_str())
        .bind(&entity.id.0)
        .fetch_one(&mut *tx)
        .await?
        .try_get::<i64, _>("count")?;
        if existing > 0 {
            return Err(RepositoryError::AlreadyExists(entity.clone()));
        }

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO entity_state (entity_kind, entity_id, status, version, updated_at)
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(entity.kind.as_str())
        .bind(&entity.id.0)
        .bind(initial.as_str())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO entity_transition
                (entity_kind, entity_id, from_status, to_status, version, occurred_at)
             VALUES (?, ?, NULL, ?, 1, ?)",
        )
        .bind(entity.kind.as_str())
        .bind(&entity.id.0)
        .bind(initial.as_str())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(VersionedState { entity: entity.clone(), status: initial, version: 1, updated_at: now })
    }

    async fn load_state(
        &self,
        entity: &EntityRef,
    ) -> Result<Option<VersionedState>, RepositoryError> {
        let row = sqlx::query(
            "SELECT status, version, updated_at
             FROM entity_state
             WHERE entity_kind = ? AND entity_id = ?",
        )
        .bind(entity.kind.as_str())
        .bind(&entity.id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| state_from_row(entity, &row)).transpose()
    }

    async fn store_state(
        &self,
        entity: &EntityRef,
        new_state: Status,
        expected_version: u64,
    ) -> Result<VersionedState, RepositoryError> {
        ensure_kind(entity, new_state)?;
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;

        let row = sqlx::query(
            "SELECT status, version, updated_at
             FROM entity_state
             WHERE entity_kind = ? AND entity_id = ?",
        )
        .bind(entity.kind.as_str())
        .bind(&entity.id.0)
        .fetch_optional(&mut *tx)
        .await?;
        let current = match row {
            Some(row) => state_from_row(entity, &row)?,
            None => return Err(RepositoryError::NotFound(entity.clone())),
        };
        if current.version != expected_version {
            return Err(conflict(entity, expected_version, current.version));
        }

        let next_version = expected_version + 1;
        let now = Utc::now();
        let updated = sqlx::query(
            "UPDATE entity_state
             SET status = ?, version = ?, updated_at = ?
             WHERE entity_kind = ? AND entity_id = ? AND version = ?",
        )
        .bind(new_state.as_str())
        .bind(to_db_version(next_version)?)
        .bind(now.to_rfc3339())
        .bind(entity.kind.as_str())
        .bind(&entity.id.0)
        .bind(to_db_version(expected_version)?)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(conflict(entity, expected_version, current.version + 1));
        }

        sqlx::query(
            "INSERT INTO entity_transition
                (entity_kind, entity_id, from_status, to_status, version, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.kind.as_str())
        .bind(&entity.id.0)
        .bind(current.status.as_str())
        .bind(new_state.as_str())
        .bind(to_db_version(next_version)?)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(VersionedState {
            entity: entity.clone(),
            status: new_state,
            version: next_version,
            updated_at: now,
        })
    }
}

#[async_trait::async_trait]
impl EntityStateStore for SqlEntityStateStore {
    async fn create(
        &self,
        entity: &EntityRef,
        initial: Status,
    ) -> Result<VersionedState, ApplicationError> {
        Ok(self.create_state(entity, initial).await?)
    }

    async fn load(&self, entity: &EntityRef) -> Result<Option<VersionedState>, ApplicationError> {
        Ok(self.load_state(entity).await?)
    }

    async fn store(
        &self,
        entity: &EntityRef,
        new_state: Status,
        expected_version: u64,
    ) -> Result<VersionedState, ApplicationError> {
        Ok(self.store_state(entity, new_state, expected_version).await?)
    }
}

fn conflict(entity: &EntityRef, expected: u64, actual: u64) -> RepositoryError {
    RepositoryError::Domain(DomainError::ConcurrentModification {
        entity: entity.clone(),
        expected,
        actual,
    })
}

fn state_from_row(entity: &EntityRef, row: &SqliteRow) -> Result<VersionedState, RepositoryError> {
    Ok(VersionedState {
        entity: entity.clone(),
        status: parse_status(entity, "status", row.try_get("status")?)?,
        version: from_db_version(row.try_get("version")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn transition_from_row(
    entity: &EntityRef,
    row: &SqliteRow,
) -> Result<TransitionRecord, RepositoryError> {
    let from = row
        .try_get::<Option<String>, _>("from_status")?
        .map(|value| parse_status(entity, "from_status", value))
        .transpose()?;

    Ok(TransitionRecord {
        from,
        to: parse_status(entity, "to_status", row.try_get("to_status")?)?,
        version: from_db_version(row.try_get("version")?)?,
        occurred_at: parse_timestamp("occurred_at", row.try_get("occurred_at")?)?,
    })
}

fn parse_status(entity: &EntityRef, column: &str, value: String) -> Result<Status, RepositoryError> {
    Status::parse(entity.kind, &value).map_err(|_| {
        RepositoryError::Decode(format!("unknown {} status in `{column}`: `{value}`", entity.kind))
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

fn to_db_version(version: u64) -> Result<i64, RepositoryError> {
    i64::try_from(version)
        .map_err(|_| RepositoryError::Decode(format!("version {version} does not fit in INTEGER")))
}

fn from_db_version(version: i64) -> Result<u64, RepositoryError> {
    u64::try_from(version)
        .map_err(|_| RepositoryError::Decode(format!("negative version `{version}` in entity_state")))
}
