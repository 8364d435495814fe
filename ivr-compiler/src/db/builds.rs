//! Build history persistence

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{BuildMeta, BuildState, BuildStatus, ProgressRecord};
use ivr_common::{Error, Result};

/// Insert or update a build's status
pub async fn save_build(pool: &SqlitePool, status: &BuildStatus) -> Result<()> {
    let build_id = status.build_id.to_string();
    let created_at = status.meta.created_at.to_rfc3339();
    let finished_at = status.finished_at.map(|dt| dt.to_rfc3339());

    sqlx::query(
        r#"
        INSERT INTO builds (
            build_id, state, source_name, format, voice_id,
            completed, total, failed, cancelled, created_at, finished_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(build_id) DO UPDATE SET
            state = excluded.state,
            completed = excluded.completed,
            total = excluded.total,
            failed = excluded.failed,
            cancelled = excluded.cancelled,
            finished_at = excluded.finished_at
        "#,
    )
    .bind(&build_id)
    .bind(status.state.as_str())
    .bind(&status.meta.source_name)
    .bind(&status.meta.format)
    .bind(&status.meta.voice_id)
    .bind(status.progress.completed as i64)
    .bind(status.progress.total as i64)
    .bind(status.failed as i64)
    .bind(status.cancelled)
    .bind(&created_at)
    .bind(&finished_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one build's status
pub async fn load_build(pool: &SqlitePool, build_id: Uuid) -> Result<Option<BuildStatus>> {
    let row = sqlx::query(
        r#"
        SELECT build_id, state, source_name, format, voice_id,
               completed, total, failed, cancelled, created_at, finished_at
        FROM builds
        WHERE build_id = ?
        "#,
    )
    .bind(build_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|row| status_from_row(&row)).transpose()
}

/// Most recent builds first
pub async fn list_builds(pool: &SqlitePool, limit: i64) -> Result<Vec<BuildStatus>> {
    let rows = sqlx::query(
        r#"
        SELECT build_id, state, source_name, format, voice_id,
               completed, total, failed, cancelled, created_at, finished_at
        FROM builds
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(status_from_row).collect()
}

/// Close builds left unfinished by a previous run
///
/// Their compile task died with the old process, so they are recorded as
/// done and cancelled at whatever count they reached.
pub async fn close_stale_builds(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query(
        r#"
        UPDATE builds
        SET state = ?, cancelled = 1, finished_at = ?
        WHERE state != ?
        "#,
    )
    .bind(BuildState::Done.as_str())
    .bind(Utc::now().to_rfc3339())
    .bind(BuildState::Done.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

fn status_from_row(row: &SqliteRow) -> Result<BuildStatus> {
    let build_id: String = row.get("build_id");
    let build_id = Uuid::parse_str(&build_id)
        .map_err(|e| Error::Internal(format!("Invalid build_id: {}", e)))?;

    let state: String = row.get("state");
    let state = BuildState::parse(&state)
        .ok_or_else(|| Error::Internal(format!("Unknown build state: {}", state)))?;

    let created_at: String = row.get("created_at");
    let created_at = parse_timestamp(&created_at, "created_at")?;

    let finished_at: Option<String> = row.get("finished_at");
    let finished_at = finished_at
        .map(|s| parse_timestamp(&s, "finished_at"))
        .transpose()?;

    Ok(BuildStatus {
        build_id,
        state,
        progress: ProgressRecord {
            completed: row.get::<i64, _>("completed") as usize,
            total: row.get::<i64, _>("total") as usize,
            done: state == BuildState::Done,
        },
        failed: row.get::<i64, _>("failed") as usize,
        cancelled: row.get("cancelled"),
        meta: BuildMeta {
            source_name: row.get("source_name"),
            format: row.get("format"),
            voice_id: row.get("voice_id"),
            created_at,
        },
        finished_at,
    })
}
