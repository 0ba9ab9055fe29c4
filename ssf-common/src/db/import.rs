//! Transactional CSV batch import
//!
//! Parent codes are resolved first (read-only, one query per level); then the
//! whole batch is written in a single transaction. Any failing row rolls the
//! batch back and the error names that row's line.

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use super::{indicators, pillars, standards, subthemes, themes};
use crate::framework::import::{ImportMode, ImportRecord, ParsedRow};
use crate::framework::resolver::resolve_parents;
use crate::framework::Level;
use crate::{Error, Result};

/// Outcome of a committed import batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub table: String,
    pub mode: ImportMode,
    pub rows: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Rows removed up front in replace mode (cascaded children not counted)
    pub deleted: u64,
}

async fn find_id(
    conn: &mut SqliteConnection,
    level: Level,
    column: &str,
    value: ImportKey<'_>,
) -> Result<Option<i64>> {
    let sql = format!("SELECT id FROM {} WHERE {} = ?", level.table(), column);
    let query = sqlx::query_scalar::<_, i64>(&sql);
    let query = match value {
        ImportKey::Id(id) => query.bind(id),
        ImportKey::Code(code) => query.bind(code.to_string()),
    };
    Ok(query.fetch_optional(&mut *conn).await?)
}

#[derive(Clone, Copy)]
enum ImportKey<'a> {
    Id(i64),
    Code(&'a str),
}

fn record_code(record: &ImportRecord) -> Option<&str> {
    match record {
        ImportRecord::Pillar(r) => Some(&r.code),
        ImportRecord::Theme(r) => Some(&r.code),
        ImportRecord::Subtheme(r) => Some(&r.code),
        ImportRecord::Standard(r) => r.code.as_deref(),
        ImportRecord::Indicator(r) => r.code.as_deref(),
    }
}

async fn insert_record(
    conn: &mut SqliteConnection,
    id: Option<i64>,
    record: &ImportRecord,
) -> Result<()> {
    match (id, record) {
        (Some(id), ImportRecord::Pillar(r)) => pillars::insert_with_id(&mut *conn, id, r).await,
        (Some(id), ImportRecord::Theme(r)) => themes::insert_with_id(&mut *conn, id, r).await,
        (Some(id), ImportRecord::Subtheme(r)) => subthemes::insert_with_id(&mut *conn, id, r).await,
        (Some(id), ImportRecord::Standard(r)) => standards::insert_with_id(&mut *conn, id, r).await,
        (Some(id), ImportRecord::Indicator(r)) => indicators::insert_with_id(&mut *conn, id, r).await,
        (None, ImportRecord::Pillar(r)) => pillars::insert(&mut *conn, r).await.map(drop),
        (None, ImportRecord::Theme(r)) => themes::insert(&mut *conn, r).await.map(drop),
        (None, ImportRecord::Subtheme(r)) => subthemes::insert(&mut *conn, r).await.map(drop),
        (None, ImportRecord::Standard(r)) => standards::insert(&mut *conn, r).await.map(drop),
        (None, ImportRecord::Indicator(r)) => indicators::insert(&mut *conn, r).await.map(drop),
    }
}

async fn overwrite_record(conn: &mut SqliteConnection, id: i64, record: &ImportRecord) -> Result<()> {
    match record {
        ImportRecord::Pillar(r) => pillars::overwrite(&mut *conn, id, r).await,
        ImportRecord::Theme(r) => themes::overwrite(&mut *conn, id, r).await,
        ImportRecord::Subtheme(r) => subthemes::overwrite(&mut *conn, id, r).await,
        ImportRecord::Standard(r) => standards::overwrite(&mut *conn, id, r).await,
        ImportRecord::Indicator(r) => indicators::overwrite(&mut *conn, id, r).await,
    }
}

/// Existing row an upsert should overwrite: by id first, then by code
async fn upsert_target(
    conn: &mut SqliteConnection,
    level: Level,
    id: Option<i64>,
    record: &ImportRecord,
) -> Result<Option<i64>> {
    if let Some(id) = id {
        if let Some(found) = find_id(&mut *conn, level, "id", ImportKey::Id(id)).await? {
            return Ok(Some(found));
        }
    }
    match record_code(record) {
        Some(code) => find_id(conn, level, "code", ImportKey::Code(code)).await,
        None => Ok(None),
    }
}

/// Import validated rows into `level`'s table
pub async fn import_rows(
    pool: &SqlitePool,
    level: Level,
    mode: ImportMode,
    mut rows: Vec<ParsedRow>,
) -> Result<ImportReport> {
    if let Some(row) = rows.iter().find(|r| r.row.level() != level) {
        return Err(Error::Row {
            row: row.line,
            message: format!("{} row in a {} import", row.row.level(), level.table()),
        });
    }

    let unresolved = resolve_parents(pool, &mut rows).await?;
    if let Some(first) = unresolved.first() {
        warn!(
            "Import into {} rejected: {} unresolved parent code(s)",
            level.table(),
            unresolved.len()
        );
        let mut message = format!("{} '{}' not found", first.level, first.code);
        if unresolved.len() > 1 {
            message.push_str(&format!(" (and {} more unresolved rows)", unresolved.len() - 1));
        }
        return Err(Error::Row {
            row: rows[first.index].line,
            message,
        });
    }

    let total = rows.len();
    let records = rows
        .into_iter()
        .map(|row| {
            let line = row.line;
            row.into_record().map(|(id, record)| (line, id, record))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tx = pool.begin().await?;

    let mut deleted = 0;
    if mode == ImportMode::Replace {
        let sql = format!("DELETE FROM {}", level.table());
        deleted = sqlx::query(&sql).execute(&mut *tx).await?.rows_affected();
    }

    let mut inserted = 0;
    let mut updated = 0;
    for (line, id, record) in &records {
        let target = match mode {
            ImportMode::Upsert => upsert_target(&mut tx, level, *id, record)
                .await
                .map_err(|e| e.at_row(*line))?,
            ImportMode::Replace => None,
        };

        match target {
            Some(existing) => {
                overwrite_record(&mut tx, existing, record)
                    .await
                    .map_err(|e| e.at_row(*line))?;
                updated += 1;
            }
            None => {
                insert_record(&mut tx, *id, record)
                    .await
                    .map_err(|e| e.at_row(*line))?;
                inserted += 1;
            }
        }
    }

    tx.commit().await?;
    info!(
        "Imported {} rows into {} ({}): {} inserted, {} updated, {} deleted",
        total,
        level.table(),
        mode,
        inserted,
        updated,
        deleted
    );

    Ok(ImportReport {
        table: level.table().to_string(),
        mode,
        rows: total,
        inserted,
        updated,
        deleted,
    })
}
