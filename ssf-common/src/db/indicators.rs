//! Indicator store
//!
//! An indicator row carries four nullable parent columns of which exactly one
//! is set (enforced by a table CHECK constraint as well as by
//! [`IndicatorParent`]).

use serde::Deserialize;
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use super::models::{Indicator, IndicatorParent, IndicatorRecord, IndicatorUpdate, NewIndicator};
use super::sort_siblings;
use crate::{Error, Result};

const COLUMNS: &str = "id, code, name, description, weight, is_default, sort_order, \
                       pillar_id, theme_id, subtheme_id, standard_id";

/// Optional attachment filter for listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndicatorFilter {
    pub pillar_id: Option<i64>,
    pub theme_id: Option<i64>,
    pub subtheme_id: Option<i64>,
    pub standard_id: Option<i64>,
}

pub async fn list(pool: &SqlitePool, filter: &IndicatorFilter) -> Result<Vec<Indicator>> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM indicators WHERE 1 = 1", COLUMNS));

    for (column, value) in [
        ("pillar_id", filter.pillar_id),
        ("theme_id", filter.theme_id),
        ("subtheme_id", filter.subtheme_id),
        ("standard_id", filter.standard_id),
    ] {
        if let Some(id) = value {
            builder.push(format!(" AND {} = ", column)).push_bind(id);
        }
    }
    builder.push(" ORDER BY pillar_id, theme_id, subtheme_id, standard_id");

    let records: Vec<IndicatorRecord> = builder.build_query_as().fetch_all(pool).await?;
    let mut indicators = records
        .into_iter()
        .map(Indicator::try_from)
        .collect::<Result<Vec<_>>>()?;

    sort_siblings(&mut indicators, |i| i.parent, |i| (i.sort_order, i.code.as_deref()));
    Ok(indicators)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Indicator> {
    let sql = format!("SELECT {} FROM indicators WHERE id = ?", COLUMNS);
    let record: IndicatorRecord = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("indicator {}", id)))?;

    Indicator::try_from(record)
}

pub async fn insert<'e, E>(executor: E, new: &NewIndicator) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let [pillar_id, theme_id, subtheme_id, standard_id] = new.parent.columns();
    let result = sqlx::query(
        r#"
        INSERT INTO indicators
            (code, name, description, weight, is_default, sort_order,
             pillar_id, theme_id, subtheme_id, standard_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.weight)
    .bind(new.is_default)
    .bind(new.sort_order)
    .bind(pillar_id)
    .bind(theme_id)
    .bind(subtheme_id)
    .bind(standard_id)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_with_id<'e, E>(executor: E, id: i64, new: &NewIndicator) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let [pillar_id, theme_id, subtheme_id, standard_id] = new.parent.columns();
    sqlx::query(
        r#"
        INSERT INTO indicators
            (id, code, name, description, weight, is_default, sort_order,
             pillar_id, theme_id, subtheme_id, standard_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.weight)
    .bind(new.is_default)
    .bind(new.sort_order)
    .bind(pillar_id)
    .bind(theme_id)
    .bind(subtheme_id)
    .bind(standard_id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn overwrite<'e, E>(executor: E, id: i64, new: &NewIndicator) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let [pillar_id, theme_id, subtheme_id, standard_id] = new.parent.columns();
    let result = sqlx::query(
        r#"
        UPDATE indicators
        SET code = ?, name = ?, description = ?, weight = ?, is_default = ?, sort_order = ?,
            pillar_id = ?, theme_id = ?, subtheme_id = ?, standard_id = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.weight)
    .bind(new.is_default)
    .bind(new.sort_order)
    .bind(pillar_id)
    .bind(theme_id)
    .bind(subtheme_id)
    .bind(standard_id)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("indicator {}", id)));
    }
    Ok(())
}

fn push_parent(builder: &mut QueryBuilder<'_, Sqlite>, parent: IndicatorParent) {
    let columns = ["pillar_id", "theme_id", "subtheme_id", "standard_id"];
    for (column, value) in columns.into_iter().zip(parent.columns()) {
        builder.push(format!(", {} = ", column)).push_bind(value);
    }
}

/// Change only the provided fields; a new attachment clears the old one
pub async fn update<'e, E>(executor: E, id: i64, changes: &IndicatorUpdate) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let parent = changes.parent()?;

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE indicators SET updated_at = CURRENT_TIMESTAMP");

    if let Some(code) = &changes.code {
        builder.push(", code = ").push_bind(code.clone());
    }
    if let Some(name) = &changes.name {
        builder.push(", name = ").push_bind(name.clone());
    }
    if let Some(description) = &changes.description {
        builder.push(", description = ").push_bind(description.clone());
    }
    if let Some(weight) = changes.weight {
        builder.push(", weight = ").push_bind(weight);
    }
    if let Some(is_default) = changes.is_default {
        builder.push(", is_default = ").push_bind(is_default);
    }
    if let Some(sort_order) = changes.sort_order {
        builder.push(", sort_order = ").push_bind(sort_order);
    }
    if let Some(parent) = parent {
        push_parent(&mut builder, parent);
    }
    builder.push(" WHERE id = ").push_bind(id);

    let result = builder.build().execute(executor).await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("indicator {}", id)));
    }
    Ok(())
}

pub async fn delete<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM indicators WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("indicator {}", id)));
    }
    Ok(())
}
