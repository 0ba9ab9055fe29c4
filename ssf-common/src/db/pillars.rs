//! Pillar store

use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use super::models::{NewPillar, Pillar, PillarUpdate};
use crate::framework::sibling_order;
use crate::{Error, Result};

const COLUMNS: &str = "id, code, name, description, sort_order";

/// All pillars in display order
pub async fn list(pool: &SqlitePool) -> Result<Vec<Pillar>> {
    let sql = format!("SELECT {} FROM pillars", COLUMNS);
    let mut pillars: Vec<Pillar> = sqlx::query_as(&sql).fetch_all(pool).await?;
    pillars.sort_by(|a, b| sibling_order(a.sort_order, Some(&a.code), b.sort_order, Some(&b.code)));
    Ok(pillars)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Pillar> {
    let sql = format!("SELECT {} FROM pillars WHERE id = ?", COLUMNS);
    sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("pillar {}", id)))
}

/// Insert and return the id assigned by the store
pub async fn insert<'e, E>(executor: E, new: &NewPillar) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO pillars (code, name, description, sort_order) VALUES (?, ?, ?, ?)",
    )
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.sort_order)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Insert with a caller-chosen id (CSV rows that carry one)
pub async fn insert_with_id<'e, E>(executor: E, id: i64, new: &NewPillar) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO pillars (id, code, name, description, sort_order) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.sort_order)
    .execute(executor)
    .await?;

    Ok(())
}

/// Replace every field of an existing pillar
pub async fn overwrite<'e, E>(executor: E, id: i64, new: &NewPillar) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE pillars
        SET code = ?, name = ?, description = ?, sort_order = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.sort_order)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("pillar {}", id)));
    }
    Ok(())
}

/// Change only the provided fields
pub async fn update<'e, E>(executor: E, id: i64, changes: &PillarUpdate) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE pillars SET updated_at = CURRENT_TIMESTAMP");

    if let Some(code) = &changes.code {
        builder.push(", code = ").push_bind(code.clone());
    }
    if let Some(name) = &changes.name {
        builder.push(", name = ").push_bind(name.clone());
    }
    if let Some(description) = &changes.description {
        builder.push(", description = ").push_bind(description.clone());
    }
    if let Some(sort_order) = changes.sort_order {
        builder.push(", sort_order = ").push_bind(sort_order);
    }
    builder.push(" WHERE id = ").push_bind(id);

    let result = builder.build().execute(executor).await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("pillar {}", id)));
    }
    Ok(())
}

/// Delete a pillar; themes, sub-themes, standards and indicators below it go too
pub async fn delete<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM pillars WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("pillar {}", id)));
    }
    Ok(())
}
