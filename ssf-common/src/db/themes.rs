//! Theme store

use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use super::models::{NewTheme, Theme, ThemeUpdate};
use super::sort_siblings;
use crate::{Error, Result};

/// Themes in display order, optionally only those of one pillar
pub async fn list(pool: &SqlitePool, pillar_id: Option<i64>) -> Result<Vec<Theme>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT t.id, t.pillar_id, t.code, t.name, t.description, t.sort_order \
         FROM themes t JOIN pillars p ON p.id = t.pillar_id",
    );
    if let Some(pillar_id) = pillar_id {
        builder.push(" WHERE t.pillar_id = ").push_bind(pillar_id);
    }
    builder.push(" ORDER BY p.sort_order, p.id");

    let mut themes: Vec<Theme> = builder.build_query_as().fetch_all(pool).await?;

    sort_siblings(&mut themes, |t| t.pillar_id, |t| (t.sort_order, Some(t.code.as_str())));
    Ok(themes)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Theme> {
    sqlx::query_as(
        "SELECT id, pillar_id, code, name, description, sort_order FROM themes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("theme {}", id)))
}

pub async fn insert<'e, E>(executor: E, new: &NewTheme) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO themes (pillar_id, code, name, description, sort_order) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new.pillar_id)
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.sort_order)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_with_id<'e, E>(executor: E, id: i64, new: &NewTheme) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO themes (id, pillar_id, code, name, description, sort_order) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(new.pillar_id)
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.sort_order)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn overwrite<'e, E>(executor: E, id: i64, new: &NewTheme) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE themes
        SET pillar_id = ?, code = ?, name = ?, description = ?, sort_order = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(new.pillar_id)
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.sort_order)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("theme {}", id)));
    }
    Ok(())
}

pub async fn update<'e, E>(executor: E, id: i64, changes: &ThemeUpdate) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE themes SET updated_at = CURRENT_TIMESTAMP");

    if let Some(pillar_id) = changes.pillar_id {
        builder.push(", pillar_id = ").push_bind(pillar_id);
    }
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
        return Err(Error::NotFound(format!("theme {}", id)));
    }
    Ok(())
}

pub async fn delete<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM themes WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("theme {}", id)));
    }
    Ok(())
}
