//! Sub-theme store

use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use super::models::{NewSubtheme, Subtheme, SubthemeUpdate};
use super::sort_siblings;
use crate::{Error, Result};

/// Sub-themes in display order, optionally only those of one theme
pub async fn list(pool: &SqlitePool, theme_id: Option<i64>) -> Result<Vec<Subtheme>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT s.id, s.theme_id, s.code, s.name, s.description, s.sort_order \
         FROM subthemes s \
         JOIN themes t ON t.id = s.theme_id \
         JOIN pillars p ON p.id = t.pillar_id",
    );
    if let Some(theme_id) = theme_id {
        builder.push(" WHERE s.theme_id = ").push_bind(theme_id);
    }
    builder.push(" ORDER BY p.sort_order, p.id, t.sort_order, t.id");

    let mut subthemes: Vec<Subtheme> = builder.build_query_as().fetch_all(pool).await?;

    sort_siblings(&mut subthemes, |s| s.theme_id, |s| (s.sort_order, Some(s.code.as_str())));
    Ok(subthemes)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Subtheme> {
    sqlx::query_as(
        "SELECT id, theme_id, code, name, description, sort_order FROM subthemes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("subtheme {}", id)))
}

pub async fn insert<'e, E>(executor: E, new: &NewSubtheme) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO subthemes (theme_id, code, name, description, sort_order) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new.theme_id)
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.sort_order)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_with_id<'e, E>(executor: E, id: i64, new: &NewSubtheme) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO subthemes (id, theme_id, code, name, description, sort_order) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(new.theme_id)
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.sort_order)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn overwrite<'e, E>(executor: E, id: i64, new: &NewSubtheme) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE subthemes
        SET theme_id = ?, code = ?, name = ?, description = ?, sort_order = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(new.theme_id)
    .bind(&new.code)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.sort_order)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("subtheme {}", id)));
    }
    Ok(())
}

pub async fn update<'e, E>(executor: E, id: i64, changes: &SubthemeUpdate) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE subthemes SET updated_at = CURRENT_TIMESTAMP");

    if let Some(theme_id) = changes.theme_id {
        builder.push(", theme_id = ").push_bind(theme_id);
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
        return Err(Error::NotFound(format!("subtheme {}", id)));
    }
    Ok(())
}

pub async fn delete<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM subthemes WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("subtheme {}", id)));
    }
    Ok(())
}
