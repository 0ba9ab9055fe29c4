//! Standard store

use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use super::models::{NewStandard, Standard, StandardUpdate};
use super::sort_siblings;
use crate::{Error, Result};

/// Standards in display order, optionally only those of one sub-theme
pub async fn list(pool: &SqlitePool, subtheme_id: Option<i64>) -> Result<Vec<Standard>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT st.id, st.subtheme_id, st.code, st.description, st.notes, st.sort_order \
         FROM standards st \
         JOIN subthemes s ON s.id = st.subtheme_id \
         JOIN themes t ON t.id = s.theme_id \
         JOIN pillars p ON p.id = t.pillar_id",
    );
    if let Some(subtheme_id) = subtheme_id {
        builder.push(" WHERE st.subtheme_id = ").push_bind(subtheme_id);
    }
    builder.push(" ORDER BY p.sort_order, p.id, t.sort_order, t.id, s.sort_order, s.id");

    let mut standards: Vec<Standard> = builder.build_query_as().fetch_all(pool).await?;

    sort_siblings(&mut standards, |s| s.subtheme_id, |s| (s.sort_order, s.code.as_deref()));
    Ok(standards)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Standard> {
    sqlx::query_as(
        "SELECT id, subtheme_id, code, description, notes, sort_order FROM standards WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("standard {}", id)))
}

pub async fn insert<'e, E>(executor: E, new: &NewStandard) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO standards (subtheme_id, code, description, notes, sort_order) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new.subtheme_id)
    .bind(&new.code)
    .bind(&new.description)
    .bind(&new.notes)
    .bind(new.sort_order)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_with_id<'e, E>(executor: E, id: i64, new: &NewStandard) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO standards (id, subtheme_id, code, description, notes, sort_order) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(new.subtheme_id)
    .bind(&new.code)
    .bind(&new.description)
    .bind(&new.notes)
    .bind(new.sort_order)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn overwrite<'e, E>(executor: E, id: i64, new: &NewStandard) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE standards
        SET subtheme_id = ?, code = ?, description = ?, notes = ?, sort_order = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(new.subtheme_id)
    .bind(&new.code)
    .bind(&new.description)
    .bind(&new.notes)
    .bind(new.sort_order)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("standard {}", id)));
    }
    Ok(())
}

pub async fn update<'e, E>(executor: E, id: i64, changes: &StandardUpdate) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE standards SET updated_at = CURRENT_TIMESTAMP");

    if let Some(subtheme_id) = changes.subtheme_id {
        builder.push(", subtheme_id = ").push_bind(subtheme_id);
    }
    if let Some(code) = &changes.code {
        builder.push(", code = ").push_bind(code.clone());
    }
    if let Some(description) = &changes.description {
        builder.push(", description = ").push_bind(description.clone());
    }
    if let Some(notes) = &changes.notes {
        builder.push(", notes = ").push_bind(notes.clone());
    }
    if let Some(sort_order) = changes.sort_order {
        builder.push(", sort_order = ").push_bind(sort_order);
    }
    builder.push(" WHERE id = ").push_bind(id);

    let result = builder.build().execute(executor).await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("standard {}", id)));
    }
    Ok(())
}

/// Delete a standard and the indicators attached to it
pub async fn delete<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM standards WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("standard {}", id)));
    }
    Ok(())
}
