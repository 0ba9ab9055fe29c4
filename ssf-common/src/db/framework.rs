//! Whole-framework queries: nested tree, denormalised standard rows,
//! export snapshot and transactional tree save

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::indicators::{self, IndicatorFilter};
use super::models::{
    Indicator, IndicatorParent, NewPillar, NewSubtheme, NewTheme, StandardRow,
};
use super::{pillars, standards, subthemes, themes};
use crate::framework::export::{
    FrameworkSnapshot, PillarBranch, StandardBranch, SubthemeBranch, ThemeBranch,
};
use crate::framework::grouping::{build_groups, PillarGroup};
use crate::framework::{sibling_order, FrameworkTree, PillarNode, SubthemeNode, ThemeNode};
use crate::{Error, Result};

fn group_by<K, V>(items: Vec<V>, key: impl Fn(&V) -> K) -> HashMap<K, Vec<V>>
where
    K: std::hash::Hash + Eq,
{
    let mut groups: HashMap<K, Vec<V>> = HashMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    groups
}

/// Pillar → theme → sub-theme tree, siblings in display order
pub async fn load_tree(pool: &SqlitePool) -> Result<FrameworkTree> {
    let pillars = pillars::list(pool).await?;
    let mut themes = group_by(themes::list(pool, None).await?, |t| t.pillar_id);
    let mut subthemes = group_by(subthemes::list(pool, None).await?, |s| s.theme_id);

    let pillars = pillars
        .into_iter()
        .map(|p| PillarNode {
            themes: themes
                .remove(&p.id)
                .unwrap_or_default()
                .into_iter()
                .map(|t| ThemeNode {
                    subthemes: subthemes
                        .remove(&t.id)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|s| SubthemeNode {
                            id: Some(s.id),
                            code: s.code,
                            name: s.name,
                            description: s.description,
                            sort_order: s.sort_order,
                        })
                        .collect(),
                    id: Some(t.id),
                    code: t.code,
                    name: t.name,
                    description: t.description,
                    sort_order: t.sort_order,
                })
                .collect(),
            id: Some(p.id),
            code: p.code,
            name: p.name,
            description: p.description,
            sort_order: p.sort_order,
        })
        .collect();

    Ok(FrameworkTree { pillars })
}

/// Full hierarchy including standards and attached indicators
pub async fn load_export_tree(pool: &SqlitePool) -> Result<FrameworkSnapshot> {
    let pillars = pillars::list(pool).await?;
    let mut themes = group_by(themes::list(pool, None).await?, |t| t.pillar_id);
    let mut subthemes = group_by(subthemes::list(pool, None).await?, |s| s.theme_id);
    let mut standards = group_by(standards::list(pool, None).await?, |s| s.subtheme_id);
    let mut indicators: HashMap<IndicatorParent, Vec<Indicator>> =
        group_by(indicators::list(pool, &IndicatorFilter::default()).await?, |i| i.parent);

    let mut take = |parent: IndicatorParent| indicators.remove(&parent).unwrap_or_default();

    let mut branches = Vec::with_capacity(pillars.len());
    for pillar in pillars {
        let mut theme_branches = Vec::new();
        for theme in themes.remove(&pillar.id).unwrap_or_default() {
            let mut subtheme_branches = Vec::new();
            for subtheme in subthemes.remove(&theme.id).unwrap_or_default() {
                let standard_branches = standards
                    .remove(&subtheme.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|standard| StandardBranch {
                        indicators: take(IndicatorParent::Standard(standard.id)),
                        standard,
                    })
                    .collect();
                subtheme_branches.push(SubthemeBranch {
                    indicators: take(IndicatorParent::Subtheme(subtheme.id)),
                    subtheme,
                    standards: standard_branches,
                });
            }
            theme_branches.push(ThemeBranch {
                indicators: take(IndicatorParent::Theme(theme.id)),
                theme,
                subthemes: subtheme_branches,
            });
        }
        branches.push(PillarBranch {
            indicators: take(IndicatorParent::Pillar(pillar.id)),
            pillar,
            themes: theme_branches,
        });
    }

    Ok(FrameworkSnapshot { pillars: branches })
}

/// Order denormalised rows by `(sort_order, natural code)` at every level
pub fn sort_framework_rows(rows: &mut [StandardRow]) {
    rows.sort_by(|a, b| {
        sibling_order(
            a.pillar_sort_order,
            Some(&a.pillar_code),
            b.pillar_sort_order,
            Some(&b.pillar_code),
        )
        .then(a.pillar_id.cmp(&b.pillar_id))
        .then_with(|| {
            sibling_order(
                a.theme_sort_order,
                Some(&a.theme_code),
                b.theme_sort_order,
                Some(&b.theme_code),
            )
        })
        .then(a.theme_id.cmp(&b.theme_id))
        .then_with(|| {
            sibling_order(
                a.subtheme_sort_order,
                Some(&a.subtheme_code),
                b.subtheme_sort_order,
                Some(&b.subtheme_code),
            )
        })
        .then(a.subtheme_id.cmp(&b.subtheme_id))
        .then_with(|| {
            sibling_order(
                a.sort_order,
                a.standard_code.as_deref(),
                b.sort_order,
                b.standard_code.as_deref(),
            )
        })
        .then(a.standard_id.cmp(&b.standard_id))
    });
}

/// Every standard joined with its ancestors, sorted for grouping
pub async fn load_standard_rows(pool: &SqlitePool) -> Result<Vec<StandardRow>> {
    let mut rows: Vec<StandardRow> = sqlx::query_as(
        r#"
        SELECT
            p.id AS pillar_id, p.code AS pillar_code, p.name AS pillar_name,
            p.sort_order AS pillar_sort_order,
            t.id AS theme_id, t.code AS theme_code, t.name AS theme_name,
            t.sort_order AS theme_sort_order,
            s.id AS subtheme_id, s.code AS subtheme_code, s.name AS subtheme_name,
            s.sort_order AS subtheme_sort_order,
            st.id AS standard_id, st.code AS standard_code,
            st.description, st.notes, st.sort_order
        FROM standards st
        JOIN subthemes s ON s.id = st.subtheme_id
        JOIN themes t ON t.id = s.theme_id
        JOIN pillars p ON p.id = t.pillar_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    sort_framework_rows(&mut rows);
    Ok(rows)
}

/// Standards grouped under their pillar / theme / sub-theme
pub async fn load_grouped_standards(pool: &SqlitePool) -> Result<Vec<PillarGroup<StandardRow>>> {
    Ok(build_groups(load_standard_rows(pool).await?))
}

fn check_name(name: &str, what: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation(format!("{} name must not be empty", what)));
    }
    Ok(())
}

/// Give every stored code a temporary unique value so rewrites can't collide
async fn park_codes(conn: &mut SqliteConnection) -> Result<()> {
    for table in ["pillars", "themes", "subthemes"] {
        let sql = format!("UPDATE {} SET code = '~' || id", table);
        sqlx::query(&sql).execute(&mut *conn).await?;
    }
    Ok(())
}

async fn delete_absent(conn: &mut SqliteConnection, table: &str, keep: &HashSet<i64>) -> Result<u64> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!("DELETE FROM {}", table));
    if !keep.is_empty() {
        builder.push(" WHERE id NOT IN (");
        let mut separated = builder.separated(", ");
        for id in keep {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
    }

    let result = builder.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Persist a submitted tree as the new pillar / theme / sub-theme structure
///
/// Runs in one transaction. Stored nodes are updated in place (codes, names,
/// parents, sort orders), nodes without an id are inserted, and stored nodes
/// missing from the tree are deleted with everything below them. A node id
/// that does not exist fails the whole save.
pub async fn save_tree(pool: &SqlitePool, tree: &FrameworkTree) -> Result<FrameworkTree> {
    let mut tx = pool.begin().await?;
    park_codes(&mut tx).await?;

    let mut keep_pillars = HashSet::new();
    let mut keep_themes = HashSet::new();
    let mut keep_subthemes = HashSet::new();
    let mut inserted = 0usize;

    for pillar in &tree.pillars {
        check_name(&pillar.name, "Pillar")?;
        let new = NewPillar {
            code: pillar.code.clone(),
            name: pillar.name.clone(),
            description: pillar.description.clone(),
            sort_order: pillar.sort_order,
        };
        let pillar_id = match pillar.id {
            Some(id) => {
                pillars::overwrite(&mut *tx, id, &new).await?;
                id
            }
            None => {
                inserted += 1;
                pillars::insert(&mut *tx, &new).await?
            }
        };
        keep_pillars.insert(pillar_id);

        for theme in &pillar.themes {
            check_name(&theme.name, "Theme")?;
            let new = NewTheme {
                pillar_id,
                code: theme.code.clone(),
                name: theme.name.clone(),
                description: theme.description.clone(),
                sort_order: theme.sort_order,
            };
            let theme_id = match theme.id {
                Some(id) => {
                    themes::overwrite(&mut *tx, id, &new).await?;
                    id
                }
                None => {
                    inserted += 1;
                    themes::insert(&mut *tx, &new).await?
                }
            };
            keep_themes.insert(theme_id);

            for subtheme in &theme.subthemes {
                check_name(&subtheme.name, "Sub-theme")?;
                let new = NewSubtheme {
                    theme_id,
                    code: subtheme.code.clone(),
                    name: subtheme.name.clone(),
                    description: subtheme.description.clone(),
                    sort_order: subtheme.sort_order,
                };
                let subtheme_id = match subtheme.id {
                    Some(id) => {
                        subthemes::overwrite(&mut *tx, id, &new).await?;
                        id
                    }
                    None => {
                        inserted += 1;
                        subthemes::insert(&mut *tx, &new).await?
                    }
                };
                keep_subthemes.insert(subtheme_id);
            }
        }
    }

    // Children first: kept nodes are already attached to kept parents
    let mut deleted = delete_absent(&mut tx, "subthemes", &keep_subthemes).await?;
    deleted += delete_absent(&mut tx, "themes", &keep_themes).await?;
    deleted += delete_absent(&mut tx, "pillars", &keep_pillars).await?;

    tx.commit().await?;
    info!(
        "Saved framework tree: {} pillars, {} themes, {} sub-themes ({} inserted, {} deleted)",
        keep_pillars.len(),
        keep_themes.len(),
        keep_subthemes.len(),
        inserted,
        deleted
    );

    load_tree(pool).await
}
