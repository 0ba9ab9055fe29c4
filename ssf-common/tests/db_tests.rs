//! Store integration tests against in-memory and on-disk SQLite databases

use sqlx::SqlitePool;
use ssf_common::db::framework::{load_export_tree, load_grouped_standards, load_tree, save_tree};
use ssf_common::db::indicators::IndicatorFilter;
use ssf_common::db::{
    import_rows, indicators, init_database, init_memory_database, pillars, standards, subthemes,
    themes, IndicatorParent, NewIndicator, NewPillar, NewStandard, NewSubtheme, NewTheme,
    PillarUpdate,
};
use ssf_common::framework::export::{framework_rows, RowKind};
use ssf_common::framework::import::{parse_import_csv, ImportMode};
use ssf_common::framework::{recalc_ref_codes, ThemeNode};
use ssf_common::{Error, Level};

struct Seeded {
    pillar: i64,
    theme: i64,
    subtheme: i64,
    standard: i64,
}

async fn seed(pool: &SqlitePool) -> Seeded {
    let pillar = pillars::insert(
        pool,
        &NewPillar {
            code: "P1".to_string(),
            name: "Shelter".to_string(),
            description: None,
            sort_order: 1,
        },
    )
    .await
    .unwrap();
    let theme = themes::insert(
        pool,
        &NewTheme {
            pillar_id: pillar,
            code: "P1.T1".to_string(),
            name: "Structure".to_string(),
            description: None,
            sort_order: 1,
        },
    )
    .await
    .unwrap();
    let subtheme = subthemes::insert(
        pool,
        &NewSubtheme {
            theme_id: theme,
            code: "P1.T1.1".to_string(),
            name: "Roof".to_string(),
            description: None,
            sort_order: 1,
        },
    )
    .await
    .unwrap();
    let standard = standards::insert(
        pool,
        &NewStandard {
            subtheme_id: subtheme,
            code: Some("S1".to_string()),
            description: "Roof is watertight".to_string(),
            notes: None,
            sort_order: 1,
        },
    )
    .await
    .unwrap();

    Seeded {
        pillar,
        theme,
        subtheme,
        standard,
    }
}

fn indicator(name: &str, parent: IndicatorParent) -> NewIndicator {
    NewIndicator {
        code: None,
        name: name.to_string(),
        description: None,
        weight: None,
        is_default: false,
        sort_order: 0,
        parent,
    }
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    sqlx::query_scalar(&sql).fetch_one(pool).await.unwrap()
}

#[tokio::test]
async fn test_database_created_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("ssf.db");

    let pool = init_database(&path).await.unwrap();
    assert!(path.exists());
    assert_eq!(count(&pool, "pillars").await, 0);
    pool.close().await;

    // Reopening an existing file keeps it usable
    let pool = init_database(&path).await.unwrap();
    assert_eq!(count(&pool, "schema_version").await, 1);
}

#[tokio::test]
async fn test_delete_cascades_to_descendants() {
    let pool = init_memory_database().await.unwrap();
    let seeded = seed(&pool).await;
    indicators::insert(&pool, &indicator("Leaks", IndicatorParent::Standard(seeded.standard)))
        .await
        .unwrap();
    indicators::insert(&pool, &indicator("Overall", IndicatorParent::Theme(seeded.theme)))
        .await
        .unwrap();

    pillars::delete(&pool, seeded.pillar).await.unwrap();

    for table in ["pillars", "themes", "subthemes", "standards", "indicators"] {
        assert_eq!(count(&pool, table).await, 0, "{} not emptied", table);
    }
}

#[tokio::test]
async fn test_partial_update_changes_only_given_fields() {
    let pool = init_memory_database().await.unwrap();
    let seeded = seed(&pool).await;

    pillars::update(
        &pool,
        seeded.pillar,
        &PillarUpdate {
            name: Some("Shelter & NFI".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let pillar = pillars::get(&pool, seeded.pillar).await.unwrap();
    assert_eq!(pillar.name, "Shelter & NFI");
    assert_eq!(pillar.code, "P1");

    let missing = pillars::update(&pool, 999, &PillarUpdate::default()).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_partial_update_can_clear_nullable_column() {
    let pool = init_memory_database().await.unwrap();
    let seeded = seed(&pool).await;

    let set = PillarUpdate {
        description: Some(Some("Physical dwelling".to_string())),
        ..Default::default()
    };
    pillars::update(&pool, seeded.pillar, &set).await.unwrap();
    assert_eq!(
        pillars::get(&pool, seeded.pillar).await.unwrap().description.as_deref(),
        Some("Physical dwelling")
    );

    // Absent leaves it alone, explicit null clears it
    pillars::update(&pool, seeded.pillar, &PillarUpdate::default()).await.unwrap();
    assert!(pillars::get(&pool, seeded.pillar).await.unwrap().description.is_some());

    let clear = PillarUpdate {
        description: Some(None),
        ..Default::default()
    };
    pillars::update(&pool, seeded.pillar, &clear).await.unwrap();
    assert_eq!(pillars::get(&pool, seeded.pillar).await.unwrap().description, None);
}

#[tokio::test]
async fn test_indicator_check_constraint_and_listing() {
    let pool = init_memory_database().await.unwrap();
    let seeded = seed(&pool).await;

    indicators::insert(&pool, &indicator("B", IndicatorParent::Subtheme(seeded.subtheme)))
        .await
        .unwrap();
    let mut a = indicator("A", IndicatorParent::Subtheme(seeded.subtheme));
    a.sort_order = -1;
    indicators::insert(&pool, &a).await.unwrap();

    let listed = indicators::list(
        &pool,
        &IndicatorFilter {
            subtheme_id: Some(seeded.subtheme),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(
        listed.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
        vec!["A", "B"]
    );

    // Bypassing the typed payload still can't attach to two parents
    let result = sqlx::query(
        "INSERT INTO indicators (name, pillar_id, theme_id) VALUES ('Bad', ?, ?)",
    )
    .bind(seeded.pillar)
    .bind(seeded.theme)
    .execute(&pool)
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_natural_sibling_order() {
    let pool = init_memory_database().await.unwrap();
    for code in ["P10", "P2", "P1"] {
        pillars::insert(
            &pool,
            &NewPillar {
                code: code.to_string(),
                name: code.to_string(),
                description: None,
                sort_order: 0,
            },
        )
        .await
        .unwrap();
    }

    let codes: Vec<String> = pillars::list(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.code)
        .collect();
    assert_eq!(codes, vec!["P1", "P2", "P10"]);
}

#[tokio::test]
async fn test_import_resolves_theme_code() {
    let pool = init_memory_database().await.unwrap();
    let seeded = seed(&pool).await;

    let csv = "name,pillar_code,theme_code,subtheme_code\nFire safety,,P1.T1,\n";
    let rows = parse_import_csv(Level::Indicator, csv.as_bytes()).unwrap();
    let report = import_rows(&pool, Level::Indicator, ImportMode::Upsert, rows)
        .await
        .unwrap();

    assert_eq!(report.inserted, 1);
    let listed = indicators::list(&pool, &IndicatorFilter::default()).await.unwrap();
    assert_eq!(listed[0].parent, IndicatorParent::Theme(seeded.theme));
}

#[tokio::test]
async fn test_upsert_by_code_updates_instead_of_duplicating() {
    let pool = init_memory_database().await.unwrap();
    seed(&pool).await;

    let csv = "code,name,description\nP1,Shelter conditions,Updated\nP2,Settlement,\n";
    let rows = parse_import_csv(Level::Pillar, csv.as_bytes()).unwrap();
    let report = import_rows(&pool, Level::Pillar, ImportMode::Upsert, rows)
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(count(&pool, "pillars").await, 2);

    let listed = pillars::list(&pool).await.unwrap();
    let p1 = listed.iter().find(|p| p.code == "P1").unwrap();
    assert_eq!(p1.name, "Shelter conditions");
    // Children survive an upsert of their parent
    assert_eq!(count(&pool, "themes").await, 1);
}

#[tokio::test]
async fn test_upsert_unknown_id_falls_back_to_code() {
    let pool = init_memory_database().await.unwrap();
    let seeded = seed(&pool).await;

    let csv = "id,code,name\n99,P1,Shelter renamed\n";
    let rows = parse_import_csv(Level::Pillar, csv.as_bytes()).unwrap();
    let report = import_rows(&pool, Level::Pillar, ImportMode::Upsert, rows)
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.inserted, 0);
    assert_eq!(count(&pool, "pillars").await, 1);
    let pillar = pillars::get(&pool, seeded.pillar).await.unwrap();
    assert_eq!(pillar.name, "Shelter renamed");
}

#[tokio::test]
async fn test_upsert_matches_id_before_code() {
    let pool = init_memory_database().await.unwrap();
    let seeded = seed(&pool).await;

    // Known id wins: the row renames P1 itself
    let csv = format!("id,code,name\n{},P5,Shelter\n", seeded.pillar);
    let rows = parse_import_csv(Level::Pillar, csv.as_bytes()).unwrap();
    let report = import_rows(&pool, Level::Pillar, ImportMode::Upsert, rows)
        .await
        .unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(pillars::get(&pool, seeded.pillar).await.unwrap().code, "P5");

    // Unknown id and unknown code: inserted under the given id
    let csv = "id,code,name\n42,P6,Services\n";
    let rows = parse_import_csv(Level::Pillar, csv.as_bytes()).unwrap();
    let report = import_rows(&pool, Level::Pillar, ImportMode::Upsert, rows)
        .await
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(pillars::get(&pool, 42).await.unwrap().code, "P6");
}

#[tokio::test]
async fn test_failing_row_rolls_back_whole_batch() {
    let pool = init_memory_database().await.unwrap();
    seed(&pool).await;

    // Line 3 duplicates line 2's code
    let csv = "code,name,theme_code\nP1.T1.2,Walls,P1.T1\nP1.T1.2,Floor,P1.T1\n";
    let rows = parse_import_csv(Level::Subtheme, csv.as_bytes()).unwrap();
    let result = import_rows(&pool, Level::Subtheme, ImportMode::Replace, rows).await;

    match result {
        Err(Error::Row { row, .. }) => assert_eq!(row, 3),
        other => panic!("expected row error, got {:?}", other),
    }
    // The replace-mode delete was rolled back too
    assert_eq!(count(&pool, "subthemes").await, 1);
    assert_eq!(count(&pool, "standards").await, 1);
}

#[tokio::test]
async fn test_unresolved_code_rejects_batch() {
    let pool = init_memory_database().await.unwrap();
    seed(&pool).await;

    let csv = "code,name,pillar_code\nP1.T2,Space,P1\nP9.T1,Orphan,P9\n";
    let rows = parse_import_csv(Level::Theme, csv.as_bytes()).unwrap();
    let result = import_rows(&pool, Level::Theme, ImportMode::Upsert, rows).await;

    match result {
        Err(Error::Row { row, message }) => {
            assert_eq!(row, 3);
            assert!(message.contains("P9"));
        }
        other => panic!("expected row error, got {:?}", other),
    }
    assert_eq!(count(&pool, "themes").await, 1);
}

#[tokio::test]
async fn test_replace_mode_cascades() {
    let pool = init_memory_database().await.unwrap();
    seed(&pool).await;

    let csv = "code,name\nP1,Shelter\n";
    let rows = parse_import_csv(Level::Pillar, csv.as_bytes()).unwrap();
    let report = import_rows(&pool, Level::Pillar, ImportMode::Replace, rows)
        .await
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(count(&pool, "themes").await, 0);
}

#[tokio::test]
async fn test_save_tree_inserts_renumbers_and_deletes() {
    let pool = init_memory_database().await.unwrap();
    let seeded = seed(&pool).await;
    let extra = themes::insert(
        &pool,
        &NewTheme {
            pillar_id: seeded.pillar,
            code: "P1.T2".to_string(),
            name: "Space".to_string(),
            description: None,
            sort_order: 2,
        },
    )
    .await
    .unwrap();

    let mut tree = load_tree(&pool).await.unwrap();
    assert_eq!(tree.pillars[0].themes.len(), 2);

    // New theme first, "Space" dropped
    tree.pillars[0].themes.retain(|t| t.id != Some(extra));
    tree.pillars[0].themes.insert(0, ThemeNode::new("Fire safety"));
    let saved = save_tree(&pool, &recalc_ref_codes(&tree)).await.unwrap();

    let themes = &saved.pillars[0].themes;
    assert_eq!(themes.len(), 2);
    assert_eq!(themes[0].name, "Fire safety");
    assert_eq!(themes[0].code, "P1.T1");
    assert_eq!(themes[1].id, Some(seeded.theme));
    assert_eq!(themes[1].code, "P1.T2");
    assert_eq!(themes[1].subthemes[0].code, "P1.T2.1");
    assert!(themes::get(&pool, extra).await.is_err());
}

#[tokio::test]
async fn test_save_tree_with_unknown_id_changes_nothing() {
    let pool = init_memory_database().await.unwrap();
    seed(&pool).await;

    let mut tree = load_tree(&pool).await.unwrap();
    tree.pillars[0].themes[0].id = Some(4242);

    assert!(save_tree(&pool, &recalc_ref_codes(&tree)).await.is_err());
    let after = load_tree(&pool).await.unwrap();
    assert_eq!(after.pillars[0].code, "P1");
    assert_eq!(after.pillars[0].themes[0].code, "P1.T1");
}

#[tokio::test]
async fn test_export_tree_and_grouping_from_store() {
    let pool = init_memory_database().await.unwrap();
    let seeded = seed(&pool).await;
    for name in ["Leaks", "Material"] {
        indicators::insert(&pool, &indicator(name, IndicatorParent::Standard(seeded.standard)))
            .await
            .unwrap();
    }
    standards::insert(
        &pool,
        &NewStandard {
            subtheme_id: seeded.subtheme,
            code: None,
            description: "Roof is insulated".to_string(),
            notes: None,
            sort_order: 2,
        },
    )
    .await
    .unwrap();

    let snapshot = load_export_tree(&pool).await.unwrap();
    let leaves = framework_rows(&snapshot)
        .into_iter()
        .filter(|r| r.kind == RowKind::Leaf)
        .count();
    assert_eq!(leaves, 3);

    let groups = load_grouped_standards(&pool).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].themes[0].subthemes[0].rows.len(), 2);
}
