//! Positional reference codes
//!
//! Codes are derived purely from array position:
//! pillar `i` → `P<i+1>`, theme `j` → `<pillar>.T<j+1>`, sub-theme `k` →
//! `<theme>.<k+1>`, and `sort_order` is the 1-based position among siblings.

use serde::Serialize;
use std::collections::BTreeMap;

use super::tree::{FrameworkTree, PillarNode, SubthemeNode, ThemeNode};
use super::Level;

pub fn pillar_code(index: usize) -> String {
    format!("P{}", index + 1)
}

pub fn theme_code(pillar_code: &str, index: usize) -> String {
    format!("{}.T{}", pillar_code, index + 1)
}

pub fn subtheme_code(theme_code: &str, index: usize) -> String {
    format!("{}.{}", theme_code, index + 1)
}

fn position(index: usize) -> i64 {
    index as i64 + 1
}

/// Recompute every code and `sort_order` from array order
///
/// Returns a new tree; ids, names and descriptions are carried over unchanged.
pub fn recalc_ref_codes(tree: &FrameworkTree) -> FrameworkTree {
    let pillars = tree
        .pillars
        .iter()
        .enumerate()
        .map(|(i, pillar)| {
            let code = pillar_code(i);
            let themes = pillar
                .themes
                .iter()
                .enumerate()
                .map(|(j, theme)| recalc_theme(theme, &code, j))
                .collect();
            PillarNode {
                id: pillar.id,
                code,
                name: pillar.name.clone(),
                description: pillar.description.clone(),
                sort_order: position(i),
                themes,
            }
        })
        .collect();

    FrameworkTree { pillars }
}

fn recalc_theme(theme: &ThemeNode, pillar_code: &str, j: usize) -> ThemeNode {
    let code = theme_code(pillar_code, j);
    let subthemes = theme
        .subthemes
        .iter()
        .enumerate()
        .map(|(k, subtheme)| SubthemeNode {
            id: subtheme.id,
            code: subtheme_code(&code, k),
            name: subtheme.name.clone(),
            description: subtheme.description.clone(),
            sort_order: position(k),
        })
        .collect();

    ThemeNode {
        id: theme.id,
        code,
        name: theme.name.clone(),
        description: theme.description.clone(),
        sort_order: position(j),
        subthemes,
    }
}

/// Identity of a tree node for dirty tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKey {
    /// Persisted node, keyed by its store id
    Stored { level: Level, id: i64 },
    /// Node not saved yet, keyed by its current index path
    Unsaved { level: Level, path: Vec<usize> },
}

impl NodeKey {
    fn new(level: Level, id: Option<i64>, path: &[usize]) -> Self {
        match id {
            Some(id) => NodeKey::Stored { level, id },
            None => NodeKey::Unsaved {
                level,
                path: path.to_vec(),
            },
        }
    }
}

/// Stored versus freshly computed code for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirtyEntry {
    pub key: NodeKey,
    pub current_code: String,
    pub computed_code: String,
    pub dirty: bool,
}

/// Compare each node's current code with its positional code, in tree order
///
/// The tree itself is not rewritten.
pub fn dirty_entries(tree: &FrameworkTree) -> Vec<DirtyEntry> {
    let mut entries = Vec::new();
    let mut push = |level: Level, id: Option<i64>, path: &[usize], current: &str, computed: &str| {
        entries.push(DirtyEntry {
            key: NodeKey::new(level, id, path),
            current_code: current.to_string(),
            computed_code: computed.to_string(),
            dirty: current != computed,
        });
    };

    for (i, pillar) in tree.pillars.iter().enumerate() {
        let p_code = pillar_code(i);
        push(Level::Pillar, pillar.id, &[i], &pillar.code, &p_code);

        for (j, theme) in pillar.themes.iter().enumerate() {
            let t_code = theme_code(&p_code, j);
            push(Level::Theme, theme.id, &[i, j], &theme.code, &t_code);

            for (k, subtheme) in theme.subthemes.iter().enumerate() {
                let s_code = subtheme_code(&t_code, k);
                push(Level::Subtheme, subtheme.id, &[i, j, k], &subtheme.code, &s_code);
            }
        }
    }

    entries
}

/// Per node: does the current code differ from the positional one?
pub fn dirty_map(tree: &FrameworkTree) -> BTreeMap<NodeKey, bool> {
    dirty_entries(tree)
        .into_iter()
        .map(|entry| (entry.key, entry.dirty))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::tree::{apply_edit, NodePath, TreeEdit, TreeNode};

    fn stored_pillar(id: i64, code: &str, themes: Vec<ThemeNode>) -> PillarNode {
        PillarNode {
            id: Some(id),
            code: code.to_string(),
            name: format!("Pillar {}", id),
            description: Some("desc".to_string()),
            sort_order: 7,
            themes,
        }
    }

    fn stored_theme(id: i64, code: &str, subthemes: Vec<SubthemeNode>) -> ThemeNode {
        ThemeNode {
            id: Some(id),
            code: code.to_string(),
            name: format!("Theme {}", id),
            description: None,
            sort_order: 3,
            subthemes,
        }
    }

    fn stored_subtheme(id: i64, code: &str) -> SubthemeNode {
        SubthemeNode {
            id: Some(id),
            code: code.to_string(),
            name: format!("Subtheme {}", id),
            description: None,
            sort_order: 9,
        }
    }

    fn messy_tree() -> FrameworkTree {
        FrameworkTree {
            pillars: vec![
                stored_pillar(
                    10,
                    "X",
                    vec![
                        stored_theme(20, "T1", vec![stored_subtheme(30, "a"), stored_subtheme(31, "b")]),
                        stored_theme(21, "T7", vec![]),
                    ],
                ),
                stored_pillar(11, "P2", vec![stored_theme(22, "P2.T1", vec![stored_subtheme(32, "P2.T1.1")])]),
            ],
        }
    }

    #[test]
    fn test_positional_codes_and_sort_orders() {
        let tree = recalc_ref_codes(&messy_tree());

        assert_eq!(tree.pillars[0].code, "P1");
        assert_eq!(tree.pillars[0].sort_order, 1);
        assert_eq!(tree.pillars[1].code, "P2");
        assert_eq!(tree.pillars[1].sort_order, 2);
        assert_eq!(tree.pillars[0].themes[0].code, "P1.T1");
        assert_eq!(tree.pillars[0].themes[1].code, "P1.T2");
        assert_eq!(tree.pillars[0].themes[1].sort_order, 2);
        assert_eq!(tree.pillars[0].themes[0].subthemes[0].code, "P1.T1.1");
        assert_eq!(tree.pillars[0].themes[0].subthemes[1].code, "P1.T1.2");
        assert_eq!(tree.pillars[0].themes[0].subthemes[1].sort_order, 2);
        assert_eq!(tree.pillars[1].themes[0].subthemes[0].code, "P2.T1.1");
    }

    #[test]
    fn test_recalc_is_idempotent() {
        let once = recalc_ref_codes(&messy_tree());
        let twice = recalc_ref_codes(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_recalc_only_changes_codes_and_sort_orders() {
        let original = messy_tree();
        let recalculated = recalc_ref_codes(&original);

        assert_eq!(original.pillars.len(), recalculated.pillars.len());
        for (before, after) in original.pillars.iter().zip(&recalculated.pillars) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.name, after.name);
            assert_eq!(before.description, after.description);
            assert_eq!(before.themes.len(), after.themes.len());
            for (tb, ta) in before.themes.iter().zip(&after.themes) {
                assert_eq!(tb.id, ta.id);
                assert_eq!(tb.name, ta.name);
                assert_eq!(tb.subthemes.len(), ta.subthemes.len());
                for (sb, sa) in tb.subthemes.iter().zip(&ta.subthemes) {
                    assert_eq!(sb.id, sa.id);
                    assert_eq!(sb.name, sa.name);
                }
            }
        }
        // Input left as it was
        assert_eq!(original.pillars[0].code, "X");
    }

    #[test]
    fn test_insert_theme_then_recalc() {
        let tree = FrameworkTree {
            pillars: vec![
                stored_pillar(1, "P1", vec![stored_theme(5, "P1.T1", vec![])]),
                stored_pillar(2, "P2", vec![]),
            ],
        };
        let mut new_theme = ThemeNode::new("Fire safety");
        new_theme.code = "ZZZ".to_string();

        let edited = apply_edit(
            &tree,
            &TreeEdit::Insert {
                parent: NodePath(vec![0]),
                position: 0,
                node: TreeNode::Theme(new_theme),
            },
        )
        .unwrap();
        let recalculated = recalc_ref_codes(&edited);

        assert_eq!(recalculated.pillars[0].themes[0].code, "P1.T1");
        assert_eq!(recalculated.pillars[0].themes[0].name, "Fire safety");
        assert_eq!(recalculated.pillars[0].themes[1].code, "P1.T2");
        assert_eq!(recalculated.pillars[0].themes[1].id, Some(5));
    }

    #[test]
    fn test_dirty_map_flags_changed_codes_only() {
        let tree = messy_tree();
        let dirty = dirty_map(&tree);

        assert_eq!(dirty[&NodeKey::Stored { level: Level::Pillar, id: 10 }], true);
        assert_eq!(dirty[&NodeKey::Stored { level: Level::Pillar, id: 11 }], false);
        assert_eq!(dirty[&NodeKey::Stored { level: Level::Theme, id: 20 }], true);
        assert_eq!(dirty[&NodeKey::Stored { level: Level::Theme, id: 22 }], false);
        assert_eq!(dirty[&NodeKey::Stored { level: Level::Subtheme, id: 32 }], false);
        assert_eq!(dirty.len(), 8);

        // Nothing rewritten
        assert_eq!(tree.pillars[0].code, "X");
    }

    #[test]
    fn test_dirty_map_empty_after_recalc() {
        let tree = recalc_ref_codes(&messy_tree());
        assert!(dirty_map(&tree).values().all(|dirty| !dirty));
    }

    #[test]
    fn test_unsaved_nodes_keyed_by_path() {
        let tree = FrameworkTree {
            pillars: vec![PillarNode::new("New pillar")],
        };
        let entries = dirty_entries(&tree);

        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].key,
            NodeKey::Unsaved {
                level: Level::Pillar,
                path: vec![0]
            }
        );
        assert_eq!(entries[0].computed_code, "P1");
        assert!(entries[0].dirty);
    }
}
