//! Tree builder: flat denormalised rows → pillar / theme / sub-theme groups
//!
//! Rows must already be sorted by the caller so equal grouping keys are
//! contiguous; the builder itself never reorders anything. A group is created
//! the first time its `(parent chain, code)` key is seen and later rows with
//! the same key are appended to it, so first-seen order is preserved.

use serde::Serialize;
use std::collections::HashMap;

/// Code and display name of one grouping level of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupLabel<'a> {
    pub code: &'a str,
    pub name: &'a str,
}

/// Access to the pillar / theme / sub-theme keys a row is grouped by
pub trait GroupKeys {
    fn pillar(&self) -> GroupLabel<'_>;
    fn theme(&self) -> GroupLabel<'_>;
    fn subtheme(&self) -> GroupLabel<'_>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarGroup<R> {
    pub code: String,
    pub name: String,
    pub themes: Vec<ThemeGroup<R>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeGroup<R> {
    pub code: String,
    pub name: String,
    pub subthemes: Vec<SubthemeGroup<R>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubthemeGroup<R> {
    pub code: String,
    pub name: String,
    pub rows: Vec<R>,
}

/// Group pre-sorted rows into nested pillar → theme → sub-theme nodes
pub fn build_groups<R: GroupKeys>(rows: Vec<R>) -> Vec<PillarGroup<R>> {
    let mut pillars: Vec<PillarGroup<R>> = Vec::new();
    let mut pillar_index: HashMap<String, usize> = HashMap::new();
    let mut theme_index: HashMap<(usize, String), usize> = HashMap::new();
    let mut subtheme_index: HashMap<(usize, usize, String), usize> = HashMap::new();

    for row in rows {
        let (p, t, s) = {
            let pillar = row.pillar();
            let p = *pillar_index
                .entry(pillar.code.to_string())
                .or_insert_with(|| {
                    pillars.push(PillarGroup {
                        code: pillar.code.to_string(),
                        name: pillar.name.to_string(),
                        themes: Vec::new(),
                    });
                    pillars.len() - 1
                });

            let theme = row.theme();
            let themes = &mut pillars[p].themes;
            let t = *theme_index
                .entry((p, theme.code.to_string()))
                .or_insert_with(|| {
                    themes.push(ThemeGroup {
                        code: theme.code.to_string(),
                        name: theme.name.to_string(),
                        subthemes: Vec::new(),
                    });
                    themes.len() - 1
                });

            let subtheme = row.subtheme();
            let subthemes = &mut pillars[p].themes[t].subthemes;
            let s = *subtheme_index
                .entry((p, t, subtheme.code.to_string()))
                .or_insert_with(|| {
                    subthemes.push(SubthemeGroup {
                        code: subtheme.code.to_string(),
                        name: subtheme.name.to_string(),
                        rows: Vec::new(),
                    });
                    subthemes.len() - 1
                });

            (p, t, s)
        };

        pillars[p].themes[t].subthemes[s].rows.push(row);
    }

    pillars
}

/// Total number of leaf rows held by a grouping
pub fn leaf_count<R>(groups: &[PillarGroup<R>]) -> usize {
    groups
        .iter()
        .flat_map(|p| &p.themes)
        .flat_map(|t| &t.subthemes)
        .map(|s| s.rows.len())
        .sum()
}
