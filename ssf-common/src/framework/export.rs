//! CSV export formatting
//!
//! Two layouts are produced from a loaded [`FrameworkSnapshot`]:
//!
//! - the wide framework table, walked pre-order depth-first. Each pillar,
//!   theme and sub-theme emits a summary row with its own columns filled and
//!   everything else blank; indicators attached directly to that level follow
//!   it. Each standard then emits one leaf row per indicator, or a single row
//!   with blank indicator cells when it has none. Blank cells mean "same as
//!   the row above".
//! - the flat combined listing, one row per entity of any level.
//!
//! Every field is quoted and the output starts with a UTF-8 byte-order mark.

use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::io::Write;

use super::Level;
use crate::db::models::{Indicator, Pillar, Standard, Subtheme, Theme};
use crate::{Error, Result};

pub const UTF8_BOM: &[u8; 3] = b"\xEF\xBB\xBF";

pub const FRAMEWORK_HEADER: [&str; 15] = [
    "Pillar Code",
    "Pillar",
    "Theme Code",
    "Theme",
    "Sub-theme Code",
    "Sub-theme",
    "Description",
    "Standard Code",
    "Standard",
    "Notes",
    "Indicator Code",
    "Indicator",
    "Indicator Description",
    "Weight",
    "Default",
];

pub const COMBINED_HEADER: [&str; 6] =
    ["level", "code", "parent_code", "name", "description", "sort_order"];

/// The whole stored hierarchy, children in display order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameworkSnapshot {
    pub pillars: Vec<PillarBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarBranch {
    pub pillar: Pillar,
    pub indicators: Vec<Indicator>,
    pub themes: Vec<ThemeBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeBranch {
    pub theme: Theme,
    pub indicators: Vec<Indicator>,
    pub subthemes: Vec<SubthemeBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubthemeBranch {
    pub subtheme: Subtheme,
    pub indicators: Vec<Indicator>,
    pub standards: Vec<StandardBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardBranch {
    pub standard: Standard,
    pub indicators: Vec<Indicator>,
}

impl FrameworkSnapshot {
    pub fn standard_count(&self) -> usize {
        self.pillars
            .iter()
            .flat_map(|p| &p.themes)
            .flat_map(|t| &t.subthemes)
            .map(|s| s.standards.len())
            .sum()
    }
}

/// What produced a row of the wide table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// First encounter of a pillar, theme or sub-theme
    Summary(Level),
    /// Indicator attached directly to a pillar, theme or sub-theme
    Attachment(Level),
    /// Standard × indicator
    Leaf,
}

/// One row of the wide table; `None` cells are written empty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameworkRecord {
    pub pillar_code: Option<String>,
    pub pillar: Option<String>,
    pub theme_code: Option<String>,
    pub theme: Option<String>,
    pub subtheme_code: Option<String>,
    pub subtheme: Option<String>,
    pub description: Option<String>,
    pub standard_code: Option<String>,
    pub standard: Option<String>,
    pub notes: Option<String>,
    pub indicator_code: Option<String>,
    pub indicator: Option<String>,
    pub indicator_description: Option<String>,
    pub weight: Option<String>,
    pub default: Option<String>,
}

impl FrameworkRecord {
    fn with_indicator(mut self, indicator: &Indicator) -> Self {
        self.indicator_code = indicator.code.clone();
        self.indicator = Some(indicator.name.clone());
        self.indicator_description = indicator.description.clone();
        self.weight = indicator.weight.map(|w| w.to_string());
        self.default = Some(if indicator.is_default { "TRUE" } else { "FALSE" }.to_string());
        self
    }

    pub fn fields(&self) -> [&str; 15] {
        [
            &self.pillar_code,
            &self.pillar,
            &self.theme_code,
            &self.theme,
            &self.subtheme_code,
            &self.subtheme,
            &self.description,
            &self.standard_code,
            &self.standard,
            &self.notes,
            &self.indicator_code,
            &self.indicator,
            &self.indicator_description,
            &self.weight,
            &self.default,
        ]
        .map(|cell| cell.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub kind: RowKind,
    pub record: FrameworkRecord,
}

fn attachment_rows(level: Level, indicators: &[Indicator], out: &mut Vec<ExportRow>) {
    out.extend(indicators.iter().map(|indicator| ExportRow {
        kind: RowKind::Attachment(level),
        record: FrameworkRecord::default().with_indicator(indicator),
    }));
}

fn standard_rows(branch: &StandardBranch, out: &mut Vec<ExportRow>) {
    let standard = &branch.standard;
    let first = FrameworkRecord {
        standard_code: standard.code.clone(),
        standard: Some(standard.description.clone()),
        notes: standard.notes.clone(),
        ..Default::default()
    };

    match branch.indicators.split_first() {
        None => out.push(ExportRow {
            kind: RowKind::Leaf,
            record: first,
        }),
        Some((head, rest)) => {
            out.push(ExportRow {
                kind: RowKind::Leaf,
                record: first.with_indicator(head),
            });
            out.extend(rest.iter().map(|indicator| ExportRow {
                kind: RowKind::Leaf,
                record: FrameworkRecord::default().with_indicator(indicator),
            }));
        }
    }
}

/// Rows of the wide framework table in traversal order
pub fn framework_rows(snapshot: &FrameworkSnapshot) -> Vec<ExportRow> {
    let mut rows = Vec::new();

    for p in &snapshot.pillars {
        rows.push(ExportRow {
            kind: RowKind::Summary(Level::Pillar),
            record: FrameworkRecord {
                pillar_code: Some(p.pillar.code.clone()),
                pillar: Some(p.pillar.name.clone()),
                description: p.pillar.description.clone(),
                ..Default::default()
            },
        });
        attachment_rows(Level::Pillar, &p.indicators, &mut rows);

        for t in &p.themes {
            rows.push(ExportRow {
                kind: RowKind::Summary(Level::Theme),
                record: FrameworkRecord {
                    theme_code: Some(t.theme.code.clone()),
                    theme: Some(t.theme.name.clone()),
                    description: t.theme.description.clone(),
                    ..Default::default()
                },
            });
            attachment_rows(Level::Theme, &t.indicators, &mut rows);

            for s in &t.subthemes {
                rows.push(ExportRow {
                    kind: RowKind::Summary(Level::Subtheme),
                    record: FrameworkRecord {
                        subtheme_code: Some(s.subtheme.code.clone()),
                        subtheme: Some(s.subtheme.name.clone()),
                        description: s.subtheme.description.clone(),
                        ..Default::default()
                    },
                });
                attachment_rows(Level::Subtheme, &s.indicators, &mut rows);

                for standard in &s.standards {
                    standard_rows(standard, &mut rows);
                }
            }
        }
    }

    rows
}

/// One row of the flat combined listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRecord {
    pub level: Level,
    pub code: Option<String>,
    pub parent_code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

impl CombinedRecord {
    fn indicator(indicator: &Indicator, parent_code: Option<&str>) -> Self {
        CombinedRecord {
            level: Level::Indicator,
            code: indicator.code.clone(),
            parent_code: parent_code.map(str::to_string),
            name: indicator.name.clone(),
            description: indicator.description.clone(),
            sort_order: indicator.sort_order,
        }
    }

    fn fields(&self) -> [String; 6] {
        [
            self.level.to_string(),
            self.code.clone().unwrap_or_default(),
            self.parent_code.clone().unwrap_or_default(),
            self.name.clone(),
            self.description.clone().unwrap_or_default(),
            self.sort_order.to_string(),
        ]
    }
}

/// Every entity, parents before children, each followed by its indicators
///
/// Standards have no name of their own: their description fills `name` and
/// their notes fill `description`.
pub fn combined_rows(snapshot: &FrameworkSnapshot) -> Vec<CombinedRecord> {
    let mut rows = Vec::new();

    for p in &snapshot.pillars {
        let pillar_code = p.pillar.code.as_str();
        rows.push(CombinedRecord {
            level: Level::Pillar,
            code: Some(p.pillar.code.clone()),
            parent_code: None,
            name: p.pillar.name.clone(),
            description: p.pillar.description.clone(),
            sort_order: p.pillar.sort_order,
        });
        rows.extend(p.indicators.iter().map(|i| CombinedRecord::indicator(i, Some(pillar_code))));

        for t in &p.themes {
            let theme_code = t.theme.code.as_str();
            rows.push(CombinedRecord {
                level: Level::Theme,
                code: Some(t.theme.code.clone()),
                parent_code: Some(pillar_code.to_string()),
                name: t.theme.name.clone(),
                description: t.theme.description.clone(),
                sort_order: t.theme.sort_order,
            });
            rows.extend(t.indicators.iter().map(|i| CombinedRecord::indicator(i, Some(theme_code))));

            for s in &t.subthemes {
                let subtheme_code = s.subtheme.code.as_str();
                rows.push(CombinedRecord {
                    level: Level::Subtheme,
                    code: Some(s.subtheme.code.clone()),
                    parent_code: Some(theme_code.to_string()),
                    name: s.subtheme.name.clone(),
                    description: s.subtheme.description.clone(),
                    sort_order: s.subtheme.sort_order,
                });
                rows.extend(
                    s.indicators
                        .iter()
                        .map(|i| CombinedRecord::indicator(i, Some(subtheme_code))),
                );

                for b in &s.standards {
                    let standard = &b.standard;
                    rows.push(CombinedRecord {
                        level: Level::Standard,
                        code: standard.code.clone(),
                        parent_code: Some(subtheme_code.to_string()),
                        name: standard.description.clone(),
                        description: standard.notes.clone(),
                        sort_order: standard.sort_order,
                    });
                    rows.extend(
                        b.indicators
                            .iter()
                            .map(|i| CombinedRecord::indicator(i, standard.code.as_deref())),
                    );
                }
            }
        }
    }

    rows
}

fn csv_writer<W: Write>(mut out: W) -> Result<csv::Writer<W>> {
    out.write_all(UTF8_BOM)?;
    Ok(WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .from_writer(out))
}

fn finish<W: Write>(writer: csv::Writer<W>) -> Result<W> {
    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// Write the wide framework table
pub fn write_framework_csv<W: Write>(snapshot: &FrameworkSnapshot, out: W) -> Result<W> {
    let mut writer = csv_writer(out)?;
    writer.write_record(FRAMEWORK_HEADER)?;
    for row in framework_rows(snapshot) {
        writer.write_record(row.record.fields())?;
    }
    finish(writer)
}

/// Write the flat combined listing
pub fn write_combined_csv<W: Write>(snapshot: &FrameworkSnapshot, out: W) -> Result<W> {
    let mut writer = csv_writer(out)?;
    writer.write_record(COMBINED_HEADER)?;
    for record in combined_rows(snapshot) {
        writer.write_record(record.fields())?;
    }
    finish(writer)
}

pub fn framework_csv_bytes(snapshot: &FrameworkSnapshot) -> Result<Vec<u8>> {
    write_framework_csv(snapshot, Vec::new())
}

pub fn combined_csv_bytes(snapshot: &FrameworkSnapshot) -> Result<Vec<u8>> {
    write_combined_csv(snapshot, Vec::new())
}
