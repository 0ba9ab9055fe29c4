//! CSV import row schemas
//!
//! Each target table has its own row shape. Rows are validated while they
//! are read: a row that does not match its table's shape is rejected with
//! its line number instead of being coerced. Empty cells count as absent.
//!
//! | table      | columns                                                                    |
//! |------------|----------------------------------------------------------------------------|
//! | pillars    | `id?, code, name, description, sort_order`                                 |
//! | themes     | `id?, code, pillar_code \| pillar_id, name, description, sort_order`       |
//! | subthemes  | `id?, code, theme_code \| theme_id, name, description, sort_order`         |
//! | standards  | `id?, code, subtheme_code \| subtheme_id, description, notes, sort_order`  |
//! | indicators | `id?, code, name, description, weight, is_default, sort_order` plus one of `<level>_id \| <level>_code` |
//!
//! A missing `sort_order` defaults to the row's position in the file.

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::resolver::{ParentRef, ParentReference};
use super::Level;
use crate::db::models::{
    IndicatorParent, NewIndicator, NewPillar, NewStandard, NewSubtheme, NewTheme,
};
use crate::{Error, Result};

const UTF8_BOM: &[u8; 3] = b"\xEF\xBB\xBF";

/// How an import batch is applied to its table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Update rows matched by id or code, insert the rest
    #[default]
    Upsert,
    /// Delete every row of the table (cascading to children), then insert
    Replace,
}

impl FromStr for ImportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "upsert" => Ok(ImportMode::Upsert),
            "replace" => Ok(ImportMode::Replace),
            other => Err(Error::Validation(format!(
                "Unknown import mode '{}' (expected upsert or replace)",
                other
            ))),
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Upsert => f.write_str("upsert"),
            ImportMode::Replace => f.write_str("replace"),
        }
    }
}

/// Parent reference as read from a row: an id, a code, or both
#[derive(Debug, Clone, PartialEq)]
pub struct ParentCell {
    pub level: Level,
    pub id: Option<i64>,
    pub code: Option<String>,
}

impl ParentCell {
    fn resolved_id(&self, line: usize) -> Result<i64> {
        self.id.ok_or_else(|| Error::Row {
            row: line,
            message: format!(
                "{} '{}' not found",
                self.level,
                self.code.as_deref().unwrap_or_default()
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PillarImport {
    pub id: Option<i64>,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeImport {
    pub id: Option<i64>,
    pub code: String,
    pub pillar: ParentCell,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubthemeImport {
    pub id: Option<i64>,
    pub code: String,
    pub theme: ParentCell,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardImport {
    pub id: Option<i64>,
    pub code: Option<String>,
    pub subtheme: ParentCell,
    pub description: String,
    pub notes: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorImport {
    pub id: Option<i64>,
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub is_default: bool,
    pub sort_order: i64,
    pub parent: ParentCell,
}

/// One validated import row, tagged by target table
#[derive(Debug, Clone, PartialEq)]
pub enum ImportRow {
    Pillar(PillarImport),
    Theme(ThemeImport),
    Subtheme(SubthemeImport),
    Standard(StandardImport),
    Indicator(IndicatorImport),
}

/// A validated row together with its 1-based line number in the file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub line: usize,
    pub row: ImportRow,
}

impl ImportRow {
    pub fn level(&self) -> Level {
        match self {
            ImportRow::Pillar(_) => Level::Pillar,
            ImportRow::Theme(_) => Level::Theme,
            ImportRow::Subtheme(_) => Level::Subtheme,
            ImportRow::Standard(_) => Level::Standard,
            ImportRow::Indicator(_) => Level::Indicator,
        }
    }

    /// Explicit id column value
    pub fn id(&self) -> Option<i64> {
        match self {
            ImportRow::Pillar(r) => r.id,
            ImportRow::Theme(r) => r.id,
            ImportRow::Subtheme(r) => r.id,
            ImportRow::Standard(r) => r.id,
            ImportRow::Indicator(r) => r.id,
        }
    }

    /// Code of the row itself (the upsert conflict key)
    pub fn code(&self) -> Option<&str> {
        match self {
            ImportRow::Pillar(r) => Some(&r.code),
            ImportRow::Theme(r) => Some(&r.code),
            ImportRow::Subtheme(r) => Some(&r.code),
            ImportRow::Standard(r) => r.code.as_deref(),
            ImportRow::Indicator(r) => r.code.as_deref(),
        }
    }

    fn parent_cell(&self) -> Option<&ParentCell> {
        match self {
            ImportRow::Pillar(_) => None,
            ImportRow::Theme(r) => Some(&r.pillar),
            ImportRow::Subtheme(r) => Some(&r.theme),
            ImportRow::Standard(r) => Some(&r.subtheme),
            ImportRow::Indicator(r) => Some(&r.parent),
        }
    }

    fn parent_cell_mut(&mut self) -> Option<&mut ParentCell> {
        match self {
            ImportRow::Pillar(_) => None,
            ImportRow::Theme(r) => Some(&mut r.pillar),
            ImportRow::Subtheme(r) => Some(&mut r.theme),
            ImportRow::Standard(r) => Some(&mut r.subtheme),
            ImportRow::Indicator(r) => Some(&mut r.parent),
        }
    }
}

impl ParentRef for ParsedRow {
    fn parent_reference(&self) -> Option<ParentReference> {
        self.row.parent_cell().map(|cell| ParentReference {
            level: cell.level,
            id: cell.id,
            code: cell.code.clone(),
        })
    }

    fn set_parent_id(&mut self, id: i64) {
        if let Some(cell) = self.row.parent_cell_mut() {
            cell.id = Some(id);
        }
    }
}

/// A row ready to be written: resolved parent id plus store payload
#[derive(Debug, Clone, PartialEq)]
pub enum ImportRecord {
    Pillar(NewPillar),
    Theme(NewTheme),
    Subtheme(NewSubtheme),
    Standard(NewStandard),
    Indicator(NewIndicator),
}

impl ParsedRow {
    /// Convert to a store payload; fails if the parent is still unresolved
    pub fn into_record(self) -> Result<(Option<i64>, ImportRecord)> {
        let line = self.line;
        let record = match self.row {
            ImportRow::Pillar(r) => (
                r.id,
                ImportRecord::Pillar(NewPillar {
                    code: r.code,
                    name: r.name,
                    description: r.description,
                    sort_order: r.sort_order,
                }),
            ),
            ImportRow::Theme(r) => (
                r.id,
                ImportRecord::Theme(NewTheme {
                    pillar_id: r.pillar.resolved_id(line)?,
                    code: r.code,
                    name: r.name,
                    description: r.description,
                    sort_order: r.sort_order,
                }),
            ),
            ImportRow::Subtheme(r) => (
                r.id,
                ImportRecord::Subtheme(NewSubtheme {
                    theme_id: r.theme.resolved_id(line)?,
                    code: r.code,
                    name: r.name,
                    description: r.description,
                    sort_order: r.sort_order,
                }),
            ),
            ImportRow::Standard(r) => (
                r.id,
                ImportRecord::Standard(NewStandard {
                    subtheme_id: r.subtheme.resolved_id(line)?,
                    code: r.code,
                    description: r.description,
                    notes: r.notes,
                    sort_order: r.sort_order,
                }),
            ),
            ImportRow::Indicator(r) => {
                let parent = IndicatorParent::new(r.parent.level, r.parent.resolved_id(line)?)?;
                (
                    r.id,
                    ImportRecord::Indicator(NewIndicator {
                        code: r.code,
                        name: r.name,
                        description: r.description,
                        weight: r.weight,
                        is_default: r.is_default,
                        sort_order: r.sort_order,
                        parent,
                    }),
                )
            }
        };
        Ok(record)
    }
}

/// Parse and validate an uploaded CSV for `level`
///
/// The first failing row aborts parsing; nothing has touched the store yet.
pub fn parse_import_csv(level: Level, data: &[u8]) -> Result<Vec<ParsedRow>> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = build_header_map(reader.headers()?);
    let mut rows = Vec::new();

    for (index, result) in reader.records().enumerate() {
        // +2: 1-based and header row
        let fallback_line = index + 2;
        let record = result.map_err(|e| Error::Row {
            row: fallback_line,
            message: format!("CSV parse error: {}", e),
        })?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);

        if record.iter().all(str::is_empty) {
            continue;
        }

        let fields = Fields {
            record: &record,
            headers: &headers,
            line,
        };
        let default_sort = rows.len() as i64 + 1;
        let row = parse_row(level, &fields, default_sort)?;
        rows.push(ParsedRow { line, row });
    }

    Ok(rows)
}

fn parse_row(level: Level, fields: &Fields<'_>, default_sort: i64) -> Result<ImportRow> {
    let id = fields.int("id")?;
    let sort_order = fields.int("sort_order")?.unwrap_or(default_sort);

    let row = match level {
        Level::Pillar => ImportRow::Pillar(PillarImport {
            id,
            code: fields.required("code")?,
            name: fields.required("name")?,
            description: fields.text("description"),
            sort_order,
        }),
        Level::Theme => ImportRow::Theme(ThemeImport {
            id,
            code: fields.required("code")?,
            pillar: fields.required_parent(Level::Pillar)?,
            name: fields.required("name")?,
            description: fields.text("description"),
            sort_order,
        }),
        Level::Subtheme => ImportRow::Subtheme(SubthemeImport {
            id,
            code: fields.required("code")?,
            theme: fields.required_parent(Level::Theme)?,
            name: fields.required("name")?,
            description: fields.text("description"),
            sort_order,
        }),
        Level::Standard => ImportRow::Standard(StandardImport {
            id,
            code: fields.text("code"),
            subtheme: fields.required_parent(Level::Subtheme)?,
            description: fields.required("description")?,
            notes: fields.text("notes"),
            sort_order,
        }),
        Level::Indicator => ImportRow::Indicator(IndicatorImport {
            id,
            code: fields.text("code"),
            name: fields.required("name")?,
            description: fields.text("description"),
            weight: fields.float("weight")?,
            is_default: fields.flag("is_default")?,
            sort_order,
            parent: fields.indicator_parent()?,
        }),
    };

    Ok(row)
}

/// Map of lower-cased header names to column indices
fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect()
}

struct Fields<'a> {
    record: &'a StringRecord,
    headers: &'a HashMap<String, usize>,
    line: usize,
}

impl Fields<'_> {
    fn invalid(&self, message: String) -> Error {
        Error::Row {
            row: self.line,
            message,
        }
    }

    fn text(&self, column: &str) -> Option<String> {
        self.headers
            .get(column)
            .and_then(|&idx| self.record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn required(&self, column: &str) -> Result<String> {
        self.text(column)
            .ok_or_else(|| self.invalid(format!("Missing required field '{}'", column)))
    }

    fn int(&self, column: &str) -> Result<Option<i64>> {
        self.text(column)
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| self.invalid(format!("'{}' is not an integer: {}", column, v)))
            })
            .transpose()
    }

    fn float(&self, column: &str) -> Result<Option<f64>> {
        self.text(column)
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| self.invalid(format!("'{}' is not a number: {}", column, v)))
            })
            .transpose()
    }

    fn flag(&self, column: &str) -> Result<bool> {
        match self.text(column).map(|v| v.to_ascii_lowercase()) {
            None => Ok(false),
            Some(v) => match v.as_str() {
                "true" | "t" | "yes" | "y" | "1" => Ok(true),
                "false" | "f" | "no" | "n" | "0" => Ok(false),
                _ => Err(self.invalid(format!("'{}' is not a boolean: {}", column, v))),
            },
        }
    }

    fn parent(&self, level: Level) -> Result<Option<ParentCell>> {
        let id = self.int(level.id_column())?;
        let code = self.text(level.code_column());
        if id.is_none() && code.is_none() {
            return Ok(None);
        }
        Ok(Some(ParentCell { level, id, code }))
    }

    fn required_parent(&self, level: Level) -> Result<ParentCell> {
        self.parent(level)?.ok_or_else(|| {
            self.invalid(format!(
                "Missing parent reference: need {} or {}",
                level.code_column(),
                level.id_column()
            ))
        })
    }

    fn indicator_parent(&self) -> Result<ParentCell> {
        let mut found = Vec::new();
        for level in Level::INDICATOR_PARENTS {
            if let Some(cell) = self.parent(level)? {
                found.push(cell);
            }
        }

        if found.len() > 1 {
            let levels: Vec<&str> = found.iter().map(|c| c.level.as_str()).collect();
            return Err(self.invalid(format!(
                "Indicator references more than one parent level: {}",
                levels.join(", ")
            )));
        }

        found.pop().ok_or_else(|| {
            self.invalid(
                "Indicator needs exactly one of pillar, theme, subtheme or standard id/code"
                    .to_string(),
            )
        })
    }
}
