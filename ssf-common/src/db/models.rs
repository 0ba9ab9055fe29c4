//! Database models
//!
//! Stored records, create payloads (`New*`) and partial-update payloads
//! (`*Update`, only provided fields change) for every hierarchy level.

use serde::{Deserialize, Serialize};

use crate::framework::grouping::{GroupKeys, GroupLabel};
use crate::framework::Level;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Pillar {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Theme {
    pub id: i64,
    pub pillar_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subtheme {
    pub id: i64,
    pub theme_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Standard {
    pub id: i64,
    pub subtheme_id: i64,
    pub code: Option<String>,
    pub description: String,
    pub notes: Option<String>,
    pub sort_order: i64,
}

/// The single hierarchy node an indicator is attached to
///
/// Serialises as one of `pillar_id`, `theme_id`, `subtheme_id`, `standard_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndicatorParent {
    #[serde(rename = "pillar_id")]
    Pillar(i64),
    #[serde(rename = "theme_id")]
    Theme(i64),
    #[serde(rename = "subtheme_id")]
    Subtheme(i64),
    #[serde(rename = "standard_id")]
    Standard(i64),
}

impl IndicatorParent {
    /// Build from the four attachment columns; exactly one must be set
    pub fn from_columns(
        pillar_id: Option<i64>,
        theme_id: Option<i64>,
        subtheme_id: Option<i64>,
        standard_id: Option<i64>,
    ) -> Result<Self> {
        match (pillar_id, theme_id, subtheme_id, standard_id) {
            (Some(id), None, None, None) => Ok(IndicatorParent::Pillar(id)),
            (None, Some(id), None, None) => Ok(IndicatorParent::Theme(id)),
            (None, None, Some(id), None) => Ok(IndicatorParent::Subtheme(id)),
            (None, None, None, Some(id)) => Ok(IndicatorParent::Standard(id)),
            (None, None, None, None) => Err(Error::Validation(
                "Indicator needs one of pillar_id, theme_id, subtheme_id, standard_id".to_string(),
            )),
            _ => Err(Error::Validation(
                "Indicator may be attached to only one of pillar_id, theme_id, subtheme_id, standard_id"
                    .to_string(),
            )),
        }
    }

    pub fn new(level: Level, id: i64) -> Result<Self> {
        match level {
            Level::Pillar => Ok(IndicatorParent::Pillar(id)),
            Level::Theme => Ok(IndicatorParent::Theme(id)),
            Level::Subtheme => Ok(IndicatorParent::Subtheme(id)),
            Level::Standard => Ok(IndicatorParent::Standard(id)),
            Level::Indicator => Err(Error::Validation(
                "Indicators cannot be attached to indicators".to_string(),
            )),
        }
    }

    pub fn level(&self) -> Level {
        match self {
            IndicatorParent::Pillar(_) => Level::Pillar,
            IndicatorParent::Theme(_) => Level::Theme,
            IndicatorParent::Subtheme(_) => Level::Subtheme,
            IndicatorParent::Standard(_) => Level::Standard,
        }
    }

    pub fn id(&self) -> i64 {
        match *self {
            IndicatorParent::Pillar(id)
            | IndicatorParent::Theme(id)
            | IndicatorParent::Subtheme(id)
            | IndicatorParent::Standard(id) => id,
        }
    }

    /// Values for `(pillar_id, theme_id, subtheme_id, standard_id)`
    pub fn columns(&self) -> [Option<i64>; 4] {
        let mut columns = [None; 4];
        let slot = match self.level() {
            Level::Pillar => 0,
            Level::Theme => 1,
            Level::Subtheme => 2,
            _ => 3,
        };
        columns[slot] = Some(self.id());
        columns
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub id: i64,
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub is_default: bool,
    pub sort_order: i64,
    #[serde(flatten)]
    pub parent: IndicatorParent,
}

/// Raw `indicators` row before the attachment columns are validated
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IndicatorRecord {
    pub id: i64,
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub is_default: bool,
    pub sort_order: i64,
    pub pillar_id: Option<i64>,
    pub theme_id: Option<i64>,
    pub subtheme_id: Option<i64>,
    pub standard_id: Option<i64>,
}

impl TryFrom<IndicatorRecord> for Indicator {
    type Error = Error;

    fn try_from(record: IndicatorRecord) -> Result<Self> {
        let parent = IndicatorParent::from_columns(
            record.pillar_id,
            record.theme_id,
            record.subtheme_id,
            record.standard_id,
        )
        .map_err(|e| Error::Internal(format!("indicator {}: {}", record.id, e)))?;

        Ok(Indicator {
            id: record.id,
            code: record.code,
            name: record.name,
            description: record.description,
            weight: record.weight,
            is_default: record.is_default,
            sort_order: record.sort_order,
            parent,
        })
    }
}

// ========================================
// Create payloads
// ========================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPillar {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTheme {
    pub pillar_id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewSubtheme {
    pub theme_id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewStandard {
    pub subtheme_id: i64,
    #[serde(default)]
    pub code: Option<String>,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

/// Indicator create payload as sent over the wire
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewIndicatorRequest {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub pillar_id: Option<i64>,
    #[serde(default)]
    pub theme_id: Option<i64>,
    #[serde(default)]
    pub subtheme_id: Option<i64>,
    #[serde(default)]
    pub standard_id: Option<i64>,
}

/// Validated indicator create payload
#[derive(Debug, Clone, PartialEq)]
pub struct NewIndicator {
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub is_default: bool,
    pub sort_order: i64,
    pub parent: IndicatorParent,
}

impl TryFrom<NewIndicatorRequest> for NewIndicator {
    type Error = Error;

    fn try_from(request: NewIndicatorRequest) -> Result<Self> {
        let parent = IndicatorParent::from_columns(
            request.pillar_id,
            request.theme_id,
            request.subtheme_id,
            request.standard_id,
        )?;
        Ok(NewIndicator {
            code: request.code,
            name: request.name,
            description: request.description,
            weight: request.weight,
            is_default: request.is_default,
            sort_order: request.sort_order,
            parent,
        })
    }
}

// ========================================
// Partial updates
// ========================================

/// Present-but-null becomes `Some(None)` so an update can clear a nullable column
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PillarUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThemeUpdate {
    pub pillar_id: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubthemeUpdate {
    pub theme_id: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StandardUpdate {
    pub subtheme_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub code: Option<Option<String>>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    pub sort_order: Option<i64>,
}

/// Indicator partial update. Re-attaching takes exactly one of the four
/// parent columns; leaving all four out keeps the current attachment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndicatorUpdate {
    #[serde(default, deserialize_with = "nullable")]
    pub code: Option<Option<String>>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub weight: Option<Option<f64>>,
    pub is_default: Option<bool>,
    pub sort_order: Option<i64>,
    pub pillar_id: Option<i64>,
    pub theme_id: Option<i64>,
    pub subtheme_id: Option<i64>,
    pub standard_id: Option<i64>,
}

impl IndicatorUpdate {
    /// New attachment requested by this update, if any
    pub fn parent(&self) -> Result<Option<IndicatorParent>> {
        if self.pillar_id.is_none()
            && self.theme_id.is_none()
            && self.subtheme_id.is_none()
            && self.standard_id.is_none()
        {
            return Ok(None);
        }
        IndicatorParent::from_columns(
            self.pillar_id,
            self.theme_id,
            self.subtheme_id,
            self.standard_id,
        )
        .map(Some)
    }
}

// ========================================
// Denormalised rows
// ========================================

/// One standard joined with its sub-theme, theme and pillar
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StandardRow {
    pub pillar_id: i64,
    pub pillar_code: String,
    pub pillar_name: String,
    pub pillar_sort_order: i64,
    pub theme_id: i64,
    pub theme_code: String,
    pub theme_name: String,
    pub theme_sort_order: i64,
    pub subtheme_id: i64,
    pub subtheme_code: String,
    pub subtheme_name: String,
    pub subtheme_sort_order: i64,
    pub standard_id: i64,
    pub standard_code: Option<String>,
    pub description: String,
    pub notes: Option<String>,
    pub sort_order: i64,
}

impl GroupKeys for StandardRow {
    fn pillar(&self) -> GroupLabel<'_> {
        GroupLabel {
            code: &self.pillar_code,
            name: &self.pillar_name,
        }
    }

    fn theme(&self) -> GroupLabel<'_> {
        GroupLabel {
            code: &self.theme_code,
            name: &self.theme_name,
        }
    }

    fn subtheme(&self) -> GroupLabel<'_> {
        GroupLabel {
            code: &self.subtheme_code,
            name: &self.subtheme_name,
        }
    }
}
