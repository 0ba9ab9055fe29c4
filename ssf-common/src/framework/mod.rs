//! Framework hierarchy transformations
//!
//! Pure data transformations over the pillar → theme → sub-theme → standard →
//! indicator hierarchy:
//! - [`resolver`]: parent code → id resolution for CSV import
//! - [`refcodes`]: positional code / sort order recalculation and dirty map
//! - [`tree`]: editable framework tree and structural edits
//! - [`grouping`]: flat sorted rows → nested pillar/theme/sub-theme groups
//! - [`import`]: per-table CSV row schemas
//! - [`export`]: CSV export formatting

pub mod export;
pub mod grouping;
pub mod import;
pub mod natural;
pub mod refcodes;
pub mod resolver;
pub mod tree;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

pub use natural::{natural_cmp, sibling_order};
pub use refcodes::{dirty_entries, dirty_map, recalc_ref_codes, DirtyEntry, NodeKey};
pub use tree::{apply_edit, FrameworkTree, NodePath, PillarNode, SubthemeNode, ThemeNode, TreeEdit, TreeNode};

/// One level of the classification hierarchy, broadest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Pillar,
    Theme,
    Subtheme,
    Standard,
    Indicator,
}

impl Level {
    /// All levels in hierarchy order
    pub const ALL: [Level; 5] = [
        Level::Pillar,
        Level::Theme,
        Level::Subtheme,
        Level::Standard,
        Level::Indicator,
    ];

    /// Levels an indicator may attach to
    pub const INDICATOR_PARENTS: [Level; 4] =
        [Level::Pillar, Level::Theme, Level::Subtheme, Level::Standard];

    /// Backing table name
    pub fn table(self) -> &'static str {
        match self {
            Level::Pillar => "pillars",
            Level::Theme => "themes",
            Level::Subtheme => "subthemes",
            Level::Standard => "standards",
            Level::Indicator => "indicators",
        }
    }

    /// Singular lowercase name, also the prefix of `<level>_id` / `<level>_code` columns
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Pillar => "pillar",
            Level::Theme => "theme",
            Level::Subtheme => "subtheme",
            Level::Standard => "standard",
            Level::Indicator => "indicator",
        }
    }

    /// Fixed parent level; `None` for pillars (root) and indicators (variable attachment)
    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Theme => Some(Level::Pillar),
            Level::Subtheme => Some(Level::Theme),
            Level::Standard => Some(Level::Subtheme),
            Level::Pillar | Level::Indicator => None,
        }
    }

    /// Foreign-key column name referencing this level (`pillar_id`, ...)
    pub fn id_column(self) -> &'static str {
        match self {
            Level::Pillar => "pillar_id",
            Level::Theme => "theme_id",
            Level::Subtheme => "subtheme_id",
            Level::Standard => "standard_id",
            Level::Indicator => "indicator_id",
        }
    }

    /// Code-reference column name used by CSV imports (`pillar_code`, ...)
    pub fn code_column(self) -> &'static str {
        match self {
            Level::Pillar => "pillar_code",
            Level::Theme => "theme_code",
            Level::Subtheme => "subtheme_code",
            Level::Standard => "standard_code",
            Level::Indicator => "indicator_code",
        }
    }

    /// Look a level up by its table name (`"themes"`) or singular name (`"theme"`)
    pub fn from_table_name(name: &str) -> Option<Level> {
        let name = name.trim().to_ascii_lowercase();
        Level::ALL
            .into_iter()
            .find(|level| level.table() == name || level.as_str() == name)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::from_table_name(s).ok_or_else(|| Error::Validation(format!("Unknown level: {}", s)))
    }
}
