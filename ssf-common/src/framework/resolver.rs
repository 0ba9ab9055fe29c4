//! Code resolver: parent codes → stored ids for CSV import rows
//!
//! Rows may reference their parent by id, by code, or both; an id always
//! wins. Codes still needing resolution are collected per level and looked up
//! in a single batched query per level through the injected [`CodeLookup`]
//! store handle. A code with no match leaves that row's parent id unset and
//! reports it as unresolved; every other row resolves independently.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use super::Level;
use crate::Result;

/// Store handle able to map codes to ids for one level in one round trip
#[allow(async_fn_in_trait)]
pub trait CodeLookup {
    /// Ids of all `level` rows whose code is in `codes`, keyed by code.
    /// Codes with no stored row are simply absent from the result.
    async fn lookup_codes(&self, level: Level, codes: &[String]) -> Result<HashMap<String, i64>>;
}

/// The parent a row points at, as written in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentReference {
    pub level: Level,
    pub id: Option<i64>,
    pub code: Option<String>,
}

impl ParentReference {
    /// Code that still has to be resolved (no id supplied)
    fn pending_code(&self) -> Option<&str> {
        match (self.id, &self.code) {
            (None, Some(code)) => Some(code.as_str()),
            _ => None,
        }
    }
}

/// A row whose parent is referenced by id and/or code
pub trait ParentRef {
    /// `None` for rows with no parent (pillars)
    fn parent_reference(&self) -> Option<ParentReference>;

    /// Store the resolved parent id back onto the row
    fn set_parent_id(&mut self, id: i64);
}

/// A row whose parent code did not match any stored row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    /// Index of the row in the resolved batch
    pub index: usize,
    pub level: Level,
    pub code: String,
}

/// Distinct codes needing resolution, per level
pub fn collect_codes<R: ParentRef>(rows: &[R]) -> BTreeMap<Level, BTreeSet<String>> {
    let mut needed: BTreeMap<Level, BTreeSet<String>> = BTreeMap::new();
    for reference in rows.iter().filter_map(ParentRef::parent_reference) {
        if let Some(code) = reference.pending_code() {
            needed
                .entry(reference.level)
                .or_default()
                .insert(code.to_string());
        }
    }
    needed
}

/// Resolve parent codes in place; returns the rows left without a parent id
pub async fn resolve_parents<L, R>(lookup: &L, rows: &mut [R]) -> Result<Vec<Unresolved>>
where
    L: CodeLookup,
    R: ParentRef,
{
    let mut mappings: HashMap<Level, HashMap<String, i64>> = HashMap::new();
    for (level, codes) in collect_codes(rows) {
        let codes: Vec<String> = codes.into_iter().collect();
        let found = lookup.lookup_codes(level, &codes).await?;
        debug!(
            "Resolved {}/{} {} codes",
            found.len(),
            codes.len(),
            level
        );
        mappings.insert(level, found);
    }

    let mut unresolved = Vec::new();
    for (index, row) in rows.iter_mut().enumerate() {
        let Some(reference) = row.parent_reference() else {
            continue;
        };
        let Some(code) = reference.pending_code() else {
            continue;
        };

        match mappings
            .get(&reference.level)
            .and_then(|by_code| by_code.get(code))
        {
            Some(&id) => row.set_parent_id(id),
            None => unresolved.push(Unresolved {
                index,
                level: reference.level,
                code: code.to_string(),
            }),
        }
    }

    Ok(unresolved)
}
