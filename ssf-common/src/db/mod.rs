//! Database schema and per-table queries

pub mod framework;
pub mod import;
pub mod indicators;
pub mod init;
pub mod lookup;
pub mod models;
pub mod pillars;
pub mod standards;
pub mod subthemes;
pub mod themes;

pub use import::{import_rows, ImportReport};
pub use init::*;
pub use models::*;

use crate::framework::sibling_order;

/// Order items by `sort_order` then natural code within runs of the same parent
///
/// Items must already be grouped so each parent's children are contiguous;
/// the order of the groups themselves is kept.
pub(crate) fn sort_siblings<T, P>(
    items: &mut [T],
    parent: impl Fn(&T) -> P,
    key: impl Fn(&T) -> (i64, Option<&str>),
) where
    P: PartialEq,
{
    for run in items.chunk_by_mut(|a, b| parent(a) == parent(b)) {
        run.sort_by(|a, b| {
            let (a_sort, a_code) = key(a);
            let (b_sort, b_code) = key(b);
            sibling_order(a_sort, a_code, b_sort, b_code)
        });
    }
}
