//! Numeric-aware ("natural") ordering for hierarchy codes
//!
//! Codes mix text and numbers (`P2`, `P10`, `P1.T2.10`); plain lexicographic
//! order puts `P10` before `P2`. Runs of ASCII digits compare by numeric value.

use std::cmp::Ordering;

/// Splits a string into alternating digit / non-digit runs
struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Runs<'a> {
    type Item = (bool, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some((digits, run))
    }
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Compare two codes treating embedded digit runs as numbers
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Runs { rest: a };
    let mut right = Runs { rest: b };

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((true, x)), Some((true, y))) => match cmp_digit_runs(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
            (Some((false, x)), Some((false, y))) => match x.cmp(y) {
                Ordering::Equal => continue,
                other => return other,
            },
            // Numbers sort before text at the same position
            (Some((true, _)), Some((false, _))) => return Ordering::Less,
            (Some((false, _)), Some((true, _))) => return Ordering::Greater,
        }
    }
}

/// Sibling order: `sort_order` first, ties broken by natural code order
pub fn sibling_order(
    a_sort: i64,
    a_code: Option<&str>,
    b_sort: i64,
    b_code: Option<&str>,
) -> Ordering {
    a_sort
        .cmp(&b_sort)
        .then_with(|| natural_cmp(a_code.unwrap_or(""), b_code.unwrap_or("")))
}
