//! Ordering of sibling nodes.
//!
//! Directories come before files. Within a kind, names not starting with a
//! dot come before dot-names. Remaining ties are broken by a natural,
//! case-insensitive comparison in which digit runs compare by value, then by
//! case (lowercase first), then by the raw bytes.
//!
//! # Examples
//!
//! ```
//! use filetree_engine::sort::compare_entries;
//! use std::cmp::Ordering;
//!
//! assert_eq!(compare_entries(true, "zeta", false, "alpha"), Ordering::Less);
//! assert_eq!(compare_entries(false, "file2", false, "file10"), Ordering::Less);
//! assert_eq!(compare_entries(false, ".env", false, "Makefile"), Ordering::Greater);
//! assert_eq!(compare_entries(false, "same", false, "same"), Ordering::Equal);
//! ```

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Compares two sibling entries.
#[must_use]
pub fn compare_entries(a_is_dir: bool, a_name: &str, b_is_dir: bool, b_name: &str) -> Ordering {
    b_is_dir
        .cmp(&a_is_dir)
        .then_with(|| a_name.starts_with('.').cmp(&b_name.starts_with('.')))
        .then_with(|| compare_names(a_name, b_name))
}

/// Natural name comparison: numeric-aware and case-insensitive first.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    natural(a, b, |c| c.to_lowercase().next().unwrap_or(c))
        .then_with(|| compare_case(a, b))
        .then_with(|| a.cmp(b))
}

fn natural(a: &str, b: &str, fold: impl Fn(char) -> char) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ordering = compare_digit_runs(&take_digits(&mut left), &take_digits(&mut right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = fold(l).cmp(&fold(r));
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

// Lowercase sorts before uppercase at the first position where case differs.
fn compare_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .zip(b.chars())
        .find(|(l, r)| l != r)
        .map_or(Ordering::Equal, |(l, r)| l.is_uppercase().cmp(&r.is_uppercase()))
}
