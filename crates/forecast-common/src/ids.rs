//! Ordering of administrative identifiers.

use std::cmp::Ordering;

/// Compare two ids numerically when both are integers, lexicographically
/// otherwise. "0102" < "0110" < "0201" either way; "9" < "10" numerically.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}
