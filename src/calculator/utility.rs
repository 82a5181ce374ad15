use std::cmp::Ordering;
use std::sync::LazyLock;

use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed};
use tracing::warn;

/// Credit-weighted mean of `(credits, grade_point)` pairs.
///
/// Returns `(cgpa, total_credits)`; the CGPA is 0.0 when no credits are present.
pub fn weighted_mean<I>(pairs: I) -> (f64, f64)
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (points, credits) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(points, credits), (c, gp)| {
            (points + c * gp, credits + c)
        });

    if credits == 0.0 {
        (0.0, credits)
    } else {
        (points / credits, credits)
    }
}

/// Root-locale collator with default options: case-insensitive at the
/// primary level, lowercase ahead of uppercase, accents and punctuation
/// placed the way `localeCompare` places them.
static COLLATOR: LazyLock<Option<CollatorBorrowed<'static>>> = LazyLock::new(|| {
    Collator::try_new(Default::default(), CollatorOptions::default())
        .map_err(|e| warn!(error = %e, "Collator unavailable, comparing names by code point"))
        .ok()
});

/// Orders course names with locale-aware collation.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    match COLLATOR.as_ref() {
        Some(collator) => collator.compare(a, b),
        None => a.cmp(b),
    }
}

/// True when `value` is usable as a credit count.
pub fn is_valid_credits(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
