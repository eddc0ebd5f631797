//! Response matching.
//!
//! The instrument protocol has no request IDs: a response is recognised
//! purely by its content. Each request carries an [`Expectation`] that the
//! engine checks against every received line. Lines that fail it (stale
//! stream output, echoes, fragments from before a reset) are skipped.

use std::fmt;
use std::sync::Arc;

use alicat_core::UnitId;

/// The acceptance test a line must pass to answer a request.
///
/// Length-based variants count characters, terminator included.
#[derive(Clone)]
pub enum Expectation {
    /// The line contains the unit identifier and a `\r`.
    ContainsUnitId(UnitId),
    /// The line is at least this many characters long.
    MinLength(usize),
    /// The line is strictly longer than this many characters.
    LongerThan(usize),
    /// An arbitrary test on the line.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Expectation {
    /// Build a [`Predicate`](Expectation::Predicate) expectation.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Expectation::Predicate(Arc::new(f))
    }

    /// Whether `line` satisfies this expectation.
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Expectation::ContainsUnitId(unit) => line.contains(unit.as_str()) && line.contains('\r'),
            Expectation::MinLength(n) => line.chars().count() >= *n,
            Expectation::LongerThan(n) => line.chars().count() > *n,
            Expectation::Predicate(f) => f(line),
        }
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::ContainsUnitId(unit) => f.debug_tuple("ContainsUnitId").field(unit).finish(),
            Expectation::MinLength(n) => f.debug_tuple("MinLength").field(n).finish(),
            Expectation::LongerThan(n) => f.debug_tuple("LongerThan").field(n).finish(),
            Expectation::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Whether `line` satisfies `expectation`.
///
/// # Example
///
/// ```
/// use alicat_core::UnitId;
/// use alicat_text_io::{Expectation, matches};
///
/// let unit = UnitId::new("A").unwrap();
/// assert!(matches("A +014.70\r", &Expectation::ContainsUnitId(unit.clone())));
/// assert!(!matches("A +014.70", &Expectation::ContainsUnitId(unit)));
/// assert!(matches("0123456789", &Expectation::MinLength(10)));
/// ```
pub fn matches(line: &str, expectation: &Expectation) -> bool {
    expectation.matches(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str) -> UnitId {
        UnitId::new(id).unwrap()
    }

    #[test]
    fn unit_id_requires_id_and_terminator() {
        let exp = Expectation::ContainsUnitId(unit("A"));
        assert!(exp.matches("A +014.70 +025.00\r"));
        assert!(!exp.matches("A +014.70 +025.00"));
        assert!(!exp.matches("B +014.70\r"));
        assert!(!exp.matches(""));
    }

    #[test]
    fn unit_id_is_a_substring_test() {
        // No word boundary: a line merely mentioning the id passes.
        let exp = Expectation::ContainsUnitId(unit("A"));
        assert!(exp.matches("B Air\r"));
    }

    #[test]
    fn min_length_is_inclusive() {
        let exp = Expectation::MinLength(10);
        assert!(exp.matches("A 69 12 1\r"));
        assert!(!exp.matches("A 69 12\r"));
    }

    #[test]
    fn longer_than_is_exclusive() {
        let exp = Expectation::LongerThan(3);
        assert!(exp.matches("A 8\r"));
        assert!(!exp.matches("A 8"));
        assert!(!exp.matches("\r"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let exp = Expectation::MinLength(3);
        assert!(!exp.matches("\u{FFFD}\r"));
        assert!(exp.matches("\u{FFFD}A\r"));
    }

    #[test]
    fn predicate() {
        let exp = Expectation::predicate(|line| line.starts_with("A "));
        assert!(exp.matches("A 1\r"));
        assert!(!exp.matches("B 1\r"));
        assert_eq!(format!("{exp:?}"), "Predicate(..)");
    }

    #[test]
    fn free_function_delegates() {
        assert!(matches("A 1\r", &Expectation::LongerThan(3)));
        assert!(!matches("A\r", &Expectation::LongerThan(3)));
    }
}
