//! Output reconciliation against a lesson's expected output.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No expectation defined, or nothing produced yet.
    NotApplicable,
    Match,
    Mismatch,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::NotApplicable => "n/a",
            Verdict::Match => "match",
            Verdict::Mismatch => "mismatch",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Exact comparison after trimming leading and trailing whitespace only.
pub fn reconcile(actual: Option<&str>, expected: Option<&str>) -> Verdict {
    match (actual, expected) {
        (Some(actual), Some(expected)) if !actual.is_empty() && !expected.is_empty() => {
            if actual.trim() == expected.trim() {
                Verdict::Match
            } else {
                Verdict::Mismatch
            }
        }
        _ => Verdict::NotApplicable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newline_is_ignored() {
        assert_eq!(reconcile(Some("Hello, World!"), Some("Hello, World!\n")), Verdict::Match);
        assert_eq!(reconcile(Some("  \n42\t\n"), Some("42")), Verdict::Match);
    }

    #[test]
    fn internal_whitespace_is_significant() {
        assert_eq!(reconcile(Some("Count: 1\nCount: 2"), Some("Count: 1\n\nCount: 2")), Verdict::Mismatch);
        assert_eq!(reconcile(Some("a  b"), Some("a b")), Verdict::Mismatch);
        assert_eq!(reconcile(Some("hello"), Some("Hello")), Verdict::Mismatch);
    }

    #[test]
    fn missing_side_is_not_applicable() {
        assert_eq!(reconcile(None, Some("x")), Verdict::NotApplicable);
        assert_eq!(reconcile(Some(""), Some("x")), Verdict::NotApplicable);
        assert_eq!(reconcile(Some("x"), None), Verdict::NotApplicable);
        assert_eq!(reconcile(Some("x"), Some("")), Verdict::NotApplicable);
        assert_eq!(reconcile(None, None), Verdict::NotApplicable);
    }

    #[test]
    fn whitespace_only_output_against_expectation_mismatches() {
        assert_eq!(reconcile(Some("\n"), Some("Done!")), Verdict::Mismatch);
    }
}
