//! Result type for the name plausibility check.
//!
//! The check is best-effort. A classifier that could not answer reports
//! [`Screening::Unavailable`] instead of an error, so "no verdict" is never
//! confused with "nobody is a real name".

use std::collections::HashSet;

/// Verdict from a name plausibility classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screening {
    /// Names the classifier judged to be real people.
    Screened(Vec<String>),
    /// The classifier could not be consulted or gave an unusable answer.
    Unavailable(String),
}

impl Screening {
    /// Names to keep from `input`, in input order.
    ///
    /// Fails open: an unavailable verdict keeps every name. Names the
    /// classifier invented are ignored.
    pub fn apply(&self, input: Vec<String>) -> Vec<String> {
        self.partition(input).0
    }

    /// Splits `input` into kept and removed names, both in input order.
    pub fn partition(&self, input: Vec<String>) -> (Vec<String>, Vec<String>) {
        match self {
            Self::Screened(kept) => {
                let kept: HashSet<&str> = kept.iter().map(|name| name.trim()).collect();
                input
                    .into_iter()
                    .partition(|name| kept.contains(name.trim()))
            }
            Self::Unavailable(_) => (input, Vec::new()),
        }
    }

    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Screened(_))
    }
}
