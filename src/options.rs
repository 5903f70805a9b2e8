//! Configuration options for the matcher.
//!
//! [`MatcherOptions`] is usually assembled through [`MatcherOptionsBuilder`];
//! every field has a default so only the interesting ones need to be set.

use derive_builder::Builder;

use crate::needle::CaseMatching;
use crate::score::ScoreOptions;

/// Number of results returned when no limit is configured
pub const DEFAULT_LIMIT: usize = 100;

/// Worker count used when the available parallelism cannot be queried
const FALLBACK_THREADS: usize = 4;

/// Options controlling how a [`crate::matcher::Matcher`] scores and ranks candidates.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(default)]
pub struct MatcherOptions {
    /// Let dot-files match even when the needle does not start with `.`
    pub always_show_dot_files: bool,
    /// Never match dot-files, whatever the needle
    pub never_show_dot_files: bool,
    /// Case policy applied to needles
    pub case: CaseMatching,
    /// Remove spaces from needles before matching
    pub ignore_spaces: bool,
    /// Maximum number of results per run, must be positive
    pub limit: usize,
    /// Number of workers used on large corpora, must be positive
    pub threads: usize,
    /// Explore every placement of the needle instead of the first one
    pub recurse: bool,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            always_show_dot_files: false,
            never_show_dot_files: false,
            case: CaseMatching::default(),
            ignore_spaces: true,
            limit: DEFAULT_LIMIT,
            threads: default_threads(),
            recurse: true,
        }
    }
}

impl MatcherOptions {
    /// Scorer options for a needle normalized with the given case sensitivity
    pub fn score_options(&self, case_sensitive: bool) -> ScoreOptions {
        ScoreOptions {
            case_sensitive,
            always_show_dot_files: self.always_show_dot_files,
            never_show_dot_files: self.never_show_dot_files,
            recurse: self.recurse,
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_THREADS)
}
