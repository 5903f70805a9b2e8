//! Convenience re-exports of commonly used types.
//!
//! `use fzmatch::prelude::*;` brings in everything needed to build a corpus
//! and match against it.

pub use crate::error::{MatchError, ScanError};
pub use crate::matcher::{MatchResult, Matcher};
pub use crate::needle::{CaseMatching, Needle};
pub use crate::options::{MatcherOptions, MatcherOptionsBuilder};
pub use crate::reader::{FindOptions, ReaderOptions, ScanResult, find, read_bufread, read_command};
pub use crate::scanner::{Scanner, Span, Storage};
pub use crate::score::{ScoreOptions, score};
