//! fzmatch is a fuzzy path matcher library for Rust.
//!
//! It ranks a fixed corpus of paths against a short query the way an
//! interactive file finder does: boundary characters such as `/`, `_` or a
//! camel-case hump make a match score higher, shorter paths win ties, and
//! dot-files stay hidden unless asked for. Results are kept incrementally, so
//! typing one more character only rescans the candidates that still matched.
//!
//! # Examples
//!
//! ```
//! use fzmatch::prelude::*;
//!
//! let scanner = Scanner::from_copies(["src/main.rs", "src/matcher.rs", "README.md"]);
//! let options = MatcherOptionsBuilder::default().limit(10).build().unwrap();
//! let mut matcher = Matcher::new(&scanner, options).unwrap();
//!
//! let result = matcher.run(b"smr");
//! assert_eq!(result.matches[0], b"src/main.rs");
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;

pub use crate::error::{MatchError, ScanError};
pub use crate::matcher::{MatchResult, Matcher};
pub use crate::needle::CaseMatching;
pub use crate::options::{MatcherOptions, MatcherOptionsBuilder};
pub use crate::scanner::Scanner;

pub mod error;
pub mod heap;
pub mod matcher;
pub mod needle;
pub mod options;
pub mod prelude;
pub mod reader;
pub mod scanner;
pub mod score;
