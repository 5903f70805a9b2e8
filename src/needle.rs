//! Search string normalization.

use crate::score::Bitmask;

#[derive(Eq, PartialEq, Debug, Copy, Clone, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[cfg_attr(feature = "cli", clap(rename_all = "snake_case"))]
/// Case sensitivity mode for matching
pub enum CaseMatching {
    /// Case-sensitive matching
    Respect,
    /// Case-insensitive matching
    Ignore,
    /// Smart case: case-insensitive unless query contains uppercase
    #[default]
    Smart,
}

/// A normalized search string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Needle {
    bytes: Vec<u8>,
    case_sensitive: bool,
    bitmask: Bitmask,
}

impl Needle {
    /// Normalizes `raw` under the given case policy, optionally removing spaces.
    ///
    /// Folding only touches ASCII letters; other bytes pass through untouched.
    pub fn new(raw: &[u8], case: CaseMatching, ignore_spaces: bool) -> Self {
        let case_sensitive = match case {
            CaseMatching::Respect => true,
            CaseMatching::Ignore => false,
            CaseMatching::Smart => raw.iter().any(u8::is_ascii_uppercase),
        };

        let mut bytes: Vec<u8> = if ignore_spaces {
            raw.iter().copied().filter(|&b| b != b' ').collect()
        } else {
            raw.to_vec()
        };
        if !case_sensitive {
            bytes.make_ascii_lowercase();
        }

        let bitmask = Bitmask::of(&bytes);
        Self {
            bytes,
            case_sensitive,
            bitmask,
        }
    }

    /// The normalized bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the normalized needle
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the normalized needle is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether comparisons must respect case
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Letters present in the needle
    pub fn bitmask(&self) -> Bitmask {
        self.bitmask
    }

    /// Whether the needle is exactly `.`
    pub fn is_dot(&self) -> bool {
        self.bytes == b"."
    }

    /// Whether this needle is `previous` plus zero or more trailing bytes.
    ///
    /// Smart case can only flip from insensitive to sensitive as bytes are
    /// added, which never lets a previously rejected candidate match.
    pub fn extends(&self, previous: &Needle) -> bool {
        self.bytes.starts_with(&previous.bytes)
    }
}
