//! Fuzzy scoring of a single candidate against a needle.
//!
//! Scores fall in `[0.0, 1.0]`, `0.0` meaning "no match". Candidates hidden by
//! the dot-file policy on an empty needle get [`FILTERED`], which sorts below
//! a plain non-match.
//!
//! Every matched needle character contributes a baseline of
//! `(1 / needle_len + 1 / haystack_len) / 2`, scaled by how good its position
//! is:
//!
//! * the first needle character at position 0 keeps the full baseline
//! * a character following the previous match directly keeps it too
//! * otherwise the byte before the match decides: `/` 0.9, `-` `_` space or a
//!   digit 0.8, a lowercase to uppercase transition 0.8, `.` 0.7, anything
//!   else `DISTANCE_DECAY / distance` where `distance` counts the bytes since
//!   the previous match
//!
//! Before searching, a 26-bit letter mask rejects haystacks lacking one of
//! the needle's letters, and a backward prescan records for every needle
//! character the rightmost position it may occupy. The search itself then
//! only looks at positions between the leftmost and rightmost bounds of each
//! needle character, and fills the best score of every needle suffix level by
//! level from the end, keeping two rows of haystack length alive.

use crate::needle::Needle;

/// Score of an exact match or of any candidate against an empty needle
pub const MATCH_ALL: f32 = 1.0;
/// Score of a candidate that does not match
pub const NO_MATCH: f32 = 0.0;
/// Score of a candidate hidden by the dot-file policy
pub const FILTERED: f32 = -1.0;
/// Numerator of the factor applied to a match preceded by an ordinary byte
pub const DISTANCE_DECAY: f32 = 0.75;

const IMPOSSIBLE: f32 = f32::NEG_INFINITY;

/// Set of the ASCII letters (case-folded) present in a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bitmask(u32);

impl Bitmask {
    /// Letters present in `bytes`; anything but `a-z`/`A-Z` is ignored
    pub fn of(bytes: &[u8]) -> Self {
        let mut mask = Self::default();
        for &byte in bytes {
            mask.insert(byte);
        }
        mask
    }

    #[inline]
    fn insert(&mut self, byte: u8) {
        let lower = byte.to_ascii_lowercase();
        if lower.is_ascii_lowercase() {
            self.0 |= 1 << (lower - b'a');
        }
    }

    /// Whether every letter of `other` is also in `self`
    pub fn contains(self, other: Bitmask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bits, `a` being the lowest one
    pub fn bits(self) -> u32 {
        self.0
    }
}

/// Knobs that change how a candidate is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreOptions {
    /// Compare bytes exactly instead of folding ASCII case
    pub case_sensitive: bool,
    /// Let needles match inside dot-files and dot-directories
    pub always_show_dot_files: bool,
    /// Never match inside dot-files, even when the needle asks for a dot; wins
    /// over `always_show_dot_files`
    pub never_show_dot_files: bool,
    /// Explore every placement of each needle character instead of only the
    /// leftmost one
    pub recurse: bool,
}

/// Scores `candidate` against `needle`.
///
/// When `options.case_sensitive` is false the needle is folded before use, so
/// callers may pass it as typed.
pub fn score(candidate: &[u8], needle: &[u8], options: &ScoreOptions) -> f32 {
    let folded;
    let needle = if options.case_sensitive {
        needle
    } else {
        folded = needle.to_ascii_lowercase();
        &folded[..]
    };
    let mut bitmask = None;
    score_bytes(candidate, needle, Bitmask::of(needle), &mut bitmask, options)
}

/// Scores a haystack for the matcher, consulting and filling its cached letter
/// mask.
pub(crate) fn score_haystack(
    candidate: &[u8],
    bitmask: &mut Option<Bitmask>,
    needle: &Needle,
    options: &ScoreOptions,
) -> f32 {
    score_bytes(candidate, needle.as_bytes(), needle.bitmask(), bitmask, options)
}

fn score_bytes(
    candidate: &[u8],
    needle: &[u8],
    needle_mask: Bitmask,
    bitmask: &mut Option<Bitmask>,
    options: &ScoreOptions,
) -> f32 {
    if needle.is_empty() {
        let hide = options.never_show_dot_files || !options.always_show_dot_files;
        return if hide && has_dot_file(candidate) {
            FILTERED
        } else {
            MATCH_ALL
        };
    }

    if needle.len() == candidate.len() && bytes_eq(candidate, needle, options.case_sensitive) {
        return if options.never_show_dot_files && has_dot_file(candidate) {
            NO_MATCH
        } else {
            MATCH_ALL
        };
    }

    if let Some(mask) = bitmask
        && !mask.contains(needle_mask)
    {
        return NO_MATCH;
    }

    let Some(rightmost) = prescan(candidate, needle, bitmask, options.case_sensitive) else {
        return NO_MATCH;
    };

    let best = Search::new(candidate, needle, &rightmost, options).best();
    if best.is_finite() && best > NO_MATCH {
        best
    } else {
        NO_MATCH
    }
}

/// Whether any path component of `candidate` starts with a dot.
fn has_dot_file(candidate: &[u8]) -> bool {
    memchr::memchr_iter(b'.', candidate).any(|idx| is_dot_file_start(candidate, idx))
}

#[inline]
fn is_dot_file_start(candidate: &[u8], idx: usize) -> bool {
    candidate[idx] == b'.' && (idx == 0 || candidate[idx - 1] == b'/')
}

#[inline]
fn byte_eq(haystack: u8, needle: u8, case_sensitive: bool) -> bool {
    if case_sensitive {
        haystack == needle
    } else {
        haystack.to_ascii_lowercase() == needle
    }
}

fn bytes_eq(haystack: &[u8], needle: &[u8], case_sensitive: bool) -> bool {
    haystack
        .iter()
        .zip(needle)
        .all(|(&h, &n)| byte_eq(h, n, case_sensitive))
}

/// Walks the candidate backwards, placing needle characters as far right as
/// they can go. Returns those positions, or `None` when the needle does not
/// fit. Fills the candidate's letter mask on the way when it is not cached
/// yet.
fn prescan(
    candidate: &[u8],
    needle: &[u8],
    bitmask: &mut Option<Bitmask>,
    case_sensitive: bool,
) -> Option<Vec<usize>> {
    let compute_mask = bitmask.is_none();
    let mut mask = Bitmask::default();
    let mut rightmost = vec![0; needle.len()];
    let mut remaining = needle.len();

    for (idx, &byte) in candidate.iter().enumerate().rev() {
        if compute_mask {
            mask.insert(byte);
        }
        if remaining > 0 {
            if byte_eq(byte, needle[remaining - 1], case_sensitive) {
                remaining -= 1;
                rightmost[remaining] = idx;
            }
        } else if !compute_mask {
            break;
        }
    }

    if compute_mask {
        *bitmask = Some(mask);
    }
    (remaining == 0).then_some(rightmost)
}

/// Earliest position of every needle character, placing them greedily from
/// the left. Only called once the needle is known to fit.
fn leftmost(candidate: &[u8], needle: &[u8], case_sensitive: bool) -> Vec<usize> {
    let mut positions = Vec::with_capacity(needle.len());
    let mut from = 0;
    for &wanted in needle {
        let idx = candidate
            .get(from..)
            .unwrap_or_default()
            .iter()
            .position(|&byte| byte_eq(byte, wanted, case_sensitive))
            .map_or(candidate.len(), |offset| from + offset);
        positions.push(idx);
        from = idx + 1;
    }
    positions
}

/// Search over needle placements, scoped to one scoring call.
///
/// Needle characters are placed from the last one backwards. After handling
/// level `i`, `rest[j]` holds the best score of `needle[i + 1..]` once
/// `needle[i]` sits at `haystack[j]`. Only two such rows are alive at a time,
/// and only matching positions between the leftmost and rightmost bounds of a
/// level are ever written or read.
struct Search<'a> {
    haystack: &'a [u8],
    needle: &'a [u8],
    leftmost: Vec<usize>,
    rightmost: &'a [usize],
    per_char: f32,
    options: &'a ScoreOptions,
}

impl<'a> Search<'a> {
    fn new(haystack: &'a [u8], needle: &'a [u8], rightmost: &'a [usize], options: &'a ScoreOptions) -> Self {
        let per_char = (1.0 / needle.len() as f32 + 1.0 / haystack.len() as f32) / 2.0;
        Self {
            haystack,
            needle,
            leftmost: leftmost(haystack, needle, options.case_sensitive),
            rightmost,
            per_char,
            options,
        }
    }

    fn best(&self) -> f32 {
        let last = self.needle.len() - 1;
        let bound = self.rightmost[last] + 1;
        let mut rest = vec![0.0; bound];
        let mut next = vec![IMPOSSIBLE; bound];

        for i in (0..last).rev() {
            for j in self.leftmost[i]..=self.rightmost[i] {
                if byte_eq(self.haystack[j], self.needle[i], self.options.case_sensitive) {
                    next[j] = self.scan(i + 1, j + 1, Some(j), &rest);
                }
            }
            std::mem::swap(&mut rest, &mut next);
        }
        self.scan(0, 0, None, &rest)
    }

    /// Best score for `needle[i..]` with `needle[i]` at or after `start`,
    /// `rest` holding the scores of `needle[i + 1..]`.
    fn scan(&self, i: usize, start: usize, last: Option<usize>, rest: &[f32]) -> f32 {
        let mut best = IMPOSSIBLE;
        for j in start..=self.rightmost[i] {
            if self.blocked(j, i) {
                break;
            }
            if byte_eq(self.haystack[j], self.needle[i], self.options.case_sensitive) {
                let total = self.contribution(j, last) + rest[j];
                if total > best {
                    best = total;
                }
                if !self.options.recurse {
                    break;
                }
            }
        }
        best
    }

    /// A dot starting a path component stops the scan unless the policy lets
    /// the needle see it.
    #[inline]
    fn blocked(&self, j: usize, i: usize) -> bool {
        if !is_dot_file_start(self.haystack, j) {
            return false;
        }
        self.options.never_show_dot_files || (self.needle[i] != b'.' && !self.options.always_show_dot_files)
    }

    fn contribution(&self, j: usize, last: Option<usize>) -> f32 {
        let distance = match last {
            Some(last) => j - last,
            None => j + 1,
        };
        if distance <= 1 {
            return self.per_char;
        }

        let prev = self.haystack[j - 1];
        let curr = self.haystack[j];
        let factor = match prev {
            b'/' => 0.9,
            b'-' | b'_' | b' ' | b'0'..=b'9' => 0.8,
            b'a'..=b'z' if curr.is_ascii_uppercase() => 0.8,
            b'.' => 0.7,
            _ => DISTANCE_DECAY / distance as f32,
        };
        self.per_char * factor
    }
}

#[cfg(test)]
#[cfg_attr(coverage, coverage(off))]
mod tests {
    use super::*;

    fn opts() -> ScoreOptions {
        ScoreOptions {
            recurse: true,
            ..Default::default()
        }
    }

    fn show_all() -> ScoreOptions {
        ScoreOptions {
            always_show_dot_files: true,
            ..opts()
        }
    }

    fn assert_close(left: f32, right: f32) {
        assert!((left - right).abs() < 1e-5, "{left} != {right}");
    }

    #[test]
    fn test_bitmask() {
        let mask = Bitmask::of(b"Abz/9");
        assert_eq!(mask.bits(), 0b11 | 1 << 25);
        assert!(mask.contains(Bitmask::of(b"ba")));
        assert!(!mask.contains(Bitmask::of(b"c")));
        assert!(mask.contains(Bitmask::of(b"./-")));
    }

    #[test]
    fn test_empty_needle() {
        assert_eq!(score(b"foo/bar", b"", &opts()), MATCH_ALL);
        assert_eq!(score(b".git", b"", &opts()), FILTERED);
        assert_eq!(score(b"src/.cache/x", b"", &opts()), FILTERED);
        assert_eq!(score(b"foo.rb", b"", &opts()), MATCH_ALL);
        assert_eq!(score(b".git", b"", &show_all()), MATCH_ALL);
        let never = ScoreOptions {
            never_show_dot_files: true,
            ..show_all()
        };
        assert_eq!(score(b".git", b"", &never), FILTERED);
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(score(b"foo", b"foo", &opts()), MATCH_ALL);
        assert_eq!(score(b"Foo", b"FOO", &opts()), MATCH_ALL);
        let sensitive = ScoreOptions {
            case_sensitive: true,
            ..opts()
        };
        assert_eq!(score(b"Foo", b"Foo", &sensitive), MATCH_ALL);
        assert_eq!(score(b"Foo", b"foo", &sensitive), NO_MATCH);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(score(b"abc", b"abx", &opts()), NO_MATCH);
        assert_eq!(score(b"abc", b"cba", &opts()), NO_MATCH);
        assert_eq!(score(b"", b"a", &opts()), NO_MATCH);
        assert_eq!(score(b"ab", b"abc", &opts()), NO_MATCH);
        assert_eq!(score(b"a/b", b"a/b/", &opts()), NO_MATCH);
    }

    #[test]
    fn test_contiguous_prefix() {
        // (1/3 + 1/6) / 2 per character, three characters at full weight
        assert_close(score(b"foo.rb", b"foo", &opts()), 0.75);
    }

    #[test]
    fn test_boundary_factors() {
        // per character: (1/2 + 1/4) / 2 = 0.375; `b` weighted by its predecessor
        assert_close(score(b"a/bc", b"ab", &opts()), 0.375 * 1.9);
        assert_close(score(b"a_bc", b"ab", &opts()), 0.375 * 1.8);
        assert_close(score(b"a3bc", b"ab", &opts()), 0.375 * 1.8);
        assert_close(score(b"a.bc", b"ab", &opts()), 0.375 * 1.7);
        assert_close(score(b"axbc", b"ab", &opts()), 0.375 * (1.0 + DISTANCE_DECAY / 2.0));
        assert_close(score(b"aXBc", b"ab", &opts()), 0.375 * (1.0 + DISTANCE_DECAY / 2.0));
        assert_close(score(b"xaBc", b"ab", &opts()), 0.375 * (DISTANCE_DECAY / 2.0 + 1.0));
    }

    #[test]
    fn test_camel_case() {
        let camel = score(b"fooBar", b"fb", &opts());
        let flat = score(b"foobar", b"fb", &opts());
        assert!(camel > flat, "camel={camel} flat={flat}");
    }

    #[test]
    fn test_shorter_scores_higher() {
        let short = score(b"main.go", b"main", &opts());
        let long = score(b"maintain.go", b"main", &opts());
        assert!(short > long, "short={short} long={long}");
    }

    #[test]
    fn test_position_zero_beats_slash() {
        let start = score(b"foo.rb", b"foo", &opts());
        let nested = score(b"a/b/c/foo.rb", b"foo", &opts());
        assert!(start > nested, "start={start} nested={nested}");
    }

    #[test]
    fn test_recurse_finds_better_placement() {
        let greedy = ScoreOptions {
            recurse: false,
            ..opts()
        };
        let recursive = score(b"axxb_ab", b"ab", &opts());
        let first_fit = score(b"axxb_ab", b"ab", &greedy);
        assert!(first_fit > NO_MATCH);
        assert!(recursive > first_fit, "recursive={recursive} first_fit={first_fit}");
        // a@5 after `_`, b contiguous; per character (1/2 + 1/7) / 2
        assert_close(recursive, (0.5 + 1.0 / 7.0) / 2.0 * 1.8);
    }

    #[test]
    fn test_case_insensitive() {
        assert!(score(b"FooBar", b"fb", &opts()) > NO_MATCH);
        assert!(score(b"FooBar", b"FB", &opts()) > NO_MATCH);
        let sensitive = ScoreOptions {
            case_sensitive: true,
            ..opts()
        };
        assert!(score(b"FooBar", b"FB", &sensitive) > NO_MATCH);
        assert_eq!(score(b"FooBar", b"fb", &sensitive), NO_MATCH);
    }

    #[test]
    fn test_dot_files_hidden() {
        assert_eq!(score(b".git/config", b"config", &opts()), NO_MATCH);
        assert_eq!(score(b"src/.hidden/bar", b"bar", &opts()), NO_MATCH);
        assert!(score(b".git/config", b"config", &show_all()) > NO_MATCH);
        assert!(score(b".git/config", b".g", &opts()) > NO_MATCH);
        // matched entirely before reaching the dot-directory
        assert!(score(b"foo/.hidden/bar", b"foo", &opts()) > NO_MATCH);
        // a dot that does not start a component is an ordinary byte
        assert!(score(b"foo.rb", b"rb", &opts()) > NO_MATCH);
    }

    #[test]
    fn test_never_show_dot_files() {
        let never = ScoreOptions {
            never_show_dot_files: true,
            ..show_all()
        };
        assert_eq!(score(b".git/config", b".g", &never), NO_MATCH);
        assert_eq!(score(b".git/config", b"config", &never), NO_MATCH);
        assert_eq!(score(b".git", b".git", &never), NO_MATCH);
        assert!(score(b"foo.rb", b"rb", &never) > NO_MATCH);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let candidates: [&[u8]; 5] = [b"a", b"ab", b"a/b/c/d", b"AbC_dEf-123", b"xxxxxxxxxxxxa"];
        for candidate in candidates {
            for needle in [&b"a"[..], b"ab", b"abc", b"d"] {
                let s = score(candidate, needle, &opts());
                assert!((0.0..=1.0).contains(&s), "{s} out of range");
            }
        }
    }

    #[test]
    fn test_haystack_bitmask_cached() {
        let needle = Needle::new(b"foo", crate::needle::CaseMatching::Smart, true);
        let mut bitmask = None;
        let s = score_haystack(b"bar/foo", &mut bitmask, &needle, &opts());
        assert!(s > NO_MATCH);
        assert_eq!(bitmask, Some(Bitmask::of(b"barfoo")));

        // a cached mask missing a needle letter short-circuits
        let mut stale = Some(Bitmask::of(b"bar"));
        assert_eq!(score_haystack(b"bar/foo", &mut stale, &needle, &opts()), NO_MATCH);
    }

    #[test]
    fn test_bitmask_filled_on_failed_prescan() {
        let needle = Needle::new(b"zz", crate::needle::CaseMatching::Smart, true);
        let mut bitmask = None;
        assert_eq!(score_haystack(b"Zebra", &mut bitmask, &needle, &opts()), NO_MATCH);
        assert_eq!(bitmask, Some(Bitmask::of(b"zebra")));
    }

    #[test]
    fn test_leftmost() {
        assert_eq!(leftmost(b"a/b/ab", b"ab", true), vec![0, 2]);
        assert_eq!(leftmost(b"xAxB", b"ab", false), vec![1, 3]);
    }

    #[test]
    fn test_long_needle_is_iterative() {
        let needle = vec![b'a'; 50_000];
        let mut haystack = vec![b'a'; 50_001];
        haystack.resize(100_000, b'b');
        let n = needle.len() as f32;
        let h = haystack.len() as f32;
        let expected = n * (1.0 / n + 1.0 / h) / 2.0;

        for recurse in [true, false] {
            let options = ScoreOptions { recurse, ..opts() };
            let s = score(&haystack, &needle, &options);
            assert!(s > NO_MATCH && s < MATCH_ALL, "{s} out of range");
            assert!((s - expected).abs() < 1e-2, "{s} != {expected}");
        }
    }
}
