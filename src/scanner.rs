//! The candidate store.
//!
//! A [`Scanner`] holds an immutable, indexable list of byte-string candidates.
//! Candidates live either in an arena owned by the scanner (copies made by
//! [`Scanner::from_copies`] and [`Scanner::append`]) or in a single slab
//! adopted from a producer (a command's output, a directory walk) through
//! [`Scanner::from_slab`]. The slab is released as one unit when the scanner
//! is dropped; its candidates are never freed individually.
//!
//! Candidates are addressed by spans (region, offset, length), so growing the
//! arena never invalidates an index that was already handed out.

use std::fmt;

use crate::error::MatchError;

/// Location of one candidate inside a caller supplied buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the candidate
    pub start: usize,
    /// Length of the candidate in bytes
    pub len: usize,
}

impl Span {
    /// Creates a span covering `len` bytes starting at `start`
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    fn end(&self) -> Option<usize> {
        self.start.checked_add(self.len)
    }
}

/// An externally produced buffer adopted by a scanner without copying.
#[derive(Default)]
pub struct Slab {
    bytes: Box<[u8]>,
}

impl Slab {
    /// Size of the slab in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the slab holds no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Ownership mode of a scanner's candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Every candidate is a copy owned by the scanner
    Owned,
    /// The scanner wraps an adopted slab of the given size (candidates
    /// appended later are owned copies)
    Borrowed(usize),
}

#[derive(Debug, Clone, Copy)]
enum Region {
    Arena,
    Slab,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    region: Region,
    start: usize,
    len: usize,
}

/// Indexable store of candidate strings.
#[derive(Default)]
pub struct Scanner {
    arena: Vec<u8>,
    slab: Option<Slab>,
    entries: Vec<Entry>,
}

impl Scanner {
    /// Creates an empty scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scanner owning copies of `strings`.
    pub fn from_copies<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut scanner = Self::new();
        scanner.append(strings);
        scanner
    }

    /// Creates a scanner that adopts `buffer` and exposes the candidates
    /// described by `spans` without copying them.
    ///
    /// The buffer is released as one unit when the scanner is dropped.
    pub fn from_slab(buffer: Vec<u8>, spans: Vec<Span>) -> Result<Self, MatchError> {
        let buffer_len = buffer.len();
        let mut entries = Vec::with_capacity(spans.len());
        for (index, span) in spans.into_iter().enumerate() {
            match span.end() {
                Some(end) if end <= buffer_len => entries.push(Entry {
                    region: Region::Slab,
                    start: span.start,
                    len: span.len,
                }),
                _ => {
                    return Err(MatchError::InvalidSpan {
                        index,
                        start: span.start,
                        len: span.len,
                        buffer_len,
                    });
                }
            }
        }
        debug!("scanner: adopted {} byte slab with {} candidates", buffer_len, entries.len());

        Ok(Self {
            arena: Vec::new(),
            slab: Some(Slab {
                bytes: buffer.into_boxed_slice(),
            }),
            entries,
        })
    }

    /// Appends copies of `strings`, keeping every existing index stable.
    pub fn append<I, S>(&mut self, strings: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        for string in strings {
            let bytes = string.as_ref();
            let start = self.arena.len();
            self.arena.extend_from_slice(bytes);
            self.entries.push(Entry {
                region: Region::Arena,
                start,
                len: bytes.len(),
            });
        }
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the scanner holds no candidates
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the candidate at `index`.
    pub fn get(&self, index: usize) -> Result<&[u8], MatchError> {
        self.entries
            .get(index)
            .map(|entry| self.resolve(entry))
            .ok_or(MatchError::IndexOutOfRange {
                index,
                count: self.entries.len(),
            })
    }

    /// Iterates over the candidates in index order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        self.entries.iter().map(move |entry| self.resolve(entry))
    }

    /// Ownership mode of the store
    pub fn storage(&self) -> Storage {
        match &self.slab {
            Some(slab) => Storage::Borrowed(slab.len()),
            None => Storage::Owned,
        }
    }

    /// Human readable listing of every candidate, one per line.
    pub fn dump(&self) -> String {
        let mut out = String::from("{\n");
        for candidate in self.iter() {
            out.push_str("  ");
            out.push_str(&String::from_utf8_lossy(candidate));
            out.push_str(",\n");
        }
        out.push('}');
        out
    }

    fn resolve(&self, entry: &Entry) -> &[u8] {
        let bytes: &[u8] = match entry.region {
            Region::Arena => &self.arena,
            Region::Slab => self.slab.as_ref().map(|slab| &slab.bytes[..]).unwrap_or_default(),
        };
        &bytes[entry.start..entry.start + entry.len]
    }
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}
