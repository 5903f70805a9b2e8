//! Parallel top-k matching over a [`Scanner`].
//!
//! A [`Matcher`] keeps one [`Haystack`] per candidate. Each haystack caches the
//! candidate's letter bitmask and its score against the previous needle, which
//! lets a run skip candidates that cannot match when the user keeps typing.
//!
//! Large corpora are scored by several workers. The haystack array is cut
//! into [`CHUNK_SIZE`] element chunks dealt round-robin to the workers, so each
//! worker owns a disjoint set of `&mut` slices for the whole run and no
//! locking is needed. Every worker keeps its best results in a bounded
//! [`Heap`]; the heaps are merged once all workers have joined.

use std::cmp::Ordering;
use std::thread;
use std::time::Instant;

use crate::error::MatchError;
use crate::heap::Heap;
use crate::needle::Needle;
use crate::options::MatcherOptions;
use crate::scanner::Scanner;
use crate::score::{Bitmask, NO_MATCH, ScoreOptions, score_haystack};

/// Below this many candidates a single worker does all the scoring
pub const THREAD_THRESHOLD: usize = 1000;
/// Upper bound on the configured number of workers
pub const MAX_THREADS: usize = 64;
/// Number of consecutive haystacks handed to a worker at a time
pub const CHUNK_SIZE: usize = 64;

/// A candidate together with its per-search cache.
#[derive(Debug, Clone)]
pub struct Haystack<'s> {
    candidate: &'s [u8],
    bitmask: Option<Bitmask>,
    score: Option<f32>,
}

impl<'s> Haystack<'s> {
    fn new(candidate: &'s [u8]) -> Self {
        Self {
            candidate,
            bitmask: None,
            score: None,
        }
    }

    /// The candidate text
    pub fn candidate(&self) -> &'s [u8] {
        self.candidate
    }

    /// Score computed by the last run that looked at this candidate
    pub fn cached_score(&self) -> Option<f32> {
        self.score
    }
}

/// Outcome of one [`Matcher::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'s> {
    /// Matching candidates, best first
    pub matches: Vec<&'s [u8]>,
    /// Size of the corpus that was searched
    pub candidate_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct Scored<'s> {
    score: f32,
    candidate: &'s [u8],
}

type Comparator<'s> = fn(&Scored<'s>, &Scored<'s>) -> Ordering;

/// Dictionary order; a candidate that is a prefix of another sorts first.
fn by_candidate(a: &Scored, b: &Scored) -> Ordering {
    a.candidate.cmp(b.candidate)
}

/// Score descending, then dictionary order.
fn by_score(a: &Scored, b: &Scored) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| by_candidate(a, b))
}

/// Incremental fuzzy matcher bound to one scanner.
///
/// The matcher borrows the scanner, so the scanner cannot grow while a matcher
/// over it is alive. Build a new matcher after appending candidates.
pub struct Matcher<'s> {
    haystacks: Vec<Haystack<'s>>,
    options: MatcherOptions,
    last_needle: Option<Needle>,
}

impl<'s> Matcher<'s> {
    /// Creates a matcher over every candidate currently in `scanner`.
    ///
    /// Fails when `limit` or `threads` is zero; `threads` is capped at
    /// [`MAX_THREADS`].
    pub fn new(scanner: &'s Scanner, mut options: MatcherOptions) -> Result<Self, MatchError> {
        if options.limit == 0 {
            return Err(MatchError::InvalidLimit);
        }
        if options.threads == 0 {
            return Err(MatchError::InvalidThreadCount);
        }
        if options.threads > MAX_THREADS {
            debug!("matcher: clamping {} threads to {}", options.threads, MAX_THREADS);
            options.threads = MAX_THREADS;
        }

        let haystacks: Vec<Haystack<'s>> = scanner.iter().map(Haystack::new).collect();
        debug!(
            "matcher: {} candidates, limit {}, threads {}",
            haystacks.len(),
            options.limit,
            options.threads
        );

        Ok(Self {
            haystacks,
            options,
            last_needle: None,
        })
    }

    /// The options this matcher was built with (after clamping)
    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    /// Number of candidates searched by each run
    pub fn candidate_count(&self) -> usize {
        self.haystacks.len()
    }

    /// Per-candidate caches, in scanner order
    pub fn haystacks(&self) -> &[Haystack<'s>] {
        &self.haystacks
    }

    /// Returns at most `limit` candidates matching `needle`, best first.
    ///
    /// When `needle` extends the needle of the previous run, candidates that
    /// did not match then are not scored again.
    pub fn run(&mut self, needle: &[u8]) -> MatchResult<'s> {
        let start = Instant::now();
        let needle = Needle::new(needle, self.options.case, self.options.ignore_spaces);
        let skip_misses = self
            .last_needle
            .as_ref()
            .is_some_and(|previous| needle.extends(previous));

        let candidate_count = self.haystacks.len();
        let workers = self.worker_count();
        let alphabetical = needle.is_empty() || needle.is_dot();
        let comparator: Comparator<'s> = if alphabetical { by_candidate } else { by_score };
        let score_options = self.options.score_options(needle.case_sensitive());
        // no run can return more than the corpus holds
        let limit = self.options.limit.min(candidate_count).max(1);

        let mut partitions: Vec<Vec<&mut [Haystack<'s>]>> = (0..workers).map(|_| Vec::new()).collect();
        for (idx, chunk) in self.haystacks.chunks_mut(CHUNK_SIZE).enumerate() {
            partitions[idx % workers].push(chunk);
        }

        let task = Task {
            needle: &needle,
            options: &score_options,
            skip_misses,
            limit,
            comparator,
        };
        let mut merged = task.dispatch(partitions);
        merged.sort_by(comparator);
        merged.truncate(limit);

        debug!(
            "matcher: {:?} matched {}/{} with {} worker(s) in {:?}{}",
            String::from_utf8_lossy(needle.as_bytes()),
            merged.len(),
            candidate_count,
            workers,
            start.elapsed(),
            if skip_misses { " (incremental)" } else { "" }
        );

        self.last_needle = Some(needle);
        MatchResult {
            matches: merged.into_iter().map(|scored| scored.candidate).collect(),
            candidate_count,
        }
    }

    fn worker_count(&self) -> usize {
        let count = self.haystacks.len();
        if count < THREAD_THRESHOLD {
            return 1;
        }
        self.options.threads.min(count.div_ceil(CHUNK_SIZE)).max(1)
    }
}

/// Read-only state shared by every worker of a run.
#[derive(Clone, Copy)]
struct Task<'a, 's> {
    needle: &'a Needle,
    options: &'a ScoreOptions,
    skip_misses: bool,
    limit: usize,
    comparator: Comparator<'s>,
}

impl<'a, 's> Task<'a, 's> {
    /// Runs one worker per partition and merges their results.
    ///
    /// The last partition is scored on the calling thread. A panicking worker
    /// takes the caller down with it.
    fn dispatch(self, mut partitions: Vec<Vec<&mut [Haystack<'s>]>>) -> Vec<Scored<'s>> {
        let inline = partitions.pop().unwrap_or_default();
        let worker_id = partitions.len();

        thread::scope(|scope| {
            let handles: Vec<_> = partitions
                .into_iter()
                .enumerate()
                .map(|(id, chunks)| scope.spawn(move || self.search(id, chunks)))
                .collect();

            let mut merged = self.search(worker_id, inline);
            for handle in handles {
                match handle.join() {
                    Ok(found) => merged.extend(found),
                    Err(payload) => std::panic::resume_unwind(payload),
                }
            }
            merged
        })
    }

    /// Scores the haystacks of one worker, keeping the best `limit` of them.
    fn search(self, worker_id: usize, chunks: Vec<&mut [Haystack<'s>]>) -> Vec<Scored<'s>> {
        let mut heap = Heap::new(self.limit.saturating_add(1), self.comparator);
        let mut scored = 0usize;

        for haystack in chunks.into_iter().flat_map(|chunk| chunk.iter_mut()) {
            if self.skip_misses && haystack.score == Some(NO_MATCH) {
                continue;
            }
            let score = score_haystack(haystack.candidate, &mut haystack.bitmask, self.needle, self.options);
            haystack.score = Some(score);
            scored += 1;
            if score <= NO_MATCH {
                continue;
            }

            let entry = Scored {
                score,
                candidate: haystack.candidate,
            };
            if heap.len() < self.limit {
                heap.insert(entry);
            } else if heap
                .peek()
                .is_some_and(|worst| (self.comparator)(&entry, worst) != Ordering::Greater)
            {
                heap.insert(entry);
                heap.extract();
            }
        }

        trace!("matcher: worker {} scored {}, kept {}", worker_id, scored, heap.len());
        heap.into_vec()
    }
}
