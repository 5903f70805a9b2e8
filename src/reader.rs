//! Candidate production.
//!
//! Producers collect candidates into one flat buffer plus a list of spans and
//! hand both to [`Scanner::from_slab`], so the scanner adopts the buffer
//! instead of copying every entry. A failure never discards what was already
//! collected: it travels next to the partial corpus in [`ScanResult`].

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::error::ScanError;
use crate::scanner::{Scanner, Span};

/// Default maximum directory depth for [`find`]
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Candidates produced by a reader, with the error that ended production early
/// if there was one.
#[derive(Debug)]
pub struct ScanResult {
    /// Everything collected, possibly partial
    pub scanner: Scanner,
    /// The first failure encountered
    pub error: Option<ScanError>,
}

impl ScanResult {
    fn new(buffer: Vec<u8>, spans: Vec<Span>, error: Option<ScanError>) -> Self {
        match Scanner::from_slab(buffer, spans) {
            Ok(scanner) => Self { scanner, error },
            Err(err) => Self {
                scanner: Scanner::new(),
                error: Some(err.into()),
            },
        }
    }

    fn failed(error: ScanError) -> Self {
        Self {
            scanner: Scanner::new(),
            error: Some(error),
        }
    }
}

/// Options for splitting a byte stream into candidates
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    delimiter: u8,
    drop: usize,
    max_files: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b'\n',
            drop: 0,
            max_files: 0,
        }
    }
}

impl ReaderOptions {
    /// Sets the byte separating entries (default: '\n')
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Separates entries with NUL instead of newline
    pub fn read0(mut self, enable: bool) -> Self {
        self.delimiter = if enable { b'\0' } else { b'\n' };
        self
    }

    /// Removes `drop` bytes from the front of every entry, e.g. `./`
    pub fn drop(mut self, drop: usize) -> Self {
        self.drop = drop;
        self
    }

    /// Stops after `max_files` entries, 0 meaning no limit
    pub fn max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }
}

/// Options for [`find`]
#[derive(Debug, Clone)]
pub struct FindOptions {
    /// Deepest directory level to descend into below the root
    pub max_depth: usize,
    /// Stops after this many files, 0 meaning no limit
    pub max_files: usize,
    /// Follow symbolic links
    pub follow_links: bool,
    /// Skip files excluded by `.gitignore` and git's exclude files
    pub respect_gitignore: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_files: 0,
            follow_links: true,
            respect_gitignore: false,
        }
    }
}

enum Stop {
    Exhausted,
    Capped,
    Failed(ScanError),
}

/// Flat buffer being filled by a producer.
#[derive(Default)]
struct Collected {
    buffer: Vec<u8>,
    spans: Vec<Span>,
}

impl Collected {
    fn push(&mut self, entry: &[u8]) {
        self.spans.push(Span::new(self.buffer.len(), entry.len()));
        self.buffer.extend_from_slice(entry);
    }

    fn len(&self) -> usize {
        self.spans.len()
    }

    fn is_full(&self, max_files: usize) -> bool {
        max_files > 0 && self.len() >= max_files
    }
}

fn collect(mut source: impl BufRead, options: &ReaderOptions, collected: &mut Collected) -> Stop {
    let mut entry = Vec::new();
    loop {
        entry.clear();
        match source.read_until(options.delimiter, &mut entry) {
            Ok(0) => return Stop::Exhausted,
            Ok(_) => {
                if entry.last() == Some(&options.delimiter) {
                    entry.pop();
                }
                if entry.is_empty() {
                    continue;
                }
                if entry.len() < options.drop {
                    return Stop::Failed(ScanError::DropExceedsEntry {
                        drop: options.drop,
                        len: entry.len(),
                    });
                }
                collected.push(&entry[options.drop..]);
                if collected.is_full(options.max_files) {
                    return Stop::Capped;
                }
            }
            Err(err) => return Stop::Failed(err.into()),
        }
    }
}

/// Splits everything `source` yields into candidates.
pub fn read_bufread(source: impl BufRead, options: &ReaderOptions) -> ScanResult {
    let mut collected = Collected::default();
    let error = match collect(source, options, &mut collected) {
        Stop::Failed(err) => {
            warn!("reader: {err}, keeping {} entries", collected.len());
            Some(err)
        }
        Stop::Exhausted | Stop::Capped => None,
    };
    debug!("reader: collected {} entries", collected.len());
    ScanResult::new(collected.buffer, collected.spans, error)
}

/// Runs `cmd` with `sh -c` and splits its standard output into candidates.
///
/// The process is killed once `max_files` entries have been read. A non-zero
/// exit is reported as [`ScanError::CommandFailed`] alongside the output
/// collected before it.
pub fn read_command(cmd: &str, options: &ReaderOptions) -> ScanResult {
    debug!("reader: running {cmd:?}");
    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            warn!("reader: could not spawn {cmd:?}: {err}");
            return ScanResult::failed(ScanError::Spawn(err));
        }
    };

    let mut collected = Collected::default();
    let stop = match child.stdout.take() {
        Some(stdout) => collect(BufReader::new(stdout), options, &mut collected),
        None => Stop::Exhausted,
    };

    let mut error = match stop {
        Stop::Exhausted => None,
        Stop::Capped => {
            trace!("reader: killing {cmd:?} after {} entries", collected.len());
            kill(&mut child, cmd);
            None
        }
        Stop::Failed(err) => {
            trace!("reader: killing {cmd:?} after a read error: {err}");
            kill(&mut child, cmd);
            Some(err)
        }
    };

    match child.wait() {
        Ok(status) if !status.success() && error.is_none() && !collected.is_full(options.max_files) => {
            error = Some(ScanError::CommandFailed(status.to_string()));
        }
        Ok(_) => {}
        Err(err) => {
            if error.is_none() {
                error = Some(err.into());
            }
        }
    }

    if let Some(err) = &error {
        warn!("reader: {err}, keeping {} entries", collected.len());
    }
    debug!("reader: {cmd:?} produced {} entries", collected.len());
    ScanResult::new(collected.buffer, collected.spans, error)
}

fn kill(child: &mut Child, cmd: &str) {
    if let Err(err) = child.kill() {
        debug!("reader: could not kill {cmd:?}: {err}");
    }
}

/// Collects the regular files below `root`, as paths relative to `root`.
///
/// Dot-files are included; hiding them is up to the matcher. The walk stops at
/// the first error, which is returned with the files found so far.
pub fn find(root: &Path, options: &FindOptions) -> ScanResult {
    let mut builder = ignore::WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(options.follow_links)
        .max_depth(Some(options.max_depth))
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    let mut collected = Collected::default();
    let mut error = None;
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                error = Some(ScanError::from(err));
                break;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let bytes = path.as_os_str().as_encoded_bytes();
        if bytes.is_empty() {
            continue;
        }
        collected.push(bytes);
        if collected.is_full(options.max_files) {
            trace!("reader: stopping walk after {} files", collected.len());
            break;
        }
    }

    if let Some(err) = &error {
        warn!("reader: {err}, keeping {} files", collected.len());
    }
    debug!("reader: found {} files below {}", collected.len(), root.display());
    ScanResult::new(collected.buffer, collected.spans, error)
}

#[cfg(test)]
#[cfg_attr(coverage, coverage(off))]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use super::*;

    fn entries(result: &ScanResult) -> Vec<String> {
        result
            .scanner
            .iter()
            .map(|e| String::from_utf8_lossy(e).into_owned())
            .collect()
    }

    #[test]
    fn test_bufread_skips_empty_entries() {
        let result = read_bufread(Cursor::new("a\nb\n\nc"), &ReaderOptions::default());
        assert!(result.error.is_none());
        assert_eq!(entries(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_bufread_read0() {
        let options = ReaderOptions::default().read0(true);
        let result = read_bufread(Cursor::new(&b"a b\0c\nd\0"[..]), &options);
        assert_eq!(entries(&result), vec!["a b", "c\nd"]);
    }

    #[test]
    fn test_bufread_drop() {
        let options = ReaderOptions::default().drop(2);
        let result = read_bufread(Cursor::new("./foo\n./bar/baz\n"), &options);
        assert_eq!(entries(&result), vec!["foo", "bar/baz"]);
    }

    #[test]
    fn test_bufread_drop_exceeds_entry() {
        let options = ReaderOptions::default().drop(2);
        let result = read_bufread(Cursor::new("./a\nb\n./c\n"), &options);
        assert_eq!(entries(&result), vec!["a"]);
        assert!(matches!(result.error, Some(ScanError::DropExceedsEntry { drop: 2, len: 1 })));
    }

    #[test]
    fn test_bufread_max_files() {
        let options = ReaderOptions::default().max_files(2);
        let result = read_bufread(Cursor::new("a\nb\nc\n"), &options);
        assert!(result.error.is_none());
        assert_eq!(entries(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_command() {
        let result = read_command("printf 'x\\n./y\\n'", &ReaderOptions::default());
        assert!(result.error.is_none());
        assert_eq!(entries(&result), vec!["x", "./y"]);
    }

    #[test]
    fn test_command_failure_keeps_output() {
        let result = read_command("echo kept; exit 3", &ReaderOptions::default());
        assert_eq!(entries(&result), vec!["kept"]);
        assert!(matches!(result.error, Some(ScanError::CommandFailed(_))));
    }

    #[test]
    fn test_command_killed_at_max_files() {
        let options = ReaderOptions::default().max_files(5);
        let result = read_command("yes abc", &options);
        assert!(result.error.is_none());
        assert_eq!(entries(&result), vec!["abc"; 5]);
    }

    #[test]
    fn test_command_killed_after_read_error() {
        let options = ReaderOptions::default().drop(2);
        let result = read_command("printf './a\\nb\\n'; exec yes ./c", &options);
        assert_eq!(entries(&result), vec!["a"]);
        assert!(matches!(result.error, Some(ScanError::DropExceedsEntry { drop: 2, len: 1 })));
    }

    #[test]
    fn test_find() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("README"), "").unwrap();
        fs::write(dir.path().join("src/main.rs"), "").unwrap();
        fs::write(dir.path().join("src/nested/deep.rs"), "").unwrap();
        fs::write(dir.path().join(".git/config"), "").unwrap();

        let result = find(dir.path(), &FindOptions::default());
        assert!(result.error.is_none());
        let mut found = entries(&result);
        found.sort();
        assert_eq!(found, vec![".git/config", "README", "src/main.rs", "src/nested/deep.rs"]);

        let shallow = FindOptions {
            max_depth: 2,
            ..FindOptions::default()
        };
        let mut found = entries(&find(dir.path(), &shallow));
        found.sort();
        assert_eq!(found, vec![".git/config", "README", "src/main.rs"]);

        let capped = FindOptions {
            max_files: 1,
            ..FindOptions::default()
        };
        assert_eq!(find(dir.path(), &capped).scanner.len(), 1);
    }

    #[test]
    fn test_find_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = find(&dir.path().join("missing"), &FindOptions::default());
        assert!(result.scanner.is_empty());
        assert!(matches!(result.error, Some(ScanError::Walk(_))));
    }
}
