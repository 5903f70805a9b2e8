extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate log;
extern crate fzmatch;
extern crate shlex;

use std::env;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use fzmatch::options::DEFAULT_LIMIT;
use fzmatch::prelude::*;
use fzmatch::reader::DEFAULT_MAX_DEPTH;

/// Number of times `--benchmark` types the query
const BENCHMARK_ROUNDS: u32 = 10;

/// fzm - fuzzy path matcher
///
/// Reads candidate paths from a command, from standard input or from a
/// directory walk, and prints the ones matching the query, best first.
#[derive(Parser, Debug)]
#[command(name = "fzm", args_override_self = true, verbatim_doc_comment, version, about)]
struct FzmOptions {
    /// Directory to walk for candidates
    ///
    /// Defaults to the current directory when nothing is piped in
    dir: Option<PathBuf>,

    //  --- Input ---
    /// Command whose output lists the candidates, run with `sh -c`
    #[arg(long, help_heading = "Input")]
    cmd: Option<String>,

    /// Read input delimited by ASCII NUL(\\0) characters
    #[arg(long, help_heading = "Input")]
    read0: bool,

    /// Number of bytes to remove from the front of every input entry
    ///
    /// Example: `--cmd 'find . -type f' --drop 2` strips the leading `./`
    #[arg(long, default_value_t = 0, help_heading = "Input")]
    drop: usize,

    /// Stop reading after this many candidates (0 for no limit)
    #[arg(long, default_value_t = 0, help_heading = "Input")]
    max_files: usize,

    /// Deepest directory level visited by the directory walk
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, help_heading = "Input")]
    max_depth: usize,

    /// Skip files ignored by git during the directory walk
    #[arg(long, help_heading = "Input")]
    gitignore: bool,

    //  --- Search ---
    /// Query to match
    #[arg(long, short, default_value = "", help_heading = "Search")]
    query: String,

    /// Maximum number of matches printed
    #[arg(long, default_value_t = DEFAULT_LIMIT, help_heading = "Search")]
    limit: usize,

    /// Number of matching threads (defaults to the available parallelism)
    #[arg(long, help_heading = "Search")]
    threads: Option<usize>,

    /// Case sensitivity
    #[arg(long, default_value = "smart", value_enum, help_heading = "Search")]
    case: CaseMatching,

    /// Treat spaces in the query as characters to match
    #[arg(long, help_heading = "Search")]
    no_ignore_spaces: bool,

    /// Match dot-files even when the query does not start with `.`
    #[arg(long, help_heading = "Search")]
    always_show_dot_files: bool,

    /// Never match dot-files
    #[arg(long, help_heading = "Search")]
    never_show_dot_files: bool,

    /// Score only the first placement of the query in each candidate
    #[arg(long, help_heading = "Search")]
    no_recurse: bool,

    //  --- Output ---
    /// Print output delimited by ASCII NUL(\\0) characters
    #[arg(long, help_heading = "Output")]
    print0: bool,

    /// Type the query one character at a time and report timings on stderr
    #[arg(long, help_heading = "Output")]
    benchmark: bool,
}

//------------------------------------------------------------------------------
fn main() {
    env_logger::builder().format_timestamp_nanos().init();
    if let Err(err) = color_eyre::install() {
        warn!("could not install error report handler: {err}");
    }

    match real_main() {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(err) => {
            // if downstream pipe is closed, exit silently
            if err
                .downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
            {
                std::process::exit(0)
            }
            eprintln!("fzm: {err:?}");
            std::process::exit(2)
        }
    }
}

fn parse_args() -> FzmOptions {
    let mut args = Vec::new();

    args.push(
        env::args()
            .next()
            .expect("there should be at least one arg: the application name"),
    );
    args.extend(
        env::var("FZM_DEFAULT_OPTIONS")
            .ok()
            .and_then(|val| shlex::split(&val))
            .unwrap_or_default(),
    );
    for arg in env::args().skip(1) {
        args.push(arg);
    }

    FzmOptions::parse_from(args)
}

fn real_main() -> Result<i32> {
    let opts = parse_args();

    //------------------------------------------------------------------------------
    // collect candidates
    let input = read_candidates(&opts);
    if let Some(err) = &input.error {
        warn!("{err}; matching against {} candidates", input.scanner.len());
    }

    let options = matcher_options(&opts)?;
    if opts.benchmark {
        benchmark(&input.scanner, &options, opts.query.as_bytes())?;
    }

    //------------------------------------------------------------------------------
    // match
    let mut matcher = Matcher::new(&input.scanner, options).wrap_err("invalid matcher options")?;
    let result = matcher.run(opts.query.as_bytes());

    //------------------------------------------------------------------------------
    // output
    let ending = if opts.print0 { b'\0' } else { b'\n' };
    let mut stdout = BufWriter::new(io::stdout().lock());
    for candidate in &result.matches {
        stdout.write_all(candidate)?;
        stdout.write_all(&[ending])?;
    }
    stdout.flush()?;

    Ok(if result.matches.is_empty() { 1 } else { 0 })
}

/// Reads from `--cmd`, then an explicit directory, then piped stdin, and
/// finally walks the current directory.
fn read_candidates(opts: &FzmOptions) -> ScanResult {
    let reader_options = ReaderOptions::default()
        .read0(opts.read0)
        .drop(opts.drop)
        .max_files(opts.max_files);

    if let Some(cmd) = &opts.cmd {
        return read_command(cmd, &reader_options);
    }

    let stdin = io::stdin();
    if opts.dir.is_none() && !stdin.is_terminal() {
        debug!("reading candidates from stdin");
        return read_bufread(stdin.lock(), &reader_options);
    }

    let root = opts.dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let find_options = FindOptions {
        max_depth: opts.max_depth,
        max_files: opts.max_files,
        respect_gitignore: opts.gitignore,
        ..FindOptions::default()
    };
    find(&root, &find_options)
}

fn matcher_options(opts: &FzmOptions) -> Result<MatcherOptions> {
    let mut builder = MatcherOptionsBuilder::default();
    builder
        .always_show_dot_files(opts.always_show_dot_files)
        .never_show_dot_files(opts.never_show_dot_files)
        .case(opts.case)
        .ignore_spaces(!opts.no_ignore_spaces)
        .limit(opts.limit)
        .recurse(!opts.no_recurse);
    if let Some(threads) = opts.threads {
        builder.threads(threads);
    }
    Ok(builder.build()?)
}

/// Times every prefix of `query` as if it were typed, averaged over
/// [`BENCHMARK_ROUNDS`] fresh matchers.
fn benchmark(scanner: &Scanner, options: &MatcherOptions, query: &[u8]) -> Result<()> {
    let mut totals = vec![Duration::ZERO; query.len() + 1];
    let mut counts = vec![0usize; query.len() + 1];

    for _ in 0..BENCHMARK_ROUNDS {
        let mut matcher = Matcher::new(scanner, options.clone()).wrap_err("invalid matcher options")?;
        for end in 0..=query.len() {
            let start = Instant::now();
            counts[end] = matcher.run(&query[..end]).matches.len();
            totals[end] += start.elapsed();
        }
    }

    let mut stderr = io::stderr().lock();
    writeln!(
        stderr,
        "{} candidates, {} threads, {} rounds",
        scanner.len(),
        options.threads,
        BENCHMARK_ROUNDS
    )?;
    for (end, total) in totals.iter().enumerate() {
        let average = format!("{:?}", *total / BENCHMARK_ROUNDS);
        writeln!(
            stderr,
            "{:<24} {:>6} matches {:>12}",
            format!("{:?}", String::from_utf8_lossy(&query[..end])),
            counts[end],
            average
        )?;
    }
    Ok(())
}
