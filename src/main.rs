use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use log::{debug, warn, LevelFilter};
use std::{
    fs,
    io::{self, IsTerminal, Read, Write},
    process::ExitCode,
};

mod error;
use error::DataError;

mod ops;
use ops::{filter, output};

mod psdle;
use psdle::{DateField, Document};

/// Widest indent `--ident` accepts.
const MAX_INDENT: i64 = 64;

/// Bytes of input shown either side of a JSON syntax error.
const EXCERPT_RADIUS: usize = 40;

const EPILOG: &str = "All date-times have to be formatted as <YYYY>-<MM>-<DD>T<HH>:<MM>:<SS><offset> (ISO 8601), \
e.g. 2019-08-23T15:36:12+0000 or 2019-08-23T15:36:12Z";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Filter PSDLE JSON exports on purchase date or release date.",
    long_about = None,
    after_help = EPILOG
)]
struct Args {
    /// Path to PSDLE JSON file (use '-' for stdin).
    #[arg(value_name = "PSDLE JSON file")]
    file: String,

    #[arg(long, help = "Compare against release date instead of purchase date.")]
    releasedate: bool,

    #[arg(long, value_name = "DATE-TIME", value_parser = parse_bound, help = "Extract entries since the given date and time.")]
    since: Option<DateTime<FixedOffset>>,

    #[arg(long, value_name = "DATE-TIME", value_parser = parse_bound, help = "Extract entries before the given date and time.")]
    before: Option<DateTime<FixedOffset>>,

    #[arg(
        long,
        value_name = "LEVEL",
        default_value_t = -1,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i64).range(..=MAX_INDENT),
        help = "Create a pretty-printed output with that indent level."
    )]
    ident: i64,

    #[arg(
        short,
        long,
        value_name = "LEVEL",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=1),
        help = "Debug verbosity level: 0 = no debug info, 1 = show debug info."
    )]
    debug: u8,
}

/// How chatty the program is on stderr, from `--debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Verbosity(u8);

impl Verbosity {
    fn is_debug(self) -> bool {
        self.0 >= 1
    }

    fn level_filter(self) -> LevelFilter {
        if self.is_debug() {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}

fn parse_bound(s: &str) -> Result<DateTime<FixedOffset>, String> {
    filter::parse_date_time(s).map_err(|e| format!("{e}, expected e.g. 2019-08-23T15:36:12+0000"))
}

/// Negative levels mean compact output.
fn indent_width(level: i64) -> Option<usize> {
    usize::try_from(level).ok()
}

fn init_logger(verbosity: Verbosity) {
    env_logger::Builder::new()
        .filter_level(verbosity.level_filter())
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}",
                record.level().as_str().to_lowercase(),
                record.args()
            )
        })
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    let verbosity = Verbosity(args.debug);
    init_logger(verbosity);

    let field = DateField::from_release_flag(args.releasedate);
    let Some(criteria) = filter::FilterCriteria::new(field, args.since, args.before) else {
        eprintln!(
            "{}: Please specify at least a since and/or a before date.",
            "Error".red().bold()
        );
        eprintln!("{}", Args::command().render_help());
        return ExitCode::from(1);
    };

    if let Err(e) = run(&args, &criteria) {
        return report(&e, verbosity);
    }
    ExitCode::SUCCESS
}

/// Prints the error and picks the exit code for it.
fn report(e: &anyhow::Error, verbosity: Verbosity) -> ExitCode {
    eprintln!("{}: {:#}", "Error".red().bold(), e);

    if e.downcast_ref::<DataError>().is_some() {
        return ExitCode::from(2);
    }

    if verbosity.is_debug() {
        eprintln!("{}:\n{:?}", "Details".yellow().bold(), e);
    }
    ExitCode::FAILURE
}

fn read_input(file_path: &str) -> Result<String> {
    let bytes = fs::read(file_path)
        .with_context(|| format!("Failed to read file: {}", file_path))?;
    Ok(decode(bytes, file_path))
}

/// Invalid UTF-8 sequences become U+FFFD instead of failing the run.
fn decode(bytes: Vec<u8>, source: &str) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!("{} is not valid UTF-8, invalid bytes replaced", source);
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

/// Cuts `line` down to a window around the 1-based byte `column`.
/// Returns the window and the caret's position in it, in characters.
fn excerpt(line: &str, column: usize) -> (String, usize) {
    let mut at = column.saturating_sub(1).min(line.len());
    while !line.is_char_boundary(at) {
        at -= 1;
    }

    let mut start = at.saturating_sub(EXCERPT_RADIUS);
    while !line.is_char_boundary(start) {
        start -= 1;
    }

    let mut end = (at + EXCERPT_RADIUS).min(line.len());
    while !line.is_char_boundary(end) {
        end += 1;
    }

    let prefix = if start > 0 { "..." } else { "" };
    let suffix = if end < line.len() { "..." } else { "" };
    let caret = prefix.len() + line[start..at].chars().count();

    (format!("{prefix}{}{suffix}", &line[start..end]), caret)
}

fn parse_document(input: &str) -> Result<Document> {
    serde_json::from_str(input).map_err(|e| {
        if !e.is_syntax() && !e.is_eof() {
            return anyhow!(e);
        }

        // 1-based position of the error
        let line = e.line();
        let column = e.column();

        // exports are often one minified line, so only show a window of it
        let source_line = input.lines().nth(line.saturating_sub(1)).unwrap_or_default();
        let (snippet, caret) = excerpt(source_line, column);

        let context_str = format!(
            "{}\n{}{}",
            snippet,
            " ".repeat(caret),
            "^-- here".purple().bold()
        );

        anyhow!(
            "{}\n{}:\n{}",
            e,
            "Context".yellow().bold(),
            context_str
        )
    })
    .context("Failed to parse PSDLE JSON file")
}

fn run(args: &Args, criteria: &filter::FilterCriteria) -> Result<()> {
    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    debug!("{:?}", criteria);

    let contents = match args.file.as_str() {
        "-" => {
            let mut stdin = io::stdin();
            if stdin.is_terminal() {
                #[allow(unreachable_code)]
                return Err(Args::command()
                    .error(
                        ErrorKind::MissingRequiredArgument,
                        "Missing input: either provide a file or pipe the JSON export in."
                    )
                    .exit());
            }

            let mut bytes = Vec::new();
            stdin
                .read_to_end(&mut bytes)
                .context("Failed to read standard input")?;
            decode(bytes, "standard input")
        }
        file => read_input(file)?,
    };
    debug!("read {} bytes from {}", contents.len(), args.file);

    let mut document = parse_document(&contents)?;
    let mut items = document.take_items()?;
    let total = items.len();

    filter::filter_items(&mut items, criteria)?;
    debug!(
        "kept {} of {} items by {}",
        items.len(),
        total,
        criteria.field().label()
    );

    document.replace_items(items);

    let indent = indent_width(args.ident);
    debug!("output indent: {:?}", indent);
    let rendered = output::render(&document, indent)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").context("Failed to write output")?;

    Ok(())
}
