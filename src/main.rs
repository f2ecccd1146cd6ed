use clap::{Parser, ValueEnum};
use ledger_include::{CombinedStream, IncludeError, Result, resolve};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LONG_HELP: &str = r#"
Directives:
  include <pattern>    - Expand every file matching <pattern>, relative to the
                         directory of the file holding the directive

Output formats:
  text       - Flattened ledger with position markers (default)
  json       - One JSON object per line: {"kind":"content"|"marker",...}
  annotated  - Every content line prefixed with <file>:<line>:
  stripped   - Flattened ledger without markers

Examples:
  # Flatten a ledger
  ledger-include main.ledger
  # Same, taking the file from the environment
  LEDGER_FILE=main.ledger ledger-include
  # Show where every line came from
  ledger-include main.ledger -f annotated
  # List the files that get pulled in
  ledger-include main.ledger --list
  # Check includes without printing the result
  ledger-include main.ledger --dry-run
"#;

/// Flatten ledger files by expanding include directives.
#[derive(Parser, Debug)]
#[command(
    name = "ledger-include",
    version,
    about = "Flatten ledger files by expanding include directives.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Root ledger file
    #[arg(value_name = "FILE", env = "LEDGER_FILE")]
    file: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format for the flattened stream
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Resolve all includes and print a summary instead of the stream
    #[arg(long, conflicts_with = "list")]
    dry_run: bool,

    /// List included files in expansion order (optionally with format: plain, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain", conflicts_with = "dry_run")]
    list: Option<ListFormat>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Flattened text with position markers
    Text,
    /// JSON lines of tagged entries
    Json,
    /// Content lines prefixed with their origin
    Annotated,
    /// Content lines only
    Stripped,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// One path per line
    Plain,
    /// JSON output for scripting
    Json,
}

#[derive(Serialize)]
struct SourceInfo {
    index: usize,
    path: String,
    lines: usize,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => LogLevel::Error,
        (false, 0) => LogLevel::Warn,
        (false, 1) => LogLevel::Info,
        (false, 2) => LogLevel::Debug,
        (false, _) => LogLevel::Trace,
    };

    if let Err(e) = run(&cli, log_level) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, log_level: LogLevel) -> Result<()> {
    log(
        log_level,
        LogLevel::Info,
        &format!("Resolving {}", cli.file.display()),
    );
    let stream = resolve(root_filename(&cli.file)?)?;
    log(
        log_level,
        LogLevel::Debug,
        &format!(
            "Resolved {} entries from {} file expansions",
            stream.len(),
            stream.sources().len()
        ),
    );

    if cli.dry_run {
        return dry_run(&stream, log_level);
    }

    let rendered = if let Some(list_format) = cli.list {
        list_sources(&stream, list_format)?
    } else {
        render(&stream, cli.format)?
    };

    if let Some(output_path) = &cli.output {
        log(
            log_level,
            LogLevel::Info,
            &format!("Writing output to {}", output_path.display()),
        );
        std::fs::write(output_path, rendered)?;
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
    }

    log(log_level, LogLevel::Info, "Done");
    Ok(())
}

fn root_filename(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| IncludeError::NonUtf8Path {
        path: path.to_path_buf(),
    })
}

fn render(stream: &CombinedStream, format: OutputFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Text => out = stream.to_text(),
        OutputFormat::Json => {
            for line in stream.lines() {
                out.push_str(&serde_json::to_string(line)?);
                out.push('\n');
            }
        }
        OutputFormat::Annotated => {
            for line in stream.source_lines()? {
                out.push_str(&format!(
                    "{}:{}: {}\n",
                    line.path.display(),
                    line.line,
                    line.text
                ));
            }
        }
        OutputFormat::Stripped => {
            for text in stream.content() {
                out.push_str(text);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

fn source_infos(stream: &CombinedStream) -> Result<Vec<SourceInfo>> {
    Ok(stream
        .expansions()?
        .into_iter()
        .enumerate()
        .map(|(index, expansion)| SourceInfo {
            index,
            path: expansion.path.display().to_string(),
            lines: expansion.lines,
        })
        .collect())
}

fn list_sources(stream: &CombinedStream, format: ListFormat) -> Result<String> {
    match format {
        ListFormat::Plain => {
            let mut out = String::new();
            for path in stream.sources() {
                out.push_str(&path.display().to_string());
                out.push('\n');
            }
            Ok(out)
        }
        ListFormat::Json => {
            let mut json = serde_json::to_string_pretty(&source_infos(stream)?)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn dry_run(stream: &CombinedStream, log_level: LogLevel) -> Result<()> {
    for info in source_infos(stream)? {
        log(
            log_level,
            LogLevel::Info,
            &format!("✓ {} ({} lines)", info.path, info.lines),
        );
    }

    println!(
        "Summary: {} file expansions, {} content lines",
        stream.sources().len(),
        stream.content().count()
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

fn log(current_level: LogLevel, message_level: LogLevel, message: &str) {
    if message_level >= current_level {
        eprintln!(
            "[{}] {}",
            match message_level {
                LogLevel::Trace => "TRACE",
                LogLevel::Debug => "DEBUG",
                LogLevel::Info => "INFO",
                LogLevel::Warn => "WARN",
                LogLevel::Error => "ERROR",
            },
            message
        );
    }
}
