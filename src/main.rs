mod config;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use critail_logs::{
    CriParser, IndexItem, LogFilterResult, StreamType, TailReadError, filter_cri_log_by_stream,
    read_tail_lines,
};

use crate::config::{FileConfig, OutputFormat, Settings};

/// critail - Print the last lines of one output stream from a CRI container log
#[derive(Parser, Debug)]
#[command(name = "critail")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Container log file written by the runtime
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Number of most recent lines to show [default: 100]
    #[arg(long, short = 'n', allow_negative_numbers = true)]
    tail_lines: Option<i64>,

    /// Stream to show: stdout or stderr [default: stdout]
    #[arg(long, value_parser = parse_stream)]
    stream: Option<StreamType>,

    /// How to print the retained lines [default: content]
    #[arg(long, value_enum)]
    output: Option<OutputFormat>,

    /// TOML file with default settings
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn parse_stream(s: &str) -> Result<StreamType, String> {
    StreamType::from_bytes(s.as_bytes())
        .ok_or_else(|| format!("unknown stream '{}', expected stdout or stderr", s))
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args);

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

fn run(args: Args) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file_config, args.tail_lines, args.stream, args.output);
    tracing::debug!(?settings, path = %args.path.display(), "resolved settings");

    let mut file = open_log(&args.path)?;
    let result = filter_cri_log_by_stream(&mut file, settings.tail_lines, settings.stream)
        .with_context(|| format!("Failed to filter log file: {}", args.path.display()))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match settings.output {
        OutputFormat::Json => write_summary(&mut out, settings.stream, &result)?,
        OutputFormat::Raw => write_lines(&mut file, &result, &mut out, |line, out| {
            out.write_all(line)
        })?,
        OutputFormat::Content => write_lines(&mut file, &result, &mut out, write_content)?,
    }

    out.flush().context("Failed to write output")?;
    Ok(())
}

fn open_log(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Summary printed for `--output json`
#[derive(Serialize)]
struct Summary<'a> {
    stream: StreamType,
    processed_bytes: u64,
    max_log_length: u64,
    lines: Vec<&'a IndexItem>,
}

fn write_summary<W: Write>(out: &mut W, stream: StreamType, result: &LogFilterResult) -> Result<()> {
    let summary = Summary {
        stream,
        processed_bytes: result.processed_bytes(),
        max_log_length: result.max_log_length(),
        lines: result.index().iter().collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &summary).context("Failed to write summary")?;
    writeln!(out)?;
    Ok(())
}

fn write_lines<W, F>(file: &mut File, result: &LogFilterResult, out: &mut W, mut emit: F) -> Result<()>
where
    W: Write,
    F: FnMut(&[u8], &mut W) -> io::Result<()>,
{
    read_tail_lines(file, result, |line| emit(line, out)).map_err(|e| match e {
        TailReadError::Visitor(e) => anyhow::Error::new(e).context("Failed to write output"),
        TailReadError::Seek { offset, source } | TailReadError::Read { offset, source } => {
            anyhow::Error::new(source).context(format!("Failed to read log line at offset {offset}"))
        }
    })
}

/// Print the payload of a CRI line; partial fragments carry no newline, so
/// consecutive fragments print as one line
fn write_content<W: Write>(line: &[u8], out: &mut W) -> io::Result<()> {
    let msg = CriParser::parse(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    out.write_all(&msg.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_stream_arg() {
        assert_eq!(parse_stream("stderr"), Ok(StreamType::Stderr));
        assert!(parse_stream("both").is_err());
    }

    #[test]
    fn test_args_negative_tail() {
        let args = Args::try_parse_from(["critail", "-n", "-1", "pod.log"]).unwrap();
        assert_eq!(args.tail_lines, Some(-1));
        assert_eq!(args.path, PathBuf::from("pod.log"));
    }

    #[test]
    fn test_write_content_joins_partials() {
        let mut out = Vec::new();
        write_content(b"2024-01-15T10:30:00Z stdout P hello \n", &mut out).unwrap();
        write_content(b"2024-01-15T10:30:00Z stdout F world\n", &mut out).unwrap();
        assert_eq!(out, b"hello world\n");
    }

    #[test]
    fn test_write_content_full_lines() {
        let mut out = Vec::new();
        write_content(b"2024-01-15T10:30:00Z stdout F one\n", &mut out).unwrap();
        write_content(b"2024-01-15T10:30:01Z stdout F two\n", &mut out).unwrap();
        assert_eq!(out, b"one\ntwo\n");
    }

    #[test]
    fn test_write_content_invalid_line() {
        let mut out = Vec::new();
        let err = write_content(b"garbage\n", &mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_write_summary() {
        let log = "2024-01-15T10:30:00Z stdout F one\n2024-01-15T10:30:01Z stderr F two\n";
        let result = filter_cri_log_by_stream(Cursor::new(log), 10, StreamType::Stderr).unwrap();

        let mut out = Vec::new();
        write_summary(&mut out, StreamType::Stderr, &result).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["stream"], "stderr");
        assert_eq!(value["processed_bytes"], 68);
        assert_eq!(value["max_log_length"], 34);
        assert_eq!(value["lines"][0]["offset"], 34);
        assert_eq!(value["lines"][0]["length"], 34);
    }
}
