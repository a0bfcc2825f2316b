use chrono::{DateTime, Utc};
use thiserror::Error;

use critail_types::{CriLogMessage, LogTag, StreamType};

/// Separates the fields of a CRI log line
const DELIMITER: u8 = b' ';

/// Separates multiple tags in the tag field
const TAG_DELIMITER: u8 = b':';

const EOL: u8 = b'\n';

/// Errors from parsing a CRI log line
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("timestamp is not found")]
    TimestampNotFound,

    #[error("unexpected timestamp format {raw:?}: {source}")]
    InvalidTimestamp {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("stream type is not found")]
    StreamNotFound,

    #[error("unexpected stream type {0:?}")]
    UnexpectedStream(String),

    #[error("log tag is not found")]
    TagNotFound,
}

/// Classifies a complete log line by the stream it was written to
pub trait LineClassifier {
    type Error;

    fn classify(&self, line: &[u8]) -> Result<StreamType, Self::Error>;
}

impl<F, E> LineClassifier for F
where
    F: Fn(&[u8]) -> Result<StreamType, E>,
{
    type Error = E;

    fn classify(&self, line: &[u8]) -> Result<StreamType, E> {
        self(line)
    }
}

/// Parser for the CRI container log format
///
/// A line looks like `2024-01-15T10:30:00.123456789Z stdout F message\n`:
/// timestamp, stream, tags, then the payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct CriParser;

impl CriParser {
    /// Extract only the stream field, without validating the timestamp
    pub fn extract_stream(line: &[u8]) -> Result<StreamType, ParseError> {
        let (_, rest) = split_field(line).ok_or(ParseError::TimestampNotFound)?;
        let (stream, _) = split_field(rest).ok_or(ParseError::StreamNotFound)?;
        parse_stream(stream)
    }

    /// Parse a whole log line
    pub fn parse(line: &[u8]) -> Result<CriLogMessage, ParseError> {
        let (raw_ts, rest) = split_field(line).ok_or(ParseError::TimestampNotFound)?;
        let timestamp = parse_timestamp(raw_ts)?;

        let (stream, rest) = split_field(rest).ok_or(ParseError::StreamNotFound)?;
        let stream = parse_stream(stream)?;

        let (tags, content) = split_field(rest).ok_or(ParseError::TagNotFound)?;
        // Only the first tag is meaningful; later ones are reserved
        let first_tag = tags.split(|b| *b == TAG_DELIMITER).next().unwrap_or_default();
        let tag = LogTag::from_bytes(first_tag);

        // A partial line's newline was added by the runtime, not the container
        let content = if tag.is_partial() {
            content.strip_suffix(&[EOL]).unwrap_or(content)
        } else {
            content
        };

        Ok(CriLogMessage {
            timestamp,
            stream,
            tag,
            content: content.to_vec(),
        })
    }
}

impl LineClassifier for CriParser {
    type Error = ParseError;

    fn classify(&self, line: &[u8]) -> Result<StreamType, ParseError> {
        Self::extract_stream(line)
    }
}

/// Split at the first delimiter, dropping the delimiter itself
fn split_field(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let idx = line.iter().position(|b| *b == DELIMITER)?;
    Some((&line[..idx], &line[idx + 1..]))
}

fn parse_stream(raw: &[u8]) -> Result<StreamType, ParseError> {
    StreamType::from_bytes(raw)
        .ok_or_else(|| ParseError::UnexpectedStream(String::from_utf8_lossy(raw).into_owned()))
}

fn parse_timestamp(raw: &[u8]) -> Result<DateTime<Utc>, ParseError> {
    let text = String::from_utf8_lossy(raw);
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|source| ParseError::InvalidTimestamp {
            raw: text.into_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_stream() {
        let line = b"2024-01-15T10:30:00.123456789Z stderr F boom\n";
        assert_eq!(CriParser::extract_stream(line).unwrap(), StreamType::Stderr);

        let line = b"2024-01-15T10:30:00Z stdout P part";
        assert_eq!(CriParser::extract_stream(line).unwrap(), StreamType::Stdout);
    }

    #[test]
    fn test_extract_stream_errors() {
        assert!(matches!(
            CriParser::extract_stream(b"no-delimiter\n"),
            Err(ParseError::TimestampNotFound)
        ));
        assert!(matches!(
            CriParser::extract_stream(b"2024-01-15T10:30:00Z stdout"),
            Err(ParseError::StreamNotFound)
        ));
        match CriParser::extract_stream(b"2024-01-15T10:30:00Z stdin F x\n") {
            Err(ParseError::UnexpectedStream(s)) => assert_eq!(s, "stdin"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_full_line() {
        let msg = CriParser::parse(b"2024-01-15T10:30:00.5Z stdout F hello world\n").unwrap();
        assert_eq!(msg.stream, StreamType::Stdout);
        assert_eq!(msg.tag, LogTag::Full);
        assert_eq!(msg.content, b"hello world\n");
        let expected = DateTime::parse_from_rfc3339("2024-01-15T10:30:00.5Z").unwrap();
        assert_eq!(msg.timestamp, expected.with_timezone(&Utc));
    }

    #[test]
    fn test_parse_partial_trims_newline() {
        let msg = CriParser::parse(b"2024-01-15T10:30:00Z stderr P:x first half\n").unwrap();
        assert!(msg.tag.is_partial());
        assert_eq!(msg.content, b"first half");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            CriParser::parse(b"yesterday stdout F x\n"),
            Err(ParseError::InvalidTimestamp { .. })
        ));
        assert!(matches!(
            CriParser::parse(b"2024-01-15T10:30:00Z stdout"),
            Err(ParseError::StreamNotFound)
        ));
        assert!(matches!(
            CriParser::parse(b"2024-01-15T10:30:00Z stdout F"),
            Err(ParseError::TagNotFound)
        ));
    }

    #[test]
    fn test_parse_multibyte_content() {
        let line = "2024-01-15T10:30:00Z stdout F ╭──╮\n".as_bytes();
        let msg = CriParser::parse(line).unwrap();
        assert_eq!(msg.content_lossy(), "╭──╮\n");
    }

    #[test]
    fn test_closure_classifier() {
        let classify = |line: &[u8]| match line.first() {
            Some(b'E') => Ok(StreamType::Stderr),
            Some(_) => Ok(StreamType::Stdout),
            None => Err("empty"),
        };
        assert_eq!(classify.classify(b"E:x"), Ok(StreamType::Stderr));
        assert_eq!(classify.classify(b""), Err("empty"));
    }
}
