use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

use thiserror::Error;
use tracing::{debug, trace};

use critail_types::{IndexItem, StreamType};

use crate::buffer::{InvalidCapacity, RingIndex};
use crate::parser::{CriParser, LineClassifier};

const EOL: u8 = b'\n';

/// Errors from scanning a log file for the tail of one stream
#[derive(Debug, Error)]
pub enum FilterError<E> {
    #[error("{op}: {source}")]
    Seek {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    InvalidCapacity(#[from] InvalidCapacity),

    #[error("read line: {0}")]
    Read(#[source] io::Error),

    /// The classifier rejected a line; its error is passed through as is
    #[error(transparent)]
    Classify(E),
}

/// Where the last lines of one stream live inside a log file
#[derive(Clone, Debug)]
pub struct LogFilterResult {
    index: RingIndex<IndexItem>,
    max_log_length: u64,
    processed_bytes: u64,
}

impl LogFilterResult {
    /// Offsets and lengths of the retained lines, oldest first
    pub fn index(&self) -> &RingIndex<IndexItem> {
        &self.index
    }

    /// Longest retained-stream line seen, 0 if nothing matched
    pub fn max_log_length(&self) -> u64 {
        self.max_log_length
    }

    /// Total bytes of every complete line scanned, of either stream
    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes
    }
}

/// Find the last `tail_lines` complete lines of `want` in `source`
///
/// Only offsets and lengths are kept, never line contents, so a very long
/// file or line costs no more memory than the index itself. The size of
/// `source` is measured once up front; a trailing line without its newline,
/// or one that extends past that size, is treated as still being written and
/// is left out of every count.
pub fn filter_log_by_stream<R, C>(
    mut source: R,
    tail_lines: i64,
    want: StreamType,
    classifier: &C,
) -> Result<LogFilterResult, FilterError<C::Error>>
where
    R: Read + Seek,
    C: LineClassifier + ?Sized,
{
    let cur_size = source
        .seek(SeekFrom::End(0))
        .map_err(|source| FilterError::Seek {
            op: "seek to end of log file",
            source,
        })?;
    source
        .seek(SeekFrom::Start(0))
        .map_err(|source| FilterError::Seek {
            op: "seek to front of log file",
            source,
        })?;

    let mut reader = BufReader::new(source);
    let mut index = RingIndex::new(tail_lines)?;

    let mut line = Vec::new();
    let mut read_bytes: u64 = 0;
    let mut processed_bytes: u64 = 0;
    let mut max_log_length: u64 = 0;

    loop {
        line.clear();
        let read = reader.read_until(EOL, &mut line);
        let line_length = line.len() as u64;
        read_bytes += line_length;

        let at_eof = read.is_ok() && line.last() != Some(&EOL);
        if at_eof || read_bytes > cur_size {
            if line_length > 0 {
                trace!(
                    offset = processed_bytes,
                    length = line_length,
                    "skipping incomplete line"
                );
            }
            break;
        }
        read.map_err(FilterError::Read)?;

        let stream = classifier.classify(&line).map_err(FilterError::Classify)?;
        if stream == want {
            max_log_length = max_log_length.max(line_length);
            index.add(IndexItem::new(processed_bytes, line_length));
        }
        processed_bytes += line_length;
    }

    debug!(
        stream = %want,
        size = cur_size,
        processed_bytes,
        retained = index.len(),
        max_log_length,
        "filtered log by stream"
    );

    Ok(LogFilterResult {
        index,
        max_log_length,
        processed_bytes,
    })
}

/// [`filter_log_by_stream`] for files in the CRI container log format
pub fn filter_cri_log_by_stream<R>(
    source: R,
    tail_lines: i64,
    want: StreamType,
) -> Result<LogFilterResult, FilterError<crate::ParseError>>
where
    R: Read + Seek,
{
    filter_log_by_stream(source, tail_lines, want, &CriParser)
}
