use std::io::{self, Read, Seek, SeekFrom};

use thiserror::Error;

use crate::filter::LogFilterResult;

/// Errors from reading back the lines a filter pass retained
#[derive(Debug, Error)]
pub enum TailReadError<E> {
    #[error("seek to log line at offset {offset}: {source}")]
    Seek {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("read log line at offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Visitor(E),
}

/// Read every line indexed by `result` from `source`, oldest first
///
/// One buffer sized to the longest retained line is reused for every line.
/// `source` must be the same, unmodified file the filter pass scanned.
pub fn read_tail_lines<R, E, F>(
    mut source: R,
    result: &LogFilterResult,
    mut visitor: F,
) -> Result<(), TailReadError<E>>
where
    R: Read + Seek,
    F: FnMut(&[u8]) -> Result<(), E>,
{
    let mut buf = Vec::with_capacity(result.max_log_length() as usize);

    result.index().visit_all(|item| {
        source
            .seek(SeekFrom::Start(item.offset))
            .map_err(|source| TailReadError::Seek {
                offset: item.offset,
                source,
            })?;

        buf.resize(item.length as usize, 0);
        source
            .read_exact(&mut buf)
            .map_err(|source| TailReadError::Read {
                offset: item.offset,
                source,
            })?;

        visitor(&buf).map_err(TailReadError::Visitor)
    })
}
