//! Log processing for critail
//!
//! This crate locates the tail of one output stream in a container log file
//! without holding the file in memory, and reads those lines back.

mod buffer;
mod filter;
mod parser;
mod reader;

pub use buffer::{InvalidCapacity, Iter, RingIndex};
pub use filter::{FilterError, LogFilterResult, filter_cri_log_by_stream, filter_log_by_stream};
pub use parser::{CriParser, LineClassifier, ParseError};
pub use reader::{TailReadError, read_tail_lines};

// Re-export types used in our public API
pub use critail_types::{CriLogMessage, IndexItem, LogTag, StreamType};
