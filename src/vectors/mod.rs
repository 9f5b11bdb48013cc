//! Term-vector accumulation and serialization.
//!
//! For every (document, field) pair whose options request term vectors,
//! the indexing thread feeds one [`TermVectorsWriter::record_token`] call
//! per token into this module. When the field is done,
//! [`TermVectorsWriter::finish_field`] serializes the accumulated
//! postings into the document's [`DocumentVectorBuffer`], using the
//! following record layout:
//!
//! ```text
//! record  := posting_count:varint  flags:byte  posting*
//! posting := prefix_len:varint suffix_len:varint suffix:bytes
//!            freq:varint
//!            [freq position deltas, one varint each, if flags & 0x1]
//!            [offset (start delta, length) pairs, if flags & 0x2]
//! ```
//!
//! Terms are serialized in the order of the codec's term comparator and
//! front-coded against their predecessor. Positions and offset starts
//! are delta-coded: the first occurrence stores the absolute value,
//! every later occurrence stores the difference with the previous one.
//!
//! Deltas are assumed non-negative: the tokenization pipeline must feed
//! occurrences in non-decreasing position and offset order within a
//! document. This is a precondition, not something this module defends
//! against.

mod accumulator;
mod doc_buffer;
mod reader;
mod writer;

pub use self::accumulator::{Posting, TermVectorsAccumulator};
pub use self::doc_buffer::DocumentVectorBuffer;
pub use self::reader::{TermVectorEntry, TermVectorsReader};
pub use self::writer::TermVectorsWriter;

/// Bit of the record flag byte telling that positions are present.
pub const STORE_POSITIONS: u8 = 0x1;
/// Bit of the record flag byte telling that offsets are present.
pub const STORE_OFFSETS: u8 = 0x2;

/// Index of the position delta stream of a posting.
pub const POSITIONS_STREAM: usize = 0;
/// Index of the offset delta stream of a posting.
pub const OFFSETS_STREAM: usize = 1;
