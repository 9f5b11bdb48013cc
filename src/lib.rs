//! # quiver
//!
//! A term-vector indexing core.
//!
//! The crate covers two concerns of an inverted-index writer:
//!
//! - the [`vectors`] module accumulates per-term occurrence data
//!   (frequency, positions, character offsets) for one field of one
//!   document, and serializes it into a compact on-disk record: terms are
//!   front-coded in sorted order, positions and offsets are delta-coded
//!   varints.
//! - the [`codec`] module composes the three on-disk format roles of a
//!   segment (postings, terms index, terms dictionary) into a single
//!   writer or reader facade, guaranteeing that a failure while opening
//!   any role closes every role opened before it.
//!
//! Indexing is single-writer per document: one thread owns a
//! [`vectors::TermVectorsWriter`] and its document buffer for the duration
//! of a document. Codec assemblies for different segments are independent
//! and may run concurrently.

#[macro_use]
extern crate log;

pub mod codec;
pub mod common;
pub mod directory;
mod error;
pub mod schema;
pub mod stacker;
pub mod vectors;

pub use crate::error::Error;

/// `quiver` result type, used by all fallible crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A document id, local to one segment.
pub type DocId = u32;

pub use crate::codec::{Codec, StandardCodec};
pub use crate::schema::{Field, VectorOptions};
pub use crate::vectors::{DocumentVectorBuffer, TermVectorsWriter};
