//! The default codec.
//!
//! One segment is made of four files, all prefixed by the same header
//! (codec magic, codec name, format version):
//!
//! - `.freq` holds the postings of every term back to back, each a run
//!   of `(doc id delta, term frequency)` varint pairs.
//! - `.pos` is reserved for token positions and currently holds only
//!   the header.
//! - `.term` is the terms dictionary: front-coded terms, each followed
//!   by its serialized [`TermInfo`]. Front coding restarts on every
//!   [`INDEX_INTERVAL`]-th entry so that a scan can start there.
//! - `.termidx` samples every [`INDEX_INTERVAL`]-th term together with
//!   the offset of its dictionary entry.

mod postings;
mod terms_dict;
mod terms_index;

pub use self::postings::{StandardPostingsReader, StandardPostingsWriter};
pub use self::terms_dict::{StandardTermsDictReader, StandardTermsDictWriter};
pub use self::terms_index::{StandardTermsIndexReader, StandardTermsIndexWriter};

use std::io;
use std::io::Write;
use std::path::Path;

use crate::codec::{
    lexicographic_order, Codec, FieldsConsumer, FieldsProducer, PostingsReader, PostingsWriter,
    RoleStack, SegmentReadState, SegmentWriteState, TermComparator, TermsDictReader,
    TermsDictWriter, TermsIndexReader, TermsIndexWriter,
};
use crate::common::{BinarySerializable, VInt};
use crate::error::Error;

pub const POSTINGS_EXTENSION: &str = "freq";
pub const POSITIONS_EXTENSION: &str = "pos";
pub const TERMS_DICT_EXTENSION: &str = "term";
pub const TERMS_INDEX_EXTENSION: &str = "termidx";

const EXTENSIONS: [&str; 4] = [
    POSTINGS_EXTENSION,
    POSITIONS_EXTENSION,
    TERMS_DICT_EXTENSION,
    TERMS_INDEX_EXTENSION,
];

/// One dictionary entry out of `INDEX_INTERVAL` is sampled into the
/// terms index, and front coding restarts there.
pub(crate) const INDEX_INTERVAL: usize = 128;

const CODEC_MAGIC: u32 = 0x7175_6976;
const CODEC_NAME: &str = "standard";
const CODEC_VERSION: u32 = 1;

/// Writes the common file header. Offsets recorded by the roles are
/// relative to the first byte after it.
pub(crate) fn write_header<W: Write>(wrt: &mut W) -> io::Result<()> {
    CODEC_MAGIC.serialize(wrt)?;
    VInt(CODEC_NAME.len() as u64).serialize(wrt)?;
    wrt.write_all(CODEC_NAME.as_bytes())?;
    CODEC_VERSION.serialize(wrt)
}

/// Validates the header at the front of `data` and advances `data`
/// past it.
pub(crate) fn check_header(data: &mut &[u8], path: &Path) -> crate::Result<()> {
    let magic = u32::deserialize(data)?;
    if magic != CODEC_MAGIC {
        return Err(Error::DataCorruption(format!(
            "{path:?} does not start with the codec magic"
        )));
    }
    let name_len = VInt::deserialize(data)?.val() as usize;
    if name_len > data.len() {
        return Err(Error::DataCorruption(format!("{path:?} header truncated")));
    }
    let (name, remaining) = data.split_at(name_len);
    *data = remaining;
    if name != CODEC_NAME.as_bytes() {
        return Err(Error::DataCorruption(format!(
            "{path:?} was written by codec {:?}",
            String::from_utf8_lossy(name)
        )));
    }
    let version = u32::deserialize(data)?;
    if version != CODEC_VERSION {
        return Err(Error::DataCorruption(format!(
            "{path:?} has unsupported format version {version}"
        )));
    }
    Ok(())
}

/// The codec shipped with the crate.
#[derive(Clone)]
pub struct StandardCodec {
    comparator: TermComparator,
}

impl Default for StandardCodec {
    fn default() -> StandardCodec {
        StandardCodec {
            comparator: lexicographic_order,
        }
    }
}

impl StandardCodec {
    /// A codec ordering terms with a custom comparator. Segments must
    /// be read with the comparator they were written with.
    pub fn with_comparator(comparator: TermComparator) -> StandardCodec {
        StandardCodec { comparator }
    }

    pub fn comparator(&self) -> TermComparator {
        self.comparator
    }
}

impl Codec for StandardCodec {
    fn name(&self) -> &'static str {
        CODEC_NAME
    }

    fn fields_consumer(&self, state: &SegmentWriteState<'_>) -> crate::Result<FieldsConsumer> {
        let mut stack: RoleStack<
            Box<dyn PostingsWriter>,
            Box<dyn TermsIndexWriter>,
            Box<dyn TermsDictWriter>,
        > = RoleStack::default();
        stack.open_postings(
            StandardPostingsWriter::open(state)
                .map(|role| Box::new(role) as Box<dyn PostingsWriter>),
        )?;
        stack.open_terms_index(
            StandardTermsIndexWriter::open(state)
                .map(|role| Box::new(role) as Box<dyn TermsIndexWriter>),
        )?;
        stack.open_terms_dict(
            StandardTermsDictWriter::open(state, self.comparator)
                .map(|role| Box::new(role) as Box<dyn TermsDictWriter>),
        )?;
        let (postings, terms_index, terms_dict) = stack.into_roles();
        Ok(FieldsConsumer::new(
            postings,
            terms_index,
            terms_dict,
            self.comparator,
        ))
    }

    fn fields_producer(&self, state: &SegmentReadState<'_>) -> crate::Result<FieldsProducer> {
        let mut stack: RoleStack<
            Box<dyn PostingsReader>,
            Box<dyn TermsIndexReader>,
            Box<dyn TermsDictReader>,
        > = RoleStack::default();
        stack.open_postings(
            StandardPostingsReader::open(state)
                .map(|role| Box::new(role) as Box<dyn PostingsReader>),
        )?;
        stack.open_terms_index(
            StandardTermsIndexReader::open(state, self.comparator)
                .map(|role| Box::new(role) as Box<dyn TermsIndexReader>),
        )?;
        stack.open_terms_dict(
            StandardTermsDictReader::open(state, self.comparator)
                .map(|role| Box::new(role) as Box<dyn TermsDictReader>),
        )?;
        let (postings, terms_index, terms_dict) = stack.into_roles();
        Ok(FieldsProducer::new(postings, terms_index, terms_dict))
    }

    fn extensions(&self) -> &'static [&'static str] {
        &EXTENSIONS
    }
}
