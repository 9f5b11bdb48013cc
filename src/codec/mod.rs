//! Composition of the on-disk format roles of a segment.
//!
//! A codec splits the inverted index of a segment across three roles:
//! the postings lists, the terms dictionary mapping each term to a
//! [`TermInfo`], and a sampled terms index used to bound dictionary
//! scans. [`Codec::fields_consumer`] and [`Codec::fields_producer`]
//! assemble the three roles into a single facade.
//!
//! Opening a role can fail, and roles hold resources from the moment
//! they are opened. Assembly therefore goes through a [`RoleStack`]
//! that records every successfully opened role; if a later stage fails,
//! the stack closes the already-opened roles in reverse order and hands
//! back the error of the stage that failed. Close errors on that path
//! are logged and dropped so the caller always sees the original
//! failure.

pub mod standard;

pub use self::standard::StandardCodec;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::io;
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::common::{BinarySerializable, VInt};
use crate::directory::Directory;
use crate::schema::FieldInfos;
use crate::DocId;

/// Total order on term bytes, shared by the term-vector serializer and
/// all three codec roles of a segment.
pub type TermComparator = fn(&[u8], &[u8]) -> Ordering;

/// The default term order.
pub fn lexicographic_order(left: &[u8], right: &[u8]) -> Ordering {
    left.cmp(right)
}

/// Dictionary entry of one term: its document frequency and the
/// location of its postings within the postings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermInfo {
    pub doc_freq: u32,
    pub postings_start: u64,
    pub postings_len: u64,
}

impl BinarySerializable for TermInfo {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        VInt(u64::from(self.doc_freq)).serialize(writer)?;
        VInt(self.postings_start).serialize(writer)?;
        VInt(self.postings_len).serialize(writer)
    }

    fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
        let doc_freq = VInt::deserialize(reader)?.val() as u32;
        let postings_start = VInt::deserialize(reader)?.val();
        let postings_len = VInt::deserialize(reader)?.val();
        Ok(TermInfo {
            doc_freq,
            postings_start,
            postings_len,
        })
    }
}

/// Common surface of every codec role.
///
/// `close` flushes and releases whatever the role holds. A role must
/// tolerate being closed right after opening, without any writes.
pub trait CodecRole {
    /// Role label used in teardown logs.
    fn role_name(&self) -> &'static str;

    fn close(&mut self) -> crate::Result<()>;
}

impl<T: CodecRole + ?Sized> CodecRole for Box<T> {
    fn role_name(&self) -> &'static str {
        (**self).role_name()
    }

    fn close(&mut self) -> crate::Result<()> {
        (**self).close()
    }
}

/// Writes the postings of one term and locates them with a
/// [`TermInfo`].
pub trait PostingsWriter: CodecRole {
    /// `docs` holds `(doc id, term frequency)` pairs in increasing doc
    /// id order.
    fn write_postings(&mut self, docs: &[(DocId, u32)]) -> io::Result<TermInfo>;
}

/// Samples terms into the terms index. Called once per term, in term
/// order; implementations decide which calls leave a mark.
pub trait TermsIndexWriter: CodecRole {
    fn index_term(&mut self, term: &[u8], dict_offset: u64) -> io::Result<()>;
}

/// Appends dictionary entries in term order.
pub trait TermsDictWriter: CodecRole {
    /// Returns the offset of the entry within the dictionary data, fit
    /// for [`TermsDictReader::seek_term`].
    fn insert_term(&mut self, term: &[u8], term_info: &TermInfo) -> io::Result<u64>;
}

/// Decodes postings located by a [`TermInfo`].
pub trait PostingsReader: CodecRole {
    fn read_postings(&self, term_info: &TermInfo) -> crate::Result<Vec<(DocId, u32)>>;
}

/// Maps a target term to a dictionary offset at or before the term's
/// entry.
pub trait TermsIndexReader: CodecRole {
    fn floor_offset(&self, term: &[u8]) -> u64;
}

/// Scans the dictionary for an exact term, starting from an offset
/// produced by the terms index.
pub trait TermsDictReader: CodecRole {
    fn seek_term(&self, term: &[u8], start_offset: u64) -> crate::Result<Option<TermInfo>>;
}

/// Buffer size handed to codec roles when the caller has no opinion.
pub const DEFAULT_BUFFER_SIZE: usize = 16_384;

/// Everything a codec needs to create the write side of a segment.
pub struct SegmentWriteState<'a> {
    pub directory: &'a dyn Directory,
    pub segment_name: &'a str,
    pub field_infos: &'a FieldInfos,
    /// Write buffer size, in bytes, for each role's output file.
    pub buffer_size: usize,
}

/// Everything a codec needs to open the read side of a segment.
pub struct SegmentReadState<'a> {
    pub directory: &'a dyn Directory,
    pub segment_name: &'a str,
    pub field_infos: &'a FieldInfos,
    /// Read buffer size, in bytes. Roles that load files whole may
    /// ignore it.
    pub buffer_size: usize,
    /// Keep only every n-th terms index sample. 1 keeps them all.
    pub index_divisor: usize,
}

/// Path of one component file of a segment.
pub fn segment_file(segment_name: &str, extension: &str) -> PathBuf {
    PathBuf::from(format!("{segment_name}.{extension}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Postings,
    TermsIndex,
    TermsDict,
}

/// Teardown list used while assembling the three roles of a segment.
///
/// Roles are opened in a fixed order. Each `open_*` call either records
/// the role, or, on failure, closes every previously recorded role in
/// reverse order and returns the error unchanged.
pub struct RoleStack<P, I, D> {
    postings: Option<P>,
    terms_index: Option<I>,
    terms_dict: Option<D>,
    opened: Vec<Stage>,
}

impl<P: CodecRole, I: CodecRole, D: CodecRole> Default for RoleStack<P, I, D> {
    fn default() -> Self {
        RoleStack {
            postings: None,
            terms_index: None,
            terms_dict: None,
            opened: Vec::with_capacity(3),
        }
    }
}

impl<P: CodecRole, I: CodecRole, D: CodecRole> RoleStack<P, I, D> {
    pub fn open_postings(&mut self, postings: crate::Result<P>) -> crate::Result<()> {
        match postings {
            Ok(role) => {
                self.postings = Some(role);
                self.opened.push(Stage::Postings);
                Ok(())
            }
            Err(err) => {
                self.unwind();
                Err(err)
            }
        }
    }

    pub fn open_terms_index(&mut self, terms_index: crate::Result<I>) -> crate::Result<()> {
        match terms_index {
            Ok(role) => {
                self.terms_index = Some(role);
                self.opened.push(Stage::TermsIndex);
                Ok(())
            }
            Err(err) => {
                self.unwind();
                Err(err)
            }
        }
    }

    pub fn open_terms_dict(&mut self, terms_dict: crate::Result<D>) -> crate::Result<()> {
        match terms_dict {
            Ok(role) => {
                self.terms_dict = Some(role);
                self.opened.push(Stage::TermsDict);
                Ok(())
            }
            Err(err) => {
                self.unwind();
                Err(err)
            }
        }
    }

    /// Hands the three roles over once all of them opened.
    pub fn into_roles(mut self) -> (P, I, D) {
        let postings = self.postings.take();
        let terms_index = self.terms_index.take();
        let terms_dict = self.terms_dict.take();
        match (postings, terms_index, terms_dict) {
            (Some(postings), Some(terms_index), Some(terms_dict)) => {
                (postings, terms_index, terms_dict)
            }
            _ => panic!("into_roles called before all three roles opened"),
        }
    }

    fn unwind(&mut self) {
        while let Some(stage) = self.opened.pop() {
            let close_result = match stage {
                Stage::Postings => self.postings.take().map(|mut role| {
                    let result = role.close();
                    (role.role_name(), result)
                }),
                Stage::TermsIndex => self.terms_index.take().map(|mut role| {
                    let result = role.close();
                    (role.role_name(), result)
                }),
                Stage::TermsDict => self.terms_dict.take().map(|mut role| {
                    let result = role.close();
                    (role.role_name(), result)
                }),
            };
            if let Some((role_name, Err(close_err))) = close_result {
                warn!("failed to close {role_name} while unwinding: {close_err}");
            }
        }
    }
}

/// Write facade over a fully assembled segment: postings writer, terms
/// index writer and terms dictionary writer.
pub struct FieldsConsumer {
    postings: Box<dyn PostingsWriter>,
    terms_index: Box<dyn TermsIndexWriter>,
    terms_dict: Box<dyn TermsDictWriter>,
    comparator: TermComparator,
    last_term: Vec<u8>,
    num_terms: u64,
}

impl FieldsConsumer {
    pub fn new(
        postings: Box<dyn PostingsWriter>,
        terms_index: Box<dyn TermsIndexWriter>,
        terms_dict: Box<dyn TermsDictWriter>,
        comparator: TermComparator,
    ) -> FieldsConsumer {
        FieldsConsumer {
            postings,
            terms_index,
            terms_dict,
            comparator,
            last_term: Vec::new(),
            num_terms: 0,
        }
    }

    /// Adds one term with its postings.
    ///
    /// Terms must arrive in strictly increasing comparator order.
    pub fn add_term(&mut self, term: &[u8], docs: &[(DocId, u32)]) -> crate::Result<TermInfo> {
        if self.num_terms > 0 {
            assert_eq!(
                (self.comparator)(self.last_term.as_slice(), term),
                Ordering::Less,
                "terms must be added in increasing order"
            );
        }
        let term_info = self.postings.write_postings(docs)?;
        let dict_offset = self.terms_dict.insert_term(term, &term_info)?;
        self.terms_index.index_term(term, dict_offset)?;
        self.last_term.clear();
        self.last_term.extend_from_slice(term);
        self.num_terms += 1;
        Ok(term_info)
    }

    pub fn num_terms(&self) -> u64 {
        self.num_terms
    }

    /// Closes the roles in reverse opening order. Every role is closed
    /// even if an earlier one fails; the first error is returned.
    pub fn close(mut self) -> crate::Result<()> {
        close_all([
            &mut self.terms_dict as &mut dyn CodecRole,
            &mut self.terms_index,
            &mut self.postings,
        ])
    }
}

/// Read facade over a fully assembled segment.
pub struct FieldsProducer {
    postings: Box<dyn PostingsReader>,
    terms_index: Box<dyn TermsIndexReader>,
    terms_dict: Box<dyn TermsDictReader>,
}

impl FieldsProducer {
    pub fn new(
        postings: Box<dyn PostingsReader>,
        terms_index: Box<dyn TermsIndexReader>,
        terms_dict: Box<dyn TermsDictReader>,
    ) -> FieldsProducer {
        FieldsProducer {
            postings,
            terms_index,
            terms_dict,
        }
    }

    /// Looks a term up in the dictionary.
    pub fn term_info(&self, term: &[u8]) -> crate::Result<Option<TermInfo>> {
        let start_offset = self.terms_index.floor_offset(term);
        self.terms_dict.seek_term(term, start_offset)
    }

    /// Decodes the postings of `term`, or `None` if the term is absent.
    pub fn read_postings(&self, term: &[u8]) -> crate::Result<Option<Vec<(DocId, u32)>>> {
        match self.term_info(term)? {
            Some(term_info) => Ok(Some(self.postings.read_postings(&term_info)?)),
            None => Ok(None),
        }
    }

    /// Closes the roles in reverse opening order. Every role is closed
    /// even if an earlier one fails; the first error is returned.
    pub fn close(mut self) -> crate::Result<()> {
        close_all([
            &mut self.terms_dict as &mut dyn CodecRole,
            &mut self.terms_index,
            &mut self.postings,
        ])
    }
}

/// Closes every role, even when one of them fails. The first error is
/// kept and returned; later ones are logged and dropped.
fn close_all(roles: [&mut dyn CodecRole; 3]) -> crate::Result<()> {
    let mut first_err: Option<crate::Error> = None;
    for role in roles {
        if let Err(err) = role.close() {
            if first_err.is_some() {
                warn!("failed to close {}: {err}", role.role_name());
            } else {
                first_err = Some(err);
            }
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// An on-disk format for the term component of a segment.
pub trait Codec {
    fn name(&self) -> &'static str;

    /// Assembles the write side of a segment, leak free: a failure at
    /// any stage closes the roles opened by the previous stages.
    fn fields_consumer(&self, state: &SegmentWriteState<'_>) -> crate::Result<FieldsConsumer>;

    /// Assembles the read side of a segment, with the same guarantee.
    fn fields_producer(&self, state: &SegmentReadState<'_>) -> crate::Result<FieldsProducer>;

    /// File name extensions used by this codec, in role order.
    fn extensions(&self) -> &'static [&'static str];

    /// The set of files making up `segment_name` under this codec.
    fn files(&self, segment_name: &str) -> HashSet<String> {
        self.extensions()
            .iter()
            .map(|extension| format!("{segment_name}.{extension}"))
            .collect()
    }
}
