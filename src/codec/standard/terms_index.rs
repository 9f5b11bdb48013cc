use std::cmp::Ordering;
use std::io;
use std::io::{BufWriter, Write};

use crate::codec::standard::{check_header, write_header, INDEX_INTERVAL, TERMS_INDEX_EXTENSION};
use crate::codec::{
    segment_file, CodecRole, SegmentReadState, SegmentWriteState, TermComparator,
    TermsIndexReader, TermsIndexWriter,
};
use crate::common::{BinarySerializable, VInt};
use crate::directory::WritePtr;
use crate::error::Error;

/// Samples every [`INDEX_INTERVAL`]-th term into the `termidx` file,
/// together with the offset of its dictionary entry.
pub struct StandardTermsIndexWriter {
    wrt: BufWriter<WritePtr>,
    num_terms: u64,
}

impl StandardTermsIndexWriter {
    pub fn open(state: &SegmentWriteState<'_>) -> crate::Result<StandardTermsIndexWriter> {
        let path = segment_file(state.segment_name, TERMS_INDEX_EXTENSION);
        let file = state.directory.open_write(&path)?;
        let mut wrt = BufWriter::with_capacity(state.buffer_size, file);
        write_header(&mut wrt)?;
        Ok(StandardTermsIndexWriter { wrt, num_terms: 0 })
    }
}

impl TermsIndexWriter for StandardTermsIndexWriter {
    fn index_term(&mut self, term: &[u8], dict_offset: u64) -> io::Result<()> {
        if self.num_terms % INDEX_INTERVAL as u64 == 0 {
            VInt(term.len() as u64).serialize(&mut self.wrt)?;
            self.wrt.write_all(term)?;
            VInt(dict_offset).serialize(&mut self.wrt)?;
        }
        self.num_terms += 1;
        Ok(())
    }
}

impl CodecRole for StandardTermsIndexWriter {
    fn role_name(&self) -> &'static str {
        "terms index writer"
    }

    fn close(&mut self) -> crate::Result<()> {
        self.wrt.flush()?;
        Ok(())
    }
}

/// In-memory table of the sampled terms, loaded at open.
pub struct StandardTermsIndexReader {
    samples: Vec<(Vec<u8>, u64)>,
    comparator: TermComparator,
}

impl StandardTermsIndexReader {
    /// `state.index_divisor` keeps only one sample out of that many, to
    /// trade lookup speed for memory.
    pub fn open(
        state: &SegmentReadState<'_>,
        comparator: TermComparator,
    ) -> crate::Result<StandardTermsIndexReader> {
        if state.index_divisor == 0 {
            return Err(Error::InvalidArgument(
                "index_divisor must be at least 1".to_string(),
            ));
        }
        let path = segment_file(state.segment_name, TERMS_INDEX_EXTENSION);
        let data = state.directory.open_read(&path)?;
        let mut cursor = &data[..];
        check_header(&mut cursor, &path)?;
        let mut samples: Vec<(Vec<u8>, u64)> = Vec::new();
        let mut sample_ord = 0usize;
        while !cursor.is_empty() {
            let term_len = VInt::deserialize(&mut cursor)?.val() as usize;
            if term_len > cursor.len() {
                return Err(Error::DataCorruption(format!(
                    "{path:?} ends in the middle of a sample"
                )));
            }
            let term = cursor[..term_len].to_vec();
            cursor = &cursor[term_len..];
            let dict_offset = VInt::deserialize(&mut cursor)?.val();
            if sample_ord % state.index_divisor == 0 {
                samples.push((term, dict_offset));
            }
            sample_ord += 1;
        }
        Ok(StandardTermsIndexReader {
            samples,
            comparator,
        })
    }
}

impl TermsIndexReader for StandardTermsIndexReader {
    fn floor_offset(&self, term: &[u8]) -> u64 {
        let num_smaller_or_equal = self
            .samples
            .partition_point(|(sample, _)| (self.comparator)(sample, term) != Ordering::Greater);
        if num_smaller_or_equal == 0 {
            0
        } else {
            self.samples[num_smaller_or_equal - 1].1
        }
    }
}

impl CodecRole for StandardTermsIndexReader {
    fn role_name(&self) -> &'static str {
        "terms index reader"
    }

    fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}
