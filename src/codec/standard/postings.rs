use std::io;
use std::io::{BufWriter, Write};

use crate::codec::standard::{check_header, write_header, POSITIONS_EXTENSION, POSTINGS_EXTENSION};
use crate::codec::{
    segment_file, CodecRole, PostingsReader, PostingsWriter, SegmentReadState, SegmentWriteState,
    TermInfo,
};
use crate::common::{BinarySerializable, CountingWriter, VInt};
use crate::directory::WritePtr;
use crate::error::Error;
use crate::DocId;

/// Appends each term's postings to the `freq` file as a run of
/// `(doc id delta, term frequency)` varint pairs.
pub struct StandardPostingsWriter {
    freq_wrt: CountingWriter<BufWriter<WritePtr>>,
    positions_wrt: BufWriter<WritePtr>,
}

impl StandardPostingsWriter {
    pub fn open(state: &SegmentWriteState<'_>) -> crate::Result<StandardPostingsWriter> {
        let freq_path = segment_file(state.segment_name, POSTINGS_EXTENSION);
        let freq_file = state.directory.open_write(&freq_path)?;
        let mut freq_wrt = BufWriter::with_capacity(state.buffer_size, freq_file);
        write_header(&mut freq_wrt)?;
        let positions_path = segment_file(state.segment_name, POSITIONS_EXTENSION);
        let positions_file = state.directory.open_write(&positions_path)?;
        let mut positions_wrt = BufWriter::with_capacity(state.buffer_size, positions_file);
        write_header(&mut positions_wrt)?;
        Ok(StandardPostingsWriter {
            freq_wrt: CountingWriter::wrap(freq_wrt),
            positions_wrt,
        })
    }
}

impl PostingsWriter for StandardPostingsWriter {
    fn write_postings(&mut self, docs: &[(DocId, u32)]) -> io::Result<TermInfo> {
        let postings_start = self.freq_wrt.written_bytes();
        let mut last_doc = 0u32;
        for &(doc, term_freq) in docs {
            VInt(u64::from(doc - last_doc)).serialize(&mut self.freq_wrt)?;
            VInt(u64::from(term_freq)).serialize(&mut self.freq_wrt)?;
            last_doc = doc;
        }
        Ok(TermInfo {
            doc_freq: docs.len() as u32,
            postings_start,
            postings_len: self.freq_wrt.written_bytes() - postings_start,
        })
    }
}

impl CodecRole for StandardPostingsWriter {
    fn role_name(&self) -> &'static str {
        "postings writer"
    }

    fn close(&mut self) -> crate::Result<()> {
        self.freq_wrt.flush()?;
        self.positions_wrt.flush()?;
        Ok(())
    }
}

/// Decodes postings out of the byte range a [`TermInfo`] points at.
pub struct StandardPostingsReader {
    body: Vec<u8>,
}

impl StandardPostingsReader {
    pub fn open(state: &SegmentReadState<'_>) -> crate::Result<StandardPostingsReader> {
        let freq_path = segment_file(state.segment_name, POSTINGS_EXTENSION);
        let data = state.directory.open_read(&freq_path)?;
        let mut cursor = &data[..];
        check_header(&mut cursor, &freq_path)?;
        let body = cursor.to_vec();
        let positions_path = segment_file(state.segment_name, POSITIONS_EXTENSION);
        let positions_data = state.directory.open_read(&positions_path)?;
        let mut positions_cursor = &positions_data[..];
        check_header(&mut positions_cursor, &positions_path)?;
        Ok(StandardPostingsReader { body })
    }
}

impl PostingsReader for StandardPostingsReader {
    fn read_postings(&self, term_info: &TermInfo) -> crate::Result<Vec<(DocId, u32)>> {
        let start = term_info.postings_start as usize;
        let end = start + term_info.postings_len as usize;
        if end > self.body.len() || start > end {
            return Err(Error::DataCorruption(format!(
                "postings range {start}..{end} escapes the postings file"
            )));
        }
        let mut cursor = &self.body[start..end];
        // Each posting takes at least two bytes; an inflated count must
        // not drive the pre-allocation.
        let mut postings = Vec::with_capacity((term_info.doc_freq as usize).min(cursor.len() / 2));
        let mut doc: DocId = 0;
        for _ in 0..term_info.doc_freq {
            doc += VInt::deserialize(&mut cursor)?.val() as DocId;
            let term_freq = VInt::deserialize(&mut cursor)?.val() as u32;
            postings.push((doc, term_freq));
        }
        if !cursor.is_empty() {
            return Err(Error::DataCorruption(
                "trailing bytes after the last posting of a term".to_string(),
            ));
        }
        Ok(postings)
    }
}

impl CodecRole for StandardPostingsReader {
    fn role_name(&self) -> &'static str {
        "postings reader"
    }

    fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}
