use std::cmp::Ordering;
use std::io;
use std::io::{BufWriter, Write};

use crate::codec::standard::{check_header, write_header, INDEX_INTERVAL, TERMS_DICT_EXTENSION};
use crate::codec::{
    segment_file, CodecRole, SegmentReadState, SegmentWriteState, TermComparator, TermInfo,
    TermsDictReader, TermsDictWriter,
};
use crate::common::{common_prefix_len, BinarySerializable, CountingWriter, VInt};
use crate::directory::WritePtr;
use crate::error::Error;

/// Appends front-coded dictionary entries to the `term` file.
///
/// Entry layout: prefix length, suffix length, suffix bytes, then the
/// serialized [`TermInfo`]. The prefix is forced to zero on every
/// [`INDEX_INTERVAL`]-th entry, so that offsets handed out for those
/// entries are valid scan starting points.
pub struct StandardTermsDictWriter {
    wrt: CountingWriter<BufWriter<WritePtr>>,
    comparator: TermComparator,
    last_term: Vec<u8>,
    num_terms: u64,
}

impl StandardTermsDictWriter {
    pub fn open(
        state: &SegmentWriteState<'_>,
        comparator: TermComparator,
    ) -> crate::Result<StandardTermsDictWriter> {
        let path = segment_file(state.segment_name, TERMS_DICT_EXTENSION);
        let file = state.directory.open_write(&path)?;
        let mut wrt = BufWriter::with_capacity(state.buffer_size, file);
        write_header(&mut wrt)?;
        Ok(StandardTermsDictWriter {
            wrt: CountingWriter::wrap(wrt),
            comparator,
            last_term: Vec::new(),
            num_terms: 0,
        })
    }
}

impl TermsDictWriter for StandardTermsDictWriter {
    fn insert_term(&mut self, term: &[u8], term_info: &TermInfo) -> io::Result<u64> {
        if self.num_terms > 0 {
            assert_eq!(
                (self.comparator)(self.last_term.as_slice(), term),
                Ordering::Less,
                "dictionary terms must be inserted in increasing order"
            );
        }
        let entry_offset = self.wrt.written_bytes();
        let prefix_len = if self.num_terms % INDEX_INTERVAL as u64 == 0 {
            0
        } else {
            common_prefix_len(&self.last_term, term)
        };
        VInt(prefix_len as u64).serialize(&mut self.wrt)?;
        VInt((term.len() - prefix_len) as u64).serialize(&mut self.wrt)?;
        self.wrt.write_all(&term[prefix_len..])?;
        term_info.serialize(&mut self.wrt)?;
        self.last_term.clear();
        self.last_term.extend_from_slice(term);
        self.num_terms += 1;
        Ok(entry_offset)
    }
}

impl CodecRole for StandardTermsDictWriter {
    fn role_name(&self) -> &'static str {
        "terms dictionary writer"
    }

    fn close(&mut self) -> crate::Result<()> {
        self.wrt.flush()?;
        Ok(())
    }
}

/// Scans the dictionary from an offset produced by the terms index.
pub struct StandardTermsDictReader {
    body: Vec<u8>,
    comparator: TermComparator,
}

impl StandardTermsDictReader {
    pub fn open(
        state: &SegmentReadState<'_>,
        comparator: TermComparator,
    ) -> crate::Result<StandardTermsDictReader> {
        let path = segment_file(state.segment_name, TERMS_DICT_EXTENSION);
        let data = state.directory.open_read(&path)?;
        let mut cursor = &data[..];
        check_header(&mut cursor, &path)?;
        Ok(StandardTermsDictReader {
            body: cursor.to_vec(),
            comparator,
        })
    }
}

impl TermsDictReader for StandardTermsDictReader {
    fn seek_term(&self, term: &[u8], start_offset: u64) -> crate::Result<Option<TermInfo>> {
        let start = start_offset as usize;
        if start > self.body.len() {
            return Err(Error::DataCorruption(format!(
                "terms index points at offset {start} past the end of the dictionary"
            )));
        }
        let mut cursor = &self.body[start..];
        let mut current_term: Vec<u8> = Vec::new();
        while !cursor.is_empty() {
            let prefix_len = VInt::deserialize(&mut cursor)?.val() as usize;
            let suffix_len = VInt::deserialize(&mut cursor)?.val() as usize;
            if prefix_len > current_term.len() || suffix_len > cursor.len() {
                return Err(Error::DataCorruption(
                    "corrupted terms dictionary entry".to_string(),
                ));
            }
            current_term.truncate(prefix_len);
            current_term.extend_from_slice(&cursor[..suffix_len]);
            cursor = &cursor[suffix_len..];
            let term_info = TermInfo::deserialize(&mut cursor)?;
            match (self.comparator)(current_term.as_slice(), term) {
                Ordering::Less => {}
                Ordering::Equal => return Ok(Some(term_info)),
                Ordering::Greater => return Ok(None),
            }
        }
        Ok(None)
    }
}

impl CodecRole for StandardTermsDictReader {
    fn role_name(&self) -> &'static str {
        "terms dictionary reader"
    }

    fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{StandardTermsDictReader, StandardTermsDictWriter};
    use crate::codec::standard::INDEX_INTERVAL;
    use crate::codec::{
        lexicographic_order, CodecRole, SegmentReadState, SegmentWriteState, TermInfo,
        TermsDictReader, TermsDictWriter, DEFAULT_BUFFER_SIZE,
    };
    use crate::directory::RamDirectory;
    use crate::schema::FieldInfos;

    fn term_info(ord: u64) -> TermInfo {
        TermInfo {
            doc_freq: 1,
            postings_start: ord * 10,
            postings_len: 10,
        }
    }

    #[test]
    fn test_seek_from_interval_boundary() {
        let directory = RamDirectory::create();
        let field_infos = FieldInfos::default();
        let write_state = SegmentWriteState {
            directory: &directory,
            segment_name: "seg",
            field_infos: &field_infos,
            buffer_size: DEFAULT_BUFFER_SIZE,
        };
        let mut writer = StandardTermsDictWriter::open(&write_state, lexicographic_order).unwrap();
        let num_terms = 2 * INDEX_INTERVAL + 5;
        let mut boundary_offset = 0u64;
        for ord in 0..num_terms {
            let term = format!("term{ord:05}");
            let offset = writer
                .insert_term(term.as_bytes(), &term_info(ord as u64))
                .unwrap();
            if ord == INDEX_INTERVAL {
                boundary_offset = offset;
            }
        }
        writer.close().unwrap();
        let read_state = SegmentReadState {
            directory: &directory,
            segment_name: "seg",
            field_infos: &field_infos,
            buffer_size: DEFAULT_BUFFER_SIZE,
            index_divisor: 1,
        };
        let reader = StandardTermsDictReader::open(&read_state, lexicographic_order).unwrap();
        // Scan from the middle of the dictionary.
        let target = format!("term{:05}", INDEX_INTERVAL + 3);
        let found = reader
            .seek_term(target.as_bytes(), boundary_offset)
            .unwrap()
            .unwrap();
        assert_eq!(found, term_info(INDEX_INTERVAL as u64 + 3));
        // Scan from the beginning.
        let found = reader.seek_term(b"term00000", 0).unwrap().unwrap();
        assert_eq!(found, term_info(0));
        assert!(reader.seek_term(b"term00003a", 0).unwrap().is_none());
        assert!(reader.seek_term(b"zzz", 0).unwrap().is_none());
    }

    #[test]
    #[should_panic(expected = "increasing order")]
    fn test_out_of_order_insert_panics() {
        let directory = RamDirectory::create();
        let field_infos = FieldInfos::default();
        let write_state = SegmentWriteState {
            directory: &directory,
            segment_name: "seg",
            field_infos: &field_infos,
            buffer_size: DEFAULT_BUFFER_SIZE,
        };
        let mut writer = StandardTermsDictWriter::open(&write_state, lexicographic_order).unwrap();
        writer.insert_term(b"b", &term_info(0)).unwrap();
        writer.insert_term(b"a", &term_info(1)).unwrap();
    }
}
