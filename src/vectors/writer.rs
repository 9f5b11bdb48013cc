use std::io;
use std::io::Write;

use fail::fail_point;

use crate::codec::TermComparator;
use crate::common::{common_prefix_len, BinarySerializable, VInt};
use crate::schema::{Field, FieldInfos, VectorOptions};
use crate::vectors::{
    DocumentVectorBuffer, TermVectorsAccumulator, OFFSETS_STREAM, POSITIONS_STREAM,
    STORE_OFFSETS, STORE_POSITIONS,
};
use crate::DocId;

/// Per-field inversion state. Lives across documents; only the
/// accumulator content is per-document.
struct TermVectorsFieldWriter {
    accumulator: TermVectorsAccumulator,
    do_vectors: bool,
    do_positions: bool,
    do_offsets: bool,
    max_num_postings: usize,
}

impl TermVectorsFieldWriter {
    fn new() -> TermVectorsFieldWriter {
        TermVectorsFieldWriter {
            accumulator: TermVectorsAccumulator::default(),
            do_vectors: false,
            do_positions: false,
            do_offsets: false,
            max_num_postings: 0,
        }
    }

    /// Writes the field's term vector record.
    ///
    /// The accumulator is left untouched, so that a failed write can be
    /// detected and discarded at the next `start_field`.
    fn serialize<W: Write>(
        &self,
        comparator: TermComparator,
        scratch: &mut Vec<u8>,
        wrt: &mut W,
    ) -> io::Result<()> {
        fail_point!("TermVectorsFieldWriter::serialize", |msg: Option<String>| {
            Err(io::Error::new(io::ErrorKind::Other, format!("{msg:?}")))
        });
        VInt(self.accumulator.num_postings() as u64).serialize(wrt)?;
        let mut flags = 0u8;
        if self.do_positions {
            flags |= STORE_POSITIONS;
        }
        if self.do_offsets {
            flags |= STORE_OFFSETS;
        }
        wrt.write_all(&[flags])?;
        let mut last_term: &[u8] = &[];
        for (term, posting_id) in self.accumulator.sorted_postings(comparator) {
            let prefix_len = common_prefix_len(last_term, term);
            VInt(prefix_len as u64).serialize(wrt)?;
            VInt((term.len() - prefix_len) as u64).serialize(wrt)?;
            wrt.write_all(&term[prefix_len..])?;
            VInt(self.accumulator.posting(posting_id).freq() as u64).serialize(wrt)?;
            if self.do_positions {
                self.accumulator
                    .read_stream(posting_id, POSITIONS_STREAM, scratch);
                wrt.write_all(scratch)?;
            }
            if self.do_offsets {
                self.accumulator
                    .read_stream(posting_id, OFFSETS_STREAM, scratch);
                wrt.write_all(scratch)?;
            }
            last_term = term;
        }
        Ok(())
    }
}

/// Accumulates and serializes term vectors, one field at a time, for
/// one document at a time.
///
/// A single writer owns all of a document's fields. The expected call
/// sequence per document is `start_field` / `record_token`* /
/// `finish_field` for each vectored field, closed by `finish_doc` (or
/// `abort_doc`).
pub struct TermVectorsWriter {
    per_field: Vec<TermVectorsFieldWriter>,
    doc: Option<DocumentVectorBuffer>,
    comparator: TermComparator,
    scratch: Vec<u8>,
}

impl TermVectorsWriter {
    pub fn new(field_infos: &FieldInfos, comparator: TermComparator) -> TermVectorsWriter {
        let per_field = (0..field_infos.num_fields())
            .map(|_| TermVectorsFieldWriter::new())
            .collect();
        TermVectorsWriter {
            per_field,
            doc: None,
            comparator,
            scratch: Vec::new(),
        }
    }

    /// Begins the inversion of `field` within document `doc_id`.
    ///
    /// The flags of every options instance attached to the field are
    /// OR-ed together. Returns true iff the field stores term vectors,
    /// in which case every token of the field must be fed through
    /// [`Self::record_token`].
    pub fn start_field(&mut self, doc_id: DocId, field: Field, options: &[VectorOptions]) -> bool {
        let field_writer = &mut self.per_field[field.field_id() as usize];
        field_writer.do_vectors = false;
        field_writer.do_positions = false;
        field_writer.do_offsets = false;
        for opts in options {
            if opts.is_indexed() && opts.vectors_stored() {
                field_writer.do_vectors = true;
                field_writer.do_positions |= opts.positions_stored();
                field_writer.do_offsets |= opts.offsets_stored();
            }
        }
        if !field_writer.do_vectors {
            return false;
        }
        match self.doc {
            Some(ref doc) => {
                debug_assert_eq!(doc.doc_id(), doc_id);
            }
            None => {
                self.doc = Some(DocumentVectorBuffer::new(doc_id));
            }
        }
        if field_writer.accumulator.num_postings() != 0 {
            // Left over from a field whose serialization failed, or
            // from an aborted document.
            debug!(
                "discarding {} stale postings of field {:?}",
                field_writer.accumulator.num_postings(),
                field
            );
            field_writer.accumulator.reset();
        }
        true
    }

    /// Records one token occurrence.
    ///
    /// Positions and offsets must be non-decreasing across the calls
    /// for one field.
    pub fn record_token(
        &mut self,
        field: Field,
        term: &[u8],
        position: u32,
        start_offset: u32,
        end_offset: u32,
    ) {
        let field_writer = &mut self.per_field[field.field_id() as usize];
        debug_assert!(field_writer.do_vectors);
        let (posting_id, created) = field_writer.accumulator.upsert(term);
        let length = end_offset - start_offset;
        if created {
            field_writer.accumulator.posting_mut(posting_id).freq = 1;
            if field_writer.do_positions {
                field_writer
                    .accumulator
                    .append(posting_id, POSITIONS_STREAM, position);
            }
            if field_writer.do_offsets {
                field_writer
                    .accumulator
                    .append(posting_id, OFFSETS_STREAM, start_offset);
                field_writer
                    .accumulator
                    .append(posting_id, OFFSETS_STREAM, length);
            }
        } else {
            let (last_position, last_offset) = {
                let posting = field_writer.accumulator.posting_mut(posting_id);
                posting.freq += 1;
                (posting.last_position, posting.last_offset)
            };
            if field_writer.do_positions {
                field_writer
                    .accumulator
                    .append(posting_id, POSITIONS_STREAM, position - last_position);
            }
            if field_writer.do_offsets {
                field_writer
                    .accumulator
                    .append(posting_id, OFFSETS_STREAM, start_offset - last_offset);
                field_writer
                    .accumulator
                    .append(posting_id, OFFSETS_STREAM, length);
            }
        }
        let posting = field_writer.accumulator.posting_mut(posting_id);
        posting.last_position = position;
        posting.last_offset = end_offset;
    }

    /// Completes the inversion of `field`: serializes its record into
    /// the document buffer and recycles the accumulator.
    ///
    /// A field with zero postings writes nothing and does not appear in
    /// the document's field list. On error the accumulator is left as
    /// is and will be discarded by the next `start_field` on the same
    /// field.
    pub fn finish_field(&mut self, field: Field) -> io::Result<()> {
        let field_writer = &mut self.per_field[field.field_id() as usize];
        if !field_writer.do_vectors || field_writer.accumulator.num_postings() == 0 {
            return Ok(());
        }
        field_writer.max_num_postings = field_writer
            .max_num_postings
            .max(field_writer.accumulator.num_postings());
        let doc = self
            .doc
            .as_mut()
            .expect("start_field opens the document buffer before finish_field can run");
        field_writer.serialize(self.comparator, &mut self.scratch, doc.buffer_mut())?;
        doc.add_field(field);
        field_writer.accumulator.reset();
        Ok(())
    }

    /// Hands over the finished document, or `None` if no field of the
    /// document stored vectors.
    pub fn finish_doc(&mut self) -> Option<DocumentVectorBuffer> {
        self.doc.take()
    }

    /// Drops the current document. Accumulators that still hold
    /// postings are lazily discarded by the next `start_field`.
    pub fn abort_doc(&mut self) {
        self.doc = None;
    }

    /// Trims accumulation structures between documents. Hash tables are
    /// resized down to the largest posting count each field has seen.
    pub fn shrink(&mut self) {
        for field_writer in &mut self.per_field {
            field_writer.accumulator.reset();
            field_writer
                .accumulator
                .shrink_to(field_writer.max_num_postings);
            field_writer.max_num_postings = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TermVectorsWriter;
    use crate::codec::lexicographic_order;
    use crate::schema::{FieldInfos, VectorOptions};
    use crate::vectors::TermVectorsReader;

    fn full_options() -> VectorOptions {
        VectorOptions::default()
            .set_indexed()
            .set_vectors()
            .set_positions()
            .set_offsets()
    }

    fn writer_with_one_field(options: VectorOptions) -> (TermVectorsWriter, crate::schema::Field) {
        let mut field_infos = FieldInfos::default();
        let field = field_infos.add_field("body", options);
        (
            TermVectorsWriter::new(&field_infos, lexicographic_order),
            field,
        )
    }

    #[test]
    fn test_exact_record_bytes() {
        let (mut writer, field) = writer_with_one_field(full_options());
        assert!(writer.start_field(0, field, &[full_options()]));
        writer.record_token(field, b"the", 0, 0, 3);
        writer.record_token(field, b"quick", 2, 4, 9);
        writer.record_token(field, b"the", 4, 15, 18);
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        assert_eq!(doc.fields(), &[field]);
        let expected: Vec<u8> = vec![
            2,    // posting count
            3,    // flags: positions | offsets
            0, 5, // "quick": no shared prefix
            b'q', b'u', b'i', b'c', b'k',
            1, // freq
            2, // position 2
            4, 5, // offset (4, len 5)
            0, 3, // "the": no prefix shared with "quick"
            b't', b'h', b'e',
            2, // freq
            0, 4, // positions 0, then delta 4
            0, 3, // offset (0, len 3)
            12, 3, // start delta 15 - 3 = 12, len 3
        ];
        assert_eq!(doc.vector_data(), &expected[..]);
    }

    #[test]
    fn test_record_roundtrip() {
        let (mut writer, field) = writer_with_one_field(full_options());
        assert!(writer.start_field(7, field, &[full_options()]));
        writer.record_token(field, b"apple", 0, 0, 5);
        writer.record_token(field, b"applesauce", 1, 6, 16);
        writer.record_token(field, b"apple", 2, 17, 22);
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        assert_eq!(doc.doc_id(), 7);
        let mut reader = TermVectorsReader::new(doc.vector_data());
        let entries = reader.read_record().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].term, b"apple");
        assert_eq!(entries[0].freq, 2);
        assert_eq!(entries[0].positions, vec![0, 2]);
        assert_eq!(entries[0].offsets, vec![(0, 5), (17, 5)]);
        assert_eq!(entries[1].term, b"applesauce");
        assert_eq!(entries[1].freq, 1);
        assert_eq!(entries[1].positions, vec![1]);
        assert_eq!(entries[1].offsets, vec![(6, 10)]);
    }

    #[test]
    fn test_front_coding_prefix_lengths() {
        let options = VectorOptions::default().set_indexed().set_vectors();
        let (mut writer, field) = writer_with_one_field(options);
        assert!(writer.start_field(0, field, &[options]));
        writer.record_token(field, b"cat", 0, 0, 3);
        writer.record_token(field, b"car", 1, 4, 7);
        writer.record_token(field, b"cart", 2, 8, 12);
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        let expected: Vec<u8> = vec![
            3, 0, // count, flags
            0, 3, b'c', b'a', b'r', 1, // "car"
            3, 1, b't', 1, // "cart" shares "car"
            2, 1, b't', 1, // "cat" shares "ca"
        ];
        assert_eq!(doc.vector_data(), &expected[..]);
    }

    #[test]
    fn test_randomized_roundtrip() {
        use std::collections::BTreeMap;

        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(3);
        let (mut writer, field) = writer_with_one_field(full_options());
        assert!(writer.start_field(0, field, &[full_options()]));
        let mut expected: BTreeMap<Vec<u8>, (Vec<u32>, Vec<(u32, u32)>)> = BTreeMap::new();
        let mut position = 0u32;
        let mut offset = 0u32;
        for _ in 0..500 {
            let term_len = rng.gen_range(1..6);
            let term: Vec<u8> = (0..term_len).map(|_| rng.gen_range(b'a'..b'd')).collect();
            let token_len = rng.gen_range(1..10u32);
            writer.record_token(field, &term, position, offset, offset + token_len);
            let (positions, offsets) = expected.entry(term).or_default();
            positions.push(position);
            offsets.push((offset, token_len));
            position += rng.gen_range(1..4u32);
            offset += token_len + rng.gen_range(0..3u32);
        }
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        let mut reader = TermVectorsReader::new(doc.vector_data());
        let entries = reader.read_record().unwrap();
        assert!(reader.is_exhausted());
        assert_eq!(entries.len(), expected.len());
        for (entry, (term, (positions, offsets))) in entries.iter().zip(expected.iter()) {
            assert_eq!(&entry.term, term);
            assert_eq!(entry.freq as usize, positions.len());
            assert_eq!(&entry.positions, positions);
            assert_eq!(&entry.offsets, offsets);
        }
    }

    #[test]
    fn test_positions_only() {
        let options = VectorOptions::default()
            .set_indexed()
            .set_vectors()
            .set_positions();
        let (mut writer, field) = writer_with_one_field(options);
        assert!(writer.start_field(0, field, &[options]));
        writer.record_token(field, b"a", 0, 0, 1);
        writer.record_token(field, b"a", 3, 4, 5);
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        let mut reader = TermVectorsReader::new(doc.vector_data());
        let entries = reader.read_record().unwrap();
        assert_eq!(entries[0].positions, vec![0, 3]);
        assert!(entries[0].offsets.is_empty());
    }

    #[test]
    fn test_offsets_only() {
        let options = VectorOptions::default()
            .set_indexed()
            .set_vectors()
            .set_offsets();
        let (mut writer, field) = writer_with_one_field(options);
        assert!(writer.start_field(0, field, &[options]));
        writer.record_token(field, b"a", 0, 0, 1);
        writer.record_token(field, b"a", 3, 4, 5);
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        let mut reader = TermVectorsReader::new(doc.vector_data());
        let entries = reader.read_record().unwrap();
        assert!(entries[0].positions.is_empty());
        assert_eq!(entries[0].offsets, vec![(0, 1), (4, 1)]);
    }

    #[test]
    fn test_vectors_not_requested() {
        let options = VectorOptions::default().set_indexed();
        let (mut writer, field) = writer_with_one_field(options);
        assert!(!writer.start_field(0, field, &[options]));
        assert!(writer.finish_doc().is_none());
    }

    #[test]
    fn test_options_are_ored() {
        let base = VectorOptions::default().set_indexed().set_vectors();
        let with_positions = base.set_positions();
        let with_offsets = base.set_offsets();
        let (mut writer, field) = writer_with_one_field(base);
        assert!(writer.start_field(0, field, &[with_positions, with_offsets]));
        writer.record_token(field, b"a", 1, 2, 3);
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        let mut reader = TermVectorsReader::new(doc.vector_data());
        let entries = reader.read_record().unwrap();
        assert_eq!(entries[0].positions, vec![1]);
        assert_eq!(entries[0].offsets, vec![(2, 1)]);
    }

    #[test]
    fn test_zero_postings_writes_nothing() {
        let (mut writer, field) = writer_with_one_field(full_options());
        assert!(writer.start_field(0, field, &[full_options()]));
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        assert!(doc.fields().is_empty());
        assert!(doc.vector_data().is_empty());
    }

    #[test]
    fn test_abort_doc_discards_stale_postings() {
        let (mut writer, field) = writer_with_one_field(full_options());
        assert!(writer.start_field(0, field, &[full_options()]));
        writer.record_token(field, b"left", 0, 0, 4);
        writer.abort_doc();
        assert!(writer.start_field(1, field, &[full_options()]));
        writer.record_token(field, b"fresh", 0, 0, 5);
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        let mut reader = TermVectorsReader::new(doc.vector_data());
        let entries = reader.read_record().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].term, b"fresh");
    }

    #[test]
    #[cfg(feature = "failpoints")]
    fn test_failed_serialization_is_discarded() {
        let scenario = fail::FailScenario::setup();
        let (mut writer, field) = writer_with_one_field(full_options());
        assert!(writer.start_field(0, field, &[full_options()]));
        writer.record_token(field, b"doomed", 0, 0, 6);
        fail::cfg("TermVectorsFieldWriter::serialize", "return").unwrap();
        assert!(writer.finish_field(field).is_err());
        fail::cfg("TermVectorsFieldWriter::serialize", "off").unwrap();
        writer.abort_doc();
        assert!(writer.start_field(1, field, &[full_options()]));
        writer.record_token(field, b"alive", 0, 0, 5);
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        let mut reader = TermVectorsReader::new(doc.vector_data());
        let entries = reader.read_record().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].term, b"alive");
        scenario.teardown();
    }

    #[test]
    fn test_shrink_keeps_writer_usable() {
        let (mut writer, field) = writer_with_one_field(full_options());
        assert!(writer.start_field(0, field, &[full_options()]));
        for i in 0..100u32 {
            writer.record_token(field, format!("term{i:03}").as_bytes(), i, i * 2, i * 2 + 1);
        }
        writer.finish_field(field).unwrap();
        writer.finish_doc().unwrap();
        writer.shrink();
        assert!(writer.start_field(1, field, &[full_options()]));
        writer.record_token(field, b"after", 0, 0, 5);
        writer.finish_field(field).unwrap();
        let doc = writer.finish_doc().unwrap();
        let mut reader = TermVectorsReader::new(doc.vector_data());
        assert_eq!(reader.read_record().unwrap().len(), 1);
    }
}
