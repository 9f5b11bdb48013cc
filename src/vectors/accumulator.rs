use crate::codec::TermComparator;
use crate::stacker::{ExpUnrolledLinkedList, MemoryArena, TermHashMap};
use crate::vectors::{OFFSETS_STREAM, POSITIONS_STREAM};

const NUM_STREAMS: usize = 2;

/// Accumulation record of one unique term within one (document, field)
/// pair.
///
/// `last_position` and `last_offset` are running state used to
/// delta-code later occurrences; they are only meaningful while the
/// field is being inverted and die with the posting at field
/// completion.
pub struct Posting {
    pub(crate) freq: u32,
    pub(crate) last_position: u32,
    pub(crate) last_offset: u32,
    streams: [ExpUnrolledLinkedList; NUM_STREAMS],
}

impl Posting {
    /// Number of occurrences recorded so far.
    pub fn freq(&self) -> u32 {
        self.freq
    }
}

/// Stores one [`Posting`] per unique term, keyed by term bytes.
///
/// Term bytes and delta streams live in a [`MemoryArena`];
/// [`TermVectorsAccumulator::reset`] reclaims everything at once without
/// walking the postings.
#[derive(Default)]
pub struct TermVectorsAccumulator {
    arena: MemoryArena,
    term_map: TermHashMap,
    postings: Vec<Posting>,
}

impl TermVectorsAccumulator {
    /// Returns the posting id for `term`, inserting a fresh posting on
    /// the first occurrence. The boolean is true iff the posting was
    /// just created.
    pub fn upsert(&mut self, term: &[u8]) -> (u32, bool) {
        let next_id = self.postings.len() as u32;
        let mut created = false;
        let id = self
            .term_map
            .mutate_or_create(term, &mut self.arena, |opt_id| match opt_id {
                Some(existing) => existing,
                None => {
                    created = true;
                    next_id
                }
            });
        if created {
            let positions = ExpUnrolledLinkedList::new(&mut self.arena);
            let offsets = ExpUnrolledLinkedList::new(&mut self.arena);
            self.postings.push(Posting {
                freq: 0,
                last_position: 0,
                last_offset: 0,
                streams: [positions, offsets],
            });
        }
        (id, created)
    }

    /// Number of unique terms seen since the last reset.
    pub fn num_postings(&self) -> usize {
        self.postings.len()
    }

    pub fn posting(&self, id: u32) -> &Posting {
        &self.postings[id as usize]
    }

    pub(crate) fn posting_mut(&mut self, id: u32) -> &mut Posting {
        &mut self.postings[id as usize]
    }

    /// Appends one varint to a posting's delta stream
    /// ([`POSITIONS_STREAM`] or [`OFFSETS_STREAM`]).
    pub fn append(&mut self, id: u32, stream: usize, value: u32) {
        debug_assert!(stream == POSITIONS_STREAM || stream == OFFSETS_STREAM);
        self.postings[id as usize].streams[stream].push_vint(value, &mut self.arena);
    }

    /// Returns `(term, posting id)` pairs ordered by `comparator`.
    ///
    /// The pre-sort order is hash-table insertion order; the result is
    /// fully determined by the comparator since terms are unique.
    pub fn sorted_postings(&self, comparator: TermComparator) -> Vec<(&[u8], u32)> {
        let mut entries: Vec<(&[u8], u32)> = self.term_map.iter(&self.arena).collect();
        entries.sort_unstable_by(|left, right| comparator(left.0, right.0));
        entries
    }

    /// Copies a posting's delta stream verbatim into `output`,
    /// replacing its content.
    pub fn read_stream(&self, id: u32, stream: usize, output: &mut Vec<u8>) {
        self.postings[id as usize].streams[stream].read_to(&self.arena, output);
    }

    /// Releases every posting for reuse. Idempotent; resetting an empty
    /// accumulator is a no-op.
    pub fn reset(&mut self) {
        if self.postings.is_empty() {
            return;
        }
        self.postings.clear();
        self.term_map.clear();
        self.arena.reset();
    }

    /// Shrinks the term hash table down to `max_postings` entries.
    /// The accumulator must be empty.
    pub fn shrink_to(&mut self, max_postings: usize) {
        self.term_map.shrink_to(max_postings);
    }

    /// Upper bound of the resident memory held by the accumulator.
    pub fn mem_usage(&self) -> usize {
        self.arena.mem_usage() + self.term_map.mem_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::TermVectorsAccumulator;
    use crate::codec::lexicographic_order;
    use crate::vectors::POSITIONS_STREAM;

    #[test]
    fn test_upsert_is_stable() {
        let mut accumulator = TermVectorsAccumulator::default();
        let (id_a, created_a) = accumulator.upsert(b"apple");
        let (id_b, created_b) = accumulator.upsert(b"banana");
        let (id_a2, created_a2) = accumulator.upsert(b"apple");
        assert!(created_a);
        assert!(created_b);
        assert!(!created_a2);
        assert_eq!(id_a, id_a2);
        assert_ne!(id_a, id_b);
        assert_eq!(accumulator.num_postings(), 2);
    }

    #[test]
    fn test_sorted_postings_follow_comparator() {
        let mut accumulator = TermVectorsAccumulator::default();
        for term in [&b"pear"[..], b"apple", b"orange"] {
            accumulator.upsert(term);
        }
        let sorted = accumulator.sorted_postings(lexicographic_order);
        let terms: Vec<&[u8]> = sorted.iter().map(|(term, _)| *term).collect();
        assert_eq!(terms, vec![&b"apple"[..], b"orange", b"pear"]);
    }

    #[test]
    fn test_stream_roundtrip() {
        let mut accumulator = TermVectorsAccumulator::default();
        let (id, _) = accumulator.upsert(b"term");
        accumulator.append(id, POSITIONS_STREAM, 3);
        accumulator.append(id, POSITIONS_STREAM, 200);
        let mut output = Vec::new();
        accumulator.read_stream(id, POSITIONS_STREAM, &mut output);
        assert_eq!(output, vec![3u8, 0xc8, 0x01]);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut accumulator = TermVectorsAccumulator::default();
        accumulator.reset();
        accumulator.reset();
        assert_eq!(accumulator.num_postings(), 0);
        accumulator.upsert(b"apple");
        accumulator.reset();
        assert_eq!(accumulator.num_postings(), 0);
        accumulator.reset();
        assert_eq!(accumulator.num_postings(), 0);
    }
}
