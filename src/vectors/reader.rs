use std::io;

use crate::common::{BinarySerializable, VInt};
use crate::vectors::{STORE_OFFSETS, STORE_POSITIONS};

/// One term of a decoded term vector record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermVectorEntry {
    pub term: Vec<u8>,
    pub freq: u32,
    /// Absolute token positions, one per occurrence.
    pub positions: Vec<u32>,
    /// `(start, length)` character ranges, one per occurrence.
    pub offsets: Vec<(u32, u32)>,
}

/// Decodes term vector records out of a [`super::DocumentVectorBuffer`]'s
/// data, one field record per [`TermVectorsReader::read_record`] call.
pub struct TermVectorsReader<'a> {
    data: &'a [u8],
}

impl<'a> TermVectorsReader<'a> {
    pub fn new(data: &'a [u8]) -> TermVectorsReader<'a> {
        TermVectorsReader { data }
    }

    /// True iff every record has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.data.is_empty()
    }

    fn read_vint(&mut self) -> io::Result<u64> {
        VInt::deserialize(&mut self.data).map(|vint| vint.val())
    }

    /// Reads the next field record, undoing front coding and delta
    /// coding on the way.
    pub fn read_record(&mut self) -> io::Result<Vec<TermVectorEntry>> {
        let num_postings = self.read_vint()? as usize;
        let flags = u8::deserialize(&mut self.data)?;
        // A posting takes at least three bytes. An inflated count in a
        // corrupted record must not drive the pre-allocation.
        let mut entries: Vec<TermVectorEntry> =
            Vec::with_capacity(num_postings.min(self.data.len() / 3));
        let mut last_term: Vec<u8> = Vec::new();
        for _ in 0..num_postings {
            let prefix_len = self.read_vint()? as usize;
            let suffix_len = self.read_vint()? as usize;
            if prefix_len > last_term.len() || suffix_len > self.data.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "corrupted term vector record",
                ));
            }
            last_term.truncate(prefix_len);
            last_term.extend_from_slice(&self.data[..suffix_len]);
            self.data = &self.data[suffix_len..];
            let freq = self.read_vint()? as u32;
            let mut positions = Vec::new();
            if flags & STORE_POSITIONS != 0 {
                let mut position = 0u32;
                for _ in 0..freq {
                    position += self.read_vint()? as u32;
                    positions.push(position);
                }
            }
            let mut offsets = Vec::new();
            if flags & STORE_OFFSETS != 0 {
                let mut prev_end = 0u32;
                for _ in 0..freq {
                    let start = prev_end + self.read_vint()? as u32;
                    let length = self.read_vint()? as u32;
                    offsets.push((start, length));
                    prev_end = start + length;
                }
            }
            entries.push(TermVectorEntry {
                term: last_term.clone(),
                freq,
                positions,
                offsets,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::TermVectorsReader;

    #[test]
    fn test_read_handcrafted_record() {
        // Two postings, positions and offsets, terms "ab" and "abc".
        let data: Vec<u8> = vec![
            2, 3, // count, flags
            0, 2, b'a', b'b', 1, // "ab", freq 1
            5, // position 5
            1, 2, // offset (1, 2)
            2, 1, b'c', 1, // "abc", freq 1
            0, // position 0
            4, 4, // offset (4, 4)
        ];
        let mut reader = TermVectorsReader::new(&data);
        let entries = reader.read_record().unwrap();
        assert!(reader.is_exhausted());
        assert_eq!(entries[0].term, b"ab");
        assert_eq!(entries[0].positions, vec![5]);
        assert_eq!(entries[0].offsets, vec![(1, 2)]);
        assert_eq!(entries[1].term, b"abc");
        assert_eq!(entries[1].positions, vec![0]);
        assert_eq!(entries[1].offsets, vec![(4, 4)]);
    }

    #[test]
    fn test_corrupted_prefix_is_rejected() {
        // Prefix length 4 against an empty previous term.
        let data: Vec<u8> = vec![1, 0, 4, 1, b'x', 1];
        let mut reader = TermVectorsReader::new(&data);
        assert!(reader.read_record().is_err());
    }

    #[test]
    fn test_truncated_record_is_rejected() {
        let data: Vec<u8> = vec![1, 3, 0, 5, b'q'];
        let mut reader = TermVectorsReader::new(&data);
        assert!(reader.read_record().is_err());
    }

    #[test]
    fn test_inflated_posting_count_is_rejected() {
        // The posting count claims close to u64::MAX entries but the
        // record holds a single posting. Decoding must fail without
        // attempting to reserve memory for the claimed count.
        let data: Vec<u8> = vec![
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01, // count
            0, // flags
            0, 1, b'x', 1, // "x", freq 1
        ];
        let mut reader = TermVectorsReader::new(&data);
        assert!(reader.read_record().is_err());
    }
}
