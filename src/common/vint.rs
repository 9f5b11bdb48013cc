use std::io;
use std::io::{Read, Write};

use super::BinarySerializable;

const CONTINUE_BIT: u8 = 128u8;

/// Wrapper over a `u64` that serializes as an unsigned variable-length
/// integer: 7 bits of payload per byte, least significant group first,
/// high bit set on every byte but the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VInt(pub u64);

impl VInt {
    /// Returns the underlying value.
    pub fn val(&self) -> u64 {
        self.0
    }

    /// Appends the varint representation to `output`.
    pub fn serialize_into_vec(&self, output: &mut Vec<u8>) {
        let mut buffer = [0u8; 10];
        let num_bytes = self.serialize_into(&mut buffer);
        output.extend_from_slice(&buffer[..num_bytes]);
    }

    /// Serializes into a fixed-size buffer, returning the number of
    /// bytes used.
    pub(crate) fn serialize_into(&self, buffer: &mut [u8; 10]) -> usize {
        let mut remaining = self.0;
        for (i, b) in buffer.iter_mut().enumerate() {
            let next_byte: u8 = (remaining & 127u64) as u8;
            remaining >>= 7;
            if remaining == 0u64 {
                *b = next_byte;
                return i + 1;
            } else {
                *b = next_byte | CONTINUE_BIT;
            }
        }
        unreachable!("a u64 is at most 10 varint bytes");
    }
}

impl BinarySerializable for VInt {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buffer = [0u8; 10];
        let num_bytes = self.serialize_into(&mut buffer);
        writer.write_all(&buffer[..num_bytes])
    }

    fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut result = 0u64;
        let mut shift = 0u64;
        loop {
            let mut byte = [0u8; 1];
            reader.read_exact(&mut byte)?;
            result |= u64::from(byte[0] % 128u8) << shift;
            if byte[0] < CONTINUE_BIT {
                return Ok(VInt(result));
            }
            shift += 7;
            if shift > 63 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "Failed to deserialize a u64 varint: too many bytes.",
                ));
            }
        }
    }
}
