mod serialize;
mod vint;
mod writer;

pub use self::serialize::BinarySerializable;
pub use self::vint::VInt;
pub use self::writer::CountingWriter;

/// Length of the longest common prefix of two byte strings.
pub(crate) fn common_prefix_len(left: &[u8], right: &[u8]) -> usize {
    left.iter()
        .zip(right.iter())
        .take_while(|(a, b)| a == b)
        .count()
}
