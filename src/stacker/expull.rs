use super::{Addr, MemoryArena};
use crate::common::VInt;

const MAX_BLOCK_LEN: u32 = 1u32 << 15;
const FIRST_BLOCK: u32 = 16u32;
const NEXT_PTR_LEN: usize = 4;

enum CapacityResult {
    Available(u32),
    NeedAlloc(u32),
}

fn len_to_capacity(len: u32) -> CapacityResult {
    match len {
        0..=15 => CapacityResult::Available(FIRST_BLOCK - len),
        16..=MAX_BLOCK_LEN => {
            let cap = 1 << (32u32 - (len - 1u32).leading_zeros());
            let available = cap - len;
            if available == 0 {
                CapacityResult::NeedAlloc(len)
            } else {
                CapacityResult::Available(available)
            }
        }
        n => {
            let available = n % MAX_BLOCK_LEN;
            if available == 0 {
                CapacityResult::NeedAlloc(MAX_BLOCK_LEN)
            } else {
                CapacityResult::Available(MAX_BLOCK_LEN - available)
            }
        }
    }
}

/// An exponential unrolled linked list of bytes.
///
/// The indexer conceptually needs a `HashMap<Term, Vec<u8>>`: as a term
/// occurs in the document being indexed, its delta stream receives a
/// handful of varint bytes. The stream is then read exactly once, when
/// the field is serialized.
///
/// Data is stored in a linked list of blocks living in the
/// [`MemoryArena`]. The first block has a size of 16 bytes and each block
/// doubles the previous one, up to `MAX_BLOCK_LEN = 32768`. Every block
/// carries four extra trailing bytes holding the address of its
/// successor.
///
/// This strategy is a good trade-off between numerous very rare terms
/// and very frequent terms whose streams keep growing.
#[derive(Debug, Clone, Copy)]
pub struct ExpUnrolledLinkedList {
    len: u32,
    head: Addr,
    tail: Addr,
}

impl ExpUnrolledLinkedList {
    pub fn new(arena: &mut MemoryArena) -> ExpUnrolledLinkedList {
        let addr = arena.allocate_space(FIRST_BLOCK as usize + NEXT_PTR_LEN);
        ExpUnrolledLinkedList {
            len: 0u32,
            head: addr,
            tail: addr,
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends the varint encoding of `val`.
    pub fn push_vint(&mut self, val: u32, arena: &mut MemoryArena) {
        let mut buffer = [0u8; 10];
        let num_bytes = VInt(u64::from(val)).serialize_into(&mut buffer);
        self.write_all(&buffer[..num_bytes], arena);
    }

    /// Appends raw bytes to the stream.
    ///
    /// If the current block end is reached, a new block is allocated.
    pub fn write_all(&mut self, mut buf: &[u8], arena: &mut MemoryArena) {
        assert!(!buf.is_empty());
        loop {
            let cap = self.ensure_capacity(arena) as usize;
            if buf.len() <= cap {
                arena.write_bytes(self.tail, buf);
                self.len += buf.len() as u32;
                self.tail = self.tail.offset(buf.len() as u32);
                return;
            }
            arena.write_bytes(self.tail, &buf[..cap]);
            self.len += cap as u32;
            self.tail = self.tail.offset(cap as u32);
            buf = &buf[cap..];
        }
    }

    fn ensure_capacity(&mut self, arena: &mut MemoryArena) -> u32 {
        match len_to_capacity(self.len) {
            CapacityResult::NeedAlloc(new_block_len) => {
                let new_block_addr: Addr =
                    arena.allocate_space(new_block_len as usize + NEXT_PTR_LEN);
                arena.write_addr_at(self.tail, new_block_addr);
                self.tail = new_block_addr;
                new_block_len
            }
            CapacityResult::Available(available) => available,
        }
    }

    /// Copies the whole stream into `output`, replacing its content.
    pub fn read_to(&self, arena: &MemoryArena, output: &mut Vec<u8>) {
        output.clear();
        let mut cur = 0u32;
        let mut addr = self.head;
        let mut len = self.len;
        while len > 0 {
            let cap = match len_to_capacity(cur) {
                CapacityResult::Available(capacity) => capacity,
                CapacityResult::NeedAlloc(capacity) => capacity,
            };
            if cap < len {
                output.extend_from_slice(arena.read_slice(addr, cap as usize));
                len -= cap;
                cur += cap;
            } else {
                output.extend_from_slice(arena.read_slice(addr, len as usize));
                return;
            }
            addr = arena.read_addr(addr.offset(cap));
        }
    }
}
