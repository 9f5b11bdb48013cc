//! In-memory data structures backing the postings accumulator.
//!
//! Everything in this module lives in a single [`MemoryArena`] owned by
//! one indexing thread: term bytes, the unrolled linked lists holding the
//! delta streams, and the hash table keys. Dropping or resetting the
//! arena reclaims all of it at once; nothing is freed individually.

mod expull;
mod memory_arena;
mod term_hashmap;

pub use self::expull::ExpUnrolledLinkedList;
pub use self::memory_arena::{Addr, MemoryArena};
pub use self::term_hashmap::TermHashMap;
