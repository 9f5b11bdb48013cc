use std::iter;
use std::mem;

use murmurhash32::murmurhash2;

use super::{Addr, MemoryArena};

/// `KeyValue` is the item stored in the hash table.
///
/// The key is a byte slice stored in the memory arena behind a `u16`
/// length prefix. The value is an opaque `u32` handle owned by the
/// caller (the postings accumulator uses it as a posting id).
#[derive(Copy, Clone)]
struct KeyValue {
    key_addr: Addr,
    hash: u32,
    value: u32,
}

impl Default for KeyValue {
    fn default() -> Self {
        KeyValue {
            key_addr: Addr::null_pointer(),
            hash: 0u32,
            value: 0u32,
        }
    }
}

impl KeyValue {
    #[inline]
    fn is_empty(self) -> bool {
        self.key_addr.is_null()
    }
}

struct QuadraticProbing {
    hash: usize,
    i: usize,
    mask: usize,
}

impl QuadraticProbing {
    fn compute(hash: usize, mask: usize) -> QuadraticProbing {
        QuadraticProbing { hash, i: 0, mask }
    }

    #[inline]
    fn next_probe(&mut self) -> usize {
        self.i += 1;
        (self.hash + self.i) & self.mask
    }
}

const MIN_TABLE_SIZE: usize = 1 << 6;

/// Customized `HashMap` with byte-slice keys.
///
/// Keys are stored in a user supplied memory arena; the quirky API
/// avoids hashing the key twice and copying it on lookups.
pub struct TermHashMap {
    table: Box<[KeyValue]>,
    mask: usize,
    occupied: Vec<usize>,
    len: usize,
}

impl Default for TermHashMap {
    fn default() -> Self {
        Self::new(1 << 10)
    }
}

impl TermHashMap {
    /// Creates a hash map; `table_size` is rounded down to a power of
    /// two.
    pub fn new(table_size: usize) -> TermHashMap {
        assert!(table_size >= MIN_TABLE_SIZE);
        let table_size_power_of_2 = 1 << (63 - (table_size as u64).leading_zeros());
        let table: Vec<KeyValue> = iter::repeat(KeyValue::default())
            .take(table_size_power_of_2)
            .collect();
        TermHashMap {
            table: table.into_boxed_slice(),
            mask: table_size_power_of_2 - 1,
            occupied: Vec::with_capacity(table_size_power_of_2 / 2),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn mem_usage(&self) -> usize {
        self.table.len() * mem::size_of::<KeyValue>()
    }

    fn is_saturated(&self) -> bool {
        self.table.len() < self.occupied.len() * 3
    }

    fn probe(&self, hash: u32) -> QuadraticProbing {
        QuadraticProbing::compute(hash as usize, self.mask)
    }

    #[inline]
    fn get_key<'m>(&self, addr: Addr, arena: &'m MemoryArena) -> &'m [u8] {
        let key_len_bytes: [u8; 2] = arena
            .read_slice(addr, 2)
            .try_into()
            .expect("read_slice returned the requested length");
        let key_len = u16::from_le_bytes(key_len_bytes) as usize;
        arena.read_slice(addr.offset(2u32), key_len)
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter<'a>(&'a self, arena: &'a MemoryArena) -> impl Iterator<Item = (&'a [u8], u32)> {
        self.occupied.iter().map(move |&bucket| {
            let kv = self.table[bucket];
            (self.get_key(kv.key_addr, arena), kv.value)
        })
    }

    fn set_bucket(&mut self, hash: u32, key_addr: Addr, value: u32, bucket: usize) {
        self.occupied.push(bucket);
        self.len += 1;
        self.table[bucket] = KeyValue {
            key_addr,
            hash,
            value,
        };
    }

    fn resize(&mut self) {
        let new_len = self.table.len() * 2;
        let mask = new_len - 1;
        self.mask = mask;
        let new_table = vec![KeyValue::default(); new_len].into_boxed_slice();
        let old_table = mem::replace(&mut self.table, new_table);
        for old_pos in self.occupied.iter_mut() {
            let key_value: KeyValue = old_table[*old_pos];
            let mut probe = QuadraticProbing::compute(key_value.hash as usize, mask);
            loop {
                let bucket = probe.next_probe();
                if self.table[bucket].is_empty() {
                    *old_pos = bucket;
                    self.table[bucket] = key_value;
                    break;
                }
            }
        }
    }

    /// Removes every entry. The arena holding the keys is reset by its
    /// owner; only the occupied buckets are touched here.
    pub fn clear(&mut self) {
        for bucket in self.occupied.drain(..) {
            self.table[bucket] = KeyValue::default();
        }
        self.len = 0;
    }

    /// Shrinks the bucket table down to what a field with
    /// `max_entries` unique terms needs.
    ///
    /// May only be called on an empty map; called after a flush when the
    /// high-water mark of a field turned out to be far below the table
    /// capacity.
    pub fn shrink_to(&mut self, max_entries: usize) {
        assert!(self.is_empty(), "cannot shrink a non-empty hash map");
        let target = (max_entries * 2)
            .next_power_of_two()
            .max(MIN_TABLE_SIZE);
        if target < self.table.len() {
            self.table = vec![KeyValue::default(); target].into_boxed_slice();
            self.mask = target - 1;
        }
    }

    /// `mutate_or_create` creates a new entry for a given key if it does
    /// not exist, or updates the existing entry.
    ///
    /// If the key is not present, `updater` receives `None` and is in
    /// charge of returning the initial value; otherwise it receives
    /// `Some(previous_value)`. Returns the value now associated with the
    /// key.
    pub fn mutate_or_create<TMutator>(
        &mut self,
        key: &[u8],
        arena: &mut MemoryArena,
        mut updater: TMutator,
    ) -> u32
    where
        TMutator: FnMut(Option<u32>) -> u32,
    {
        assert!(key.len() <= u16::MAX as usize, "term bytes too long");
        if self.is_saturated() {
            self.resize();
        }
        let hash = murmurhash2(key);
        let mut probe = self.probe(hash);
        loop {
            let bucket = probe.next_probe();
            let kv: KeyValue = self.table[bucket];
            if kv.is_empty() {
                let value = updater(None);
                let key_addr = arena.allocate_space(2 + key.len());
                arena.write_bytes(key_addr, (key.len() as u16).to_le_bytes());
                arena.write_bytes(key_addr.offset(2u32), key);
                self.set_bucket(hash, key_addr, value, bucket);
                return value;
            } else if kv.hash == hash && self.get_key(kv.key_addr, arena) == key {
                let new_value = updater(Some(kv.value));
                self.table[bucket].value = new_value;
                return new_value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::TermHashMap;
    use crate::stacker::MemoryArena;

    #[test]
    fn test_hash_map() {
        let mut arena = MemoryArena::new();
        let mut hash_map: TermHashMap = TermHashMap::default();
        hash_map.mutate_or_create(b"abc", &mut arena, |opt_val| {
            assert_eq!(opt_val, None);
            3u32
        });
        hash_map.mutate_or_create(b"abcd", &mut arena, |opt_val| {
            assert_eq!(opt_val, None);
            4u32
        });
        hash_map.mutate_or_create(b"abc", &mut arena, |opt_val| {
            assert_eq!(opt_val, Some(3u32));
            5u32
        });
        let mut vanilla_hash_map = HashMap::new();
        for (key, val) in hash_map.iter(&arena) {
            vanilla_hash_map.insert(key.to_owned(), val);
        }
        assert_eq!(vanilla_hash_map.len(), 2);
        assert_eq!(vanilla_hash_map[&b"abc"[..].to_owned()], 5u32);
        assert_eq!(vanilla_hash_map[&b"abcd"[..].to_owned()], 4u32);
    }

    #[test]
    fn test_hash_map_resize_keeps_entries() {
        let mut arena = MemoryArena::new();
        let mut hash_map: TermHashMap = TermHashMap::new(64);
        for i in 0u32..1_000u32 {
            let key = format!("key{i}");
            hash_map.mutate_or_create(key.as_bytes(), &mut arena, |opt_val| {
                assert_eq!(opt_val, None);
                i
            });
        }
        assert_eq!(hash_map.len(), 1_000);
        for (key, val) in hash_map.iter(&arena) {
            assert_eq!(key, format!("key{val}").as_bytes());
        }
    }

    #[test]
    fn test_hash_map_clear_and_shrink() {
        let mut arena = MemoryArena::new();
        let mut hash_map: TermHashMap = TermHashMap::new(64);
        for i in 0u32..1_000u32 {
            let key = format!("key{i}");
            hash_map.mutate_or_create(key.as_bytes(), &mut arena, |_| i);
        }
        let grown = hash_map.mem_usage();
        hash_map.clear();
        arena.reset();
        assert_eq!(hash_map.len(), 0);
        hash_map.shrink_to(16);
        assert!(hash_map.mem_usage() < grown);
        hash_map.mutate_or_create(b"fresh", &mut arena, |opt_val| {
            assert_eq!(opt_val, None);
            42u32
        });
        assert_eq!(hash_map.len(), 1);
    }
}
