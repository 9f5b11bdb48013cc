//! Memory arena for the indexer.
//!
//! - Allocations are cheap and consecutive allocations have great
//!   locality.
//! - Addresses ([`Addr`]) are 32 bits.
//! - Resetting the whole arena is O(number of pages), not O(bytes).
//!
//! # Limitations
//!
//! - Addresses are 32 bits: the maximum capacity of the arena is 4 GB.
//!   (One arena is owned per indexing thread.)
//! - A single allocation may not exceed one page (1 MB).

const NUM_BITS_PAGE_ADDR: usize = 20;
const PAGE_SIZE: usize = 1 << NUM_BITS_PAGE_ADDR; // pages are 1 MB large

/// Represents a pointer into the [`MemoryArena`].
///
/// The first 12 bits identify a page of memory, the last 20 bits are an
/// address within this page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Addr(u32);

impl Addr {
    /// Creates a null pointer.
    pub fn null_pointer() -> Addr {
        Addr(u32::MAX)
    }

    /// Returns the `Addr` object for `addr + offset`
    pub fn offset(self, offset: u32) -> Addr {
        Addr(self.0.wrapping_add(offset))
    }

    fn new(page_id: usize, local_addr: usize) -> Addr {
        Addr((page_id << NUM_BITS_PAGE_ADDR | local_addr) as u32)
    }

    fn page_id(self) -> usize {
        (self.0 as usize) >> NUM_BITS_PAGE_ADDR
    }

    fn page_local_addr(self) -> usize {
        (self.0 as usize) & (PAGE_SIZE - 1)
    }

    /// Returns true iff the `Addr` is null.
    pub fn is_null(self) -> bool {
        self.0 == u32::MAX
    }
}

/// The `MemoryArena`
pub struct MemoryArena {
    pages: Vec<Page>,
}

impl Default for MemoryArena {
    fn default() -> MemoryArena {
        MemoryArena::new()
    }
}

impl MemoryArena {
    /// Creates a new memory arena with a single empty page.
    pub fn new() -> MemoryArena {
        MemoryArena {
            pages: vec![Page::new(0)],
        }
    }

    /// Returns an upper bound of the resident memory consumed by the
    /// arena, counted in whole pages.
    pub fn mem_usage(&self) -> usize {
        self.pages.len() * PAGE_SIZE
    }

    /// Forgets every allocation and keeps a single empty page around.
    pub fn reset(&mut self) {
        self.pages.truncate(1);
        self.pages[0].len = 0;
    }

    /// Allocates `len` bytes and returns the allocated address.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the page size.
    pub fn allocate_space(&mut self, len: usize) -> Addr {
        assert!(len <= PAGE_SIZE, "allocation bigger than a page: {len}");
        let page_id = self.pages.len() - 1;
        if let Some(addr) = self.pages[page_id].allocate_space(len) {
            return addr;
        }
        let new_page_id = self.pages.len();
        self.pages.push(Page::new(new_page_id));
        self.pages[new_page_id]
            .allocate_space(len)
            .expect("fresh page cannot be full")
    }

    /// Writes a slice at the given address, assuming the memory was
    /// allocated beforehand.
    pub fn write_bytes<B: AsRef<[u8]>>(&mut self, addr: Addr, data: B) {
        let bytes = data.as_ref();
        self.pages[addr.page_id()]
            .slice_mut(addr.page_local_addr(), bytes.len())
            .copy_from_slice(bytes);
    }

    /// Returns the `len` bytes starting at `addr`.
    pub fn read_slice(&self, addr: Addr, len: usize) -> &[u8] {
        self.pages[addr.page_id()].slice(addr.page_local_addr(), len)
    }

    /// Writes an arena address (used as the next-block pointer of the
    /// unrolled linked lists).
    pub fn write_addr_at(&mut self, addr: Addr, target: Addr) {
        self.write_bytes(addr, target.0.to_le_bytes());
    }

    /// Reads back an address written by [`MemoryArena::write_addr_at`].
    pub fn read_addr(&self, addr: Addr) -> Addr {
        let bytes: [u8; 4] = self
            .read_slice(addr, 4)
            .try_into()
            .expect("read_slice returned the requested length");
        Addr(u32::from_le_bytes(bytes))
    }
}

struct Page {
    page_id: usize,
    len: usize,
    data: Box<[u8]>,
}

impl Page {
    fn new(page_id: usize) -> Page {
        Page {
            page_id,
            len: 0,
            data: vec![0u8; PAGE_SIZE].into_boxed_slice(),
        }
    }

    #[inline]
    fn is_available(&self, len: usize) -> bool {
        len + self.len <= PAGE_SIZE
    }

    fn slice(&self, local_addr: usize, len: usize) -> &[u8] {
        &self.data[local_addr..][..len]
    }

    fn slice_mut(&mut self, local_addr: usize, len: usize) -> &mut [u8] {
        &mut self.data[local_addr..][..len]
    }

    fn allocate_space(&mut self, len: usize) -> Option<Addr> {
        if self.is_available(len) {
            let addr = Addr::new(self.page_id, self.len);
            self.len += len;
            Some(addr)
        } else {
            None
        }
    }
}
