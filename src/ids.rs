use std::sync::atomic::{AtomicU64, Ordering};

/// PostIdAllocator
///
/// Hands out strictly increasing post ids from an atomic counter. The first
/// id is `high_water + 1`; a plain `new()` allocator therefore starts at 1.
/// The counter lives only in memory.
#[derive(Debug, Default)]
pub struct PostIdAllocator {
    last: AtomicU64,
}

impl PostIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues after an id that is already taken, e.g. the largest stored id.
    pub fn starting_after(high_water: u64) -> Self {
        Self {
            last: AtomicU64::new(high_water),
        }
    }

    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }
}
