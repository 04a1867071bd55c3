//! The on-chip cache and its three fixed tile regions.
//!
//! The tile-resident kernels (`Gemm`, `Mma`, `Mmp`, `Smm`, `Mclip`) never
//! address the cache by a raw offset the way DRAM is addressed; they address
//! it by *region* (Accum/Input/Const) plus a row/column index scaled by one
//! of the fixed block sizes. We keep the cache itself as one flat
//! [`RawMemory`] (matching the original's single `uint8_t[]`) and expose the
//! region math here so kernels never hand-roll the base-offset arithmetic.

use crate::memory::{CACHE_BYTES, CacheRegion, RawMemory};

/// Elements per row of the Input-region tile (`BlockIn`).
pub const BLOCK_IN: usize = 16;
/// Elements per row of the Accum-region tile (`BlockOut`).
pub const BLOCK_OUT: usize = 16;
/// Elements in one row of the Const-region tile (`BlockIn * BlockOut`).
pub const CONST_BLOCK: usize = BLOCK_IN * BLOCK_OUT;
/// Rows processed per tile-kernel invocation.
pub const BATCH: usize = 1;

pub struct Cache {
    raw: RawMemory,
}

impl Cache {
    pub fn new() -> Self {
        Cache {
            raw: RawMemory::new(CACHE_BYTES),
        }
    }

    pub fn raw(&self) -> &RawMemory {
        &self.raw
    }

    /// Byte offset of `region`'s start.
    pub fn region_base(region: CacheRegion) -> u64 {
        region.base()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
