//! Matrix and cache-tile kernels: full GEMM, cache-resident tile GEMM, the
//! `Mma`/`Mmp`/`Smm`/`Mclip` quantized tile ops, and the padded 2-D
//! DRAM<->cache movers `Mload`/`Mstore`.
//!
//! The tile-resident family (`Gemm`, `Mma`, `Mmp`, `Smm`, `Mclip`) never
//! carries a type suffix in the ISA — like `Transpose`/`Permute`, they
//! operate on the default `i32` element, matching the quantized-inference
//! pipeline the original device's cache layout (`Block = 16`) was built for.

use crate::accelerator::Accelerator;
use crate::elem::Elem;
use crate::inst::Instruction;
use crate::memory::cache::{BATCH, BLOCK_IN, BLOCK_OUT};
use crate::memory::{CacheRegion, DRAM_BYTES};
use crate::spec_reg::SpecReg;
use crate::unit::UnitContext;

use super::{addr, read, spec, write};

/// `C <- A . B` over the full `X_SIZE x Y_SIZE` by `Y_SIZE x Z_SIZE`
/// matrices. The destination is zeroed first; any zero dimension produces no
/// output and leaves the destination untouched (there's nothing to zero or
/// accumulate into).
pub fn gemm_full<T: Elem>(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let x = spec(accel, SpecReg::X_SIZE) as usize;
    let y = spec(accel, SpecReg::Y_SIZE) as usize;
    let z = spec(accel, SpecReg::Z_SIZE) as usize;
    if x == 0 || y == 0 || z == 0 {
        ctx.advance();
        return;
    }
    let a: Vec<T> = read::<T>(accel, inst.rs0, x * y).to_vec();
    let b: Vec<T> = read::<T>(accel, inst.rs1, y * z).to_vec();
    let c = write::<T>(accel, inst.rd, x * z);
    for ci in c.iter_mut() {
        *ci = T::default();
    }
    for i in 0..x {
        for k in 0..y {
            let aik = a[i * y + k];
            for j in 0..z {
                c[i * z + j] = c[i * z + j].add(aik.mul(b[k * z + j]));
            }
        }
    }
    ctx.advance();
}

fn cache_tile<'a>(accel: &'a Accelerator, region: CacheRegion, rows: usize, cols: usize) -> &'a [i32] {
    accel
        .slice::<i32>(DRAM_BYTES + region.base(), rows * cols)
        .expect("cache tile read out of bounds")
}

fn cache_tile_mut<'a>(accel: &'a Accelerator, region: CacheRegion, rows: usize, cols: usize) -> &'a mut [i32] {
    accel
        .slice_mut::<i32>(DRAM_BYTES + region.base(), rows * cols)
        .expect("cache tile write out of bounds")
}

/// Cache-resident Batch x BlockIn by BlockIn x BlockOut tile multiply,
/// accumulating into the Batch x BlockOut Accum tile. `RESET_ACC` zeroes the
/// accumulator before the multiply; otherwise the tile accumulates across
/// repeated dispatches, which is the whole point of tiling a larger GEMM.
pub fn gemm_tile(accel: &Accelerator, ctx: &mut dyn UnitContext, _inst: &Instruction) {
    let reset = spec(accel, SpecReg::RESET_ACC) != 0;
    let input = cache_tile(accel, CacheRegion::Input, BATCH, BLOCK_IN).to_vec();
    let weight = cache_tile(accel, CacheRegion::Const, BLOCK_IN, BLOCK_OUT).to_vec();
    let accum = cache_tile_mut(accel, CacheRegion::Accum, BATCH, BLOCK_OUT);
    if reset {
        accum.fill(0);
    }
    for b in 0..BATCH {
        for o in 0..BLOCK_OUT {
            let mut sum = accum[b * BLOCK_OUT + o];
            for k in 0..BLOCK_IN {
                sum = sum.wrapping_add(input[b * BLOCK_IN + k].wrapping_mul(weight[k * BLOCK_OUT + o]));
            }
            accum[b * BLOCK_OUT + o] = sum;
        }
    }
    ctx.advance();
}

/// Multiply-add over an `MSIZE x NSIZE` cache-resident matrix pair: `rs0`
/// names the input operand's device address, `rs1` a weight matrix. The
/// weight is only ever read off its own diagonal (`w[y*n+y]`, never
/// `w[x*n+y]`), so the same weight column value is added across every row of
/// that column; preserved byte-for-byte per DESIGN.md's resolution of this
/// open question rather than "fixed" to a full elementwise read.
pub fn mma(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let m = spec(accel, SpecReg::MSIZE) as usize;
    let n = spec(accel, SpecReg::NSIZE) as usize;
    let a: Vec<i32> = read::<i32>(accel, inst.rs0, m * n).to_vec();
    let w: Vec<i32> = read::<i32>(accel, inst.rs1, n * n).to_vec();
    let out = write::<i32>(accel, inst.rd, m * n);
    for x in 0..m {
        for y in 0..n {
            // The original source adds here where the mnemonic implies a
            // multiply; preserved byte-for-byte per DESIGN.md's resolution of
            // this open question.
            out[x * n + y] = out[x * n + y].wrapping_add(a[x * n + y].wrapping_add(w[y * n + y]));
        }
    }
    ctx.advance();
}

/// Multiply-with-positional-weight: same diagonal-only weight read as `Mma`,
/// with a multiply in place of the add.
pub fn mmp(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let m = spec(accel, SpecReg::MSIZE) as usize;
    let n = spec(accel, SpecReg::NSIZE) as usize;
    let a: Vec<i32> = read::<i32>(accel, inst.rs0, m * n).to_vec();
    let w: Vec<i32> = read::<i32>(accel, inst.rs1, n * n).to_vec();
    let out = write::<i32>(accel, inst.rd, m * n);
    for x in 0..m {
        for y in 0..n {
            out[x * n + y] = out[x * n + y].wrapping_add(a[x * n + y].wrapping_mul(w[y * n + y]));
        }
    }
    ctx.advance();
}

/// Scalar-multiply-accumulate: `rs1` is the raw instruction field read
/// directly as the scalar multiplier, not indirected through a register —
/// another of the packed-literal uses of `rs1` this family mixes in with
/// register-index uses (see `Mma`/`Mmp` above).
pub fn smm(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let m = spec(accel, SpecReg::MSIZE) as usize;
    let n = spec(accel, SpecReg::NSIZE) as usize;
    let len = m * n;
    let scalar = inst.rs1 as i32;
    let a: Vec<i32> = read::<i32>(accel, inst.rs0, len).to_vec();
    let out = write::<i32>(accel, inst.rd, len);
    for i in 0..len {
        out[i] = out[i].wrapping_add(a[i].wrapping_mul(scalar));
    }
    ctx.advance();
}

/// Elementwise clip to the 16-bit `[lower, upper]` bound packed into `rs1`:
/// low 16 bits are the lower bound, high 16 bits the upper bound. Elements
/// within bounds leave the accumulator untouched rather than being copied
/// in — this is an in-place clip of whatever `rd` already held, not a
/// clamp-and-copy of `rs0`, preserved here per DESIGN.md.
pub fn mclip(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let m = spec(accel, SpecReg::MSIZE) as usize;
    let n = spec(accel, SpecReg::NSIZE) as usize;
    let len = m * n;
    let packed = inst.rs1;
    let lower = (packed & 0xFFFF) as i32;
    let upper = ((packed >> 16) & 0xFFFF) as i32;
    let a: Vec<i32> = read::<i32>(accel, inst.rs0, len).to_vec();
    let out = write::<i32>(accel, inst.rd, len);
    for i in 0..len {
        if a[i] > upper {
            out[i] = upper;
        } else if a[i] < lower {
            out[i] = lower;
        }
    }
    ctx.advance();
}

/// 2-D load from DRAM into cache with per-side padding and a source row
/// stride. Pad rows/columns are zero-filled; `rd` names the cache
/// destination base, `rs0` the DRAM source base.
pub fn mload(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let x_size = spec(accel, SpecReg::X_SIZE) as usize;
    let y_size = spec(accel, SpecReg::Y_SIZE) as usize;
    let stride = spec(accel, SpecReg::X_STRIDE) as usize;
    let x_pad0 = spec(accel, SpecReg::X_PAD_0) as usize;
    let x_pad1 = spec(accel, SpecReg::X_PAD_1) as usize;
    let y_pad0 = spec(accel, SpecReg::Y_PAD_0) as usize;
    let y_pad1 = spec(accel, SpecReg::Y_PAD_1) as usize;

    let out_rows = y_pad0 + y_size + y_pad1;
    let out_cols = x_pad0 + x_size + x_pad1;

    let src_base = addr(accel, inst.rs0);
    let dst_base = addr(accel, inst.rd);

    for row in 0..out_rows {
        let dst_row = accel
            .slice_mut::<i32>(dst_base + (row * out_cols * BLOCK_IN) as u64, out_cols * BLOCK_IN)
            .expect("MLOAD destination row out of bounds");
        dst_row.fill(0);
        if row < y_pad0 || row >= y_pad0 + y_size {
            continue;
        }
        let src_row_idx = row - y_pad0;
        let src_row = accel
            .slice::<i32>(src_base + (src_row_idx * stride * BLOCK_IN) as u64, x_size * BLOCK_IN)
            .expect("MLOAD source row out of bounds");
        let dst_slice = &mut dst_row[x_pad0 * BLOCK_IN..(x_pad0 + x_size) * BLOCK_IN];
        dst_slice.copy_from_slice(src_row);
    }
    ctx.advance();
}

/// 2-D store from cache to DRAM with a destination row stride; no padding on
/// the way out (padding only ever enters on load).
pub fn mstore(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let x_size = spec(accel, SpecReg::X_SIZE) as usize;
    let y_size = spec(accel, SpecReg::Y_SIZE) as usize;
    let stride = spec(accel, SpecReg::X_STRIDE) as usize;

    let src_base = addr(accel, inst.rs0);
    let dst_base = addr(accel, inst.rd);

    for row in 0..y_size {
        let src_row = accel
            .slice::<i32>(src_base + (row * x_size * BLOCK_IN) as u64, x_size * BLOCK_IN)
            .expect("MSTORE source row out of bounds")
            .to_vec();
        let dst_row = accel
            .slice_mut::<i32>(dst_base + (row * stride * BLOCK_IN) as u64, x_size * BLOCK_IN)
            .expect("MSTORE destination row out of bounds");
        dst_row.copy_from_slice(&src_row);
    }
    ctx.advance();
}
