//! Elementwise vector kernels: binary, immediate, unary, reduce, plus the
//! default-typed (always `i32`) transpose/permute/extract shapes.
//!
//! Every vector-shaped kernel reads its operand length from `VLEN` at
//! dispatch time — not a fixed constant, not a length carried on the
//! instruction.

use crate::accelerator::Accelerator;
use crate::elem::{Elem, imm_as};
use crate::inst::{Instruction, Params};
use crate::spec_reg::SpecReg;
use crate::unit::UnitContext;

use super::{read, spec, write};

fn vlen(accel: &Accelerator) -> usize {
    spec(accel, SpecReg::VLEN) as usize
}

macro_rules! binary_kernel {
    ($name:ident, $op:ident) => {
        pub fn $name<T: Elem>(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
            let n = vlen(accel);
            let a: Vec<T> = read::<T>(accel, inst.rs0, n).to_vec();
            let b: Vec<T> = read::<T>(accel, inst.rs1, n).to_vec();
            let out = write::<T>(accel, inst.rd, n);
            for i in 0..n {
                out[i] = a[i].$op(b[i]);
            }
            ctx.advance();
        }
    };
}

binary_kernel!(vadd, add);
binary_kernel!(vsub, sub);
binary_kernel!(vmul, mul);

macro_rules! binary_imm_kernel {
    ($name:ident, $op:ident) => {
        pub fn $name<T: Elem>(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
            let n = vlen(accel);
            let imm: i64 = match inst.params {
                Params::Imm(v) => v,
                _ => unreachable!("immediate vector op without an immediate operand"),
            };
            let b: T = imm_as::<T>(imm);
            let a: Vec<T> = read::<T>(accel, inst.rs0, n).to_vec();
            let out = write::<T>(accel, inst.rd, n);
            for i in 0..n {
                out[i] = a[i].$op(b);
            }
            ctx.advance();
        }
    };
}

binary_imm_kernel!(vaddi, add);
binary_imm_kernel!(vsubi, sub);
binary_imm_kernel!(vmuli, mul);

macro_rules! unary_kernel {
    ($name:ident, $op:ident) => {
        pub fn $name<T: Elem>(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
            let n = vlen(accel);
            let a: Vec<T> = read::<T>(accel, inst.rs0, n).to_vec();
            let out = write::<T>(accel, inst.rd, n);
            for i in 0..n {
                out[i] = a[i].$op();
            }
            ctx.advance();
        }
    };
}

unary_kernel!(vabs, abs);
unary_kernel!(vsqua, square);
unary_kernel!(vneg, neg);
unary_kernel!(vrec, recip);
unary_kernel!(vexp, exp);
unary_kernel!(vlog10, log10);
unary_kernel!(vconj, conj);

/// `Vabs` on the complex families produces a real-valued scalar magnitude
/// per element rather than an in-type result, so the output buffer holds a
/// real type half the element's width, not `T` itself.
fn vabs_complex<T: Elem, R: Elem>(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let n = vlen(accel);
    let a: Vec<T> = read::<T>(accel, inst.rs0, n).to_vec();
    let out = write::<R>(accel, inst.rd, n);
    for i in 0..n {
        out[i] = R::from_f64(a[i].magnitude());
    }
    ctx.advance();
}

pub fn vabs_c32(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    vabs_complex::<crate::elem::Complex32, f32>(accel, ctx, inst);
}

pub fn vabs_c64(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    vabs_complex::<crate::elem::Complex64, f64>(accel, ctx, inst);
}

/// `Vrec` on `I32` promotes to an `F64` output rather than truncating the
/// reciprocal back to an integer.
pub fn vrec_i32_promoted(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let n = vlen(accel);
    let a: Vec<i32> = read::<i32>(accel, inst.rs0, n).to_vec();
    let out = write::<f64>(accel, inst.rd, n);
    for i in 0..n {
        out[i] = if a[i] == 0 { 0.0 } else { 1.0 / a[i] as f64 };
    }
    ctx.advance();
}

macro_rules! reduce_kernel {
    ($name:ident, $init:expr, $fold:expr) => {
        pub fn $name<T: Elem>(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
            let n = vlen(accel);
            let a: Vec<T> = read::<T>(accel, inst.rs0, n).to_vec();
            let fold: fn(T, T) -> T = $fold;
            let init: Option<fn() -> T> = $init;
            let acc = match init {
                Some(f) => a.iter().copied().fold(f(), fold),
                None => a.iter().copied().reduce(fold).unwrap_or_default(),
            };
            let out = write::<T>(accel, inst.rd, 1);
            out[0] = acc;
            ctx.advance();
        }
    };
}

reduce_kernel!(vsum, Some(T::default), |a: T, b: T| a.add(b));
reduce_kernel!(vmax, None, |a: T, b: T| if a.lt(b) { b } else { a });
reduce_kernel!(vmin, None, |a: T, b: T| if b.lt(a) { b } else { a });

/// Transpose and Permute never carry a type suffix in the ISA; like the rest
/// of the no-suffix opcodes they operate on the default `i32` element.
fn tensor_dims(accel: &Accelerator) -> (usize, usize, usize, usize) {
    let ndim = spec(accel, SpecReg::NDIM) as usize;
    let x = spec(accel, SpecReg::X_SIZE) as usize;
    let y = spec(accel, SpecReg::Y_SIZE) as usize;
    let z = if ndim >= 3 { spec(accel, SpecReg::Z_SIZE) as usize } else { 1 };
    (ndim, x, y, z)
}

/// 2-D/3-D transpose: swaps the two (or reverses the three) trailing axes.
/// `NDIM==2` swaps X/Y; `NDIM==3` reverses X/Y/Z, matching the axis-rank
/// convention `Permute` uses (see below) in the degenerate case where the
/// destination axis order is simply reversed.
pub fn transpose(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let (ndim, x, y, z) = tensor_dims(accel);
    let total = x * y * z;
    let src: Vec<i32> = read::<i32>(accel, inst.rs0, total).to_vec();
    let out = write::<i32>(accel, inst.rd, total);
    if ndim <= 2 {
        for xi in 0..x {
            for yi in 0..y {
                out[yi * x + xi] = src[xi * y + yi];
            }
        }
    } else {
        for xi in 0..x {
            for yi in 0..y {
                for zi in 0..z {
                    let src_idx = (xi * y + yi) * z + zi;
                    let dst_idx = (zi * y + yi) * x + xi;
                    out[dst_idx] = src[src_idx];
                }
            }
        }
    }
    ctx.advance();
}

/// General N-D permute driven by per-axis destination ranks in
/// `X_AXIS`/`Y_AXIS`/`Z_AXIS`. For each source axis `a`, its output stride is
/// the product of sizes of every destination axis whose rank exceeds `a`'s,
/// so a rank assignment of `{0,1,2}` reduces to the identity and `{1,0,2}`
/// reduces to a 2-D transpose.
pub fn permute(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let (ndim, x, y, z) = tensor_dims(accel);
    let sizes = [x, y, z];
    let axes = [
        spec(accel, SpecReg::X_AXIS) as usize,
        spec(accel, SpecReg::Y_AXIS) as usize,
        spec(accel, SpecReg::Z_AXIS) as usize,
    ];
    let n = ndim.max(2).min(3);
    let total: usize = sizes[..n].iter().product();

    // stride[a] = product of sizes[b] for every b with axes[b] > axes[a]
    let mut stride = [0usize; 3];
    for a in 0..n {
        let mut s = 1usize;
        for b in 0..n {
            if axes[b] > axes[a] {
                s *= sizes[b];
            }
        }
        stride[a] = s;
    }

    let src: Vec<i32> = read::<i32>(accel, inst.rs0, total).to_vec();
    let out = write::<i32>(accel, inst.rd, total);

    let mut idx = [0usize; 3];
    for src_linear in 0..total {
        let mut rem = src_linear;
        for a in (0..n).rev() {
            let sz = sizes[a];
            idx[a] = rem % sz;
            rem /= sz;
        }
        let dst_linear: usize = (0..n).map(|a| idx[a] * stride[a]).sum();
        out[dst_linear] = src[src_linear];
    }
    ctx.advance();
}

/// Decimation: pick every `(X_SIZE + 1)`-th sample out of `ULEN` inputs.
/// `X_SIZE == 0` is the identity case — stride 1, every element kept.
pub fn extr(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let ulen = spec(accel, SpecReg::ULEN) as usize;
    let stride = spec(accel, SpecReg::X_SIZE) as usize + 1;
    let src: Vec<i32> = read::<i32>(accel, inst.rs0, ulen).to_vec();
    let out_len = src.iter().step_by(stride).count();
    let out = write::<i32>(accel, inst.rd, out_len);
    for (dst, &v) in out.iter_mut().zip(src.iter().step_by(stride)) {
        *dst = v;
    }
    ctx.advance();
}
