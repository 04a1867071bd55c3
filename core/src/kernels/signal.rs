//! Signal-processing kernels: linear convolution/FIR, DFT-based FFT/IFFT,
//! and the digital down-converter.
//!
//! None of these carry an element-type suffix beyond what's already fixed
//! per-opcode (`Conv` is always `F32`, `Fir` always `I32`, `Fft`/`Ifft`/
//! `Ddc` always complex-`F32`), so each is a concrete function rather than a
//! generic one instantiated through `crate::inst`'s element tables.

use std::f64::consts::PI;

use num_complex::Complex32;

use crate::accelerator::Accelerator;
use crate::inst::Instruction;
use crate::spec_reg::SpecReg;
use crate::unit::UnitContext;

use super::{read, spec, write};

/// Linear convolution of a length-`ULEN` signal with a length-`VLEN` kernel,
/// producing `ULEN + VLEN - 1` outputs.
pub fn conv(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let ulen = spec(accel, SpecReg::ULEN) as usize;
    let vlen = spec(accel, SpecReg::VLEN) as usize;
    let x: Vec<f32> = read::<f32>(accel, inst.rs0, ulen).to_vec();
    let h: Vec<f32> = read::<f32>(accel, inst.rs1, vlen).to_vec();
    let out_len = ulen + vlen - 1;
    let out = write::<f32>(accel, inst.rd, out_len);
    out.fill(0.0);
    for (i, &xi) in x.iter().enumerate() {
        for (j, &hj) in h.iter().enumerate() {
            out[i + j] += xi * hj;
        }
    }
    ctx.advance();
}

/// Same shape as `Conv` on `I32`, with wrapping arithmetic instead of float.
pub fn fir(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let ulen = spec(accel, SpecReg::ULEN) as usize;
    let vlen = spec(accel, SpecReg::VLEN) as usize;
    let x: Vec<i32> = read::<i32>(accel, inst.rs0, ulen).to_vec();
    let h: Vec<i32> = read::<i32>(accel, inst.rs1, vlen).to_vec();
    let out_len = ulen + vlen - 1;
    let out = write::<i32>(accel, inst.rd, out_len);
    out.fill(0);
    for (i, &xi) in x.iter().enumerate() {
        for (j, &hj) in h.iter().enumerate() {
            out[i + j] = out[i + j].wrapping_add(xi.wrapping_mul(hj));
        }
    }
    ctx.advance();
}

/// `X[k] = sum_j x[j] * exp(-2*pi*i*k*j/N)`, a direct DFT (no FFT
/// factorization) over the complex-`F32` input of length `VLEN`.
pub fn fft(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let n = spec(accel, SpecReg::VLEN) as usize;
    let x: Vec<Complex32> = read::<Complex32>(accel, inst.rs0, n).to_vec();
    let out = write::<Complex32>(accel, inst.rd, n);
    for (k, ok) in out.iter_mut().enumerate() {
        let mut acc = Complex32::new(0.0, 0.0);
        for (j, &xj) in x.iter().enumerate() {
            let theta = -2.0 * PI * (k * j) as f64 / n as f64;
            acc += xj * Complex32::new(theta.cos() as f32, theta.sin() as f32);
        }
        *ok = acc;
    }
    ctx.advance();
}

/// Inverse DFT with the `1/N` normalization folded into the kernel.
pub fn ifft(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let n = spec(accel, SpecReg::VLEN) as usize;
    let x: Vec<Complex32> = read::<Complex32>(accel, inst.rs0, n).to_vec();
    let out = write::<Complex32>(accel, inst.rd, n);
    let norm = 1.0 / n as f32;
    for (k, ok) in out.iter_mut().enumerate() {
        let mut acc = Complex32::new(0.0, 0.0);
        for (j, &xj) in x.iter().enumerate() {
            let theta = 2.0 * PI * (k * j) as f64 / n as f64;
            acc += xj * Complex32::new(theta.cos() as f32, theta.sin() as f32);
        }
        *ok = acc * norm;
    }
    ctx.advance();
}

/// Digital down-converter: `out[i] = in[i] * exp(-2*pi*i * i * fc * Ts)` over
/// `X_SIZE` samples, taking a real input (a plain IF signal) to a complex
/// baseband output. `fc` and `Ts` are read as plain integers out of
/// `ULEN`/`VLEN` rather than any physically-scaled frequency/period — almost
/// certainly a numerical bug in the original firmware, but it's the
/// observable behavior preserved here rather than silently corrected (see
/// DESIGN.md).
pub fn ddc(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let n = spec(accel, SpecReg::X_SIZE) as usize;
    let fc = spec(accel, SpecReg::ULEN);
    let ts = spec(accel, SpecReg::VLEN);
    let x: Vec<f32> = read::<f32>(accel, inst.rs0, n).to_vec();
    let out = write::<Complex32>(accel, inst.rd, n);
    for (i, (&xi, oi)) in x.iter().zip(out.iter_mut()).enumerate() {
        let theta = -2.0 * PI * i as f64 * fc as f64 * ts as f64;
        *oi = Complex32::new(theta.cos() as f32, theta.sin() as f32) * xi;
    }
    ctx.advance();
}
