//! Golden vectors for the signal-processing opcodes: the `Fft`/`Ifft`
//! round-trip law from the testable properties, plus a hand-checked `Fir`
//! case.

use std::path::Path;

use rand::Rng;

use tvacc_core::accelerator::Accelerator;
use tvacc_core::elem::{Complex32, ElemTag};
use tvacc_core::inst::{CallUnit, Drive, Program};
use tvacc_core::spec_reg::SpecReg;

use tvacc_validation::{ComplexF64, SignalCase, write_fixture};

const N: usize = 12;

fn run_fft_then_ifft(x: &[Complex32]) -> Vec<Complex32> {
    let accel = Accelerator::new();
    let bytes = (N * 8) as u32;
    let px = accel.dram_alloc(bytes).unwrap();
    let pfreq = accel.dram_alloc(bytes).unwrap();
    let pback = accel.dram_alloc(bytes).unwrap();
    accel.slice_mut::<Complex32>(px as u64, N).unwrap().copy_from_slice(x);

    let mut program = Program::new();
    program.create_func(
        "DOIT",
        vec![
            Program::fft(1, 0, 0, Drive::None, Drive::None),
            Program::ifft(2, 1, 0, Drive::None, Drive::None),
            Program::ret(),
        ],
    );
    program.create_func(
        "MAIN",
        vec![
            Program::movi(0, px as i64),
            Program::movi(1, pfreq as i64),
            Program::movi(2, pback as i64),
            Program::movid(SpecReg::VLEN.index(), N as i64),
            Program::call("DOIT", CallUnit::Mpu, 0, 0, 0),
            Program::ret(),
        ],
    );
    program.build();
    accel.run(program).unwrap();
    accel.slice::<Complex32>(pback as u64, N).unwrap().to_vec()
}

fn run_fir_i32(x: &[i32], h: &[i32]) -> Vec<i32> {
    let accel = Accelerator::new();
    let px = accel.dram_alloc((x.len() * 4) as u32).unwrap();
    let ph = accel.dram_alloc((h.len() * 4) as u32).unwrap();
    let out_len = x.len() + h.len() - 1;
    let pout = accel.dram_alloc((out_len * 4) as u32).unwrap();
    accel.slice_mut::<i32>(px as u64, x.len()).unwrap().copy_from_slice(x);
    accel.slice_mut::<i32>(ph as u64, h.len()).unwrap().copy_from_slice(h);

    let mut program = Program::new();
    program.create_func(
        "DOIT",
        vec![Program::fir(2, 0, 1, 0, Drive::None, Drive::None), Program::ret()],
    );
    program.create_func(
        "MAIN",
        vec![
            Program::movi(0, px as i64),
            Program::movi(1, ph as i64),
            Program::movi(2, pout as i64),
            Program::movid(SpecReg::ULEN.index(), x.len() as i64),
            Program::movid(SpecReg::VLEN.index(), h.len() as i64),
            Program::call("DOIT", CallUnit::Mpu, 0, 0, 0),
            Program::ret(),
        ],
    );
    program.build();
    accel.run(program).unwrap();
    accel.slice::<i32>(pout as u64, out_len).unwrap().to_vec()
}

fn complex_vec(v: &[Complex32]) -> Vec<ComplexF64> {
    v.iter().map(|c| ComplexF64::new(c.re as f64, c.im as f64)).collect()
}

fn main() {
    let mut rng = rand::thread_rng();
    let x: Vec<Complex32> = (0..N)
        .map(|_| Complex32::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)))
        .collect();
    let recovered = run_fft_then_ifft(&x);
    let mse: f64 = x
        .iter()
        .zip(recovered.iter())
        .map(|(a, b)| (a - b).norm_sqr() as f64)
        .sum::<f64>()
        / N as f64;
    assert!(mse < 1e-3, "Ifft(Fft(x)) must recover x up to floating-point error, got MSE {mse}");
    write_fixture(
        Path::new("test_data/signal/fft_ifft_roundtrip_c32.json"),
        &SignalCase {
            op: "FFT+IFFT".into(),
            ulen: 0,
            vlen: N,
            input: complex_vec(&x),
            kernel: None,
            expected: complex_vec(&recovered),
            mse: Some(mse),
        },
    );

    let x_i32 = vec![1, 2, 3, 4, 5];
    let h_i32 = vec![1, 0, -1];
    let conv = run_fir_i32(&x_i32, &h_i32);
    let expected = vec![1, 2, 2, 2, 2, -4, -5];
    assert_eq!(conv, expected, "Fir must match the hand-checked linear convolution");
    write_fixture(
        Path::new("test_data/signal/fir_i32.json"),
        &SignalCase {
            op: "FIR".into(),
            ulen: x_i32.len(),
            vlen: h_i32.len(),
            input: x_i32.iter().map(|&v| ComplexF64::new(v as f64, 0.0)).collect(),
            kernel: Some(h_i32.iter().map(|&v| ComplexF64::new(v as f64, 0.0)).collect()),
            expected: conv.iter().map(|&v| ComplexF64::new(v as f64, 0.0)).collect(),
            mse: None,
        },
    );

    println!("wrote signal golden vectors to test_data/signal/");
}
