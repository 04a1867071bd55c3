//! Golden vectors for the elementwise vector opcodes' round-trip laws,
//! driving the engine directly (no host shim) the way a generator binary
//! drives the core engine directly.

use std::path::Path;

use rand::Rng;
use serde::Serialize;

use tvacc_core::accelerator::Accelerator;
use tvacc_core::elem::{Complex32, ElemTag};
use tvacc_core::inst::{CallUnit, Drive, Program};
use tvacc_core::spec_reg::SpecReg;

use tvacc_validation::{VectorCase, write_fixture};

const LEN: usize = 16;

fn run_vadd_then_vsub_i32(a: &[i32], b: &[i32]) -> (Vec<i32>, Vec<i32>) {
    let accel = Accelerator::new();
    let bytes = (LEN * 4) as u32;
    let pa = accel.dram_alloc(bytes).unwrap();
    let pb = accel.dram_alloc(bytes).unwrap();
    let psum = accel.dram_alloc(bytes).unwrap();
    let pdiff = accel.dram_alloc(bytes).unwrap();
    accel.slice_mut::<i32>(pa as u64, LEN).unwrap().copy_from_slice(a);
    accel.slice_mut::<i32>(pb as u64, LEN).unwrap().copy_from_slice(b);

    let mut program = Program::new();
    program.create_func(
        "DOIT",
        vec![
            Program::vadd(2, 0, 1, ElemTag::I32, 0, Drive::None, Drive::None),
            Program::vsub(3, 2, 1, ElemTag::I32, 0, Drive::None, Drive::None),
            Program::ret(),
        ],
    );
    program.create_func(
        "MAIN",
        vec![
            Program::movi(0, pa as i64),
            Program::movi(1, pb as i64),
            Program::movi(2, psum as i64),
            Program::movi(3, pdiff as i64),
            Program::movid(SpecReg::VLEN.index(), LEN as i64),
            Program::call("DOIT", CallUnit::Mpu, 0, 0, 0),
            Program::ret(),
        ],
    );
    program.build();
    accel.run(program).unwrap();

    let sum = accel.slice::<i32>(psum as u64, LEN).unwrap().to_vec();
    let diff = accel.slice::<i32>(pdiff as u64, LEN).unwrap().to_vec();
    (sum, diff)
}

fn run_vadd_then_vsub_f32(a: &[f32], b: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let accel = Accelerator::new();
    let bytes = (LEN * 4) as u32;
    let pa = accel.dram_alloc(bytes).unwrap();
    let pb = accel.dram_alloc(bytes).unwrap();
    let psum = accel.dram_alloc(bytes).unwrap();
    let pdiff = accel.dram_alloc(bytes).unwrap();
    accel.slice_mut::<f32>(pa as u64, LEN).unwrap().copy_from_slice(a);
    accel.slice_mut::<f32>(pb as u64, LEN).unwrap().copy_from_slice(b);

    let mut program = Program::new();
    program.create_func(
        "DOIT",
        vec![
            Program::vadd(2, 0, 1, ElemTag::F32, 0, Drive::None, Drive::None),
            Program::vsub(3, 2, 1, ElemTag::F32, 0, Drive::None, Drive::None),
            Program::ret(),
        ],
    );
    program.create_func(
        "MAIN",
        vec![
            Program::movi(0, pa as i64),
            Program::movi(1, pb as i64),
            Program::movi(2, psum as i64),
            Program::movi(3, pdiff as i64),
            Program::movid(SpecReg::VLEN.index(), LEN as i64),
            Program::call("DOIT", CallUnit::Mpu, 0, 0, 0),
            Program::ret(),
        ],
    );
    program.build();
    accel.run(program).unwrap();

    let sum = accel.slice::<f32>(psum as u64, LEN).unwrap().to_vec();
    let diff = accel.slice::<f32>(pdiff as u64, LEN).unwrap().to_vec();
    (sum, diff)
}

#[derive(Debug, Clone, Serialize)]
struct ComplexEntry {
    re: f32,
    im: f32,
}

fn run_vconj_twice_c32(a: &[Complex32]) -> Vec<Complex32> {
    let accel = Accelerator::new();
    let bytes = (LEN * 8) as u32;
    let pa = accel.dram_alloc(bytes).unwrap();
    let ptmp = accel.dram_alloc(bytes).unwrap();
    let pout = accel.dram_alloc(bytes).unwrap();
    accel.slice_mut::<Complex32>(pa as u64, LEN).unwrap().copy_from_slice(a);

    let mut program = Program::new();
    program.create_func(
        "DOIT",
        vec![
            Program::vconj(1, 0, ElemTag::C32, 0, Drive::None, Drive::None),
            Program::vconj(2, 1, ElemTag::C32, 0, Drive::None, Drive::None),
            Program::ret(),
        ],
    );
    program.create_func(
        "MAIN",
        vec![
            Program::movi(0, pa as i64),
            Program::movi(1, ptmp as i64),
            Program::movi(2, pout as i64),
            Program::movid(SpecReg::VLEN.index(), LEN as i64),
            Program::call("DOIT", CallUnit::Mpu, 0, 0, 0),
            Program::ret(),
        ],
    );
    program.build();
    accel.run(program).unwrap();
    accel.slice::<Complex32>(pout as u64, LEN).unwrap().to_vec()
}

fn main() {
    let mut rng = rand::thread_rng();

    let a_i32: Vec<i32> = (0..LEN).map(|_| rng.gen_range(-10_000..10_000)).collect();
    let b_i32: Vec<i32> = (0..LEN).map(|_| rng.gen_range(-10_000..10_000)).collect();
    let (sum_i32, diff_i32) = run_vadd_then_vsub_i32(&a_i32, &b_i32);
    assert_eq!(diff_i32, a_i32, "Vsub(Vadd(x,y),y) must recover x exactly for I32");
    write_fixture(
        Path::new("test_data/vector/vadd_vsub_i32.json"),
        &VectorCase {
            op: "VADD+VSUB".into(),
            elem: "I32".into(),
            vlen: LEN,
            lhs: a_i32.iter().map(|&v| v as f64).collect(),
            rhs: Some(b_i32.iter().map(|&v| v as f64).collect()),
            expected: sum_i32.iter().map(|&v| v as f64).collect(),
        },
    );

    let a_f32: Vec<f32> = (0..LEN).map(|_| rng.gen_range(-1000.0..1000.0)).collect();
    let b_f32: Vec<f32> = (0..LEN).map(|_| rng.gen_range(-1000.0..1000.0)).collect();
    let (sum_f32, diff_f32) = run_vadd_then_vsub_f32(&a_f32, &b_f32);
    for (d, a) in diff_f32.iter().zip(a_f32.iter()) {
        assert!((d - a).abs() < 1e-3, "Vsub(Vadd(x,y),y) must recover x within float tolerance for F32");
    }
    write_fixture(
        Path::new("test_data/vector/vadd_vsub_f32.json"),
        &VectorCase {
            op: "VADD+VSUB".into(),
            elem: "F32".into(),
            vlen: LEN,
            lhs: a_f32.iter().map(|&v| v as f64).collect(),
            rhs: Some(b_f32.iter().map(|&v| v as f64).collect()),
            expected: sum_f32.iter().map(|&v| v as f64).collect(),
        },
    );

    let a_c32: Vec<Complex32> = (0..LEN)
        .map(|_| Complex32::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)))
        .collect();
    let round_tripped = run_vconj_twice_c32(&a_c32);
    for (r, a) in round_tripped.iter().zip(a_c32.iter()) {
        assert!((r - a).norm() < 1e-3, "Vconj(Vconj(x)) must recover x for C32");
    }
    write_fixture(
        Path::new("test_data/vector/vconj_involution_c32.json"),
        &a_c32
            .iter()
            .map(|c| ComplexEntry { re: c.re, im: c.im })
            .collect::<Vec<_>>(),
    );

    println!("wrote vector golden vectors to test_data/vector/");
}
