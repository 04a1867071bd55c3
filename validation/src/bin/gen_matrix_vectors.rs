//! Golden vectors for `Gemm`, driving the engine directly. Covers a fixed
//! hand-checkable case plus the zero-dimension edge case (any of
//! `X_SIZE`/`Y_SIZE`/`Z_SIZE` zero is a no-op, not an error).

use std::path::Path;

use rand::Rng;

use tvacc_core::accelerator::Accelerator;
use tvacc_core::elem::ElemTag;
use tvacc_core::inst::{CallUnit, Drive, Program};
use tvacc_core::spec_reg::SpecReg;

use tvacc_validation::{MatrixCase, write_fixture};

fn run_gemm_f32(x: usize, y: usize, z: usize, a: &[f32], b: &[f32]) -> Vec<f32> {
    let accel = Accelerator::new();
    let pa = accel.dram_alloc((a.len() * 4) as u32).unwrap();
    let pb = accel.dram_alloc((b.len() * 4) as u32).unwrap();
    let pc = accel.dram_alloc(((x * z).max(1) * 4) as u32).unwrap();
    accel.slice_mut::<f32>(pa as u64, a.len()).unwrap().copy_from_slice(a);
    accel.slice_mut::<f32>(pb as u64, b.len()).unwrap().copy_from_slice(b);
    if x * z > 0 {
        accel.slice_mut::<f32>(pc as u64, x * z).unwrap().fill(-1.0);
    }

    let mut program = Program::new();
    program.create_func(
        "DOIT",
        vec![
            Program::gemm_full(2, 0, 1, ElemTag::F32, 0, Drive::None, Drive::None),
            Program::ret(),
        ],
    );
    program.create_func(
        "MAIN",
        vec![
            Program::movi(0, pa as i64),
            Program::movi(1, pb as i64),
            Program::movi(2, pc as i64),
            Program::movid(SpecReg::X_SIZE.index(), x as i64),
            Program::movid(SpecReg::Y_SIZE.index(), y as i64),
            Program::movid(SpecReg::Z_SIZE.index(), z as i64),
            Program::call("DOIT", CallUnit::Mpu, 0, 0, 0),
            Program::ret(),
        ],
    );
    program.build();
    accel.run(program).unwrap();

    if x * z == 0 {
        Vec::new()
    } else {
        accel.slice::<f32>(pc as u64, x * z).unwrap().to_vec()
    }
}

fn main() {
    // 3x2 times 2x3 with integer-valued floats, hand-checkable.
    let a = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    let b = vec![7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0];
    let c = run_gemm_f32(3, 2, 3, &a, &b);
    let expected = vec![27.0, 30.0, 33.0, 61.0, 68.0, 75.0, 95.0, 106.0, 117.0];
    assert_eq!(c, expected, "fixed 3x2 times 2x3 GEMM.F32 must match the hand-checked product");
    write_fixture(
        Path::new("test_data/matrix/gemm_f32_3x2x3.json"),
        &MatrixCase {
            op: "GEMM".into(),
            elem: "F32".into(),
            x_size: 3,
            y_size: 2,
            z_size: 3,
            a: a.iter().map(|&v| v as f64).collect(),
            b: b.iter().map(|&v| v as f64).collect(),
            expected: c.iter().map(|&v| v as f64).collect(),
        },
    );

    // Random case at a larger size.
    let mut rng = rand::thread_rng();
    let (x, y, z) = (4usize, 3usize, 5usize);
    let ra: Vec<f32> = (0..x * y).map(|_| rng.gen_range(-10.0..10.0)).collect();
    let rb: Vec<f32> = (0..y * z).map(|_| rng.gen_range(-10.0..10.0)).collect();
    let rc = run_gemm_f32(x, y, z, &ra, &rb);
    let mut expected_rc = vec![0f32; x * z];
    for i in 0..x {
        for k in 0..y {
            for j in 0..z {
                expected_rc[i * z + j] += ra[i * y + k] * rb[k * z + j];
            }
        }
    }
    for (got, want) in rc.iter().zip(expected_rc.iter()) {
        assert!((got - want).abs() < 1e-2, "GEMM.F32 mismatch: {got} vs {want}");
    }
    write_fixture(
        Path::new("test_data/matrix/gemm_f32_random.json"),
        &MatrixCase {
            op: "GEMM".into(),
            elem: "F32".into(),
            x_size: x,
            y_size: y,
            z_size: z,
            a: ra.iter().map(|&v| v as f64).collect(),
            b: rb.iter().map(|&v| v as f64).collect(),
            expected: rc.iter().map(|&v| v as f64).collect(),
        },
    );

    // Zero-dimension edge case: X_SIZE == 0 means an empty destination, so
    // the kernel advances without touching memory at all.
    let c_zero = run_gemm_f32(0, 3, 2, &[], &[]);
    assert!(c_zero.is_empty(), "Gemm with any dimension zero must be a no-op, producing no writes");
    println!("wrote matrix golden vectors to test_data/matrix/");
}
