//! `tvacc-host`: a small CLI that drives the accelerator core through the
//! same external interface a real host program would use, standing in for
//! a full C-ABI shim. Each subcommand runs one of a handful of concrete
//! end-to-end scenarios.

use clap::{Parser, Subcommand};
use rand::Rng;

use tvacc_core::accelerator::Accelerator;
use tvacc_core::elem::{Complex32, ElemTag};
use tvacc_core::inst::{CallUnit, Drive, Program};
use tvacc_core::memory::cache::BLOCK_IN;
use tvacc_core::memory::{CacheRegion, DRAM_BYTES};
use tvacc_core::spec_reg::SpecReg;

use tvacc_host::device::{alloc_buffer, copy_to_device, copy_to_host, free_buffer};
use tvacc_host::irq::{wait_irq, IrqArgs, IRQ_FFT, IRQ_IFFT, IRQ_VMULC32};
use tvacc_host::queue::CommandQueue;
use tvacc_host::HostError;

#[derive(Parser)]
#[command(
    name = "tvacc-host",
    about = "Host runtime driver for the tensor/vector accelerator core"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// vcmul -> fft -> vcmul -> ifft pipeline on complex-F32 vectors.
    Pipeline {
        #[arg(long, default_value_t = 10)]
        len: usize,
    },
    /// Standalone complex-F32 elementwise multiply via IRQ 4.
    Vmulc32 {
        #[arg(long, default_value_t = 10)]
        len: usize,
    },
    /// Padded 2-D MLOAD from DRAM into the cache's Input region.
    Mload,
    /// GEMM.F32, a 3x2 matrix times a 2x3 matrix.
    Gemm,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Pipeline { len } => run_pipeline(len),
        Command::Vmulc32 { len } => run_vmulc32(len),
        Command::Mload => run_mload(),
        Command::Gemm => run_gemm(),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_pipeline(len: usize) -> Result<(), HostError> {
    let accel = Accelerator::new();
    let mut queue = CommandQueue::new(accel.clone());

    let x1 = vec![Complex32::new(0.5, 0.0); len];
    let x2 = vec![Complex32::new(2.0, 3.0); len];
    let x3 = vec![Complex32::new(2.5, 0.0); len];

    let bytes = (len * std::mem::size_of::<Complex32>()) as u32;
    let p_x1 = alloc_buffer(&accel, bytes)?;
    let p_x2 = alloc_buffer(&accel, bytes)?;
    let p_x3 = alloc_buffer(&accel, bytes)?;
    let p_tmp1 = alloc_buffer(&accel, bytes)?;
    let p_tmp2 = alloc_buffer(&accel, bytes)?;
    let p_tmp3 = alloc_buffer(&accel, bytes)?;
    let p_out = alloc_buffer(&accel, bytes)?;

    copy_to_device(&accel, p_x1, &x1)?;
    copy_to_device(&accel, p_x2, &x2)?;
    copy_to_device(&accel, p_x3, &x3)?;

    wait_irq(
        &mut queue,
        IRQ_VMULC32,
        0,
        IrqArgs {
            in_ptr: p_x1.0,
            in_ptr2: p_x2.0,
            out_ptr: p_tmp1.0,
            len: len as i64,
            ..Default::default()
        },
    )?;
    wait_irq(
        &mut queue,
        IRQ_FFT,
        0,
        IrqArgs {
            in_ptr: p_tmp1.0,
            out_ptr: p_tmp2.0,
            len: len as i64,
            ..Default::default()
        },
    )?;
    wait_irq(
        &mut queue,
        IRQ_VMULC32,
        0,
        IrqArgs {
            in_ptr: p_tmp2.0,
            in_ptr2: p_x3.0,
            out_ptr: p_tmp3.0,
            len: len as i64,
            ..Default::default()
        },
    )?;
    wait_irq(
        &mut queue,
        IRQ_IFFT,
        0,
        IrqArgs {
            in_ptr: p_tmp3.0,
            out_ptr: p_out.0,
            len: len as i64,
            ..Default::default()
        },
    )?;

    let mut out = vec![Complex32::new(0.0, 0.0); len];
    copy_to_host(&accel, &mut out, p_out)?;

    let expected = Complex32::new(2.5, 3.75);
    let mse: f32 = out.iter().map(|o| (o - expected).norm_sqr()).sum::<f32>() / len as f32;
    println!(
        "pipeline: out[0] = {:?}, MSE against expected {:?} = {:.3e}",
        out[0], expected, mse
    );

    for p in [p_x1, p_x2, p_x3, p_tmp1, p_tmp2, p_tmp3, p_out] {
        free_buffer(&accel, p)?;
    }
    Ok(())
}

fn run_vmulc32(len: usize) -> Result<(), HostError> {
    let accel = Accelerator::new();
    let mut queue = CommandQueue::new(accel.clone());
    let mut rng = rand::thread_rng();

    let a: Vec<Complex32> = (0..len)
        .map(|_| Complex32::new(rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0)))
        .collect();
    let b: Vec<Complex32> = (0..len)
        .map(|_| Complex32::new(rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0)))
        .collect();

    let bytes = (len * std::mem::size_of::<Complex32>()) as u32;
    let pa = alloc_buffer(&accel, bytes)?;
    let pb = alloc_buffer(&accel, bytes)?;
    let pout = alloc_buffer(&accel, bytes)?;
    copy_to_device(&accel, pa, &a)?;
    copy_to_device(&accel, pb, &b)?;

    wait_irq(
        &mut queue,
        IRQ_VMULC32,
        0,
        IrqArgs {
            in_ptr: pa.0,
            in_ptr2: pb.0,
            out_ptr: pout.0,
            len: len as i64,
            ..Default::default()
        },
    )?;

    let mut out = vec![Complex32::new(0.0, 0.0); len];
    copy_to_host(&accel, &mut out, pout)?;

    let mse: f32 = a
        .iter()
        .zip(b.iter())
        .zip(out.iter())
        .map(|((&ai, &bi), &oi)| (oi - ai * bi).norm_sqr())
        .sum::<f32>()
        / len as f32;
    println!("vmulc32: MSE against a*b = {mse:.3e}");
    Ok(())
}

fn run_mload() -> Result<(), HostError> {
    let accel = Accelerator::new();

    let x_size = 3usize;
    let y_size = 2usize;
    let stride = 3usize;

    let row_bytes = (stride * BLOCK_IN * std::mem::size_of::<i32>()) as u32;
    let src = alloc_buffer(&accel, row_bytes * y_size as u32)?;
    let mut src_data = vec![0i32; stride * BLOCK_IN * y_size];
    for row in 0..y_size {
        for b in 0..BLOCK_IN {
            src_data[row * stride * BLOCK_IN + b] = (10 * row) as i32;
            src_data[row * stride * BLOCK_IN + BLOCK_IN + b] = (10 * row + 1) as i32;
            src_data[row * stride * BLOCK_IN + 2 * BLOCK_IN + b] = (10 * row + 2) as i32;
        }
    }
    copy_to_device(&accel, src, &src_data)?;

    let dst_cache = DRAM_BYTES + CacheRegion::Input.base();

    let mut program = Program::new();
    program.create_func("DOIT", vec![Program::mload(1, 0, 0), Program::ret()]);
    program.create_func(
        "MAIN",
        vec![
            Program::movi(0, src.0 as i64),
            Program::movi(1, dst_cache as i64),
            Program::movid(SpecReg::X_SIZE.index(), x_size as i64),
            Program::movid(SpecReg::Y_SIZE.index(), y_size as i64),
            Program::movid(SpecReg::X_STRIDE.index(), stride as i64),
            Program::movid(SpecReg::X_PAD_0.index(), 1),
            Program::movid(SpecReg::X_PAD_1.index(), 1),
            Program::movid(SpecReg::Y_PAD_0.index(), 0),
            Program::movid(SpecReg::Y_PAD_1.index(), 0),
            Program::call("DOIT", CallUnit::Mpu, 0, 0, 0),
            Program::ret(),
        ],
    );
    program.build();
    accel.run(program)?;

    let out_cols = 1 + x_size + 1;
    let out_rows = y_size;
    let cache_vals = accel.slice::<i32>(dst_cache, out_rows * out_cols * BLOCK_IN)?;
    for row in 0..out_rows {
        let row_vals: Vec<i32> = (0..out_cols)
            .map(|col| cache_vals[row * out_cols * BLOCK_IN + col * BLOCK_IN])
            .collect();
        println!("mload: cache row {row} (one lane per column) = {row_vals:?}");
    }
    Ok(())
}

fn run_gemm() -> Result<(), HostError> {
    let accel = Accelerator::new();
    let a = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    let b = vec![7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0];

    let pa = alloc_buffer(&accel, (a.len() * 4) as u32)?;
    let pb = alloc_buffer(&accel, (b.len() * 4) as u32)?;
    let pc = alloc_buffer(&accel, 9 * 4)?;
    copy_to_device(&accel, pa, &a)?;
    copy_to_device(&accel, pb, &b)?;

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
            Program::movi(0, pa.0 as i64),
            Program::movi(1, pb.0 as i64),
            Program::movi(2, pc.0 as i64),
            Program::movid(SpecReg::X_SIZE.index(), 3),
            Program::movid(SpecReg::Y_SIZE.index(), 2),
            Program::movid(SpecReg::Z_SIZE.index(), 3),
            Program::call("DOIT", CallUnit::Mpu, 0, 0, 0),
            Program::ret(),
        ],
    );
    program.build();
    accel.run(program)?;

    let mut c = vec![0f32; 9];
    copy_to_host(&accel, &mut c, pc)?;
    println!("gemm: C = {c:?}");
    Ok(())
}
