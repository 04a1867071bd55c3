//! The IRQ -> kernel-name table and `wait_irq`'s packed-argument
//! prologue: a caller hands over a small struct of device pointers and
//! sizes, and this turns that into register-setup instructions plus a
//! call into the compute opcode bound to that interrupt line.

use tvacc_core::elem::ElemTag;
use tvacc_core::inst::{Drive, Instruction, Program};

use crate::error::HostError;
use crate::queue::CommandQueue;

pub const IRQ_FFT: u32 = 1;
pub const IRQ_IFFT: u32 = 2;
pub const IRQ_EXTR: u32 = 3;
pub const IRQ_VMULC32: u32 = 4;
pub const IRQ_FIR: u32 = 5;
pub const IRQ_DDC: u32 = 6;

fn kernel_name(irq: u32) -> &'static str {
    match irq {
        IRQ_FFT => "FFT",
        IRQ_IFFT => "IFFT",
        IRQ_EXTR => "EXTR",
        IRQ_VMULC32 => "VMULC32",
        IRQ_FIR => "FIR",
        IRQ_DDC => "DDC",
        _ => panic!("IRQ {irq} is not bound to a kernel"),
    }
}

/// The fixed MPU function bodies every program a `CommandQueue` builds
/// carries, one per IRQ-bound kernel. Each reads its operand pointers out
/// of the low general registers `wait_irq`'s prologue writes them into
/// directly, so `Call`'s register copy-down runs with `start = 0, count =
/// 0` — a no-op, since the registers are already in place.
pub fn mpu_functions() -> Vec<(&'static str, Vec<Instruction>)> {
    vec![
        (
            "FFT",
            vec![Program::fft(1, 0, 0, Drive::None, Drive::None), Program::ret()],
        ),
        (
            "IFFT",
            vec![Program::ifft(1, 0, 0, Drive::None, Drive::None), Program::ret()],
        ),
        (
            "EXTR",
            vec![Program::extr(1, 0, 0, Drive::None, Drive::None), Program::ret()],
        ),
        (
            "VMULC32",
            vec![
                Program::vmul(2, 0, 1, ElemTag::C32, 0, Drive::None, Drive::None),
                Program::ret(),
            ],
        ),
        (
            "FIR",
            vec![
                Program::fir(2, 0, 1, 0, Drive::None, Drive::None),
                Program::ret(),
            ],
        ),
        (
            "DDC",
            vec![Program::ddc(1, 0, 0, Drive::None, Drive::None), Program::ret()],
        ),
    ]
}

/// Packed argument payload for one `wait_irq` call. Which fields matter
/// depends on the kernel bound to `irq`; the rest are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct IrqArgs {
    pub in_ptr: u32,
    pub in_ptr2: u32,
    pub out_ptr: u32,
    pub len: i64,
    pub len2: i64,
    pub extra: i64,
}

/// Translate `args` into the MOVI/MOVID prologue the kernel bound to
/// `irq` expects, `CALL` into it, and `synchronize`. `timeout_ms` is
/// advisory: the core has no notion of wall-clock deadlines, so it is
/// accepted and ignored, matching the core's IRQ wait having no timeout
/// path of its own.
pub fn wait_irq(
    queue: &mut CommandQueue,
    irq: u32,
    _timeout_ms: u64,
    args: IrqArgs,
) -> Result<(), HostError> {
    let name = kernel_name(irq);
    match irq {
        IRQ_FFT | IRQ_IFFT => {
            queue.push_kernel(&format!("MOVI $0, #{:X}", args.in_ptr))?;
            queue.push_kernel(&format!("MOVI $1, #{:X}", args.out_ptr))?;
            queue.push_kernel(&format!("MOVID $VLEN, #{:X}", args.len))?;
        }
        IRQ_EXTR => {
            queue.push_kernel(&format!("MOVI $0, #{:X}", args.in_ptr))?;
            queue.push_kernel(&format!("MOVI $1, #{:X}", args.out_ptr))?;
            queue.push_kernel(&format!("MOVID $ULEN, #{:X}", args.len))?;
            queue.push_kernel(&format!("MOVID $X_SIZE, #{:X}", args.extra))?;
        }
        IRQ_VMULC32 => {
            queue.push_kernel(&format!("MOVI $0, #{:X}", args.in_ptr))?;
            queue.push_kernel(&format!("MOVI $1, #{:X}", args.in_ptr2))?;
            queue.push_kernel(&format!("MOVI $2, #{:X}", args.out_ptr))?;
            queue.push_kernel(&format!("MOVID $VLEN, #{:X}", args.len))?;
        }
        IRQ_FIR => {
            queue.push_kernel(&format!("MOVI $0, #{:X}", args.in_ptr))?;
            queue.push_kernel(&format!("MOVI $1, #{:X}", args.in_ptr2))?;
            queue.push_kernel(&format!("MOVI $2, #{:X}", args.out_ptr))?;
            queue.push_kernel(&format!("MOVID $ULEN, #{:X}", args.len))?;
            queue.push_kernel(&format!("MOVID $VLEN, #{:X}", args.len2))?;
        }
        IRQ_DDC => {
            queue.push_kernel(&format!("MOVI $0, #{:X}", args.in_ptr))?;
            queue.push_kernel(&format!("MOVI $1, #{:X}", args.out_ptr))?;
            queue.push_kernel(&format!("MOVID $X_SIZE, #{:X}", args.len))?;
            queue.push_kernel(&format!("MOVID $ULEN, #{:X}", args.len2))?;
            queue.push_kernel(&format!("MOVID $VLEN, #{:X}", args.extra))?;
        }
        _ => unreachable!("kernel_name would have already panicked"),
    }
    queue.push_kernel(&format!("CALL #{name}, #MPU, #0, #0"))?;
    queue.synchronize()
}
