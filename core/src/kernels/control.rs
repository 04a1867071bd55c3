//! Control-flow, ALU, and housekeeping kernels.
//!
//! These are the opcodes whose unit is always `Basic` rather than `AI` —
//! they never touch a path and are never subject to the data-forwarding
//! fusion pass in [`crate::inst::Program::build`].

use log::debug;

use crate::accelerator::Accelerator;
use crate::inst::{CallUnit, Instruction, Params};
use crate::memory::{CacheRegion, DRAM_BYTES};
use crate::spec_reg::SpecReg;
use crate::unit::UnitContext;

use super::{addr, spec};

pub fn mov(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let v = accel
        .general()
        .get(inst.rs0)
        .expect("register index checked at assembly time");
    accel
        .general()
        .set(inst.rd, v)
        .expect("register index checked at assembly time");
    ctx.advance();
}

pub fn movi(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let imm = match inst.params {
        Params::Imm(v) => v,
        _ => unreachable!("MOVI without an immediate operand"),
    };
    accel
        .general()
        .set(inst.rd, imm)
        .expect("register index checked at assembly time");
    ctx.advance();
}

pub fn movid(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let imm = match inst.params {
        Params::Imm(v) => v,
        _ => unreachable!("MOVID without an immediate operand"),
    };
    accel
        .special()
        .set(inst.rd, imm)
        .expect("register index checked at assembly time");
    ctx.advance();
}

/// Load a special register (`rs0`) into a general register (`rd`).
pub fn dmovi(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let v = accel
        .special()
        .get(inst.rs0)
        .expect("register index checked at assembly time");
    accel
        .general()
        .set(inst.rd, v)
        .expect("register index checked at assembly time");
    ctx.advance();
}

/// Store a general register (`rs0`) into a special register (`rd`).
pub fn dmovo(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let v = accel
        .general()
        .get(inst.rs0)
        .expect("register index checked at assembly time");
    accel
        .special()
        .set(inst.rd, v)
        .expect("register index checked at assembly time");
    ctx.advance();
}

/// Load a 32-bit word from DRAM (addressed by `rs0`) into a general register.
pub fn xmovi(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let src = addr(accel, inst.rs0);
    let v = accel.slice::<i32>(src, 1).expect("XMOVI out of bounds")[0];
    accel
        .general()
        .set(inst.rd, v as i64)
        .expect("register index checked at assembly time");
    ctx.advance();
}

/// Store a general register's low 32 bits to DRAM (addressed by `rd`).
pub fn xmovo(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let v = accel
        .general()
        .get(inst.rs0)
        .expect("register index checked at assembly time");
    let dst = addr(accel, inst.rd);
    accel.slice_mut::<i32>(dst, 1).expect("XMOVO out of bounds")[0] = v as i32;
    ctx.advance();
}

macro_rules! alu_reg_op {
    ($name:ident, $f:expr) => {
        pub fn $name(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
            let a = accel
                .general()
                .get(inst.rs0)
                .expect("register index checked at assembly time");
            let b = accel
                .general()
                .get(inst.rs1)
                .expect("register index checked at assembly time");
            let f: fn(i64, i64) -> i64 = $f;
            accel
                .general()
                .set(inst.rd, f(a, b))
                .expect("register index checked at assembly time");
            ctx.advance();
        }
    };
}

macro_rules! alu_imm_op {
    ($name:ident, $f:expr) => {
        pub fn $name(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
            let a = accel
                .general()
                .get(inst.rs0)
                .expect("register index checked at assembly time");
            let imm = match inst.params {
                Params::Imm(v) => v,
                _ => unreachable!("immediate ALU op without an immediate operand"),
            };
            let f: fn(i64, i64) -> i64 = $f;
            accel
                .general()
                .set(inst.rd, f(a, imm))
                .expect("register index checked at assembly time");
            ctx.advance();
        }
    };
}

alu_reg_op!(add, |a, b| a.wrapping_add(b));
alu_reg_op!(sub, |a, b| a.wrapping_sub(b));
alu_reg_op!(mul, |a, b| a.wrapping_mul(b));
// Historically named "set less/greater than"; the source actually computes
// min/max. Preserved as observed.
alu_reg_op!(slt, |a, b| a.min(b));
alu_reg_op!(sgt, |a, b| a.max(b));
alu_reg_op!(or, |a, b| a | b);
alu_reg_op!(and, |a, b| a & b);
alu_reg_op!(xor, |a, b| a ^ b);
// Srl/Sll shift the opposite direction of their names in the source; the
// observed direction is preserved rather than the mnemonic's implication.
alu_reg_op!(srl, |a, b| a.wrapping_shl(b as u32));
alu_reg_op!(sll, |a, b| a.wrapping_shr(b as u32));

alu_imm_op!(addi, |a, b| a.wrapping_add(b));
alu_imm_op!(subi, |a, b| a.wrapping_sub(b));
alu_imm_op!(muli, |a, b| a.wrapping_mul(b));
alu_imm_op!(slti, |a, b| a.min(b));
alu_imm_op!(sgti, |a, b| a.max(b));
alu_imm_op!(ori, |a, b| a | b);
alu_imm_op!(andi, |a, b| a & b);
alu_imm_op!(xori, |a, b| a ^ b);
alu_imm_op!(srli, |a, b| a.wrapping_shl(b as u32));
alu_imm_op!(slli, |a, b| a.wrapping_shr(b as u32));

fn take_branch(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction, taken: bool) {
    if taken {
        let label = match &inst.params {
            Params::Label(l) => l,
            Params::BranchImm { label, .. } => label,
            _ => unreachable!("branch without a target label"),
        };
        ctx.set_pc(accel.program().get_pc(label));
    } else {
        ctx.advance();
    }
}

macro_rules! branch_reg_op {
    ($name:ident, $cmp:expr) => {
        pub fn $name(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
            let a = accel
                .general()
                .get(inst.rs0)
                .expect("register index checked at assembly time") as i32;
            let b = accel
                .general()
                .get(inst.rs1)
                .expect("register index checked at assembly time") as i32;
            let cmp: fn(i32, i32) -> bool = $cmp;
            take_branch(accel, ctx, inst, cmp(a, b));
        }
    };
}

macro_rules! branch_imm_op {
    ($name:ident, $cmp:expr) => {
        pub fn $name(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
            let a = accel
                .general()
                .get(inst.rs0)
                .expect("register index checked at assembly time") as i32;
            let imm = match &inst.params {
                Params::BranchImm { imm, .. } => *imm as i32,
                _ => unreachable!("immediate branch without an immediate operand"),
            };
            let cmp: fn(i32, i32) -> bool = $cmp;
            take_branch(accel, ctx, inst, cmp(a, imm));
        }
    };
}

branch_reg_op!(beq, |a, b| a == b);
branch_reg_op!(bne, |a, b| a != b);
branch_reg_op!(blt, |a, b| a < b);
// "branch if not less" i.e. greater-or-equal.
branch_reg_op!(bnl, |a, b| a >= b);

branch_imm_op!(beqi, |a, b| a == b);
branch_imm_op!(bnei, |a, b| a != b);
branch_imm_op!(blti, |a, b| a < b);
branch_imm_op!(bnli, |a, b| a >= b);

pub fn jmp(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    accel
        .general()
        .set(inst.rd, (ctx.pc() + 1) as i64)
        .expect("register index checked at assembly time");
    let label = match &inst.params {
        Params::Label(l) => l,
        _ => unreachable!("JMP without a target label"),
    };
    ctx.set_pc(accel.program().get_pc(label));
}

pub fn jmpr(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    accel
        .general()
        .set(inst.rd, (ctx.pc() + 1) as i64)
        .expect("register index checked at assembly time");
    let target = accel
        .general()
        .get(inst.rs0)
        .expect("register index checked at assembly time") as usize;
    ctx.set_pc(target);
}

pub fn call(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let (target, unit, start, count) = match &inst.params {
        Params::Call {
            target,
            unit,
            start,
            count,
        } => (target.clone(), *unit, *start, *count),
        _ => unreachable!("CALL without call parameters"),
    };
    for k in 0..count {
        let v = accel
            .general()
            .get(start + k)
            .expect("register index checked at assembly time");
        accel
            .general()
            .set(k, v)
            .expect("register index checked at assembly time");
    }
    let target_pc = accel.program().get_pc(&target);
    match unit {
        CallUnit::Mpu => {
            accel.mpu().wait_idle();
            accel.mpu().run(target_pc);
            ctx.advance();
        }
        CallUnit::Cu => {
            accel
                .special()
                .set_named(SpecReg::RET, (ctx.pc() + 1) as i64);
            ctx.set_pc(target_pc);
        }
    }
}

/// Only ever dispatched by the CU: the MPU's loop intercepts `Tag::Ret`
/// before invoking a kernel at all (see `crate::mpu`), so this body only
/// ever runs the top-level/nested-call-return semantics.
pub fn ret(accel: &Accelerator, ctx: &mut dyn UnitContext, _inst: &Instruction) {
    let ret_pc = accel.special().get_named(SpecReg::RET) as usize;
    let program_len = accel.program().len();
    if ret_pc == program_len {
        accel.mpu().wait_idle();
        while accel.lsu().running() {
            std::thread::yield_now();
        }
        ctx.set_pc(program_len);
    } else {
        accel
            .special()
            .set_named(SpecReg::RET, program_len as i64);
        ctx.set_pc(ret_pc);
    }
}

pub fn fence(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    accel
        .paths()
        .get(inst.path)
        .expect("path index checked at assembly time")
        .wait();
    ctx.advance();
}

pub fn memset(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let dst = addr(accel, inst.rd);
    let len = accel
        .general()
        .get(inst.rs0)
        .expect("register index checked at assembly time") as usize;
    let val = accel
        .general()
        .get(inst.rs1)
        .expect("register index checked at assembly time") as i32;
    let out = accel
        .slice_mut::<i32>(dst, len)
        .expect("MEMSET out of bounds");
    out.fill(val);
    ctx.advance();
}

fn cpool_addr(accel: &Accelerator, region: CacheRegion, offset_reg: SpecReg) -> u64 {
    let offset = spec(accel, offset_reg) as u64;
    DRAM_BYTES + region.base() + offset
}

macro_rules! cpool_op {
    ($name:ident, $f:expr) => {
        pub fn $name(accel: &Accelerator, ctx: &mut dyn UnitContext, _inst: &Instruction) {
            let extent = spec(accel, SpecReg::EXTENT) as usize;
            let accum_addr = cpool_addr(accel, CacheRegion::Accum, SpecReg::ACCUM_OFFSET);
            let const_addr = cpool_addr(accel, CacheRegion::Const, SpecReg::CONST_OFFSET);
            let c: Vec<i32> = accel
                .slice::<i32>(const_addr, extent)
                .expect("c-pool read out of bounds")
                .to_vec();
            let a = accel
                .slice_mut::<i32>(accum_addr, extent)
                .expect("c-pool write out of bounds");
            let f: fn(i32, i32) -> i32 = $f;
            for i in 0..extent {
                a[i] = f(a[i], c[i]);
            }
            ctx.advance();
        }
    };
}

macro_rules! cpool_imm_op {
    ($name:ident, $f:expr) => {
        pub fn $name(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
            let imm = match inst.params {
                Params::Imm(v) => v as i32,
                _ => unreachable!("c-pool immediate op without an immediate operand"),
            };
            let extent = spec(accel, SpecReg::EXTENT) as usize;
            let accum_addr = cpool_addr(accel, CacheRegion::Accum, SpecReg::ACCUM_OFFSET);
            let a = accel
                .slice_mut::<i32>(accum_addr, extent)
                .expect("c-pool write out of bounds");
            let f: fn(i32, i32) -> i32 = $f;
            for v in a.iter_mut() {
                *v = f(*v, imm);
            }
            ctx.advance();
        }
    };
}

cpool_op!(c_add, |a, c| a.wrapping_add(c));
cpool_op!(c_shr, |a, c| a >> (c & 63));
cpool_op!(c_min, |a, c| a.min(c));
cpool_op!(c_max, |a, c| a.max(c));

cpool_imm_op!(c_addi, |a, imm| a.wrapping_add(imm));
cpool_imm_op!(c_shri, |a, imm| a >> (imm & 63));
cpool_imm_op!(c_mini, |a, imm| a.min(imm));
cpool_imm_op!(c_maxi, |a, imm| a.max(imm));

pub fn display(accel: &Accelerator, ctx: &mut dyn UnitContext, inst: &Instruction) {
    let msg = match &inst.params {
        Params::Text(s) => s.as_str(),
        _ => "",
    };
    let v = accel
        .general()
        .get(inst.rs0)
        .expect("register index checked at assembly time");
    debug!("{}: {}", msg, v);
    ctx.advance();
}
