//! Instruction records and the program builder.
//!
//! The original firmware represented an instruction as a small struct
//! carrying a `std::function<void(Unit*)>` kernel closure plus a handful of
//! tag/operand fields, and built programs by calling one factory method per
//! opcode that returned a freshly `new`'d instruction for the caller to push
//! into a function body. We keep exactly that shape — a flat struct plus a
//! `fn` kernel pointer (no captured state is ever needed; every kernel reads
//! its operands from the instruction and the accelerator it's given) — but
//! push the ~60 opcode factories through a handful of macros so the
//! per-element-type explosion doesn't have to be typed out by hand sixty
//! times over.

use std::collections::HashMap;

use log::{trace, warn};

use crate::accelerator::Accelerator;
use crate::elem::ElemTag;
use crate::error::ProgramError;
use crate::kernels::{control, matrix, signal, vector};
use crate::spec_reg::SpecReg;
use crate::unit::UnitContext;

/// The general-register index Build's data-forwarding fusion rewrites chain
/// intermediates to. Reuses [`SpecReg::FWD_TMP`]'s numeric slot as a
/// well-known *general*-register index — the original keeps one flat `int`
/// constant and indexes whichever register file happens to be in play, so a
/// single numeric alias serves both here.
pub const FWD_TMP_REG: u32 = SpecReg::FWD_TMP as u32;

/// A kernel body. Mutates accelerator state (registers, memories) and the
/// calling unit's program counter via `ctx`; never returns a recoverable
/// error (see `crate::error` module docs for why).
pub type KernelFn = fn(&Accelerator, &mut dyn UnitContext, &Instruction);

/// Which of the three instruction shapes a record is. Only `Ai` records
/// carry a meaningful path/driver/driven; `Build`'s fusion pass and path-
/// count computation both gate on this.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InstKind {
    /// Consumed by `Program::create_func` before the function body is
    /// appended to the instruction list; never itself stored.
    Label,
    Basic,
    Ai,
}

/// Semantic tag, orthogonal to [`InstKind`] — e.g. `Fence` is `Ai`-kind (it
/// carries a path id) but tagged `Fence` rather than one of the compute/
/// memory tags.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tag {
    None,
    Call,
    Ret,
    Fence,
    Load,
    Store,
    MatCompute,
    VecCompute,
}

/// Producer/consumer kind of an AI instruction's operand stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Drive {
    None,
    Inst,
    Data,
    Exu,
    Mem,
}

/// Which unit a `Call` dispatches to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CallUnit {
    Mpu,
    Cu,
}

/// The operand payload an instruction's kernel needs beyond its three
/// register indices. Most opcodes need none of this; branches, calls, and
/// immediates do.
#[derive(Clone, Debug)]
pub enum Params {
    None,
    Imm(i64),
    Label(String),
    BranchImm { label: String, imm: i64 },
    Call {
        target: String,
        unit: CallUnit,
        start: u32,
        count: u32,
    },
    Text(String),
}

pub struct Instruction {
    pub name: &'static str,
    pub kind: InstKind,
    pub tag: Tag,
    pub rd: u32,
    pub rs0: u32,
    pub rs1: u32,
    pub path: usize,
    pub driver: Drive,
    pub driven: Drive,
    pub params: Params,
    pub kernel: KernelFn,
}

fn label_unreachable(_accel: &Accelerator, _ctx: &mut dyn UnitContext, _inst: &Instruction) {
    unreachable!("a Label instruction's kernel is never invoked; create_func consumes it first")
}

impl Instruction {
    pub fn label(name: &'static str) -> Self {
        Instruction {
            name,
            kind: InstKind::Label,
            tag: Tag::None,
            rd: 0,
            rs0: 0,
            rs1: 0,
            path: 0,
            driver: Drive::None,
            driven: Drive::None,
            params: Params::Label(name.to_string()),
            kernel: label_unreachable,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn basic(
        name: &'static str,
        tag: Tag,
        rd: u32,
        rs0: u32,
        rs1: u32,
        params: Params,
        kernel: KernelFn,
    ) -> Self {
        Instruction {
            name,
            kind: InstKind::Basic,
            tag,
            rd,
            rs0,
            rs1,
            path: 0,
            driver: Drive::None,
            driven: Drive::None,
            params,
            kernel,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn ai(
        name: &'static str,
        tag: Tag,
        rd: u32,
        rs0: u32,
        rs1: u32,
        path: usize,
        driver: Drive,
        driven: Drive,
        params: Params,
        kernel: KernelFn,
    ) -> Self {
        Instruction {
            name,
            kind: InstKind::Ai,
            tag,
            rd,
            rs0,
            rs1,
            path,
            driver,
            driven,
            params,
            kernel,
        }
    }

    /// The label this instruction jumps/calls to, if it has one.
    pub fn label_target(&self) -> Option<&str> {
        match &self.params {
            Params::Label(l) => Some(l),
            Params::BranchImm { label, .. } => Some(label),
            Params::Call { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Picks the right monomorphized kernel for an element-typed opcode family.
/// Each macro-generated factory passes a small table of `(ElemTag, KernelFn)`
/// built from this.
fn require_kernel(op: &str, tag: ElemTag, table: &[(ElemTag, KernelFn)]) -> KernelFn {
    table
        .iter()
        .find(|(t, _)| *t == tag)
        .unwrap_or_else(|| panic!("{op} has no kernel for element type {tag:?}"))
        .1
}

/// Ordered instruction list plus the label -> index map `create_func` builds
/// and `Build` finalizes. Mirrors the original `Program`'s two-phase
/// lifecycle: functions are assembled one at a time, then the whole program
/// is built once (fusing data-forwarding chains, validating `MAIN`).
#[derive(Default)]
pub struct Program {
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
    errors: Vec<ProgramError>,
    built: bool,
    path_num: usize,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    /// Declare a function named `name` whose body is `body`, in program
    /// order. `Label` instructions in `body` are bound to their eventual
    /// instruction index and dropped; everything else is appended as-is.
    pub fn create_func(&mut self, name: &str, body: Vec<Instruction>) {
        if self.labels.contains_key(name) {
            self.errors.push(ProgramError::DuplicateName(name.to_string()));
            return;
        }
        let start = self.instructions.len();
        self.labels.insert(name.to_string(), start);

        let mut saw_ret = false;
        for inst in body {
            match inst.kind {
                InstKind::Label => {
                    let label_name = inst.name.to_string();
                    let idx = self.instructions.len();
                    if self.labels.insert(label_name.clone(), idx).is_some() {
                        self.errors.push(ProgramError::DuplicateLabel(label_name));
                    }
                }
                _ => {
                    if inst.tag == Tag::Ret {
                        saw_ret = true;
                    }
                    if inst.tag == Tag::Call && name != "MAIN" {
                        self.errors
                            .push(ProgramError::CallOutsideMain(name.to_string()));
                    }
                    self.instructions.push(inst);
                }
            }
        }
        if !saw_ret {
            self.errors.push(ProgramError::MissingRet(name.to_string()));
        }
        trace!("create_func({name}): {} instructions", self.instructions.len() - start);
    }

    /// Finalize the program: compute the path count, fuse data-forwarding
    /// chains, and validate the entry point. Idempotent — see
    /// [`Program::fuse_chains`] for why a second call is a no-op.
    pub fn build(&mut self) {
        self.path_num = self
            .instructions
            .iter()
            .filter(|i| i.kind == InstKind::Ai)
            .map(|i| i.path + 1)
            .max()
            .unwrap_or(0);

        self.fuse_chains();

        if !self.labels.contains_key("MAIN") {
            self.errors.push(ProgramError::NoEntryPoint);
        }
        self.built = true;
        if !self.errors.is_empty() {
            warn!("Program::build produced {} error(s)", self.errors.len());
        }
    }

    /// Rewrite maximal `Data+ Inst` AI chains to stream through
    /// [`FWD_TMP_REG`] instead of a real intermediate buffer.
    ///
    /// The chain is keyed on `driver_` (the producer marker), not `driven_`:
    /// a run starts at the first AI instruction with `driver == Data` and
    /// extends until (not including) the AI instruction with `driver ==
    /// Inst` that terminates it. That terminator is then promoted to the
    /// *front* of the run — it becomes the chain's new head, executing
    /// first and writing `FWD_TMP` from its own untouched source register —
    /// while the Data-driven run that used to precede it now follows,
    /// streaming through `FWD_TMP` in its original order, with the last
    /// data link inheriting the terminator's original `rd` as the chain's
    /// real sink. Physically this is a single `rotate_right(1)` of the
    /// `[run..=terminator]` span. A single left-to-right pass; confluent
    /// because every rewritten instruction's `driver`/`driven` are cleared
    /// to `None` as part of the rewrite, so re-running `build` never
    /// re-matches an already-fused chain.
    fn fuse_chains(&mut self) {
        let mut i = 0;
        while i < self.instructions.len() {
            if self.instructions[i].kind == InstKind::Ai && self.instructions[i].driver == Drive::Data {
                let start = i;
                let mut j = i;
                while j < self.instructions.len()
                    && self.instructions[j].kind == InstKind::Ai
                    && self.instructions[j].driver != Drive::Inst
                {
                    j += 1;
                }
                if j < self.instructions.len()
                    && self.instructions[j].kind == InstKind::Ai
                    && self.instructions[j].driver == Drive::Inst
                {
                    // [start, j) is the Data-driven run; `j` is the
                    // Inst-driven terminator that becomes the new head.
                    let sink_rd = self.instructions[j].rd;
                    self.instructions[j].rd = FWD_TMP_REG;
                    self.instructions[j].driver = Drive::None;
                    self.instructions[j].driven = Drive::None;
                    for k in start..j {
                        self.instructions[k].rs0 = FWD_TMP_REG;
                        self.instructions[k].rd = FWD_TMP_REG;
                        self.instructions[k].driver = Drive::None;
                        self.instructions[k].driven = Drive::None;
                    }
                    // The last data link (program order) is the chain's
                    // real sink, not FWD_TMP.
                    self.instructions[j - 1].rd = sink_rd;

                    // Promote the terminator to the front of the span.
                    self.instructions[start..=j].rotate_right(1);

                    i = j + 1;
                    continue;
                }
            }
            i += 1;
        }
    }

    pub fn valid(&self) -> bool {
        self.built && self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ProgramError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn path_num(&self) -> usize {
        self.path_num
    }

    pub fn get(&self, pc: usize) -> &Instruction {
        &self.instructions[pc]
    }

    /// Resolve a label to its instruction index. Out-of-bounds lookups are a
    /// programmer error (a malformed build, or calling before `build()`) and
    /// panic rather than thread a `Result` through every kernel.
    pub fn get_pc(&self, label: &str) -> usize {
        *self
            .labels
            .get(label)
            .unwrap_or_else(|| panic!("unknown label `{label}`; program not built correctly"))
    }
}

// ---------------------------------------------------------------------
// Opcode factories
// ---------------------------------------------------------------------
//
// Grouped by shape. Each macro takes the mnemonic's printable name, its
// `Tag`, and a `[(ElemTag, KernelFn); N]` table built from the generic
// kernel bodies in `crate::kernels`; the factory itself just resolves the
// table entry for the caller's requested `ElemTag` and wraps it in an
// `Instruction::ai`/`basic`.

macro_rules! elem_table {
    ($($tag:expr => $f:expr),+ $(,)?) => {
        &[$(($tag, $f as KernelFn)),+]
    };
}

impl Program {
    // -- control flow / ALU / housekeeping (all Basic) ------------------

    pub fn mov(rd: u32, rs0: u32) -> Instruction {
        Instruction::basic("MOV", Tag::None, rd, rs0, 0, Params::None, control::mov)
    }
    pub fn movi(rd: u32, imm: i64) -> Instruction {
        Instruction::basic("MOVI", Tag::None, rd, 0, 0, Params::Imm(imm), control::movi)
    }
    pub fn movid(rd: u32, imm: i64) -> Instruction {
        Instruction::basic("MOVID", Tag::None, rd, 0, 0, Params::Imm(imm), control::movid)
    }
    pub fn dmovi(rd: u32, rs0: u32) -> Instruction {
        Instruction::basic("DMOVI", Tag::None, rd, rs0, 0, Params::None, control::dmovi)
    }
    pub fn dmovo(rd: u32, rs0: u32) -> Instruction {
        Instruction::basic("DMOVO", Tag::None, rd, rs0, 0, Params::None, control::dmovo)
    }
    pub fn xmovi(rd: u32, rs0: u32) -> Instruction {
        Instruction::basic("XMOVI", Tag::None, rd, rs0, 0, Params::None, control::xmovi)
    }
    pub fn xmovo(rd: u32, rs0: u32) -> Instruction {
        Instruction::basic("XMOVO", Tag::None, rd, rs0, 0, Params::None, control::xmovo)
    }

    /// Not emitted by any current factory in the original source (returns a
    /// null instruction there) — `Halt` is a reserved unit state with no
    /// wired-up opcode. Kept as an explicit unimplemented stub rather than a
    /// real kernel, matching the original's behavior at this call site.
    pub fn halt() -> Instruction {
        unimplemented!("HALT is a reserved opcode the original device never wires up")
    }

    pub fn memset(dst: u32, len_reg: u32, val_reg: u32) -> Instruction {
        Instruction::basic(
            "MEMSET",
            Tag::None,
            dst,
            len_reg,
            val_reg,
            Params::None,
            control::memset,
        )
    }

    pub fn display(msg: &'static str, rs0: u32) -> Instruction {
        Instruction::basic(
            "DISPLAY",
            Tag::None,
            0,
            rs0,
            0,
            Params::Text(msg.to_string()),
            control::display,
        )
    }

    pub fn fence(path: usize) -> Instruction {
        Instruction::ai(
            "FENCE",
            Tag::Fence,
            0,
            0,
            0,
            path,
            Drive::None,
            Drive::None,
            Params::None,
            control::fence,
        )
    }

    pub fn ret() -> Instruction {
        Instruction::basic("RET", Tag::Ret, 0, 0, 0, Params::None, control::ret)
    }

    pub fn jmp(rd: u32, label: &str) -> Instruction {
        Instruction::basic(
            "JMP",
            Tag::None,
            rd,
            0,
            0,
            Params::Label(label.to_string()),
            control::jmp,
        )
    }
    pub fn jmpr(rd: u32, rs0: u32) -> Instruction {
        Instruction::basic("JMPR", Tag::None, rd, rs0, 0, Params::None, control::jmpr)
    }

    pub fn call(target: &str, unit: CallUnit, path: usize, start: u32, count: u32) -> Instruction {
        Instruction::ai(
            "CALL",
            Tag::Call,
            0,
            0,
            0,
            path,
            Drive::None,
            Drive::None,
            Params::Call {
                target: target.to_string(),
                unit,
                start,
                count,
            },
            control::call,
        )
    }
}

macro_rules! alu_reg_factory {
    ($method:ident, $name:literal, $f:path) => {
        impl Program {
            pub fn $method(rd: u32, rs0: u32, rs1: u32) -> Instruction {
                Instruction::basic($name, Tag::None, rd, rs0, rs1, Params::None, $f)
            }
        }
    };
}

macro_rules! alu_imm_factory {
    ($method:ident, $name:literal, $f:path) => {
        impl Program {
            pub fn $method(rd: u32, rs0: u32, imm: i64) -> Instruction {
                Instruction::basic($name, Tag::None, rd, rs0, 0, Params::Imm(imm), $f)
            }
        }
    };
}

alu_reg_factory!(add, "ADD", control::add);
alu_reg_factory!(sub, "SUB", control::sub);
alu_reg_factory!(mul, "MUL", control::mul);
alu_reg_factory!(slt, "SLT", control::slt);
alu_reg_factory!(sgt, "SGT", control::sgt);
alu_reg_factory!(or, "OR", control::or);
alu_reg_factory!(and, "AND", control::and);
alu_reg_factory!(xor, "XOR", control::xor);
alu_reg_factory!(srl, "SRL", control::srl);
alu_reg_factory!(sll, "SLL", control::sll);

alu_imm_factory!(addi, "ADDI", control::addi);
alu_imm_factory!(subi, "SUBI", control::subi);
alu_imm_factory!(muli, "MULI", control::muli);
alu_imm_factory!(slti, "SLTI", control::slti);
alu_imm_factory!(sgti, "SGTI", control::sgti);
alu_imm_factory!(ori, "ORI", control::ori);
alu_imm_factory!(andi, "ANDI", control::andi);
alu_imm_factory!(xori, "XORI", control::xori);
alu_imm_factory!(srli, "SRLI", control::srli);
alu_imm_factory!(slli, "SLLI", control::slli);

macro_rules! branch_reg_factory {
    ($method:ident, $name:literal, $f:path) => {
        impl Program {
            pub fn $method(rs0: u32, rs1: u32, label: &str) -> Instruction {
                Instruction::basic(
                    $name,
                    Tag::None,
                    0,
                    rs0,
                    rs1,
                    Params::Label(label.to_string()),
                    $f,
                )
            }
        }
    };
}

macro_rules! branch_imm_factory {
    ($method:ident, $name:literal, $f:path) => {
        impl Program {
            pub fn $method(rs0: u32, imm: i64, label: &str) -> Instruction {
                Instruction::basic(
                    $name,
                    Tag::None,
                    0,
                    rs0,
                    0,
                    Params::BranchImm {
                        label: label.to_string(),
                        imm,
                    },
                    $f,
                )
            }
        }
    };
}

branch_reg_factory!(beq, "BEQ", control::beq);
branch_reg_factory!(bne, "BNE", control::bne);
branch_reg_factory!(blt, "BLT", control::blt);
branch_reg_factory!(bnl, "BNL", control::bnl);

branch_imm_factory!(beqi, "BEQI", control::beqi);
branch_imm_factory!(bnei, "BNEI", control::bnei);
branch_imm_factory!(blti, "BLTI", control::blti);
branch_imm_factory!(bnli, "BNLI", control::bnli);

macro_rules! cpool_factory {
    ($method:ident, $name:literal, $f:path) => {
        impl Program {
            pub fn $method() -> Instruction {
                Instruction::basic($name, Tag::None, 0, 0, 0, Params::None, $f)
            }
        }
    };
}

macro_rules! cpool_imm_factory {
    ($method:ident, $name:literal, $f:path) => {
        impl Program {
            pub fn $method(imm: i64) -> Instruction {
                Instruction::basic($name, Tag::None, 0, 0, 0, Params::Imm(imm), $f)
            }
        }
    };
}

cpool_factory!(c_add, "CADD", control::c_add);
cpool_factory!(c_shr, "CSHR", control::c_shr);
cpool_factory!(c_min, "CMIN", control::c_min);
cpool_factory!(c_max, "CMAX", control::c_max);
cpool_imm_factory!(c_addi, "CADDI", control::c_addi);
cpool_imm_factory!(c_shri, "CSHRI", control::c_shri);
cpool_imm_factory!(c_mini, "CMINI", control::c_mini);
cpool_imm_factory!(c_maxi, "CMAXI", control::c_maxi);

// -- vector/compute families (AI, element-typed) -----------------------

macro_rules! ai_elem_factory {
    ($method:ident, $name:literal, $tag:expr, $table:expr) => {
        impl Program {
            pub fn $method(
                rd: u32,
                rs0: u32,
                rs1: u32,
                elem: ElemTag,
                path: usize,
                driver: Drive,
                driven: Drive,
            ) -> Instruction {
                let kernel = require_kernel($name, elem, $table);
                Instruction::ai($name, $tag, rd, rs0, rs1, path, driver, driven, Params::None, kernel)
            }
        }
    };
}

macro_rules! ai_elem_imm_factory {
    ($method:ident, $name:literal, $tag:expr, $table:expr) => {
        impl Program {
            #[allow(clippy::too_many_arguments)]
            pub fn $method(
                rd: u32,
                rs0: u32,
                imm: i64,
                elem: ElemTag,
                path: usize,
                driver: Drive,
                driven: Drive,
            ) -> Instruction {
                let kernel = require_kernel($name, elem, $table);
                Instruction::ai(
                    $name,
                    $tag,
                    rd,
                    rs0,
                    0,
                    path,
                    driver,
                    driven,
                    Params::Imm(imm),
                    kernel,
                )
            }
        }
    };
}

ai_elem_factory!(
    vadd,
    "VADD",
    Tag::VecCompute,
    elem_table! {
        ElemTag::I32 => vector::vadd::<i32>,
        ElemTag::F32 => vector::vadd::<f32>,
        ElemTag::F64 => vector::vadd::<f64>,
    }
);
ai_elem_factory!(
    vsub,
    "VSUB",
    Tag::VecCompute,
    elem_table! {
        ElemTag::I32 => vector::vsub::<i32>,
        ElemTag::F32 => vector::vsub::<f32>,
        ElemTag::F64 => vector::vsub::<f64>,
        ElemTag::C32 => vector::vsub::<crate::elem::Complex32>,
        ElemTag::C64 => vector::vsub::<crate::elem::Complex64>,
    }
);
ai_elem_factory!(
    vmul,
    "VMUL",
    Tag::VecCompute,
    elem_table! {
        ElemTag::I32 => vector::vmul::<i32>,
        ElemTag::F32 => vector::vmul::<f32>,
        ElemTag::F64 => vector::vmul::<f64>,
        ElemTag::C32 => vector::vmul::<crate::elem::Complex32>,
    }
);

ai_elem_imm_factory!(
    vaddi,
    "VADDI",
    Tag::VecCompute,
    elem_table! {
        ElemTag::I32 => vector::vaddi::<i32>,
        ElemTag::F32 => vector::vaddi::<f32>,
        ElemTag::F64 => vector::vaddi::<f64>,
        ElemTag::C32 => vector::vaddi::<crate::elem::Complex32>,
        ElemTag::C64 => vector::vaddi::<crate::elem::Complex64>,
    }
);
ai_elem_imm_factory!(
    vsubi,
    "VSUBI",
    Tag::VecCompute,
    elem_table! {
        ElemTag::I32 => vector::vsubi::<i32>,
        ElemTag::F32 => vector::vsubi::<f32>,
        ElemTag::F64 => vector::vsubi::<f64>,
        ElemTag::C32 => vector::vsubi::<crate::elem::Complex32>,
        ElemTag::C64 => vector::vsubi::<crate::elem::Complex64>,
    }
);
ai_elem_imm_factory!(
    vmuli,
    "VMULI",
    Tag::VecCompute,
    elem_table! {
        ElemTag::I32 => vector::vmuli::<i32>,
        ElemTag::F32 => vector::vmuli::<f32>,
        ElemTag::F64 => vector::vmuli::<f64>,
        ElemTag::C32 => vector::vmuli::<crate::elem::Complex32>,
        ElemTag::C64 => vector::vmuli::<crate::elem::Complex64>,
    }
);

macro_rules! ai_unary_factory {
    ($method:ident, $name:literal, $table:expr) => {
        impl Program {
            pub fn $method(
                rd: u32,
                rs0: u32,
                elem: ElemTag,
                path: usize,
                driver: Drive,
                driven: Drive,
            ) -> Instruction {
                let kernel = require_kernel($name, elem, $table);
                Instruction::ai(
                    $name,
                    Tag::VecCompute,
                    rd,
                    rs0,
                    0,
                    path,
                    driver,
                    driven,
                    Params::None,
                    kernel,
                )
            }
        }
    };
}

ai_unary_factory!(
    vabs,
    "VABS",
    elem_table! {
        ElemTag::I32 => vector::vabs::<i32>,
        ElemTag::F32 => vector::vabs::<f32>,
        ElemTag::F64 => vector::vabs::<f64>,
        ElemTag::C32 => vector::vabs_c32,
        ElemTag::C64 => vector::vabs_c64,
    }
);
ai_unary_factory!(
    vsqua,
    "VSQUA",
    elem_table! {
        ElemTag::I32 => vector::vsqua::<i32>,
        ElemTag::F32 => vector::vsqua::<f32>,
        ElemTag::F64 => vector::vsqua::<f64>,
    }
);
ai_unary_factory!(
    vneg,
    "VNEG",
    elem_table! {
        ElemTag::I32 => vector::vneg::<i32>,
        ElemTag::F32 => vector::vneg::<f32>,
        ElemTag::F64 => vector::vneg::<f64>,
    }
);
ai_unary_factory!(
    vrec,
    "VREC",
    elem_table! {
        ElemTag::I32 => vector::vrec_i32_promoted,
        ElemTag::F32 => vector::vrec::<f32>,
        ElemTag::F64 => vector::vrec::<f64>,
    }
);
ai_unary_factory!(
    vexp,
    "VEXP",
    elem_table! {
        ElemTag::I32 => vector::vexp::<i32>,
        ElemTag::F32 => vector::vexp::<f32>,
        ElemTag::F64 => vector::vexp::<f64>,
    }
);
ai_unary_factory!(
    vlog10,
    "VLOG10",
    elem_table! {
        ElemTag::I32 => vector::vlog10::<i32>,
        ElemTag::F32 => vector::vlog10::<f32>,
        ElemTag::F64 => vector::vlog10::<f64>,
    }
);
ai_unary_factory!(
    vconj,
    "VCONJ",
    elem_table! {
        ElemTag::C32 => vector::vconj::<crate::elem::Complex32>,
        ElemTag::C64 => vector::vconj::<crate::elem::Complex64>,
    }
);

macro_rules! ai_reduce_factory {
    ($method:ident, $name:literal, $table:expr) => {
        impl Program {
            pub fn $method(
                rd: u32,
                rs0: u32,
                elem: ElemTag,
                path: usize,
                driver: Drive,
                driven: Drive,
            ) -> Instruction {
                let kernel = require_kernel($name, elem, $table);
                Instruction::ai(
                    $name,
                    Tag::VecCompute,
                    rd,
                    rs0,
                    0,
                    path,
                    driver,
                    driven,
                    Params::None,
                    kernel,
                )
            }
        }
    };
}

ai_reduce_factory!(
    vsum,
    "VSUM",
    elem_table! {
        ElemTag::I32 => vector::vsum::<i32>,
        ElemTag::F32 => vector::vsum::<f32>,
        ElemTag::F64 => vector::vsum::<f64>,
    }
);
ai_reduce_factory!(
    vmax,
    "VMAX",
    elem_table! {
        ElemTag::I32 => vector::vmax::<i32>,
        ElemTag::F32 => vector::vmax::<f32>,
        ElemTag::F64 => vector::vmax::<f64>,
    }
);
ai_reduce_factory!(
    vmin,
    "VMIN",
    elem_table! {
        ElemTag::I32 => vector::vmin::<i32>,
        ElemTag::F32 => vector::vmin::<f32>,
        ElemTag::F64 => vector::vmin::<f64>,
    }
);

impl Program {
    pub fn transpose(rd: u32, rs0: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "TRANSPOSE",
            Tag::VecCompute,
            rd,
            rs0,
            0,
            path,
            driver,
            driven,
            Params::None,
            vector::transpose,
        )
    }

    pub fn permute(rd: u32, rs0: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "PERMUTE",
            Tag::VecCompute,
            rd,
            rs0,
            0,
            path,
            driver,
            driven,
            Params::None,
            vector::permute,
        )
    }

    pub fn extr(rd: u32, rs0: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "EXTR",
            Tag::VecCompute,
            rd,
            rs0,
            0,
            path,
            driver,
            driven,
            Params::None,
            vector::extr,
        )
    }
}

// -- matrix family -------------------------------------------------------

macro_rules! gemm_factory {
    ($method:ident, $name:literal, $table:expr) => {
        impl Program {
            #[allow(clippy::too_many_arguments)]
            pub fn $method(
                rd: u32,
                rs0: u32,
                rs1: u32,
                elem: ElemTag,
                path: usize,
                driver: Drive,
                driven: Drive,
            ) -> Instruction {
                let kernel = require_kernel($name, elem, $table);
                Instruction::ai(
                    $name,
                    Tag::MatCompute,
                    rd,
                    rs0,
                    rs1,
                    path,
                    driver,
                    driven,
                    Params::None,
                    kernel,
                )
            }
        }
    };
}

gemm_factory!(
    gemm_full,
    "GEMM",
    elem_table! {
        ElemTag::I32 => matrix::gemm_full::<i32>,
        ElemTag::F32 => matrix::gemm_full::<f32>,
        ElemTag::F64 => matrix::gemm_full::<f64>,
        ElemTag::C32 => matrix::gemm_full::<crate::elem::Complex32>,
        ElemTag::C64 => matrix::gemm_full::<crate::elem::Complex64>,
    }
);

impl Program {
    pub fn gemm_tile(rd: u32, rs0: u32, rs1: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "GEMM_TILE",
            Tag::MatCompute,
            rd,
            rs0,
            rs1,
            path,
            driver,
            driven,
            Params::None,
            matrix::gemm_tile,
        )
    }

    pub fn mma(rd: u32, rs0: u32, rs1: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "MMA",
            Tag::MatCompute,
            rd,
            rs0,
            rs1,
            path,
            driver,
            driven,
            Params::None,
            matrix::mma,
        )
    }

    pub fn mmp(rd: u32, rs0: u32, rs1: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "MMP",
            Tag::MatCompute,
            rd,
            rs0,
            rs1,
            path,
            driver,
            driven,
            Params::None,
            matrix::mmp,
        )
    }

    pub fn smm(rd: u32, rs0: u32, rs1: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "SMM",
            Tag::MatCompute,
            rd,
            rs0,
            rs1,
            path,
            driver,
            driven,
            Params::None,
            matrix::smm,
        )
    }

    pub fn mclip(rd: u32, rs0: u32, rs1: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "MCLIP",
            Tag::MatCompute,
            rd,
            rs0,
            rs1,
            path,
            driver,
            driven,
            Params::None,
            matrix::mclip,
        )
    }

    pub fn mload(rd: u32, rs0: u32, path: usize) -> Instruction {
        Instruction::ai(
            "MLOAD",
            Tag::Load,
            rd,
            rs0,
            0,
            path,
            Drive::None,
            Drive::None,
            Params::None,
            matrix::mload,
        )
    }

    pub fn mstore(rd: u32, rs0: u32, path: usize) -> Instruction {
        Instruction::ai(
            "MSTORE",
            Tag::Store,
            rd,
            rs0,
            0,
            path,
            Drive::None,
            Drive::None,
            Params::None,
            matrix::mstore,
        )
    }
}

// -- signal-processing family --------------------------------------------

impl Program {
    pub fn conv(rd: u32, rs0: u32, rs1: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "CONV",
            Tag::VecCompute,
            rd,
            rs0,
            rs1,
            path,
            driver,
            driven,
            Params::None,
            signal::conv,
        )
    }

    pub fn fir(rd: u32, rs0: u32, rs1: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "FIR",
            Tag::VecCompute,
            rd,
            rs0,
            rs1,
            path,
            driver,
            driven,
            Params::None,
            signal::fir,
        )
    }

    pub fn fft(rd: u32, rs0: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "FFT",
            Tag::VecCompute,
            rd,
            rs0,
            0,
            path,
            driver,
            driven,
            Params::None,
            signal::fft,
        )
    }

    pub fn ifft(rd: u32, rs0: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "IFFT",
            Tag::VecCompute,
            rd,
            rs0,
            0,
            path,
            driver,
            driven,
            Params::None,
            signal::ifft,
        )
    }

    pub fn ddc(rd: u32, rs0: u32, path: usize, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            "DDC",
            Tag::VecCompute,
            rd,
            rs0,
            0,
            path,
            driver,
            driven,
            Params::None,
            signal::ddc,
        )
    }

    /// Not emitted by any current factory in the original source (returns a
    /// null instruction there). Kept as an explicit unimplemented stub at
    /// the same call site rather than silently dropped.
    pub fn vload() -> Instruction {
        unimplemented!("VLOAD was never wired up to a kernel by the original device")
    }
    pub fn vstore() -> Instruction {
        unimplemented!("VSTORE was never wired up to a kernel by the original device")
    }
    pub fn tload() -> Instruction {
        unimplemented!("TLOAD was never wired up to a kernel by the original device")
    }
    pub fn tstore() -> Instruction {
        unimplemented!("TSTORE was never wired up to a kernel by the original device")
    }
    pub fn mvp() -> Instruction {
        unimplemented!("MVP was never wired up to a kernel by the original device")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_vec_kernel(_a: &Accelerator, ctx: &mut dyn UnitContext, _i: &Instruction) {
        ctx.advance();
    }

    fn ai(name: &'static str, rd: u32, rs0: u32, driver: Drive, driven: Drive) -> Instruction {
        Instruction::ai(
            name,
            Tag::VecCompute,
            rd,
            rs0,
            0,
            0,
            driver,
            driven,
            Params::None,
            dummy_vec_kernel,
        )
    }

    #[test]
    fn build_requires_main() {
        let mut p = Program::new();
        p.create_func("OTHER", vec![Program::ret()]);
        p.build();
        assert!(!p.valid());
        assert!(p.errors().contains(&ProgramError::NoEntryPoint));
    }

    #[test]
    fn missing_ret_is_reported() {
        let mut p = Program::new();
        p.create_func("MAIN", vec![Program::movi(0, 1)]);
        p.build();
        assert!(p
            .errors()
            .iter()
            .any(|e| matches!(e, ProgramError::MissingRet(_))));
    }

    #[test]
    fn get_pc_points_at_first_instruction_of_main() {
        let mut p = Program::new();
        p.create_func("MAIN", vec![Program::movi(0, 1), Program::ret()]);
        p.build();
        assert!(p.valid());
        assert_eq!(p.get_pc("MAIN"), 0);
    }

    #[test]
    fn duplicate_label_is_reported() {
        let mut p = Program::new();
        p.create_func(
            "MAIN",
            vec![
                Instruction::label("L"),
                Program::movi(0, 1),
                Instruction::label("L"),
                Program::ret(),
            ],
        );
        p.build();
        assert!(p
            .errors()
            .iter()
            .any(|e| matches!(e, ProgramError::DuplicateLabel(_))));
    }

    #[test]
    fn call_outside_main_is_reported() {
        let mut p = Program::new();
        p.create_func(
            "HELPER",
            vec![
                Program::call("MAIN", CallUnit::Mpu, 0, 0, 0),
                Program::ret(),
            ],
        );
        p.create_func("MAIN", vec![Program::ret()]);
        p.build();
        assert!(p
            .errors()
            .iter()
            .any(|e| matches!(e, ProgramError::CallOutsideMain(_))));
    }

    #[test]
    fn data_forwarding_chain_rewrites_to_fwd_tmp() {
        let mut p = Program::new();
        p.create_func(
            "MAIN",
            vec![
                ai("HEAD", 5, 1, Drive::Data, Drive::None),
                ai("MID", 6, 5, Drive::Data, Drive::None),
                ai("TAIL", 7, 6, Drive::Inst, Drive::None),
                Program::ret(),
            ],
        );
        p.build();
        assert!(p.valid());
        // The terminator (originally TAIL) is promoted to the front: it
        // keeps its own source register and becomes the new head, writing
        // FWD_TMP first.
        assert_eq!(p.get(0).rs0, 6, "promoted head keeps its own source");
        assert_eq!(p.get(0).rd, FWD_TMP_REG, "promoted head writes FWD_TMP");
        // HEAD now runs second, streaming through FWD_TMP.
        assert_eq!(p.get(1).rs0, FWD_TMP_REG);
        assert_eq!(p.get(1).rd, FWD_TMP_REG, "middle link both reads and writes FWD_TMP");
        // MID runs last and inherits the terminator's original rd as the
        // chain's real sink.
        assert_eq!(p.get(2).rs0, FWD_TMP_REG);
        assert_eq!(p.get(2).rd, 7, "last data link writes the chain's original sink");
    }

    #[test]
    fn fusion_is_confluent() {
        let mut p = Program::new();
        p.create_func(
            "MAIN",
            vec![
                ai("HEAD", 5, 1, Drive::Data, Drive::None),
                ai("TAIL", 7, 5, Drive::Inst, Drive::None),
                Program::ret(),
            ],
        );
        p.build();
        let before = (p.get(0).rd, p.get(1).rs0, p.get(1).rd);
        p.fuse_chains();
        let after = (p.get(0).rd, p.get(1).rs0, p.get(1).rd);
        assert_eq!(before, after, "re-running fusion is a no-op");
    }
}
