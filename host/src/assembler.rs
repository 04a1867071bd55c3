//! Mnemonic assembler: turns one printable instruction line into an
//! [`Instruction`], the way a host library's `PushKernel` parses a line of
//! text off its command queue before handing it to the device.
//!
//! Grammar: `OPCODE[.SUFFIX] [operand[, operand]...]` where an operand is
//! one of:
//! - `$HEX` — a general-register index, in hex, no `0x` prefix (`$2A`).
//! - `$NAME` — a special-register name (`$ULEN`).
//! - `#HEX` — an immediate, path index, or packed literal, in hex (`#A`).
//! - `#NONE`/`#INST`/`#DATA`/`#EXU`/`#MEM` — a drive marker.
//! - `#BAREWORD` — a label target (`#LOOP`).

use tvacc_core::elem::ElemTag;
use tvacc_core::error::ProgramError;
use tvacc_core::inst::{CallUnit, Drive, Instruction, Program};
use tvacc_core::spec_reg::SpecReg;

#[derive(Clone, Debug)]
enum Operand {
    Reg(u32),
    SpecReg(SpecReg),
    Imm(i64),
    Drive(Drive),
    Label(String),
}

impl Operand {
    fn reg(&self, tok: &str) -> Result<u32, ProgramError> {
        match self {
            Operand::Reg(r) => Ok(*r),
            _ => Err(ProgramError::MalformedOperand(tok.to_string())),
        }
    }
    fn imm(&self, tok: &str) -> Result<i64, ProgramError> {
        match self {
            Operand::Imm(v) => Ok(*v),
            _ => Err(ProgramError::MalformedOperand(tok.to_string())),
        }
    }
    fn path(&self, tok: &str) -> Result<usize, ProgramError> {
        Ok(self.imm(tok)? as usize)
    }
    fn drive(&self, tok: &str) -> Result<Drive, ProgramError> {
        match self {
            Operand::Drive(d) => Ok(*d),
            _ => Err(ProgramError::MalformedOperand(tok.to_string())),
        }
    }
    fn label(&self, tok: &str) -> Result<String, ProgramError> {
        match self {
            Operand::Label(l) => Ok(l.clone()),
            _ => Err(ProgramError::MalformedOperand(tok.to_string())),
        }
    }
}

fn parse_drive_name(s: &str) -> Option<Drive> {
    match s {
        "NONE" => Some(Drive::None),
        "INST" => Some(Drive::Inst),
        "DATA" => Some(Drive::Data),
        "EXU" => Some(Drive::Exu),
        "MEM" => Some(Drive::Mem),
        _ => None,
    }
}

fn parse_operand(tok: &str) -> Result<Operand, ProgramError> {
    if let Some(rest) = tok.strip_prefix('$') {
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Ok(n) = u32::from_str_radix(rest, 16) {
                return Ok(Operand::Reg(n));
            }
        }
        return SpecReg::from_name(rest)
            .map(Operand::SpecReg)
            .ok_or_else(|| ProgramError::UnknownSpecReg(rest.to_string()));
    }
    if let Some(rest) = tok.strip_prefix('#') {
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Ok(n) = i64::from_str_radix(rest, 16) {
                return Ok(Operand::Imm(n));
            }
        }
        if let Some(d) = parse_drive_name(rest) {
            return Ok(Operand::Drive(d));
        }
        return Ok(Operand::Label(rest.to_string()));
    }
    Err(ProgramError::MalformedOperand(tok.to_string()))
}

fn parse_elem(suffix: Option<&str>, op: &str) -> Result<ElemTag, ProgramError> {
    match suffix {
        Some("I32") => Ok(ElemTag::I32),
        Some("F32") => Ok(ElemTag::F32),
        Some("F64") => Ok(ElemTag::F64),
        Some("C32") => Ok(ElemTag::C32),
        Some("C64") => Ok(ElemTag::C64),
        _ => Err(ProgramError::MalformedOperand(format!("{op} needs a .SUFFIX element type"))),
    }
}

fn operands(line: &str) -> Result<Vec<Operand>, ProgramError> {
    line.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_operand)
        .collect()
}

fn arity(op: &str, ops: &[Operand], want: usize) -> Result<(), ProgramError> {
    if ops.len() == want {
        Ok(())
    } else {
        Err(ProgramError::MalformedOperand(format!(
            "{op} expects {want} operand(s), got {}",
            ops.len()
        )))
    }
}

/// Parse one mnemonic line into an [`Instruction`]. `leak_text` lets a
/// `DISPLAY` message outlive the line it was parsed from — assembled
/// programs are short-lived for the life of a process, so leaking the rare
/// literal string is cheaper than threading an interned-string table
/// through the whole builder just for this one opcode.
pub fn parse(line: &str) -> Result<Instruction, ProgramError> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    let mut parts = head.splitn(2, '.');
    let op = parts.next().unwrap_or_default();
    let suffix = parts.next();
    let ops = operands(rest)?;

    macro_rules! reg {
        ($i:expr) => {
            ops[$i].reg(rest)?
        };
    }
    macro_rules! imm {
        ($i:expr) => {
            ops[$i].imm(rest)?
        };
    }
    macro_rules! pth {
        ($i:expr) => {
            ops[$i].path(rest)?
        };
    }
    macro_rules! drv {
        ($i:expr) => {
            ops[$i].drive(rest)?
        };
    }
    macro_rules! lbl {
        ($i:expr) => {
            ops[$i].label(rest)?
        };
    }

    let inst = match op {
        "ADD" => { arity(op, &ops, 3)?; Program::add(reg!(0), reg!(1), reg!(2)) }
        "SUB" => { arity(op, &ops, 3)?; Program::sub(reg!(0), reg!(1), reg!(2)) }
        "MUL" => { arity(op, &ops, 3)?; Program::mul(reg!(0), reg!(1), reg!(2)) }
        "SLT" => { arity(op, &ops, 3)?; Program::slt(reg!(0), reg!(1), reg!(2)) }
        "SGT" => { arity(op, &ops, 3)?; Program::sgt(reg!(0), reg!(1), reg!(2)) }
        "OR" => { arity(op, &ops, 3)?; Program::or(reg!(0), reg!(1), reg!(2)) }
        "AND" => { arity(op, &ops, 3)?; Program::and(reg!(0), reg!(1), reg!(2)) }
        "XOR" => { arity(op, &ops, 3)?; Program::xor(reg!(0), reg!(1), reg!(2)) }
        "SRL" => { arity(op, &ops, 3)?; Program::srl(reg!(0), reg!(1), reg!(2)) }
        "SLL" => { arity(op, &ops, 3)?; Program::sll(reg!(0), reg!(1), reg!(2)) }

        "ADDI" => { arity(op, &ops, 3)?; Program::addi(reg!(0), reg!(1), imm!(2)) }
        "SUBI" => { arity(op, &ops, 3)?; Program::subi(reg!(0), reg!(1), imm!(2)) }
        "MULI" => { arity(op, &ops, 3)?; Program::muli(reg!(0), reg!(1), imm!(2)) }
        "SLTI" => { arity(op, &ops, 3)?; Program::slti(reg!(0), reg!(1), imm!(2)) }
        "SGTI" => { arity(op, &ops, 3)?; Program::sgti(reg!(0), reg!(1), imm!(2)) }
        "ORI" => { arity(op, &ops, 3)?; Program::ori(reg!(0), reg!(1), imm!(2)) }
        "ANDI" => { arity(op, &ops, 3)?; Program::andi(reg!(0), reg!(1), imm!(2)) }
        "XORI" => { arity(op, &ops, 3)?; Program::xori(reg!(0), reg!(1), imm!(2)) }
        "SRLI" => { arity(op, &ops, 3)?; Program::srli(reg!(0), reg!(1), imm!(2)) }
        "SLLI" => { arity(op, &ops, 3)?; Program::slli(reg!(0), reg!(1), imm!(2)) }

        "BEQ" => { arity(op, &ops, 3)?; Program::beq(reg!(0), reg!(1), &lbl!(2)) }
        "BNE" => { arity(op, &ops, 3)?; Program::bne(reg!(0), reg!(1), &lbl!(2)) }
        "BLT" => { arity(op, &ops, 3)?; Program::blt(reg!(0), reg!(1), &lbl!(2)) }
        "BNL" => { arity(op, &ops, 3)?; Program::bnl(reg!(0), reg!(1), &lbl!(2)) }
        "BEQI" => { arity(op, &ops, 3)?; Program::beqi(reg!(0), imm!(1), &lbl!(2)) }
        "BNEI" => { arity(op, &ops, 3)?; Program::bnei(reg!(0), imm!(1), &lbl!(2)) }
        "BLTI" => { arity(op, &ops, 3)?; Program::blti(reg!(0), imm!(1), &lbl!(2)) }
        "BNLI" => { arity(op, &ops, 3)?; Program::bnli(reg!(0), imm!(1), &lbl!(2)) }

        "CADD" => { arity(op, &ops, 0)?; Program::c_add() }
        "CSHR" => { arity(op, &ops, 0)?; Program::c_shr() }
        "CMIN" => { arity(op, &ops, 0)?; Program::c_min() }
        "CMAX" => { arity(op, &ops, 0)?; Program::c_max() }
        "CADDI" => { arity(op, &ops, 1)?; Program::c_addi(imm!(0)) }
        "CSHRI" => { arity(op, &ops, 1)?; Program::c_shri(imm!(0)) }
        "CMINI" => { arity(op, &ops, 1)?; Program::c_mini(imm!(0)) }
        "CMAXI" => { arity(op, &ops, 1)?; Program::c_maxi(imm!(0)) }

        "MOV" => { arity(op, &ops, 2)?; Program::mov(reg!(0), reg!(1)) }
        "MOVI" => { arity(op, &ops, 2)?; Program::movi(reg!(0), imm!(1)) }
        "MOVID" => {
            arity(op, &ops, 2)?;
            let rd = match &ops[0] {
                Operand::SpecReg(r) => *r as u32,
                Operand::Reg(r) => *r,
                _ => return Err(ProgramError::MalformedOperand(rest.to_string())),
            };
            Program::movid(rd, imm!(1))
        }
        "DMOVI" => { arity(op, &ops, 2)?; Program::dmovi(reg!(0), reg!(1)) }
        "DMOVO" => { arity(op, &ops, 2)?; Program::dmovo(reg!(0), reg!(1)) }
        "XMOVI" => { arity(op, &ops, 2)?; Program::xmovi(reg!(0), reg!(1)) }
        "XMOVO" => { arity(op, &ops, 2)?; Program::xmovo(reg!(0), reg!(1)) }
        "MEMSET" => { arity(op, &ops, 3)?; Program::memset(reg!(0), reg!(1), reg!(2)) }
        "DISPLAY" => {
            arity(op, &ops, 1)?;
            let msg: &'static str = Box::leak(head.to_string().into_boxed_str());
            Program::display(msg, reg!(0))
        }
        "FENCE" => { arity(op, &ops, 1)?; Program::fence(pth!(0)) }
        "RET" => { arity(op, &ops, 0)?; Program::ret() }
        "JMP" => { arity(op, &ops, 2)?; Program::jmp(reg!(0), &lbl!(1)) }
        "JMPR" => { arity(op, &ops, 2)?; Program::jmpr(reg!(0), reg!(1)) }
        "CALL" => {
            arity(op, &ops, 4)?;
            let target = lbl!(0);
            let unit = match &ops[1] {
                Operand::Label(l) if l == "MPU" => CallUnit::Mpu,
                Operand::Label(l) if l == "CU" => CallUnit::Cu,
                _ => return Err(ProgramError::MalformedOperand(rest.to_string())),
            };
            Program::call(&target, unit, pth!(2), imm!(3) as u32, 0)
        }

        "VADD" => { arity(op, &ops, 5)?; Program::vadd(reg!(0), reg!(1), reg!(2), parse_elem(suffix, op)?, pth!(3), drv!(4), Drive::None) }
        "VSUB" => { arity(op, &ops, 5)?; Program::vsub(reg!(0), reg!(1), reg!(2), parse_elem(suffix, op)?, pth!(3), drv!(4), Drive::None) }
        "VMUL" => { arity(op, &ops, 6)?; Program::vmul(reg!(0), reg!(1), reg!(2), parse_elem(suffix, op)?, pth!(3), drv!(4), drv!(5)) }
        "VADDI" => { arity(op, &ops, 6)?; Program::vaddi(reg!(0), reg!(1), imm!(2), parse_elem(suffix, op)?, pth!(3), drv!(4), drv!(5)) }
        "VSUBI" => { arity(op, &ops, 6)?; Program::vsubi(reg!(0), reg!(1), imm!(2), parse_elem(suffix, op)?, pth!(3), drv!(4), drv!(5)) }
        "VMULI" => { arity(op, &ops, 6)?; Program::vmuli(reg!(0), reg!(1), imm!(2), parse_elem(suffix, op)?, pth!(3), drv!(4), drv!(5)) }

        "VABS" => { arity(op, &ops, 5)?; Program::vabs(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }
        "VSQUA" => { arity(op, &ops, 5)?; Program::vsqua(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }
        "VNEG" => { arity(op, &ops, 5)?; Program::vneg(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }
        "VREC" => { arity(op, &ops, 5)?; Program::vrec(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }
        "VEXP" => { arity(op, &ops, 5)?; Program::vexp(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }
        "VLOG10" => { arity(op, &ops, 5)?; Program::vlog10(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }
        "VCONJ" => { arity(op, &ops, 5)?; Program::vconj(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }

        "VSUM" => { arity(op, &ops, 5)?; Program::vsum(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }
        "VMAX" => { arity(op, &ops, 5)?; Program::vmax(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }
        "VMIN" => { arity(op, &ops, 5)?; Program::vmin(reg!(0), reg!(1), parse_elem(suffix, op)?, pth!(2), drv!(3), drv!(4)) }

        "TRANSPOSE" => { arity(op, &ops, 4)?; Program::transpose(reg!(0), reg!(1), pth!(2), drv!(3), Drive::None) }
        "PERMUTE" => { arity(op, &ops, 4)?; Program::permute(reg!(0), reg!(1), pth!(2), drv!(3), Drive::None) }
        "EXTR" => { arity(op, &ops, 4)?; Program::extr(reg!(0), reg!(1), pth!(2), drv!(3), Drive::None) }

        "GEMM" => { arity(op, &ops, 6)?; Program::gemm_full(reg!(0), reg!(1), reg!(2), parse_elem(suffix, op)?, pth!(3), drv!(4), drv!(5)) }
        "GEMM_TILE" => { arity(op, &ops, 5)?; Program::gemm_tile(reg!(0), reg!(1), reg!(2), pth!(3), drv!(4), Drive::None) }
        "MMA" => { arity(op, &ops, 5)?; Program::mma(reg!(0), reg!(1), reg!(2), pth!(3), drv!(4), Drive::None) }
        "MMP" => { arity(op, &ops, 5)?; Program::mmp(reg!(0), reg!(1), reg!(2), pth!(3), drv!(4), Drive::None) }
        "SMM" => { arity(op, &ops, 5)?; Program::smm(reg!(0), reg!(1), reg!(2), pth!(3), drv!(4), Drive::None) }
        "MCLIP" => { arity(op, &ops, 5)?; Program::mclip(reg!(0), reg!(1), reg!(2), pth!(3), drv!(4), Drive::None) }
        "MLOAD" => { arity(op, &ops, 3)?; Program::mload(reg!(0), reg!(1), pth!(2)) }
        "MSTORE" => { arity(op, &ops, 3)?; Program::mstore(reg!(0), reg!(1), pth!(2)) }

        "CONV" => { arity(op, &ops, 5)?; Program::conv(reg!(0), reg!(1), reg!(2), pth!(3), drv!(4), Drive::None) }
        "FIR" => { arity(op, &ops, 5)?; Program::fir(reg!(0), reg!(1), reg!(2), pth!(3), drv!(4), Drive::None) }
        "FFT" => { arity(op, &ops, 4)?; Program::fft(reg!(0), reg!(1), pth!(2), drv!(3), Drive::None) }
        "IFFT" => { arity(op, &ops, 4)?; Program::ifft(reg!(0), reg!(1), pth!(2), drv!(3), Drive::None) }
        "DDC" => { arity(op, &ops, 4)?; Program::ddc(reg!(0), reg!(1), pth!(2), drv!(3), Drive::None) }

        _ => return Err(ProgramError::UnknownMnemonic(head.to_string())),
    };
    Ok(inst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_movi_with_hex_register_and_immediate() {
        let inst = parse("MOVI $0, #2A").unwrap();
        assert_eq!(inst.name, "MOVI");
        assert_eq!(inst.rd, 0);
    }

    #[test]
    fn parses_elem_suffixed_binary_ai_op() {
        let inst = parse("VMUL.C32 $2, $0, $1, #0, #NONE, #NONE").unwrap();
        assert_eq!(inst.name, "VMUL");
    }

    #[test]
    fn unknown_mnemonic_reports_program_error() {
        let err = parse("NOPE $0").unwrap_err();
        assert!(matches!(err, ProgramError::UnknownMnemonic(_)));
    }

    #[test]
    fn malformed_register_operand_is_rejected() {
        let err = parse("ADD $0, $1, #DATA").unwrap_err();
        assert!(matches!(err, ProgramError::MalformedOperand(_)));
    }
}
