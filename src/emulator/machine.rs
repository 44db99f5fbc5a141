//! Core machine implementation.
//!
//! [`Machine`] bundles the whole execution state (memory, register file,
//! flags) into one caller-owned context. [`Machine::step`] performs one
//! fetch-decode-execute cycle and yields the next instruction pointer or
//! the terminal outcome; [`Machine::run`] drives the loop until it halts.
//! Execution is strictly sequential: one instruction fully completes,
//! including all memory, register, and flag writes, before the next begins.

use crate::emulator::decode;
use crate::emulator::errors::{FaultPolicy, VmError};
use crate::emulator::flags::Flags;
use crate::emulator::isa::{Instruction, Shape};
use crate::emulator::memory::Memory;

/// Number of general-purpose registers.
pub const REG_COUNT: usize = 16;

/// Register file: 16 signed 32-bit general-purpose registers, all zero at
/// start-up. Indices arrive nibble-masked from the decoder, so access is
/// infallible.
#[derive(Debug, Default)]
pub struct Registers {
    regs: [i32; REG_COUNT],
}

impl Registers {
    /// Reads register `idx`.
    pub fn get(&self, idx: u8) -> i32 {
        self.regs[(idx & 0x0F) as usize]
    }

    /// Writes register `idx`.
    pub fn set(&mut self, idx: u8, value: i32) {
        self.regs[(idx & 0x0F) as usize] = value;
    }

    /// All registers in index order, for dumps.
    pub fn as_array(&self) -> &[i32; REG_COUNT] {
        &self.regs
    }
}

/// Result of executing one instruction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Keep running from this instruction pointer.
    Continue(i32),
    /// The program executed `halt`.
    Halt,
}

/// A complete virtual machine instance: flat memory, register file, and
/// condition flags, plus the fault policy governing undefined conditions.
///
/// Instances are independent; constructing one has no global effect.
pub struct Machine {
    mem: Memory,
    regs: Registers,
    flags: Flags,
    policy: FaultPolicy,
}

impl Machine {
    /// Creates a machine with zeroed memory, registers, and flags.
    pub fn new(policy: FaultPolicy) -> Self {
        Self {
            mem: Memory::new(policy),
            regs: Registers::default(),
            flags: Flags::default(),
            policy,
        }
    }

    /// Places a program image at address 0.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), VmError> {
        self.mem.load_image(image)
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Executes exactly one instruction at `ip`.
    pub fn step(&mut self, ip: i32) -> Result<Outcome, VmError> {
        let opcode = self.mem.byte(ip)?;
        let instr = Instruction::try_from(opcode)
            .map_err(|_| VmError::InvalidOpcode { opcode, addr: ip })?;
        self.exec(instr, ip)
    }

    /// Runs from `start` until the program halts or a fault surfaces.
    pub fn run(&mut self, start: i32) -> Result<(), VmError> {
        let mut ip = start;
        loop {
            match self.step(ip)? {
                Outcome::Continue(next) => ip = next,
                Outcome::Halt => return Ok(()),
            }
        }
    }

    /// Dispatches one resolved instruction.
    fn exec(&mut self, instr: Instruction, ip: i32) -> Result<Outcome, VmError> {
        use Instruction::*;
        match instr {
            Noop => Ok(Outcome::Continue(ip.wrapping_add(Shape::NoReg.len()))),
            Movr => self.op_movr(ip),
            Notl => self.op_unary(ip, |v| !v),
            Nega => self.op_unary(ip, i32::wrapping_neg),
            Muls => self.op_muls(ip),
            Divs => self.op_divs(ip),
            Comp => self.op_comp(ip),
            Jmpi => decode::imm(&self.mem, ip).map(Outcome::Continue),
            // Declared but not functionally implemented in this ISA: each
            // yields the unchanged instruction pointer, looping forever if
            // reached. Kept as-is rather than silently fixed.
            Cali | Calr | Retn => Ok(Outcome::Continue(ip)),
            Jpgt => self.op_branch(ip, !self.flags.sign() && self.flags.nonzero()),
            Jpls => self.op_branch(ip, self.flags.sign() && self.flags.nonzero()),
            Jpge => self.op_branch(ip, !self.flags.sign() || !self.flags.nonzero()),
            Jple => self.op_branch(ip, self.flags.sign() || !self.flags.nonzero()),
            Jpeq => self.op_branch(ip, self.flags.nonzero()),
            Jpne => self.op_branch(ip, !self.flags.nonzero()),
            Movi => self.op_movi(ip),
            Stor => self.op_stor(ip),
            Load => self.op_load(ip),
            Adds => self.op_alu(ip, i32::wrapping_add),
            Subs => self.op_alu(ip, i32::wrapping_sub),
            Andl => self.op_alu(ip, |a, b| a & b),
            Orll => self.op_alu(ip, |a, b| a | b),
            Xorl => self.op_alu(ip, |a, b| a ^ b),
            Shll => self.op_alu(ip, |a, b| a.wrapping_shl(b as u32)),
            Shrl => self.op_alu(ip, |a, b| (a as u32).wrapping_shr(b as u32) as i32),
            Shra => self.op_alu(ip, |a, b| a.wrapping_shr(b as u32)),
            Jmpr => {
                let rs = decode::mono_reg(&self.mem, ip)?;
                Ok(Outcome::Continue(self.regs.get(rs)))
            }
            Halt => Ok(Outcome::Halt),
        }
    }

    fn op_movr(&mut self, ip: i32) -> Result<Outcome, VmError> {
        let (rd, rs) = decode::duo_reg(&self.mem, ip)?;
        self.regs.set(rd, self.regs.get(rs));
        Ok(Outcome::Continue(ip.wrapping_add(Shape::DuoReg.len())))
    }

    /// Shared handler for the two-register unary ops (`notl`, `nega`).
    fn op_unary(&mut self, ip: i32, f: impl Fn(i32) -> i32) -> Result<Outcome, VmError> {
        let (rd, rs) = decode::duo_reg(&self.mem, ip)?;
        self.regs.set(rd, f(self.regs.get(rs)));
        Ok(Outcome::Continue(ip.wrapping_add(Shape::DuoReg.len())))
    }

    /// Shared handler for the three-register ALU ops.
    fn op_alu(&mut self, ip: i32, f: impl Fn(i32, i32) -> i32) -> Result<Outcome, VmError> {
        let (rd, rs, rt) = decode::tri_reg(&self.mem, ip)?;
        self.regs.set(rd, f(self.regs.get(rs), self.regs.get(rt)));
        Ok(Outcome::Continue(ip.wrapping_add(Shape::TriReg.len())))
    }

    fn op_muls(&mut self, ip: i32) -> Result<Outcome, VmError> {
        let (rh, rl, rs, rt) = decode::quad_reg(&self.mem, ip)?;
        let product = self.regs.get(rs) as i64 * self.regs.get(rt) as i64;
        self.regs.set(rh, (product >> 32) as i32);
        self.regs.set(rl, product as i32);
        Ok(Outcome::Continue(ip.wrapping_add(Shape::QuadReg.len())))
    }

    fn op_divs(&mut self, ip: i32) -> Result<Outcome, VmError> {
        let (rd, rr, rs, rt) = decode::quad_reg(&self.mem, ip)?;
        let dividend = self.regs.get(rs);
        let divisor = self.regs.get(rt);
        if divisor == 0 {
            if self.policy == FaultPolicy::Strict {
                return Err(VmError::DivisionByZero { addr: ip });
            }
            // Lenient placeholder: quotient 0, remainder = dividend.
            self.regs.set(rd, 0);
            self.regs.set(rr, dividend);
        } else {
            self.regs.set(rd, dividend.wrapping_div(divisor));
            self.regs.set(rr, dividend.wrapping_rem(divisor));
        }
        Ok(Outcome::Continue(ip.wrapping_add(Shape::QuadReg.len())))
    }

    fn op_comp(&mut self, ip: i32) -> Result<Outcome, VmError> {
        let (rs, rt) = decode::duo_reg(&self.mem, ip)?;
        let result = self.regs.get(rs).wrapping_sub(self.regs.get(rt));
        self.flags.record_compare(result);
        Ok(Outcome::Continue(ip.wrapping_add(Shape::DuoReg.len())))
    }

    fn op_branch(&mut self, ip: i32, taken: bool) -> Result<Outcome, VmError> {
        let target = decode::imm(&self.mem, ip)?;
        Ok(Outcome::Continue(if taken {
            target
        } else {
            ip.wrapping_add(Shape::Imm.len())
        }))
    }

    fn op_movi(&mut self, ip: i32) -> Result<Outcome, VmError> {
        let (rd, imm) = decode::reg_imm(&self.mem, ip)?;
        self.regs.set(rd, imm);
        Ok(Outcome::Continue(ip.wrapping_add(Shape::RegImm.len())))
    }

    fn op_stor(&mut self, ip: i32) -> Result<Outcome, VmError> {
        let (rs, rb, ro) = decode::tri_reg(&self.mem, ip)?;
        let addr = self.regs.get(rb).wrapping_add(self.regs.get(ro));
        self.mem.write_cell(addr, self.regs.get(rs))?;
        Ok(Outcome::Continue(ip.wrapping_add(Shape::TriReg.len())))
    }

    fn op_load(&mut self, ip: i32) -> Result<Outcome, VmError> {
        let (rd, rb, ro) = decode::tri_reg(&self.mem, ip)?;
        let addr = self.regs.get(rb).wrapping_add(self.regs.get(ro));
        let value = self.mem.read_cell(addr)?;
        self.regs.set(rd, value);
        Ok(Outcome::Continue(ip.wrapping_add(Shape::TriReg.len())))
    }

    /// Renders the instruction at `addr` as mnemonic plus operands, e.g.
    /// `movi r0, 0x78563412` or `stor [r1 + r2], r0`.
    pub fn disassemble(&self, addr: i32) -> Result<String, VmError> {
        let opcode = self.mem.byte(addr)?;
        let instr = Instruction::try_from(opcode)
            .map_err(|_| VmError::InvalidOpcode { opcode, addr })?;
        let m = instr.mnemonic();

        Ok(match instr {
            Instruction::Stor => {
                let (rs, rb, ro) = decode::tri_reg(&self.mem, addr)?;
                format!("{m} [r{rb} + r{ro}], r{rs}")
            }
            Instruction::Load => {
                let (rd, rb, ro) = decode::tri_reg(&self.mem, addr)?;
                format!("{m} r{rd}, [r{rb} + r{ro}]")
            }
            _ => match instr.shape() {
                Shape::NoReg => m.to_string(),
                Shape::MonoReg => {
                    let rs = decode::mono_reg(&self.mem, addr)?;
                    format!("{m} r{rs}")
                }
                Shape::DuoReg => {
                    let (rd, rs) = decode::duo_reg(&self.mem, addr)?;
                    format!("{m} r{rd}, r{rs}")
                }
                Shape::TriReg => {
                    let (rd, rs, rt) = decode::tri_reg(&self.mem, addr)?;
                    format!("{m} r{rd}, r{rs}, r{rt}")
                }
                Shape::QuadReg => {
                    let (ra, rb, rc, rd) = decode::quad_reg(&self.mem, addr)?;
                    format!("{m} r{ra}, r{rb}, r{rc}, r{rd}")
                }
                Shape::RegImm => {
                    let (rd, imm) = decode::reg_imm(&self.mem, addr)?;
                    format!("{m} r{rd}, {imm:#x}")
                }
                Shape::Imm => {
                    let target = decode::imm(&self.mem, addr)?;
                    format!("{m} {target:#x}")
                }
            },
        })
    }

    /// One observational trace line for the instruction at `addr`: the
    /// address, the raw encoded bytes, and the disassembly.
    pub fn trace_line(&self, addr: i32) -> Result<String, VmError> {
        let opcode = self.mem.byte(addr)?;
        let instr = Instruction::try_from(opcode)
            .map_err(|_| VmError::InvalidOpcode { opcode, addr })?;
        let raw = self.mem.read_span(addr, instr.len() as usize)?;
        let bytes = raw
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(format!(
            "{addr:#010x}  {bytes:<16}{}",
            self.disassemble(addr)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::DEMO_IMAGE;

    fn machine_with(image: &[u8]) -> Machine {
        let mut machine = Machine::new(FaultPolicy::Strict);
        machine.load_image(image).unwrap();
        machine
    }

    fn step_once(machine: &mut Machine) -> Outcome {
        machine.step(0).unwrap()
    }

    // ==================== Moves ====================

    #[test]
    fn movr_copies_and_touches_nothing_else() {
        // movr r3, r7
        let mut machine = machine_with(&[0x01, 0x37]);
        for r in 0..REG_COUNT as u8 {
            machine.registers_mut().set(r, r as i32 * 100);
        }
        assert_eq!(step_once(&mut machine), Outcome::Continue(2));
        assert_eq!(machine.registers().get(3), 700);
        for r in (0..REG_COUNT as u8).filter(|&r| r != 3) {
            assert_eq!(machine.registers().get(r), r as i32 * 100);
        }
    }

    #[test]
    fn movi_decodes_little_endian_and_advances() {
        let mut machine = machine_with(&[0x10, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(step_once(&mut machine), Outcome::Continue(5));
        assert_eq!(machine.registers().get(0), 0x78563412);
    }

    #[test]
    fn movi_negative_immediate() {
        let mut machine = machine_with(&[0x1A, 0xFF, 0xFF, 0xFF, 0xFF]);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(10), -1);
    }

    // ==================== Unary ops ====================

    #[test]
    fn notl_complements() {
        let mut machine = machine_with(&[0x02, 0x01]);
        machine.registers_mut().set(1, 0x0F0F0F0F);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(0), 0xF0F0F0F0u32 as i32);
    }

    #[test]
    fn nega_negates_with_wraparound() {
        let mut machine = machine_with(&[0x03, 0x01]);
        machine.registers_mut().set(1, 42);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(0), -42);

        let mut machine = machine_with(&[0x03, 0x01]);
        machine.registers_mut().set(1, i32::MIN);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(0), i32::MIN);
    }

    // ==================== ALU ====================

    #[test]
    fn adds_wraps_and_commutes() {
        // adds r1, r2, r3
        let mut machine = machine_with(&[0x41, 0x23]);
        machine.registers_mut().set(2, i32::MAX);
        machine.registers_mut().set(3, 1);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(1), i32::MIN);

        // Operand order swapped: same result.
        let mut machine = machine_with(&[0x41, 0x32]);
        machine.registers_mut().set(2, i32::MAX);
        machine.registers_mut().set(3, 1);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(1), i32::MIN);
    }

    #[test]
    fn subs_is_not_commutative() {
        let mut machine = machine_with(&[0x51, 0x23]);
        machine.registers_mut().set(2, 10);
        machine.registers_mut().set(3, 3);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(1), 7);

        let mut machine = machine_with(&[0x51, 0x32]);
        machine.registers_mut().set(2, 10);
        machine.registers_mut().set(3, 3);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(1), -7);
    }

    #[test]
    fn bitwise_ops() {
        // andl/orll/xorl r1, r2, r3
        for (opcode, expect) in [(0x61u8, 0b1000), (0x71, 0b1110), (0x81, 0b0110)] {
            let mut machine = machine_with(&[opcode, 0x23]);
            machine.registers_mut().set(2, 0b1100);
            machine.registers_mut().set(3, 0b1010);
            step_once(&mut machine);
            assert_eq!(machine.registers().get(1), expect, "opcode {opcode:#x}");
        }
    }

    #[test]
    fn shift_left() {
        let mut machine = machine_with(&[0x91, 0x23]);
        machine.registers_mut().set(2, 1);
        machine.registers_mut().set(3, 4);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(1), 16);
    }

    #[test]
    fn logical_vs_arithmetic_right_shift() {
        // shrl: zero-extends.
        let mut machine = machine_with(&[0xA1, 0x23]);
        machine.registers_mut().set(2, -8);
        machine.registers_mut().set(3, 1);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(1), (-8i32 as u32 >> 1) as i32);

        // shra: sign-extends.
        let mut machine = machine_with(&[0xB1, 0x23]);
        machine.registers_mut().set(2, -8);
        machine.registers_mut().set(3, 1);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(1), -4);
    }

    #[test]
    fn shift_count_uses_low_five_bits() {
        let mut machine = machine_with(&[0x91, 0x23]);
        machine.registers_mut().set(2, 1);
        machine.registers_mut().set(3, 33);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(1), 2);
    }

    // ==================== muls / divs ====================

    #[test]
    fn muls_splits_full_product() {
        // muls r3, r2, r1, r0
        let mut machine = machine_with(&[0x04, 0x32, 0x10]);
        machine.registers_mut().set(1, 0x21436587);
        machine.registers_mut().set(0, 0x78563412);
        assert_eq!(step_once(&mut machine), Outcome::Continue(3));

        let product = 0x21436587i64 * 0x78563412i64;
        let high = machine.registers().get(3) as i64;
        let low = machine.registers().get(2) as u32 as i64;
        assert_eq!((high << 32) | low, product);
    }

    #[test]
    fn muls_negative_product() {
        let mut machine = machine_with(&[0x04, 0x32, 0x10]);
        machine.registers_mut().set(1, -3);
        machine.registers_mut().set(0, 7);
        step_once(&mut machine);
        let high = machine.registers().get(3) as i64;
        let low = machine.registers().get(2) as u32 as i64;
        assert_eq!((high << 32) | low, -21);
    }

    #[test]
    fn divs_truncating() {
        // divs r0, r1, r2, r3
        let mut machine = machine_with(&[0x05, 0x01, 0x23]);
        machine.registers_mut().set(2, -7);
        machine.registers_mut().set(3, 2);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(0), -3);
        assert_eq!(machine.registers().get(1), -1);
    }

    #[test]
    fn divs_min_by_minus_one_wraps() {
        let mut machine = machine_with(&[0x05, 0x01, 0x23]);
        machine.registers_mut().set(2, i32::MIN);
        machine.registers_mut().set(3, -1);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(0), i32::MIN);
        assert_eq!(machine.registers().get(1), 0);
    }

    #[test]
    fn divs_by_zero_faults_strict() {
        let mut machine = machine_with(&[0x05, 0x01, 0x23]);
        machine.registers_mut().set(2, 9);
        assert_eq!(
            machine.step(0),
            Err(VmError::DivisionByZero { addr: 0 })
        );
    }

    #[test]
    fn divs_by_zero_lenient_placeholder() {
        let mut machine = Machine::new(FaultPolicy::Lenient);
        machine.load_image(&[0x05, 0x01, 0x23]).unwrap();
        machine.registers_mut().set(2, 9);
        assert_eq!(machine.step(0), Ok(Outcome::Continue(3)));
        assert_eq!(machine.registers().get(0), 0);
        assert_eq!(machine.registers().get(1), 9);
    }

    // ==================== compare and branches ====================

    /// Which of the six conditional jumps fire for a given comparison,
    /// checked against the literal flag formulas.
    fn taken_branches(a: i32, b: i32) -> Vec<&'static str> {
        let mut taken = Vec::new();
        for (opcode, name) in [
            (0x0Au8, "jpgt"),
            (0x0B, "jpls"),
            (0x0C, "jpge"),
            (0x0D, "jple"),
            (0x0E, "jpeq"),
            (0x0F, "jpne"),
        ] {
            // comp r1, r2 then the branch, targeting 0x40.
            let mut machine = machine_with(&[0x06, 0x12, opcode, 0x40, 0, 0, 0]);
            machine.registers_mut().set(1, a);
            machine.registers_mut().set(2, b);
            assert_eq!(machine.step(0), Ok(Outcome::Continue(2)));
            match machine.step(2).unwrap() {
                Outcome::Continue(0x40) => taken.push(name),
                Outcome::Continue(7) => {}
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        taken
    }

    #[test]
    fn equal_operands_branch_matrix() {
        // 4 - 4 = 0: sign clear, nonzero-indicator clear. Per the literal
        // formulas jpge, jple, and jpne fire; jpeq does NOT.
        assert_eq!(taken_branches(4, 4), vec!["jpge", "jple", "jpne"]);
    }

    #[test]
    fn greater_operands_branch_matrix() {
        // 5 - 3 > 0: sign clear, nonzero-indicator set.
        assert_eq!(taken_branches(5, 3), vec!["jpgt", "jpge", "jpeq"]);
    }

    #[test]
    fn lesser_operands_branch_matrix() {
        // 3 - 5 < 0: sign set, nonzero-indicator set.
        assert_eq!(taken_branches(3, 5), vec!["jpls", "jple", "jpeq"]);
    }

    #[test]
    fn compare_discards_result() {
        let mut machine = machine_with(&[0x06, 0x12]);
        machine.registers_mut().set(1, 10);
        machine.registers_mut().set(2, 4);
        step_once(&mut machine);
        assert_eq!(machine.registers().get(1), 10);
        assert_eq!(machine.registers().get(2), 4);
    }

    // ==================== memory ops ====================

    #[test]
    fn store_load_round_trip() {
        // stor [r1 + r2], r0 then load r3, [r1 + r2]
        let mut machine = machine_with(&[0x20, 0x12, 0x33, 0x12]);
        machine.registers_mut().set(0, -123456789);
        machine.registers_mut().set(1, 0x100);
        machine.registers_mut().set(2, 0x23);
        assert_eq!(machine.step(0), Ok(Outcome::Continue(2)));
        assert_eq!(machine.step(2), Ok(Outcome::Continue(4)));
        assert_eq!(machine.registers().get(3), -123456789);
    }

    #[test]
    fn store_out_of_bounds_faults_strict() {
        let mut machine = machine_with(&[0x20, 0x12]);
        machine.registers_mut().set(1, 70000);
        assert!(matches!(
            machine.step(0),
            Err(VmError::OutOfBoundsAccess { len: 4, .. })
        ));
    }

    #[test]
    fn load_negative_address_lenient_wraps() {
        let mut machine = Machine::new(FaultPolicy::Lenient);
        machine.load_image(&[0x33, 0x12]).unwrap();
        machine.registers_mut().set(1, -65536);
        // Wraps to address 0: reads the instruction bytes themselves.
        assert_eq!(machine.step(0), Ok(Outcome::Continue(2)));
        assert_eq!(machine.registers().get(3), 0x1233);
    }

    // ==================== control transfer ====================

    #[test]
    fn lenient_ip_advance_wraps_at_i32_max() {
        // Under the lenient policy every i32 is a defined address, so the
        // advance past i32::MAX must wrap like the operand addresses do.
        // i32::MAX maps to offset 65535, which holds a noop in zeroed memory.
        let mut machine = Machine::new(FaultPolicy::Lenient);
        assert_eq!(
            machine.step(i32::MAX),
            Ok(Outcome::Continue(i32::MIN))
        );
    }

    #[test]
    fn jmpi_ignores_machine_state() {
        let mut machine = machine_with(&[0x07, 0x34, 0x12, 0x00, 0x00]);
        machine.registers_mut().set(0, 999);
        machine.flags.record_compare(-1);
        assert_eq!(step_once(&mut machine), Outcome::Continue(0x1234));
    }

    #[test]
    fn jmpr_uses_register_value() {
        let mut machine = machine_with(&[0xC5]);
        machine.registers_mut().set(5, 0x2000);
        assert_eq!(step_once(&mut machine), Outcome::Continue(0x2000));
    }

    #[test]
    fn call_and_return_are_stubs() {
        // cali, calr, retn all yield the unchanged instruction pointer.
        for image in [
            &[0x08u8, 0x34, 0x12, 0x00, 0x00][..],
            &[0xD2][..],
            &[0x09][..],
        ] {
            let mut machine = machine_with(image);
            assert_eq!(machine.step(0), Ok(Outcome::Continue(0)));
        }
    }

    #[test]
    fn halt_from_any_address() {
        let mut machine = machine_with(&[0x00, 0xE0, 0x55, 0x55]);
        assert_eq!(machine.step(1), Ok(Outcome::Halt));
    }

    #[test]
    fn invalid_opcode_faults() {
        let mut machine = machine_with(&[0xF7]);
        assert_eq!(
            machine.step(0),
            Err(VmError::InvalidOpcode {
                opcode: 0xF7,
                addr: 0
            })
        );
    }

    // ==================== disassembly / trace ====================

    #[test]
    fn disassembles_each_shape() {
        let machine = machine_with(&[0x10, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(machine.disassemble(0).unwrap(), "movi r0, 0x78563412");

        let machine = machine_with(&[0x20, 0x12]);
        assert_eq!(machine.disassemble(0).unwrap(), "stor [r1 + r2], r0");

        let machine = machine_with(&[0x33, 0x12]);
        assert_eq!(machine.disassemble(0).unwrap(), "load r3, [r1 + r2]");

        let machine = machine_with(&[0x41, 0x23]);
        assert_eq!(machine.disassemble(0).unwrap(), "adds r1, r2, r3");

        let machine = machine_with(&[0x04, 0x32, 0x10]);
        assert_eq!(machine.disassemble(0).unwrap(), "muls r3, r2, r1, r0");

        let machine = machine_with(&[0x0A, 0x1C, 0x00, 0x00, 0x00]);
        assert_eq!(machine.disassemble(0).unwrap(), "jpgt 0x1c");

        let machine = machine_with(&[0xC5]);
        assert_eq!(machine.disassemble(0).unwrap(), "jmpr r5");

        let machine = machine_with(&[0xE0]);
        assert_eq!(machine.disassemble(0).unwrap(), "halt");
    }

    #[test]
    fn trace_line_format() {
        let machine = machine_with(&[0x10, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(
            machine.trace_line(0).unwrap(),
            "0x00000000  10 12 34 56 78  movi r0, 0x78563412"
        );
    }

    // ==================== end to end ====================

    #[test]
    fn demo_image_runs_to_halt() {
        let mut machine = machine_with(DEMO_IMAGE);
        machine.run(0).unwrap();

        let regs = machine.registers();
        assert_eq!(regs.get(0), 0x78563412);
        assert_eq!(regs.get(1), 0x21436587);
        // The countdown loop ran r3 down to zero before the final multiply.
        assert_eq!(regs.get(4), 0);
        assert_eq!(regs.get(5), 1);

        // muls r3, r2, r1, r0 was the last write: reconstruct the product.
        let product = 0x21436587i64 * 0x78563412i64;
        let high = regs.get(3) as i64;
        let low = regs.get(2) as u32 as i64;
        assert_eq!((high << 32) | low, product);
    }

    #[test]
    fn demo_image_flags_after_run() {
        let mut machine = machine_with(DEMO_IMAGE);
        machine.run(0).unwrap();
        // Last compare saw r3 == r4 == 0: both live flags clear.
        assert!(!machine.flags().sign());
        assert!(!machine.flags().nonzero());
    }
}
