/*
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The Chip-8 interpreter.
//!
//! The main focus of this module is the `Interpreter` struct, which contains
//! the entire state of a Chip-8 machine: memory, registers, call stack,
//! timers, display buffer and keypad state.  Each call to `step` performs
//! one fetch-decode-execute cycle followed by one timer tick; the caller is
//! responsible for invoking `step` at a steady rate (the original hardware
//! ran its timers at 60 Hz).  While `LD Vx, K` is waiting for a key the
//! cycle never completes, so the timers hold their values too.
//!
//! Faults that the original machine survived are survived here too:
//! unrecognized opcodes and bad `RET` instructions are reported on the log
//! and leave the program counter where it was, so the next cycle re-reads
//! the same bytes.

use std::default::Default;
use std::io::Read;
use std::num::Wrapping;
use std::u8;

use failure::{Error, ResultExt};
use rand;

use MEM_SIZE;
use PROG_START;
use PROG_SIZE;
use Register;
use display::{self, FONT_HEIGHT, FONT_SPRITES};
use input::{self, Key};
use instruction::{Address, AddressOutOfBoundsError, Instruction, Opcode};

/// The location at which to put the hex digit sprites.
const FONT_START: usize = 0x0;

/// An error resulting from a bad `RET` instruction.
#[derive(Debug, Fail)]
#[fail(display = "no subroutine to return from")]
pub struct NotInSubroutineError;

/// An error resulting from an input program being too large.
#[derive(Debug, Fail)]
#[fail(display = "input program is too large")]
pub struct ProgramTooLargeError;

/// A Chip-8 interpreter.
///
/// This struct contains the entire state of a Chip-8 machine and provides
/// all the expected methods for interacting with it, such as stepping
/// through execution and inspecting the internal state.
pub struct Interpreter {
    /// The internal memory.
    mem: [u8; MEM_SIZE],
    /// The display buffer.
    display: display::Buffer,
    /// The input state.
    input: input::State,
    /// The general-purpose registers `V0`-`VF`.
    regs: [Wrapping<u8>; 16],
    /// The special register `I`.
    reg_i: Address,
    /// The delay timer.
    reg_dt: u8,
    /// The sound timer.
    reg_st: u8,
    /// Whether the buzzer should sound for the current cycle.
    beep: bool,
    /// The program counter.
    pc: Address,
    /// The call stack (for returning from subroutines).
    ///
    /// The original machine had room for 16 return addresses and did not
    /// check for overflow; this stack simply grows instead.
    call_stack: Vec<Address>,
}

impl Interpreter {
    /// Returns a new interpreter with zeroed state, the hex font installed
    /// and the program counter at the program start address.
    pub fn new() -> Self {
        let mut interpreter = Interpreter {
            mem: [0; MEM_SIZE],
            display: display::Buffer::new(),
            input: input::State::new(),
            regs: [Wrapping(0); 16],
            reg_i: Address::from_u16(0).unwrap(),
            reg_dt: 0,
            reg_st: 0,
            beep: false,
            pc: Address::from_usize(PROG_START).unwrap(),
            call_stack: Vec::new(),
        };

        // Copy the font sprites into memory.
        for (i, sprite) in FONT_SPRITES.iter().enumerate() {
            let start = FONT_START + i * FONT_HEIGHT;
            let end = start + sprite.len();
            interpreter.mem[start..end].copy_from_slice(sprite);
        }

        interpreter
    }

    /// Loads program data from the specified source.
    ///
    /// The program is copied into memory starting at `PROG_START`; if the
    /// source holds more than `PROG_SIZE` bytes, an error is returned.
    pub fn load_program<R: Read>(&mut self, input: &mut R) -> Result<(), Error> {
        let read = input.read(&mut self.mem[PROG_START..])?;
        if read == PROG_SIZE {
            // Try to see if we missed part of the file.
            let mut tmp = [0u8];
            if input.read(&mut tmp)? == 1 {
                return Err(ProgramTooLargeError.into());
            }
        }
        Ok(())
    }

    /// Returns a reference to the display buffer.
    pub fn display(&self) -> &display::Buffer {
        &self.display
    }

    /// Returns a mutable reference to the display buffer.
    pub fn display_mut(&mut self) -> &mut display::Buffer {
        &mut self.display
    }

    /// Returns a reference to the input state.
    pub fn input(&self) -> &input::State {
        &self.input
    }

    /// Returns a mutable reference to the input state.
    pub fn input_mut(&mut self) -> &mut input::State {
        &mut self.input
    }

    /// Returns a reference to the internal memory.
    pub fn mem(&self) -> &[u8; MEM_SIZE] {
        &self.mem
    }

    /// Returns a mutable reference to the internal memory.
    pub fn mem_mut(&mut self) -> &mut [u8; MEM_SIZE] {
        &mut self.mem
    }

    /// Returns the value of register `I`.
    pub fn i(&self) -> Address {
        self.reg_i
    }

    /// Sets the value of register `I`.
    pub fn set_i(&mut self, val: Address) {
        self.reg_i = val;
    }

    /// Returns the value of the delay timer.
    pub fn dt(&self) -> u8 {
        self.reg_dt
    }

    /// Sets the value of the delay timer.
    pub fn set_dt(&mut self, val: u8) {
        self.reg_dt = val;
    }

    /// Returns the value of the sound timer.
    pub fn st(&self) -> u8 {
        self.reg_st
    }

    /// Sets the value of the sound timer.
    pub fn set_st(&mut self, val: u8) {
        self.reg_st = val;
    }

    /// Returns whether the buzzer should sound for the current cycle.
    pub fn beep(&self) -> bool {
        self.beep
    }

    /// Returns the value in the given register.
    pub fn register(&self, reg: Register) -> u8 {
        self.regs[reg as usize].0
    }

    /// Sets the given register to the given value.
    pub fn set_register(&mut self, reg: Register, val: u8) {
        self.regs[reg as usize].0 = val
    }

    /// Returns the value of the program counter.
    pub fn pc(&self) -> Address {
        self.pc
    }

    /// Returns the instruction at the program counter.
    pub fn current_instruction(&self) -> Result<Instruction, Error> {
        Instruction::from_opcode(self.current_opcode())
    }

    /// Returns the opcode at the program counter.
    ///
    /// A jump can put the program counter on the last byte of memory, so the
    /// second fetch byte wraps around to address 0.
    pub fn current_opcode(&self) -> Opcode {
        let high = self.mem[self.pc.addr()];
        let low = self.mem[(self.pc.addr() + 1) & 0xFFF];
        Opcode::from_bytes(high, low)
    }

    /// Performs a single fetch-decode-execute cycle and timer tick.
    ///
    /// Faults are reported on the log and leave the program counter
    /// untouched; the next call will fetch the same opcode again.  This
    /// mirrors the original machine, which had no way to halt on error.
    ///
    /// While `LD Vx, K` is awaiting a key press, the whole machine is
    /// frozen: nothing changes, timers included, until a key is down.
    pub fn step(&mut self) {
        match self.current_instruction() {
            Ok(ins) => match self.execute(ins) {
                Ok(completed) => if !completed {
                    return;
                },
                Err(e) => warn!("error at {}: {}", self.pc, e),
            },
            Err(e) => warn!("cannot decode {} at {}: {}", self.current_opcode(), self.pc, e),
        }
        self.update_timers();
    }

    /// Executes the given instruction in the current interpreter context.
    ///
    /// The interpreter will behave as if the given instruction were executed
    /// at the current program location in memory.  Returns whether the
    /// instruction completed: `LD Vx, K` reports an incomplete cycle while
    /// no key is down, and must be retried.
    pub fn execute(&mut self, ins: Instruction) -> Result<bool, Error> {
        use self::Instruction::*;

        match ins {
            Cls => self.display.clear(),
            Ret => {
                self.pc = self.call_stack
                    .pop()
                    .ok_or(NotInSubroutineError)
                    .with_context(|_| format!("error executing {}", ins))?;
            }
            Jp(addr) => {
                self.pc = addr;
                return Ok(true);
            }
            Call(addr) => {
                self.call_stack.push(self.pc);
                self.pc = addr;
                return Ok(true);
            }
            SeByte(reg, b) => if self.register(reg) == b {
                self.pc = (self.pc + 4).context("program counter overflowed")?;
                return Ok(true);
            },
            SneByte(reg, b) => if self.register(reg) != b {
                self.pc = (self.pc + 4).context("program counter overflowed")?;
                return Ok(true);
            },
            SeReg(reg1, reg2) => if self.register(reg1) == self.register(reg2) {
                self.pc = (self.pc + 4).context("program counter overflowed")?;
                return Ok(true);
            },
            LdByte(reg, b) => self.set_register(reg, b),
            AddByte(reg, b) => {
                // No carry flag for the immediate form.
                self.regs[reg as usize] += Wrapping(b);
            }
            LdReg(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.set_register(reg1, r2);
            }
            Or(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 | r2);
            }
            And(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 & r2);
            }
            Xor(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 ^ r2);
            }
            AddReg(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.add(reg1, r2);
            }
            Sub(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.sub(reg1, r2);
            }
            Shr(reg) => self.shr(reg),
            Subn(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.subn(reg1, r2);
            }
            Shl(reg) => self.shl(reg),
            SneReg(reg1, reg2) => if self.register(reg1) != self.register(reg2) {
                self.pc = (self.pc + 4).context("program counter overflowed")?;
                return Ok(true);
            },
            LdI(addr) => self.reg_i = addr,
            JpV0(addr) => {
                self.pc = (addr + self.register(Register::V0) as usize)
                    .context("attempted to jump to out of bounds address")?;
                return Ok(true);
            }
            Rnd(reg, b) => self.set_register(reg, rand::random::<u8>() & b),
            Drw(reg1, reg2, n) => self.drw(reg1, reg2, n)
                .with_context(|_| format!("error executing {}", ins))?,
            Skp(reg) => if self.input.is_pressed(Key::from_byte(self.register(reg))) {
                self.pc = (self.pc + 4).context("program counter overflowed")?;
                return Ok(true);
            },
            Sknp(reg) => if !self.input.is_pressed(Key::from_byte(self.register(reg))) {
                self.pc = (self.pc + 4).context("program counter overflowed")?;
                return Ok(true);
            },
            LdRegDt(reg) => {
                let dt = self.dt();
                self.set_register(reg, dt);
            }
            LdKey(reg) => match self.input.first_pressed() {
                Some(key) => self.set_register(reg, key as u8),
                // No key is down; leave the machine untouched (timers
                // included) so this same instruction runs again next cycle.
                None => return Ok(false),
            },
            LdDtReg(reg) => {
                let r = self.register(reg);
                self.set_dt(r);
            }
            LdSt(reg) => {
                let r = self.register(reg);
                self.set_st(r);
            }
            AddI(reg) => {
                let sum = self.i().addr() + self.register(reg) as usize;
                self.set_register(Register::VF, (sum > 0xFFF) as u8);
                self.set_i(Address::from_usize(sum & 0xFFF).unwrap());
            }
            LdF(reg) => {
                let r = self.register(reg) as usize;
                self.set_i(Address::from_usize(FONT_START + FONT_HEIGHT * r).unwrap())
            }
            LdB(reg) => self.ld_b(reg)
                .with_context(|_| format!("error executing {}", ins))?,
            LdDerefIReg(reg) => self.ld_deref_i_reg(reg)
                .with_context(|_| format!("error executing {}", ins))?,
            LdRegDerefI(reg) => self.ld_reg_deref_i(reg)
                .with_context(|_| format!("error executing {}", ins))?,
        }

        self.pc = (self.pc + 2).context("program counter overflowed")?;
        Ok(true)
    }

    /// Adds the given byte to the given register, setting `VF` to 1 on carry
    /// or 0 otherwise.
    fn add(&mut self, reg: Register, val: u8) {
        let carry = val > u8::MAX - self.register(reg);
        self.regs[reg as usize] += Wrapping(val);
        self.set_register(Register::VF, carry as u8);
    }

    /// Implements the `DRW` operation.
    ///
    /// `VF` is set to 1 if the sprite toggled any pixel from on to off, and
    /// 0 otherwise.
    fn drw(&mut self, reg1: Register, reg2: Register, n: u8) -> Result<(), Error> {
        let start = self.reg_i.addr();
        let end = start + n as usize;
        let x = self.register(reg1) as usize;
        let y = self.register(reg2) as usize;

        if end > MEM_SIZE {
            Err(AddressOutOfBoundsError(end - 1))?
        }
        let collision = self.display.draw_sprite(&self.mem[start..end], x, y);
        self.set_register(Register::VF, collision as u8);
        Ok(())
    }

    /// Implements the `LD B, Vx` operation.
    fn ld_b(&mut self, reg: Register) -> Result<(), Error> {
        let val = self.register(reg);
        let hundreds = val / 100;
        let tens = val % 100 / 10;
        let ones = val % 10;
        let addr = self.i().addr();

        if addr + 2 >= MEM_SIZE {
            Err(AddressOutOfBoundsError(addr + 2))?
        } else {
            self.mem[addr] = hundreds;
            self.mem[addr + 1] = tens;
            self.mem[addr + 2] = ones;
            Ok(())
        }
    }

    /// Implements the `LD [I], Vx` operation.
    ///
    /// Copies `V0` through `Vx` (inclusive) into memory starting at `I`;
    /// afterwards, `I` has advanced past the copied block.
    fn ld_deref_i_reg(&mut self, reg: Register) -> Result<(), Error> {
        let count = reg as usize + 1;
        let start = self.i().addr();

        if start + count > MEM_SIZE {
            Err(AddressOutOfBoundsError(start + count - 1))?
        } else {
            for (dest, src) in self.mem[start..start + count]
                .iter_mut()
                .zip(self.regs[0..count].iter())
            {
                *dest = src.0;
            }
            self.advance_i(count);

            Ok(())
        }
    }

    /// Implements the `LD Vx, [I]` operation.
    ///
    /// Fills `V0` through `Vx` (inclusive) from memory starting at `I`;
    /// afterwards, `I` has advanced past the copied block.
    fn ld_reg_deref_i(&mut self, reg: Register) -> Result<(), Error> {
        let count = reg as usize + 1;
        let start = self.i().addr();

        if start + count > MEM_SIZE {
            Err(AddressOutOfBoundsError(start + count - 1))?
        } else {
            for (dest, src) in self.regs[0..count]
                .iter_mut()
                .zip(self.mem[start..start + count].iter())
            {
                *dest = Wrapping(*src);
            }
            self.advance_i(count);

            Ok(())
        }
    }

    /// Advances `I` by the given amount, wrapping to 12 bits like the
    /// hardware register did.
    fn advance_i(&mut self, amt: usize) {
        let new_i = (self.i().addr() + amt) & 0xFFF;
        self.set_i(Address::from_usize(new_i).unwrap());
    }

    /// Shifts the given register left by 1, setting `VF` to the old highest
    /// bit.
    fn shl(&mut self, reg: Register) {
        let old = self.register(reg) >> 7;
        let r = self.register(reg);
        self.set_register(reg, r << 1);
        self.set_register(Register::VF, old);
    }

    /// Shifts the given register right by 1, setting `VF` to the old lowest
    /// bit.
    fn shr(&mut self, reg: Register) {
        let old = self.register(reg) & 1;
        let r = self.register(reg);
        self.set_register(reg, r >> 1);
        self.set_register(Register::VF, old);
    }

    /// Subtracts the given byte from the given register, setting `VF` to 0 on
    /// borrow or 1 otherwise.
    fn sub(&mut self, reg: Register, val: u8) {
        let borrow = val > self.register(reg);
        self.regs[reg as usize] -= Wrapping(val);
        self.set_register(Register::VF, !borrow as u8);
    }

    /// Sets `reg` to `val - reg`, setting `VF` to 0 on borrow or 1 otherwise.
    fn subn(&mut self, reg: Register, val: u8) {
        let borrow = self.register(reg) > val;
        self.regs[reg as usize] = Wrapping(val) - self.regs[reg as usize];
        self.set_register(Register::VF, !borrow as u8);
    }

    /// Ticks the `DT` and `ST` registers down and latches the beep signal.
    ///
    /// The sound signal is raised when `ST` was nonzero before the tick.
    fn update_timers(&mut self) {
        if self.reg_dt > 0 {
            self.reg_dt -= 1;
        }
        self.beep = self.reg_st > 0;
        if self.reg_st > 0 {
            self.reg_st -= 1;
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

#[cfg(test)]
mod tests {
    use std::u8;

    use PROG_START;
    use instruction::{Address, Instruction};
    use interpreter::Interpreter;

    /// Loads the given program bytes into a fresh interpreter.
    fn with_program(prog: &[u8]) -> Interpreter {
        let mut interpreter = Interpreter::new();
        interpreter.load_program(&mut &prog[..]).unwrap();
        interpreter
    }

    /// Tests the `ADD` operation (both `ADD Vx, byte` and `ADD Vx, Vy`).
    #[test]
    fn instruction_add() {
        use Register::*;

        // Test cases, in the format (Vx, Vy, b1, b2).
        let cases = [
            (V0, V1, 24u8, 67u8),
            (V5, VD, 54u8, 102u8),
            (V7, VE, 255u8, 255u8),
            (V2, V4, 1u8, 255u8),
            (V5, V6, 0u8, 78u8),
        ];
        let mut interpreter = Interpreter::new();

        for &(vx, vy, b1, b2) in cases.into_iter() {
            let case = (vx, vy, b1, b2);
            let sum = b1.wrapping_add(b2);
            let carry = b1 as u32 + b2 as u32 > u8::MAX as u32;

            // Test `ADD Vx, byte`; the immediate form never touches `VF`.
            interpreter.set_register(vx, b1);
            interpreter.set_register(VF, 0xAA);
            interpreter.execute(Instruction::AddByte(vx, b2)).unwrap();
            if vx != VF {
                assert_eq!(interpreter.register(vx), sum, "case {:?}", case);
                assert_eq!(interpreter.register(VF), 0xAA, "case {:?}", case);
            }

            // Test `ADD Vx, Vy`.
            interpreter.set_register(vx, b1);
            interpreter.set_register(vy, b2);
            interpreter.execute(Instruction::AddReg(vx, vy)).unwrap();
            assert_eq!(interpreter.register(vx), sum, "case {:?}", case);
            assert_eq!(interpreter.register(VF), carry as u8, "case {:?}", case);
        }
    }

    /// Tests the `AND`, `OR` and `XOR` operations.
    #[test]
    fn instruction_bitwise() {
        use Register::*;

        // Test cases, in the format (Vx, Vy, b1, b2).
        let cases = [
            (V7, V2, 0x75, 0xF2),
            (V3, V8, 0x01, 0xFF),
            (VA, VE, 0x6A, 0x32),
            (V4, VC, 0x78, 0xFD),
            (V0, V1, 0xF0, 0x0F),
        ];
        let mut interpreter = Interpreter::new();

        for &(vx, vy, b1, b2) in cases.into_iter() {
            let case = (vx, vy, b1, b2);
            let or = b1 | b2;
            let and = b1 & b2;
            let xor = b1 ^ b2;

            // Test `OR`.
            interpreter.set_register(vx, b1);
            interpreter.set_register(vy, b2);
            interpreter.execute(Instruction::Or(vx, vy)).unwrap();
            assert_eq!(interpreter.register(vx), or, "case {:?}", case);

            // Test `AND`.
            interpreter.set_register(vx, b1);
            interpreter.set_register(vy, b2);
            interpreter.execute(Instruction::And(vx, vy)).unwrap();
            assert_eq!(interpreter.register(vx), and, "case {:?}", case);

            // Test `XOR`.
            interpreter.set_register(vx, b1);
            interpreter.set_register(vy, b2);
            interpreter.execute(Instruction::Xor(vx, vy)).unwrap();
            assert_eq!(interpreter.register(vx), xor, "case {:?}", case);
        }
    }

    /// Tests the `SUB` and `SUBN` operations.
    #[test]
    fn instruction_sub() {
        use Register::*;

        // Test cases, in the format (Vx, Vy, b1, b2).
        let cases = [
            (V9, V8, 70u8, 35u8),
            (V6, V2, 56u8, 2u8),
            (V0, V1, 0u8, 0u8),
            (VE, VA, 255u8, 255u8),
            (V3, V7, 1u8, 255u8),
            (V5, V4, 5u8, 3u8),
            (V5, V4, 3u8, 5u8),
        ];
        let mut interpreter = Interpreter::new();

        for &(vx, vy, b1, b2) in cases.into_iter() {
            let case = (vx, vy, b1, b2);
            let sub = b1.wrapping_sub(b2);
            let subn = b2.wrapping_sub(b1);
            let borrow = b2 > b1;
            let borrown = b1 > b2;

            // Test `SUB Vx, Vy`.
            interpreter.set_register(vx, b1);
            interpreter.set_register(vy, b2);
            interpreter.execute(Instruction::Sub(vx, vy)).unwrap();
            assert_eq!(interpreter.register(vx), sub, "case {:?}", case);
            assert_eq!(interpreter.register(VF), !borrow as u8, "case {:?}", case);

            // Test `SUBN Vx, Vy`.
            interpreter.set_register(vx, b1);
            interpreter.set_register(vy, b2);
            interpreter.execute(Instruction::Subn(vx, vy)).unwrap();
            assert_eq!(interpreter.register(vx), subn, "case {:?}", case);
            assert_eq!(interpreter.register(VF), !borrown as u8, "case {:?}", case);
        }
    }

    /// Tests the `SHR` and `SHL` operations.
    #[test]
    fn instruction_shift() {
        use Register::*;

        // Test cases, in the format (b, shr, lsb, shl, msb).
        let cases = [
            (0b0000_0001u8, 0b0000_0000u8, 1u8, 0b0000_0010u8, 0u8),
            (0b1000_0000, 0b0100_0000, 0, 0b0000_0000, 1),
            (0b1010_0101, 0b0101_0010, 1, 0b0100_1010, 1),
            (0b0111_1110, 0b0011_1111, 0, 0b1111_1100, 0),
        ];
        let mut interpreter = Interpreter::new();

        for &(b, shr, lsb, shl, msb) in cases.into_iter() {
            let case = (b, shr, lsb, shl, msb);

            interpreter.set_register(V3, b);
            interpreter.execute(Instruction::Shr(V3)).unwrap();
            assert_eq!(interpreter.register(V3), shr, "case {:?}", case);
            assert_eq!(interpreter.register(VF), lsb, "case {:?}", case);

            interpreter.set_register(V3, b);
            interpreter.execute(Instruction::Shl(V3)).unwrap();
            assert_eq!(interpreter.register(V3), shl, "case {:?}", case);
            assert_eq!(interpreter.register(VF), msb, "case {:?}", case);
        }
    }

    /// Tests the `SE` and `SNE` skip operations.
    #[test]
    fn instruction_skips() {
        use Register::*;

        let mut interpreter = Interpreter::new();
        interpreter.set_register(V1, 0x42);
        interpreter.set_register(V2, 0x42);
        interpreter.set_register(V3, 0x43);

        let skipping = [
            Instruction::SeByte(V1, 0x42),
            Instruction::SneByte(V1, 0x99),
            Instruction::SeReg(V1, V2),
            Instruction::SneReg(V1, V3),
        ];
        let not_skipping = [
            Instruction::SeByte(V1, 0x99),
            Instruction::SneByte(V1, 0x42),
            Instruction::SeReg(V1, V3),
            Instruction::SneReg(V1, V2),
        ];

        for ins in skipping.iter() {
            let pc = interpreter.pc().addr();
            interpreter.execute(ins.clone()).unwrap();
            assert_eq!(interpreter.pc().addr(), pc + 4, "instruction {}", ins);
        }
        for ins in not_skipping.iter() {
            let pc = interpreter.pc().addr();
            interpreter.execute(ins.clone()).unwrap();
            assert_eq!(interpreter.pc().addr(), pc + 2, "instruction {}", ins);
        }
    }

    /// Tests `JP`, `CALL` and `RET`, including the bad-`RET` report.
    #[test]
    fn instruction_flow() {
        let mut interpreter = Interpreter::new();
        let target = Address::from_u16(0x400).unwrap();

        interpreter.execute(Instruction::Call(target)).unwrap();
        assert_eq!(interpreter.pc().addr(), 0x400);
        interpreter.execute(Instruction::Ret).unwrap();
        // `RET` pops the caller's address and then advances past the `CALL`.
        assert_eq!(interpreter.pc().addr(), PROG_START + 2);

        let jump = Address::from_u16(0x300).unwrap();
        interpreter.execute(Instruction::Jp(jump)).unwrap();
        assert_eq!(interpreter.pc().addr(), 0x300);

        // Returning with an empty call stack is an error, and the program
        // counter stays put.
        assert!(interpreter.execute(Instruction::Ret).is_err());
        assert_eq!(interpreter.pc().addr(), 0x300);
    }

    /// Tests `JP V0, addr`.
    #[test]
    fn instruction_jp_v0() {
        use Register::*;

        let mut interpreter = Interpreter::new();
        let base = Address::from_u16(0x300).unwrap();

        interpreter.set_register(V0, 0x24);
        interpreter.execute(Instruction::JpV0(base)).unwrap();
        assert_eq!(interpreter.pc().addr(), 0x324);
    }

    /// Tests the `LD B, Vx` operation.
    #[test]
    fn instruction_ld_b() {
        use Register::*;

        // Test cases, in the format (Vx, n1, n2, n3), where the three digits
        // to be stored are n1, n2 and n3 (in that order).
        let cases = [
            (V5, 1, 2, 3),
            (VD, 0, 0, 1),
            (VE, 1, 0, 0),
            (V2, 2, 5, 5),
            (V6, 0, 0, 0),
            (V8, 2, 3, 4),
        ];
        let mut interpreter = Interpreter::new();
        interpreter.set_i(Address::from_u16(0x300).unwrap());

        for &(vx, n1, n2, n3) in cases.into_iter() {
            let case = (vx, n1, n2, n3);
            let n = 100 * n1 + 10 * n2 + n3;

            interpreter.set_register(vx, n);
            interpreter.execute(Instruction::LdB(vx)).unwrap();
            let i = interpreter.i().addr();
            assert_eq!(interpreter.mem()[i], n1, "case {:?}", case);
            assert_eq!(interpreter.mem()[i + 1], n2, "case {:?}", case);
            assert_eq!(interpreter.mem()[i + 2], n3, "case {:?}", case);
        }
    }

    /// Tests the `LD [I], Vx` and `LD Vx, [I]` block copies, including the
    /// inclusive bound and the advancing of `I`.
    #[test]
    fn instruction_block_copy() {
        use Register::*;

        let mut interpreter = Interpreter::new();
        for i in 0..4u8 {
            interpreter.set_register([V0, V1, V2, V3][i as usize], 10 + i);
        }
        interpreter.set_i(Address::from_u16(0x500).unwrap());

        interpreter.execute(Instruction::LdDerefIReg(V3)).unwrap();
        for i in 0..4 {
            assert_eq!(interpreter.mem()[0x500 + i], 10 + i as u8);
        }
        // V3 is included, so `I` has moved past four bytes.
        assert_eq!(interpreter.i().addr(), 0x504);

        let mut interpreter = Interpreter::new();
        interpreter.mem_mut()[0x500..0x504].copy_from_slice(&[7, 8, 9, 10]);
        interpreter.set_i(Address::from_u16(0x500).unwrap());
        interpreter.execute(Instruction::LdRegDerefI(V3)).unwrap();
        assert_eq!(interpreter.register(V0), 7);
        assert_eq!(interpreter.register(V1), 8);
        assert_eq!(interpreter.register(V2), 9);
        assert_eq!(interpreter.register(V3), 10);
        assert_eq!(interpreter.i().addr(), 0x504);
    }

    /// Tests `ADD I, Vx` and its overflow flag.
    #[test]
    fn instruction_add_i() {
        use Register::*;

        let mut interpreter = Interpreter::new();

        interpreter.set_i(Address::from_u16(0x100).unwrap());
        interpreter.set_register(V4, 0x20);
        interpreter.execute(Instruction::AddI(V4)).unwrap();
        assert_eq!(interpreter.i().addr(), 0x120);
        assert_eq!(interpreter.register(VF), 0);

        interpreter.set_i(Address::from_u16(0xFFE).unwrap());
        interpreter.set_register(V4, 0x05);
        interpreter.execute(Instruction::AddI(V4)).unwrap();
        assert_eq!(interpreter.i().addr(), 0x003);
        assert_eq!(interpreter.register(VF), 1);
    }

    /// Tests `LD F, Vx` (font glyph addresses).
    #[test]
    fn instruction_ld_f() {
        use Register::*;

        let mut interpreter = Interpreter::new();

        for digit in 0..16u8 {
            interpreter.set_register(V6, digit);
            interpreter.execute(Instruction::LdF(V6)).unwrap();
            assert_eq!(interpreter.i().addr(), digit as usize * 5);
        }
    }

    /// Tests that `RND Vx, byte` always honors its mask.
    #[test]
    fn instruction_rnd() {
        use Register::*;

        let mut interpreter = Interpreter::new();

        for _ in 0..32 {
            interpreter.execute(Instruction::Rnd(V9, 0x0F)).unwrap();
            assert_eq!(interpreter.register(V9) & 0xF0, 0);
        }
    }

    /// Tests the `DRW` collision flag against a draw-twice round trip.
    #[test]
    fn instruction_drw() {
        use Register::*;

        let mut interpreter = Interpreter::new();
        // Point `I` at the glyph for `0` and draw it twice at (3, 4).
        interpreter.set_register(V0, 3);
        interpreter.set_register(V1, 4);

        interpreter.execute(Instruction::Drw(V0, V1, 5)).unwrap();
        assert_eq!(interpreter.register(VF), 0);
        assert!(interpreter.display().data()[3][4]);

        interpreter.execute(Instruction::Drw(V0, V1, 5)).unwrap();
        assert_eq!(interpreter.register(VF), 1);
        assert!(!interpreter.display().data()[3][4]);
    }

    /// Tests `SKP` and `SKNP` against the key state.
    #[test]
    fn instruction_key_skips() {
        use Register::*;
        use input::Key;

        let mut interpreter = Interpreter::new();
        interpreter.set_register(V2, 0x5);

        let pc = interpreter.pc().addr();
        interpreter.execute(Instruction::Skp(V2)).unwrap();
        assert_eq!(interpreter.pc().addr(), pc + 2);
        interpreter.execute(Instruction::Sknp(V2)).unwrap();
        assert_eq!(interpreter.pc().addr(), pc + 6);

        interpreter.input_mut().press(Key::K5);
        let pc = interpreter.pc().addr();
        interpreter.execute(Instruction::Skp(V2)).unwrap();
        assert_eq!(interpreter.pc().addr(), pc + 4);
        interpreter.execute(Instruction::Sknp(V2)).unwrap();
        assert_eq!(interpreter.pc().addr(), pc + 6);
    }

    /// Tests the timer load and store instructions.
    #[test]
    fn instruction_timers() {
        use Register::*;

        let mut interpreter = Interpreter::new();

        interpreter.set_register(V0, 7);
        interpreter.execute(Instruction::LdDtReg(V0)).unwrap();
        interpreter.execute(Instruction::LdSt(V0)).unwrap();
        assert_eq!(interpreter.dt(), 7);
        assert_eq!(interpreter.st(), 7);

        interpreter.execute(Instruction::LdRegDt(V3)).unwrap();
        assert_eq!(interpreter.register(V3), 7);
    }

    /// Tests the per-cycle timer decay and the beep signal.
    #[test]
    fn timer_decay() {
        // A program consisting of a single jump-to-self.
        let mut interpreter = with_program(&[0x12, 0x00]);
        interpreter.set_dt(2);
        interpreter.set_st(2);

        interpreter.step();
        assert_eq!(interpreter.dt(), 1);
        assert!(interpreter.beep());
        interpreter.step();
        assert_eq!(interpreter.dt(), 0);
        assert!(interpreter.beep());
        // The timers floor at zero and the beep signal drops.
        interpreter.step();
        assert_eq!(interpreter.dt(), 0);
        assert_eq!(interpreter.st(), 0);
        assert!(!interpreter.beep());
    }

    /// Tests that `LD Vx, K` stalls the program counter until a key is down.
    #[test]
    fn instruction_ld_key() {
        use Register::*;
        use input::Key;

        // `LD V4, K` followed by a jump-to-self.
        let mut interpreter = with_program(&[0xF4, 0x0A, 0x12, 0x02]);

        for _ in 0..3 {
            interpreter.step();
            assert_eq!(interpreter.pc().addr(), PROG_START);
        }

        interpreter.input_mut().press(Key::KB);
        interpreter.step();
        assert_eq!(interpreter.pc().addr(), PROG_START + 2);
        assert_eq!(interpreter.register(V4), 0xB);
    }

    /// Tests that the timers hold their values while `LD Vx, K` waits.
    #[test]
    fn await_key_freezes_timers() {
        use Register::*;
        use input::Key;

        // `LD V4, K` followed by a jump-to-self.
        let mut interpreter = with_program(&[0xF4, 0x0A, 0x12, 0x02]);
        interpreter.set_dt(5);
        interpreter.set_st(5);

        for _ in 0..3 {
            interpreter.step();
            assert_eq!(interpreter.pc().addr(), PROG_START);
            assert_eq!(interpreter.dt(), 5);
            assert_eq!(interpreter.st(), 5);
        }

        // Once a key arrives the cycle completes and the timers resume.
        interpreter.input_mut().press(Key::K2);
        interpreter.step();
        assert_eq!(interpreter.register(V4), 0x2);
        assert_eq!(interpreter.dt(), 4);
        assert_eq!(interpreter.st(), 4);
    }

    /// Tests that an unrecognized opcode leaves the program counter alone.
    #[test]
    fn unknown_opcode() {
        let mut interpreter = with_program(&[0x00, 0x00]);

        interpreter.step();
        assert_eq!(interpreter.pc().addr(), PROG_START);
        interpreter.step();
        assert_eq!(interpreter.pc().addr(), PROG_START);
    }
}
