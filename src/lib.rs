/*
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! A Chip-8 virtual machine.
//!
//! The heart of the crate is the `Interpreter`, which owns the complete
//! machine state and executes one instruction per call to `step`.  The
//! front-end (display window, keyboard, buzzer and the loop that paces
//! execution at 60 Hz) lives in the `ocho` binary and talks to the
//! interpreter only through the `display` and `input` modules.

#[macro_use]
extern crate enum_primitive;
extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;
extern crate num;
extern crate rand;

/// The size of the Chip-8's memory, in bytes.
pub const MEM_SIZE: usize = 0x1000;
/// The address where programs should be loaded.
pub const PROG_START: usize = 0x200;
/// The maximum size of a Chip-8 program, in bytes.
pub const PROG_SIZE: usize = MEM_SIZE - PROG_START;

pub mod display;
pub mod input;
pub mod instruction;
pub mod interpreter;

pub use instruction::{Address, AddressOutOfBoundsError, Instruction, Opcode, Register};
pub use interpreter::Interpreter;
