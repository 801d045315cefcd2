//! An 8-bit register machine for the KRAM instruction set.
//!
//! Programs are flat byte images executed against eight registers and a
//! bounds-checked RAM buffer; they talk to the host through a small
//! syscall console protocol, and every fault comes back to the caller
//! as a typed error instead of tearing the process down.

pub mod console;
pub mod memory;
pub mod opcode;
pub mod program;
pub mod register;
pub mod vm;
