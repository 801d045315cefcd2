//! The eight-register file of the KRAM machine.
//!
//! Six byte-wide registers sit alongside a 16-bit stack pointer and a
//! 16-bit program counter. The instruction encoding only carries 3-bit
//! selectors, so the two wide registers appear in the selector table as
//! byte views: `SPA`/`SPB` are the high and low halves of `SP`, and `PC`
//! reads as its low byte but is replaced whole (zero-extended) on write.

use std::fmt;

/// Compare flag, bit 0 of `FLG`. Written by `CMP`, consumed by
/// `BEQ`/`BNE`. The remaining bits are reserved and stay zero.
pub const FLAG_CMP: u8 = 1 << 0;

/// A register selector as carried in instruction bytes.
///
/// The discriminants are the wire encoding shared with existing program
/// images; reordering them would break every compiled binary.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
  A = 0,
  X = 1,
  Y = 2,
  /// High byte of the stack pointer.
  Spa = 3,
  Pc = 4,
  Flg = 5,
  B = 6,
  /// Low byte of the stack pointer.
  Spb = 7,
}

impl Reg {
  /// Maps a selector value to its register; selectors past the eight
  /// defined registers yield `None` and must be reported as a fault by
  /// the caller, never clamped.
  pub fn from_selector(selector: u8) -> Option<Self> {
    match selector {
      0 => Some(Self::A),
      1 => Some(Self::X),
      2 => Some(Self::Y),
      3 => Some(Self::Spa),
      4 => Some(Self::Pc),
      5 => Some(Self::Flg),
      6 => Some(Self::B),
      7 => Some(Self::Spb),
      _ => None,
    }
  }
}

/// Machine registers of a single VM instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterFile {
  pub(crate) a: u8,
  pub(crate) b: u8,
  pub(crate) x: u8,
  pub(crate) y: u8,
  pub(crate) sp: u16,
  pub(crate) pc: u16,
  pub(crate) flg: u8,
}

impl RegisterFile {
  /// A fresh register file: byte registers zeroed, `SP` and `PC` at
  /// their configured starting values.
  pub fn new(stack_pointer: u16, entry_point: u16) -> Self {
    Self {
      sp: stack_pointer,
      pc: entry_point,
      ..Self::default()
    }
  }

  /// Reads the 8-bit view of the selected register.
  pub fn get(&self, reg: Reg) -> u8 {
    match reg {
      Reg::A => self.a,
      Reg::X => self.x,
      Reg::Y => self.y,
      Reg::Spa => (self.sp >> 8) as u8,
      Reg::Pc => self.pc as u8,
      Reg::Flg => self.flg,
      Reg::B => self.b,
      Reg::Spb => self.sp as u8,
    }
  }

  /// Writes through the 8-bit view of the selected register. `SPA` and
  /// `SPB` replace their half of `SP`; `PC` is replaced whole with the
  /// zero-extended value.
  pub fn set(&mut self, reg: Reg, value: u8) {
    match reg {
      Reg::A => self.a = value,
      Reg::X => self.x = value,
      Reg::Y => self.y = value,
      Reg::Spa => self.sp = (self.sp & 0x00FF) | (u16::from(value) << 8),
      Reg::Pc => self.pc = u16::from(value),
      Reg::Flg => self.flg = value,
      Reg::B => self.b = value,
      Reg::Spb => self.sp = (self.sp & 0xFF00) | u16::from(value),
    }
  }

  /// The derived 16-bit address `X:Y`, used by register-mode memory and
  /// branch operands and by syscall pointer arguments.
  pub fn address(&self) -> u16 {
    u16::from(self.x) << 8 | u16::from(self.y)
  }

  /// Current program counter, full width.
  pub fn pc(&self) -> u16 {
    self.pc
  }

  /// Current stack pointer, full width.
  pub fn sp(&self) -> u16 {
    self.sp
  }

  pub(crate) fn compare(&self) -> bool {
    self.flg & FLAG_CMP != 0
  }

  pub(crate) fn set_compare(&mut self, equal: bool) {
    if equal {
      self.flg |= FLAG_CMP;
    } else {
      self.flg &= !FLAG_CMP;
    }
  }
}

impl fmt::Display for RegisterFile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "A:   {:#04x}    B:   {:#04x}", self.a, self.b)?;
    writeln!(f, "X:   {:#04x}    Y:   {:#04x}", self.x, self.y)?;
    writeln!(f, "SP:  {:#06x}  PC:  {:#06x}", self.sp, self.pc)?;
    write!(f, "FLG: {:#010b}", self.flg)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selector_mapping_is_canonical() {
    assert_eq!(Reg::from_selector(0), Some(Reg::A));
    assert_eq!(Reg::from_selector(1), Some(Reg::X));
    assert_eq!(Reg::from_selector(2), Some(Reg::Y));
    assert_eq!(Reg::from_selector(3), Some(Reg::Spa));
    assert_eq!(Reg::from_selector(4), Some(Reg::Pc));
    assert_eq!(Reg::from_selector(5), Some(Reg::Flg));
    assert_eq!(Reg::from_selector(6), Some(Reg::B));
    assert_eq!(Reg::from_selector(7), Some(Reg::Spb));
  }

  #[test]
  fn selector_out_of_range() {
    assert_eq!(Reg::from_selector(8), None);
    assert_eq!(Reg::from_selector(255), None);
  }

  #[test]
  fn new_applies_starting_values() {
    let regs = RegisterFile::new(0x200, 0x10);
    assert_eq!(regs.sp(), 0x200);
    assert_eq!(regs.pc(), 0x10);
    assert_eq!(regs.get(Reg::A), 0);
    assert_eq!(regs.get(Reg::B), 0);
    assert_eq!(regs.get(Reg::X), 0);
    assert_eq!(regs.get(Reg::Y), 0);
    assert_eq!(regs.get(Reg::Flg), 0);
  }

  #[test]
  fn byte_registers_roundtrip() {
    let mut regs = RegisterFile::default();
    for reg in [Reg::A, Reg::B, Reg::X, Reg::Y, Reg::Flg] {
      regs.set(reg, 0xAB);
      assert_eq!(regs.get(reg), 0xAB);
    }
  }

  #[test]
  fn stack_pointer_halves_compose() {
    let mut regs = RegisterFile::default();
    regs.set(Reg::Spa, 0x12);
    regs.set(Reg::Spb, 0x34);
    assert_eq!(regs.sp(), 0x1234);
    assert_eq!(regs.get(Reg::Spa), 0x12);
    assert_eq!(regs.get(Reg::Spb), 0x34);
    regs.set(Reg::Spa, 0xFF);
    assert_eq!(regs.sp(), 0xFF34);
  }

  #[test]
  fn pc_reads_low_byte() {
    let mut regs = RegisterFile::default();
    regs.pc = 0x1234;
    assert_eq!(regs.get(Reg::Pc), 0x34);
  }

  #[test]
  fn pc_write_replaces_whole_value() {
    let mut regs = RegisterFile::default();
    regs.pc = 0x1234;
    regs.set(Reg::Pc, 0x56);
    assert_eq!(regs.pc(), 0x0056);
  }

  #[test]
  fn derived_address_is_x_high_y_low() {
    let mut regs = RegisterFile::default();
    regs.set(Reg::X, 0x02);
    regs.set(Reg::Y, 0x40);
    assert_eq!(regs.address(), 0x0240);
  }

  #[test]
  fn compare_flag_toggles_bit_zero() {
    let mut regs = RegisterFile::default();
    assert!(!regs.compare());
    regs.set_compare(true);
    assert!(regs.compare());
    assert_eq!(regs.get(Reg::Flg), FLAG_CMP);
    regs.set_compare(false);
    assert!(!regs.compare());
    assert_eq!(regs.get(Reg::Flg), 0);
  }

  #[test]
  fn display_lists_every_register() {
    let dump = RegisterFile::new(0x200, 0).to_string();
    for label in ["A:", "B:", "X:", "Y:", "SP:", "PC:", "FLG:"] {
      assert!(dump.contains(label), "missing {label} in {dump}");
    }
    assert!(dump.contains("0x0200"));
  }
}
