//! Opcode-byte layout and decoding for the KRAM instruction set.
//!
//! Every instruction starts with a single byte holding a 5-bit family
//! code over a 3-bit register selector. Families 1..=8 are the
//! immediate-mode operations, 9..=15 their register-mode twins, and the
//! arithmetic block repeats the split at 16..=23 / 24..=31. Family 0 is
//! the only unassigned code.

/// Low three bits of an opcode byte: the register selector.
pub const SELECTOR_MASK: u8 = 0b0000_0111;

/// Shift that isolates the 5-bit family code of an opcode byte.
pub const FAMILY_SHIFT: u32 = 3;

/// Bit 6 of an opcode byte, i.e. bit 3 of the family code, distinguishes
/// the register-mode families from their immediate-mode counterparts.
pub const MODE_BIT: u8 = 0b0100_0000;

/// How an instruction names its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// The operand bytes follow in the instruction stream.
  Immediate,
  /// The operand is read from a register, or from the `X:Y` pair for
  /// 16-bit addresses.
  Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
  /// | Operation        | Semantics/RTL                 | Family (imm/reg) |
  /// |------------------|-------------------------------|------------------|
  /// | Branch Not Equal | `if FLG.cmp = 0 : pc ← aaaa`  | 1 / 9            |
  Bne,

  /// | Operation     | Semantics/RTL                | Family (imm/reg) |
  /// |---------------|------------------------------|------------------|
  /// | Branch Equal  | `if FLG.cmp = 1 : pc ← aaaa` | 2 / 10           |
  Beq,

  /// | Operation | Semantics/RTL | Family (imm/reg) |
  /// |-----------|---------------|------------------|
  /// | Jump      | `pc ← aaaa`   | 3 / 11           |
  Jmp,

  /// Loads the selector register with its operand.
  ///
  /// | Operation | Semantics/RTL       | Family (imm/reg) |
  /// |-----------|---------------------|------------------|
  /// | Move      | `r[d] ← vvvvvvvv`   | 4 / 12           |
  Mov,

  /// Compares the selector register against its operand and records the
  /// outcome in the compare flag.
  ///
  /// | Operation | Semantics/RTL                   | Family (imm/reg) |
  /// |-----------|---------------------------------|------------------|
  /// | Compare   | `FLG.cmp ← (r[d] = vvvvvvvv)`   | 5 / 13           |
  Cmp,

  /// | Operation | Semantics/RTL    | Family (imm/reg) |
  /// |-----------|------------------|------------------|
  /// | Poke      | `m[aaaa] ← r[d]` | 6 / 14           |
  Poke,

  /// | Operation | Semantics/RTL  | Family (imm/reg) |
  /// |-----------|----------------|------------------|
  /// | Peek      | `A ← m[aaaa]`  | 7 / 15           |
  Peek,

  /// Requests the host service numbered by register `A`. Takes no
  /// operand; family 8 has no register-mode twin.
  ///
  /// | Operation | Semantics/RTL | Family |
  /// |-----------|---------------|--------|
  /// | Syscall   | `host(A)`     | 8      |
  Syscall,

  /// | Operation | Semantics/RTL            | Family (imm/reg) |
  /// |-----------|--------------------------|------------------|
  /// | Add       | `A ← r[d] + vvvvvvvv`    | 16 / 24          |
  Add,

  /// | Operation | Semantics/RTL            | Family (imm/reg) |
  /// |-----------|--------------------------|------------------|
  /// | Subtract  | `A ← r[d] − vvvvvvvv`    | 17 / 25          |
  Sub,

  /// | Operation | Semantics/RTL            | Family (imm/reg) |
  /// |-----------|--------------------------|------------------|
  /// | Multiply  | `A ← r[d] × vvvvvvvv`    | 18 / 26          |
  Mul,

  /// Quotient to `A`, remainder to `B`; a zero divisor is a fault.
  ///
  /// | Operation | Semantics/RTL                                 | Family (imm/reg) |
  /// |-----------|-----------------------------------------------|------------------|
  /// | Divide    | `A ← r[d] ÷ vvvvvvvv, B ← r[d] mod vvvvvvvv`  | 19 / 27          |
  Div,

  /// | Operation   | Semantics/RTL            | Family (imm/reg) |
  /// |-------------|--------------------------|------------------|
  /// | Logical AND | `A ← r[d] & vvvvvvvv`    | 20 / 28          |
  And,

  /// | Operation  | Semantics/RTL             | Family (imm/reg) |
  /// |------------|---------------------------|------------------|
  /// | Logical OR | `A ← r[d] \| vvvvvvvv`    | 21 / 29          |
  Or,

  /// The one arithmetic operation whose destination is the selector
  /// register itself rather than `A`; the selector's old value does not
  /// participate.
  ///
  /// | Operation   | Semantics/RTL       | Family (imm/reg) |
  /// |-------------|---------------------|------------------|
  /// | Logical NOT | `r[d] ← ~vvvvvvvv`  | 22 / 30          |
  Not,

  /// | Operation   | Semantics/RTL            | Family (imm/reg) |
  /// |-------------|--------------------------|------------------|
  /// | Logical XOR | `A ← r[d] ^ vvvvvvvv`    | 23 / 31          |
  Xor,
}

/// Splits an opcode byte into its operation and addressing mode.
///
/// Family code 0 is the only encoding with no assigned operation and
/// yields `None`; the 3-bit selector never affects which operation is
/// chosen. Family 8 (`SYSCALL`) takes no operand and always decodes as
/// `Mode::Immediate`, even though its code carries the mode bit.
pub fn decode(byte: u8) -> Option<(Op, Mode)> {
  let op = match byte >> FAMILY_SHIFT {
    1 | 9 => Op::Bne,
    2 | 10 => Op::Beq,
    3 | 11 => Op::Jmp,
    4 | 12 => Op::Mov,
    5 | 13 => Op::Cmp,
    6 | 14 => Op::Poke,
    7 | 15 => Op::Peek,
    8 => Op::Syscall,
    16 | 24 => Op::Add,
    17 | 25 => Op::Sub,
    18 | 26 => Op::Mul,
    19 | 27 => Op::Div,
    20 | 28 => Op::And,
    21 | 29 => Op::Or,
    22 | 30 => Op::Not,
    23 | 31 => Op::Xor,
    _ => return None,
  };
  let mode = if op == Op::Syscall || byte & MODE_BIT == 0 {
    Mode::Immediate
  } else {
    Mode::Register
  };
  Some((op, mode))
}

/// Host services a program can request through `SYSCALL`, numbered by
/// register `A`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
  /// Stop execution.
  Exit = 0,
  /// Write the NUL-terminated string at `X:Y` to the console.
  PrintString = 1,
  /// Write the byte at `X:Y` to the console in decimal.
  PrintNumber = 2,
}

impl Syscall {
  /// Maps a syscall number taken from register `A`; unknown numbers
  /// yield `None`.
  pub fn from_number(number: u8) -> Option<Self> {
    match number {
      0 => Some(Self::Exit),
      1 => Some(Self::PrintString),
      2 => Some(Self::PrintNumber),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decode_immediate_families() {
    assert_eq!(decode(1 << FAMILY_SHIFT), Some((Op::Bne, Mode::Immediate)));
    assert_eq!(decode(2 << FAMILY_SHIFT), Some((Op::Beq, Mode::Immediate)));
    assert_eq!(decode(3 << FAMILY_SHIFT), Some((Op::Jmp, Mode::Immediate)));
    assert_eq!(decode(4 << FAMILY_SHIFT), Some((Op::Mov, Mode::Immediate)));
    assert_eq!(decode(5 << FAMILY_SHIFT), Some((Op::Cmp, Mode::Immediate)));
    assert_eq!(decode(6 << FAMILY_SHIFT), Some((Op::Poke, Mode::Immediate)));
    assert_eq!(decode(7 << FAMILY_SHIFT), Some((Op::Peek, Mode::Immediate)));
    assert_eq!(decode(16 << FAMILY_SHIFT), Some((Op::Add, Mode::Immediate)));
    assert_eq!(decode(19 << FAMILY_SHIFT), Some((Op::Div, Mode::Immediate)));
    assert_eq!(decode(23 << FAMILY_SHIFT), Some((Op::Xor, Mode::Immediate)));
  }

  #[test]
  fn decode_register_families() {
    assert_eq!(decode(9 << FAMILY_SHIFT), Some((Op::Bne, Mode::Register)));
    assert_eq!(decode(12 << FAMILY_SHIFT), Some((Op::Mov, Mode::Register)));
    assert_eq!(decode(15 << FAMILY_SHIFT), Some((Op::Peek, Mode::Register)));
    assert_eq!(decode(24 << FAMILY_SHIFT), Some((Op::Add, Mode::Register)));
    assert_eq!(decode(30 << FAMILY_SHIFT), Some((Op::Not, Mode::Register)));
    assert_eq!(decode(31 << FAMILY_SHIFT), Some((Op::Xor, Mode::Register)));
  }

  #[test]
  fn decode_mode_is_bit_six() {
    let (_, imm) = decode(4 << FAMILY_SHIFT).unwrap();
    let (_, reg) = decode((4 << FAMILY_SHIFT) | MODE_BIT).unwrap();
    assert_eq!(imm, Mode::Immediate);
    assert_eq!(reg, Mode::Register);
  }

  #[test]
  fn decode_syscall_is_always_immediate() {
    for selector in 0..8u8 {
      let byte = (8 << FAMILY_SHIFT) | selector;
      assert_eq!(decode(byte), Some((Op::Syscall, Mode::Immediate)));
    }
  }

  #[test]
  fn decode_ignores_selector_bits() {
    for selector in 0..8u8 {
      let byte = (4 << FAMILY_SHIFT) | selector;
      assert_eq!(decode(byte), Some((Op::Mov, Mode::Immediate)));
    }
  }

  #[test]
  fn decode_family_zero_is_unassigned() {
    for selector in 0..8u8 {
      assert_eq!(decode(selector), None);
    }
  }

  #[test]
  fn decode_every_nonzero_family() {
    for family in 1..32u8 {
      assert!(decode(family << FAMILY_SHIFT).is_some());
    }
  }

  #[test]
  fn syscall_numbers() {
    assert_eq!(Syscall::from_number(0), Some(Syscall::Exit));
    assert_eq!(Syscall::from_number(1), Some(Syscall::PrintString));
    assert_eq!(Syscall::from_number(2), Some(Syscall::PrintNumber));
    assert_eq!(Syscall::from_number(3), None);
    assert_eq!(Syscall::from_number(255), None);
  }
}
