//! Bounds-checked, byte-addressable RAM.

use crate::vm::Error;

/// Default RAM size in bytes.
pub const DEFAULT_SIZE: usize = 0x400;

/// The VM's RAM: a zero-initialized buffer of configured size. Valid
/// addresses are `[0, len)`; any access past the end is a `MemoryFault`
/// carrying the offending address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
  bytes: Vec<u8>,
}

impl Memory {
  /// A zero-filled buffer of `size` bytes. Addresses are 16-bit;
  /// bytes past 65536 are unreachable by programs.
  pub fn new(size: usize) -> Self {
    Self {
      bytes: vec![0; size],
    }
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// Reads one byte.
  pub fn read8(&self, addr: u16) -> Result<u8, Error> {
    self
      .bytes
      .get(usize::from(addr))
      .copied()
      .ok_or(Error::MemoryFault { addr })
  }

  /// Writes one byte.
  pub fn write8(&mut self, addr: u16, value: u8) -> Result<(), Error> {
    match self.bytes.get_mut(usize::from(addr)) {
      Some(slot) => {
        *slot = value;
        Ok(())
      }
      None => Err(Error::MemoryFault { addr }),
    }
  }

  /// Reads a big-endian 16-bit word, high byte first. The second byte's
  /// address wraps at the top of the 16-bit space, the same way the
  /// program counter does.
  pub fn read16(&self, addr: u16) -> Result<u16, Error> {
    let high = self.read8(addr)?;
    let low = self.read8(addr.wrapping_add(1))?;
    Ok(u16::from(high) << 8 | u16::from(low))
  }

  /// Copies a program image to address 0, failing before any byte moves
  /// when the image does not fit.
  pub fn load(&mut self, image: &[u8]) -> Result<(), Error> {
    if image.len() > self.bytes.len() {
      return Err(Error::ProgramTooLarge {
        size: image.len(),
        capacity: self.bytes.len(),
      });
    }
    self.bytes[..image.len()].copy_from_slice(image);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_is_zero_filled() {
    let ram = Memory::new(16);
    assert_eq!(ram.len(), 16);
    for addr in 0..16 {
      assert_eq!(ram.read8(addr).unwrap(), 0);
    }
  }

  #[test]
  fn bytes_roundtrip() {
    let mut ram = Memory::new(8);
    ram.write8(3, 0xAB).unwrap();
    assert_eq!(ram.read8(3).unwrap(), 0xAB);
  }

  #[test]
  fn read_out_of_range_faults() {
    let ram = Memory::new(8);
    let err = ram.read8(8).unwrap_err();
    assert!(matches!(err, Error::MemoryFault { addr: 8 }));
  }

  #[test]
  fn write_out_of_range_faults() {
    let mut ram = Memory::new(8);
    let err = ram.write8(100, 1).unwrap_err();
    assert!(matches!(err, Error::MemoryFault { addr: 100 }));
  }

  #[test]
  fn read16_is_big_endian() {
    let mut ram = Memory::new(8);
    ram.write8(2, 0x12).unwrap();
    ram.write8(3, 0x34).unwrap();
    assert_eq!(ram.read16(2).unwrap(), 0x1234);
  }

  #[test]
  fn read16_faults_on_second_byte() {
    let ram = Memory::new(8);
    let err = ram.read16(7).unwrap_err();
    assert!(matches!(err, Error::MemoryFault { addr: 8 }));
  }

  #[test]
  fn load_copies_to_address_zero() {
    let mut ram = Memory::new(8);
    ram.load(&[1, 2, 3]).unwrap();
    assert_eq!(ram.read8(0).unwrap(), 1);
    assert_eq!(ram.read8(1).unwrap(), 2);
    assert_eq!(ram.read8(2).unwrap(), 3);
    assert_eq!(ram.read8(3).unwrap(), 0);
  }

  #[test]
  fn load_exact_fit() {
    let mut ram = Memory::new(4);
    ram.load(&[9, 9, 9, 9]).unwrap();
    assert_eq!(ram.read8(3).unwrap(), 9);
  }

  #[test]
  fn load_too_large_fails_untouched() {
    let mut ram = Memory::new(4);
    let err = ram.load(&[1, 2, 3, 4, 5]).unwrap_err();
    assert!(matches!(
      err,
      Error::ProgramTooLarge {
        size: 5,
        capacity: 4
      }
    ));
    for addr in 0..4 {
      assert_eq!(ram.read8(addr).unwrap(), 0);
    }
  }
}
