//! The seam between a running program and the host's output.

use std::io::{self, Write};

/// Host-side sink for syscall output.
///
/// Blanket-implemented for every [`std::io::Write`], so the driver can
/// hand the VM a locked stdout while tests hand it a `Vec<u8>` capture
/// buffer.
pub trait Console {
  /// Writes the bytes of a program string, terminating NUL already
  /// stripped.
  fn print_string(&mut self, bytes: &[u8]) -> io::Result<()>;

  /// Writes a byte value in decimal, with no terminator.
  fn print_number(&mut self, value: u8) -> io::Result<()>;
}

impl<W: Write> Console for W {
  fn print_string(&mut self, bytes: &[u8]) -> io::Result<()> {
    self.write_all(bytes)
  }

  fn print_number(&mut self, value: u8) -> io::Result<()> {
    write!(self, "{value}")
  }
}
