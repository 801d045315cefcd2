/// A `Program` is a flat binary image our virtual machine copies into
/// RAM at address 0 and executes. No header, no relocation, no symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
  bytes: Vec<u8>,
}

impl Program {
  /// The raw image.
  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

impl From<Vec<u8>> for Program {
  fn from(bytes: Vec<u8>) -> Self {
    Self { bytes }
  }
}
