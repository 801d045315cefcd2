use std::io;

use tracing::{debug, trace};

use crate::console::Console;
use crate::memory::{self, Memory};
use crate::opcode::{decode, Mode, Op, Syscall, SELECTOR_MASK};
use crate::program::Program;
use crate::register::{Reg, RegisterFile};

/// Default starting value of the stack pointer.
pub const DEFAULT_STACK_POINTER: u16 = 0x200;

/// Construction parameters for a [`Vm`]. Every knob is explicit; there
/// is no process-wide state behind any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// RAM size in bytes.
  pub memory_size: usize,
  /// Starting value of the 16-bit stack pointer.
  pub stack_pointer: u16,
  /// Address of the first instruction.
  pub entry_point: u16,
  /// Optional cap on executed instructions: a program that runs this
  /// many steps without halting faults with `StepLimitExceeded`.
  pub step_limit: Option<u64>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      memory_size: memory::DEFAULT_SIZE,
      stack_pointer: DEFAULT_STACK_POINTER,
      entry_point: 0,
      step_limit: None,
    }
  }
}

/// Execution state of a [`Vm`]. `Halted` is terminal, reached through
/// the `Exit` syscall or any fault; there is no reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Running,
  Halted,
}

/// A KRAM virtual machine: eight registers and a flat byte RAM driven
/// by a fetch-decode-execute loop.
///
/// Each instance owns its memory and register file outright; nothing is
/// shared between machines. Lifecycle: construct, [`load`](Vm::load) an
/// image, [`run`](Vm::run) to a halt or fault, then inspect
/// [`result`](Vm::result) or [`dump_registers`](Vm::dump_registers).
#[derive(Debug)]
pub struct Vm {
  ram: Memory,
  regs: RegisterFile,
  state: State,
  steps: u64,
  step_limit: Option<u64>,
}

impl Vm {
  /// Create a virtual machine from explicit parameters. Memory starts
  /// zero-filled, `PC` at the entry point, `SP` at the configured top.
  pub fn new(config: Config) -> Self {
    Self {
      ram: Memory::new(config.memory_size),
      regs: RegisterFile::new(config.stack_pointer, config.entry_point),
      state: State::Running,
      steps: 0,
      step_limit: config.step_limit,
    }
  }

  /// Copies a program image into RAM at address 0. Registers are not
  /// touched, and a rejected image leaves memory untouched too.
  pub fn load(&mut self, program: &Program) -> Result<(), Error> {
    debug!(bytes = program.len(), "loading program");
    self.ram.load(program.bytes())
  }

  /// Executes a single instruction, indicating the machine's state
  /// afterwards. A fault halts the machine before it is returned;
  /// stepping a halted machine does nothing and reports `Halted` again.
  pub fn step<C>(&mut self, console: &mut C) -> Result<State, Error>
  where
    C: Console,
  {
    if self.state == State::Halted {
      return Ok(State::Halted);
    }
    if let Some(limit) = self.step_limit {
      if self.steps >= limit {
        self.state = State::Halted;
        return Err(Error::StepLimitExceeded { limit });
      }
    }
    self.steps += 1;
    let outcome = Step::new(self, console).run();
    if outcome.is_err() {
      self.state = State::Halted;
    }
    outcome?;
    Ok(self.state)
  }

  /// Runs until the program exits or a fault aborts it. The first fault
  /// halts the machine and is returned; nothing is retried.
  pub fn run<C>(&mut self, console: &mut C) -> Result<(), Error>
  where
    C: Console,
  {
    while self.step(console)? == State::Running {}
    debug!(steps = self.steps, "halted");
    Ok(())
  }

  /// Register `A`, the conventional program result.
  pub fn result(&self) -> u8 {
    self.regs.get(Reg::A)
  }

  pub fn state(&self) -> State {
    self.state
  }

  /// Read-only view of the register file.
  pub fn registers(&self) -> &RegisterFile {
    &self.regs
  }

  /// Human-readable listing of every register; does not disturb the
  /// machine.
  pub fn dump_registers(&self) -> String {
    self.regs.to_string()
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::new(Config::default())
  }
}

/// A fault raised while loading or executing a program. Every variant
/// is fatal to the run that produced it.
#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("program of {size} bytes does not fit in {capacity} bytes of memory")]
  ProgramTooLarge { size: usize, capacity: usize },

  #[error("memory access out of bounds at {addr:#06x}")]
  MemoryFault { addr: u16 },

  #[error("selector {selector} does not name a register")]
  InvalidRegisterSelector { selector: u8 },

  #[error("invalid opcode {opcode:#04x} at {addr:#06x}")]
  InvalidOpcode { opcode: u8, addr: u16 },

  #[error("divide by zero")]
  DivideByZero,

  #[error("unknown syscall {number}")]
  UnknownSyscall { number: u8 },

  #[error("string at {addr:#06x} has no NUL terminator")]
  UnterminatedString { addr: u16 },

  #[error("step limit of {limit} instructions exceeded")]
  StepLimitExceeded { limit: u64 },

  #[error("console write failed: {0}")]
  Console(#[from] io::Error),
}

struct Step<'vm, 'con, C> {
  vm: &'vm mut Vm,
  console: &'con mut C,
}

impl<'vm, 'con, C> Step<'vm, 'con, C>
where
  C: Console,
{
  fn new(vm: &'vm mut Vm, console: &'con mut C) -> Self {
    Self { vm, console }
  }

  /// Fetches the byte at `PC` and advances past it. `PC` wraps as a
  /// `u16`; the bounds check is the memory read itself.
  #[inline]
  fn fetch8(&mut self) -> Result<u8, Error> {
    let byte = self.vm.ram.read8(self.vm.regs.pc)?;
    self.vm.regs.pc = self.vm.regs.pc.wrapping_add(1);
    Ok(byte)
  }

  /// Fetches a big-endian 16-bit word at `PC` and advances past it.
  fn fetch16(&mut self) -> Result<u16, Error> {
    let word = self.vm.ram.read16(self.vm.regs.pc)?;
    self.vm.regs.pc = self.vm.regs.pc.wrapping_add(2);
    Ok(word)
  }

  /// Resolves an 8-bit operand: the next stream byte in immediate mode,
  /// or the value of the register that byte names in register mode.
  fn operand8(&mut self, mode: Mode) -> Result<u8, Error> {
    match mode {
      Mode::Immediate => self.fetch8(),
      Mode::Register => {
        let selector = self.fetch8()? & SELECTOR_MASK;
        let reg = Reg::from_selector(selector)
          .ok_or(Error::InvalidRegisterSelector { selector })?;
        Ok(self.vm.regs.get(reg))
      }
    }
  }

  /// Resolves a 16-bit address operand: two big-endian stream bytes in
  /// immediate mode, or the derived `X:Y` pair (no stream bytes) in
  /// register mode.
  fn target(&mut self, mode: Mode) -> Result<u16, Error> {
    match mode {
      Mode::Immediate => self.fetch16(),
      Mode::Register => Ok(self.vm.regs.address()),
    }
  }

  fn run(&mut self) -> Result<(), Error> {
    let at = self.vm.regs.pc;
    let byte = self.fetch8()?;
    let (op, mode) = decode(byte).ok_or(Error::InvalidOpcode {
      opcode: byte,
      addr: at,
    })?;
    let selector = byte & SELECTOR_MASK;
    let reg = Reg::from_selector(selector)
      .ok_or(Error::InvalidRegisterSelector { selector })?;
    trace!(pc = at, opcode = byte, ?op, ?mode, "step");
    match op {
      Op::Bne => bne(self, mode),
      Op::Beq => beq(self, mode),
      Op::Jmp => jmp(self, mode),
      Op::Mov => mov(self, mode, reg),
      Op::Cmp => cmp(self, mode, reg),
      Op::Poke => poke(self, mode, reg),
      Op::Peek => peek(self, mode),
      Op::Syscall => syscall(self),
      Op::Add => add(self, mode, reg),
      Op::Sub => sub(self, mode, reg),
      Op::Mul => mul(self, mode, reg),
      Op::Div => div(self, mode, reg),
      Op::And => and(self, mode, reg),
      Op::Or => or(self, mode, reg),
      Op::Not => not(self, mode, reg),
      Op::Xor => xor(self, mode, reg),
    }
  }
}

// if FLG.cmp = 0 : pc ← aaaa
fn bne<C>(step: &mut Step<'_, '_, C>, mode: Mode) -> Result<(), Error>
where
  C: Console,
{
  let target = step.target(mode)?;
  if !step.vm.regs.compare() {
    step.vm.regs.pc = target;
  }
  Ok(())
}

// if FLG.cmp = 1 : pc ← aaaa
fn beq<C>(step: &mut Step<'_, '_, C>, mode: Mode) -> Result<(), Error>
where
  C: Console,
{
  let target = step.target(mode)?;
  if step.vm.regs.compare() {
    step.vm.regs.pc = target;
  }
  Ok(())
}

// pc ← aaaa
fn jmp<C>(step: &mut Step<'_, '_, C>, mode: Mode) -> Result<(), Error>
where
  C: Console,
{
  let target = step.target(mode)?;
  step.vm.regs.pc = target;
  Ok(())
}

// r[d] ← vvvvvvvv
fn mov<C>(step: &mut Step<'_, '_, C>, mode: Mode, dest: Reg) -> Result<(), Error>
where
  C: Console,
{
  let value = step.operand8(mode)?;
  step.vm.regs.set(dest, value);
  Ok(())
}

// FLG.cmp ← (r[d] = vvvvvvvv)
fn cmp<C>(step: &mut Step<'_, '_, C>, mode: Mode, reg: Reg) -> Result<(), Error>
where
  C: Console,
{
  let left = step.vm.regs.get(reg);
  let right = step.operand8(mode)?;
  step.vm.regs.set_compare(left == right);
  Ok(())
}

// m[aaaa] ← r[d]
fn poke<C>(step: &mut Step<'_, '_, C>, mode: Mode, src: Reg) -> Result<(), Error>
where
  C: Console,
{
  let value = step.vm.regs.get(src);
  let addr = step.target(mode)?;
  step.vm.ram.write8(addr, value)
}

// A ← m[aaaa]
fn peek<C>(step: &mut Step<'_, '_, C>, mode: Mode) -> Result<(), Error>
where
  C: Console,
{
  let addr = step.target(mode)?;
  let value = step.vm.ram.read8(addr)?;
  step.vm.regs.set(Reg::A, value);
  Ok(())
}

// invoke the host service numbered by A
fn syscall<C>(step: &mut Step<'_, '_, C>) -> Result<(), Error>
where
  C: Console,
{
  let number = step.vm.regs.get(Reg::A);
  let call =
    Syscall::from_number(number).ok_or(Error::UnknownSyscall { number })?;
  debug!(?call, "syscall");
  match call {
    Syscall::Exit => {
      step.vm.state = State::Halted;
      Ok(())
    }
    Syscall::PrintString => print_string(step),
    Syscall::PrintNumber => print_number(step),
  }
}

// console ← m[X:Y ..] up to, exclusive of, the first NUL
//
// The scan is bounded to one full pass over RAM: when RAM spans the
// whole 16-bit space the cursor wraps instead of leaving bounds, and a
// NUL-free pass still faults.
fn print_string<C>(step: &mut Step<'_, '_, C>) -> Result<(), Error>
where
  C: Console,
{
  let start = step.vm.regs.address();
  let mut addr = start;
  let mut bytes = Vec::new();
  for _ in 0..step.vm.ram.len() {
    let byte = step.vm.ram.read8(addr)?;
    if byte == 0 {
      step.console.print_string(&bytes)?;
      return Ok(());
    }
    bytes.push(byte);
    addr = addr.wrapping_add(1);
  }
  Err(Error::UnterminatedString { addr: start })
}

// console ← decimal rendering of m[X:Y]
fn print_number<C>(step: &mut Step<'_, '_, C>) -> Result<(), Error>
where
  C: Console,
{
  let value = step.vm.ram.read8(step.vm.regs.address())?;
  step.console.print_number(value)?;
  Ok(())
}

// A ← r[d] + vvvvvvvv (mod 256)
fn add<C>(step: &mut Step<'_, '_, C>, mode: Mode, reg: Reg) -> Result<(), Error>
where
  C: Console,
{
  let left = step.vm.regs.get(reg);
  let right = step.operand8(mode)?;
  step.vm.regs.set(Reg::A, left.wrapping_add(right));
  Ok(())
}

// A ← r[d] − vvvvvvvv (mod 256)
fn sub<C>(step: &mut Step<'_, '_, C>, mode: Mode, reg: Reg) -> Result<(), Error>
where
  C: Console,
{
  let left = step.vm.regs.get(reg);
  let right = step.operand8(mode)?;
  step.vm.regs.set(Reg::A, left.wrapping_sub(right));
  Ok(())
}

// A ← r[d] × vvvvvvvv (mod 256)
fn mul<C>(step: &mut Step<'_, '_, C>, mode: Mode, reg: Reg) -> Result<(), Error>
where
  C: Console,
{
  let left = step.vm.regs.get(reg);
  let right = step.operand8(mode)?;
  step.vm.regs.set(Reg::A, left.wrapping_mul(right));
  Ok(())
}

// A ← r[d] ÷ vvvvvvvv, B ← r[d] mod vvvvvvvv
fn div<C>(step: &mut Step<'_, '_, C>, mode: Mode, reg: Reg) -> Result<(), Error>
where
  C: Console,
{
  let left = step.vm.regs.get(reg);
  let right = step.operand8(mode)?;
  if right == 0 {
    return Err(Error::DivideByZero);
  }
  step.vm.regs.set(Reg::A, left / right);
  step.vm.regs.set(Reg::B, left % right);
  Ok(())
}

// A ← r[d] & vvvvvvvv
fn and<C>(step: &mut Step<'_, '_, C>, mode: Mode, reg: Reg) -> Result<(), Error>
where
  C: Console,
{
  let left = step.vm.regs.get(reg);
  let right = step.operand8(mode)?;
  step.vm.regs.set(Reg::A, left & right);
  Ok(())
}

// A ← r[d] | vvvvvvvv
fn or<C>(step: &mut Step<'_, '_, C>, mode: Mode, reg: Reg) -> Result<(), Error>
where
  C: Console,
{
  let left = step.vm.regs.get(reg);
  let right = step.operand8(mode)?;
  step.vm.regs.set(Reg::A, left | right);
  Ok(())
}

// r[d] ← ~vvvvvvvv
//
// The one arithmetic destination that is the selector register; the
// selector's old value never participates.
fn not<C>(step: &mut Step<'_, '_, C>, mode: Mode, dest: Reg) -> Result<(), Error>
where
  C: Console,
{
  let value = step.operand8(mode)?;
  step.vm.regs.set(dest, !value);
  Ok(())
}

// A ← r[d] ^ vvvvvvvv
fn xor<C>(step: &mut Step<'_, '_, C>, mode: Mode, reg: Reg) -> Result<(), Error>
where
  C: Console,
{
  let left = step.vm.regs.get(reg);
  let right = step.operand8(mode)?;
  step.vm.regs.set(Reg::A, left ^ right);
  Ok(())
}
