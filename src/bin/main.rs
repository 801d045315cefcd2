use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use kram::memory::DEFAULT_SIZE;
use kram::program::Program;
use kram::vm::{Config, Vm, DEFAULT_STACK_POINTER};

/// Runs flat KRAM program images.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
  /// Program image to execute; drops into the interactive interpreter
  /// when omitted
  file: Option<PathBuf>,

  /// RAM size in bytes
  #[arg(short, long, default_value_t = DEFAULT_SIZE)]
  memory: usize,

  /// Starting value of the stack pointer
  #[arg(short, long, default_value_t = DEFAULT_STACK_POINTER)]
  stack_pointer: u16,

  /// Address of the first instruction
  #[arg(short, long, default_value_t = 0)]
  entry: u16,

  /// Print the register dump once the run is over
  #[arg(short, long)]
  dump_registers: bool,

  /// Abort after this many instructions
  #[arg(long)]
  step_limit: Option<u64>,
}

fn setup_tracing() {
  let fmt_layer = fmt::layer().with_target(false);
  let sub = Registry::default()
    .with(EnvFilter::from_default_env())
    .with(fmt_layer);
  set_global_default(sub).expect("Failed to set tracing subscriber");
}

fn interpreter() -> Result<()> {
  bail!("the interpreter is not implemented yet");
}

fn run(file: &Path, cli: &Cli) -> Result<()> {
  let image =
    fs::read(file).with_context(|| format!("reading {}", file.display()))?;
  info!(bytes = image.len(), "read image");

  let mut vm = Vm::new(Config {
    memory_size: cli.memory,
    stack_pointer: cli.stack_pointer,
    entry_point: cli.entry,
    step_limit: cli.step_limit,
  });
  vm.load(&Program::from(image))?;

  info!("starting vm");
  let rule = "-".repeat(72);
  let mut console = io::stdout().lock();
  writeln!(console, "{rule}")?;
  let outcome = vm.run(&mut console);
  writeln!(console, "{rule}")?;
  if outcome.is_ok() {
    writeln!(console, "OK")?;
  }
  if cli.dump_registers {
    writeln!(console, "{}", vm.dump_registers())?;
  }
  console.flush()?;

  outcome?;
  info!(result = vm.result(), "vm exited cleanly");
  Ok(())
}

fn main() -> Result<()> {
  setup_tracing();
  let cli = Cli::parse();
  match &cli.file {
    None => interpreter(),
    Some(file) => run(file, &cli),
  }
}
