mod emulator;

use std::path::PathBuf;

use anyhow::Context;
use chip8_vm::{Chip8, Config};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Run a CHIP-8 ROM in the terminal")]
struct Args {
    /// Path to the ROM image
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = chip8_vm::config::DEFAULT_CYCLES_PER_SECOND)]
    cps: f64,

    /// Seed for the random number instruction
    #[arg(long)]
    seed: Option<u64>,

    /// Wrap sprites around the screen edges instead of clipping them
    #[arg(long)]
    wrap: bool,

    /// Beep frequency in Hz
    #[arg(long, default_value_t = emulator::DEFAULT_FREQUENCY)]
    tone: f32,

    /// Log filter, e.g. "warn" or "chip8_vm=trace". Overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(filter) = &args.log_level {
        logger.parse_filters(filter);
    }
    logger.init();

    let rom = std::fs::read(&args.rom)
        .with_context(|| format!("Failed to read ROM {}", args.rom.display()))?;

    let mut config = Config::default()
        .with_cycles_per_second(args.cps)
        .with_wrap_sprites(args.wrap);
    config.seed = args.seed;

    let mut vm = Chip8::new(config)?;
    vm.load_program(&rom)?;

    let rom_name = args
        .rom
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unknown ROM".to_string());

    let mut emulator = emulator::Emulator::new(vm, args.tone)?;
    emulator.run(&rom_name)
}
