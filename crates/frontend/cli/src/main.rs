use anyhow::{Context, Result};
use clap::Parser;
use dmg_core::System;
use dmg_gb::{Emulator, GbSystem};
use std::fs;
use std::path::PathBuf;

/// Headless DMG emulator runner
#[derive(Parser)]
struct Args {
    /// Path to the ROM image
    rom: PathBuf,

    /// Number of frames to run before exiting
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Pace emulation to ~59.73 Hz instead of running flat out
    #[arg(long, default_value_t = false)]
    pace: bool,

    /// Suppress the end-of-run summary
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// Print a disassembly of N instructions at the entry point and exit
    #[arg(long, value_name = "N")]
    disassemble: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = fs::read(&args.rom)
        .with_context(|| format!("reading ROM {}", args.rom.display()))?;

    let mut sys = GbSystem::new();
    sys.mount("Cartridge", &rom)
        .context("loading cartridge")?;

    if let Some(count) = args.disassemble {
        for line in sys.disassemble(count) {
            println!("{line}");
        }
        return Ok(());
    }

    let (mut emu, _handle) = Emulator::new(sys);
    emu.set_pacing(args.pace);
    let frames = emu.run(Some(args.frames)).context("emulation failed")?;

    if !args.quiet {
        println!("ran {frames} frames");
    }
    Ok(())
}
