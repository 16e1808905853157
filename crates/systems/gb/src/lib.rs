//! Game Boy (DMG) system implementation.
//!
//! Wires the LR35902 CPU core from `dmg_core` to the DMG memory map: the
//! cartridge mapper, 8 KiB work RAM, high RAM, the PPU with its 160x144
//! framebuffer, the DIV/TIMA timer and the joypad latch, plus the
//! interrupt-flag plumbing between them.
//!
//! # Architecture
//!
//! The CPU owns the bus, the bus owns every peripheral. Peripherals never
//! call back into the CPU: the timer, PPU and joypad return interrupt
//! request bits that the bus accumulates into IF, and the CPU picks them up
//! after each instruction. The bus is ticked before every memory access, so
//! peripheral state is cycle-exact at each read and write.
//!
//! # Timing
//!
//! - CPU clock: 4.194304 MHz
//! - Scanline: 456 T-cycles, frame: 154 scanlines = 70224 T-cycles
//! - Vertical refresh: ~59.73 Hz
//!
//! # Usage
//!
//! ```rust,no_run
//! use dmg_core::System;
//! use dmg_gb::GbSystem;
//!
//! let mut gb = GbSystem::new();
//! let rom = std::fs::read("game.gb").unwrap();
//! gb.mount("Cartridge", &rom).unwrap();
//!
//! let frame = gb.step_frame().unwrap();
//! assert_eq!(frame.width, 160);
//! assert_eq!(frame.height, 144);
//! ```

use dmg_core::cpu_lr35902::{CpuError, CpuLr35902};
use dmg_core::types::Frame;
use dmg_core::{MountPointInfo, System};

pub mod bus;
pub mod cartridge;
pub mod emulator;
pub mod joypad;
pub mod mappers;
pub mod ppu;
pub mod timer;

pub use bus::GbBus;
pub use cartridge::CartridgeError;
pub use emulator::{ButtonEvent, Emulator, HostHandle};
pub use joypad::Button;

/// CPU T-cycles per video frame (456 dots x 154 lines)
pub const CYCLES_PER_FRAME: u32 = 70224;

#[derive(Debug, thiserror::Error)]
pub enum GbError {
    #[error("no cartridge loaded")]
    NoCartridge,
    #[error("invalid mount point")]
    InvalidMountPoint,
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    Cpu(#[from] CpuError),
    #[error("host event queue disconnected")]
    HostDisconnected,
}

/// The complete DMG machine.
pub struct GbSystem {
    pub cpu: CpuLr35902<GbBus>,
    cart_loaded: bool,
}

impl Default for GbSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl GbSystem {
    pub fn new() -> Self {
        Self {
            cpu: CpuLr35902::new(GbBus::new()),
            cart_loaded: false,
        }
    }

    /// Feed one button transition into the joypad latch.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.cpu.memory.set_button(button, pressed);
    }

    /// Disassemble `count` instructions from the current PC.
    pub fn disassemble(&mut self, count: usize) -> Vec<String> {
        let pc = self.cpu.regs.pc();
        self.cpu.disassemble(pc, count)
    }
}

impl System for GbSystem {
    type Error = GbError;

    fn reset(&mut self) {
        self.cpu.reset();
        self.cpu.memory.reset();
    }

    /// Emulate until the PPU signals V-Blank and snapshot the framebuffer.
    ///
    /// With the LCD disabled no V-Blank ever comes, so the run is capped at
    /// one frame's worth of cycles.
    fn step_frame(&mut self) -> Result<Frame, Self::Error> {
        if !self.cart_loaded {
            return Err(GbError::NoCartridge);
        }

        let mut cycles = 0;
        while cycles < CYCLES_PER_FRAME {
            cycles += self.cpu.step()?;
            if self.cpu.memory.ppu.take_frame_ready() {
                break;
            }
        }
        Ok(self.cpu.memory.ppu.frame())
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        vec![MountPointInfo {
            id: "Cartridge".to_string(),
            name: "Cartridge Slot".to_string(),
            extensions: vec!["gb".to_string()],
            required: true,
        }]
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        if mount_point_id != "Cartridge" {
            return Err(GbError::InvalidMountPoint);
        }

        self.cpu.memory.load_cart(data)?;
        self.cart_loaded = true;
        self.reset();
        Ok(())
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        if mount_point_id != "Cartridge" {
            return Err(GbError::InvalidMountPoint);
        }

        self.cart_loaded = false;
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        mount_point_id == "Cartridge" && self.cart_loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100] = 0x18; // JR -2: spin in place
        rom[0x0101] = 0xFE;
        rom
    }

    #[test]
    fn test_mount_points() {
        let sys = GbSystem::new();
        let mount_points = sys.mount_points();
        assert_eq!(mount_points.len(), 1);
        assert_eq!(mount_points[0].id, "Cartridge");
        assert!(mount_points[0].required);
    }

    #[test]
    fn test_mount_unmount() {
        let mut sys = GbSystem::new();
        assert!(!sys.is_mounted("Cartridge"));

        sys.mount("Cartridge", &nop_rom()).unwrap();
        assert!(sys.is_mounted("Cartridge"));

        sys.unmount("Cartridge").unwrap();
        assert!(!sys.is_mounted("Cartridge"));
    }

    #[test]
    fn test_mount_rejects_bad_rom() {
        let mut sys = GbSystem::new();
        assert!(matches!(
            sys.mount("Cartridge", &[0u8; 16]),
            Err(GbError::Cartridge(CartridgeError::RomTooShort { len: 16 }))
        ));

        let mut rom = nop_rom();
        rom[0x0147] = 0x19; // MBC5 is not supported
        assert!(matches!(
            sys.mount("Cartridge", &rom),
            Err(GbError::Cartridge(
                CartridgeError::UnsupportedCartridge { kind: 0x19 }
            ))
        ));
    }

    #[test]
    fn test_step_frame_without_cart() {
        let mut sys = GbSystem::new();
        assert!(matches!(sys.step_frame(), Err(GbError::NoCartridge)));
    }

    #[test]
    fn test_step_frame_dimensions() {
        let mut sys = GbSystem::new();
        sys.mount("Cartridge", &nop_rom()).unwrap();

        let frame = sys.step_frame().unwrap();
        assert_eq!(frame.width, 160);
        assert_eq!(frame.height, 144);
        assert_eq!(frame.pixels.len(), 160 * 144 * 3);
    }

    #[test]
    fn test_reset_restores_post_boot_state() {
        let mut sys = GbSystem::new();
        sys.mount("Cartridge", &nop_rom()).unwrap();
        sys.step_frame().unwrap();

        sys.reset();
        assert_eq!(sys.cpu.regs.af(), 0x01B0);
        assert_eq!(sys.cpu.regs.pc(), 0x0100);
        assert_eq!(sys.cpu.memory.ppu.ly, 0);
        assert_eq!(sys.cpu.memory.if_reg, 0);
    }

    #[test]
    fn test_disassemble_from_pc() {
        let mut sys = GbSystem::new();
        sys.mount("Cartridge", &nop_rom()).unwrap();
        let listing = sys.disassemble(1);
        assert_eq!(listing[0], "0100 JR $FE");
    }
}
