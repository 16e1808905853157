//! Memory bus: address decoding and peripheral synchronization.
//!
//! The bus owns every memory-mapped component (cartridge mapper, work RAM,
//! high RAM, timer, PPU, joypad, IE/IF) and is the only path to them. The
//! CPU drives [`MemoryLr35902::tick`] before each access so the timer and
//! PPU observe reads and writes at the cycle at which they happen;
//! peripherals report interrupt requests back as bits that the bus ORs into
//! IF.

use crate::cartridge::{CartridgeError, CartridgeMetadata};
use crate::joypad::{Button, Joypad};
use crate::mappers::Mapper;
use crate::ppu::Ppu;
use crate::timer::Timer;
use dmg_core::cpu_lr35902::MemoryLr35902;

pub use dmg_core::cpu_lr35902::{INT_JOYPAD, INT_LCD_STAT, INT_SERIAL, INT_TIMER, INT_VBLANK};

/// Post-boot values of the I/O registers no emulated peripheral claims
/// (sound registers, mostly).
const IO_DEFAULTS: &[(u16, u8)] = &[
    (0xFF10, 0x80),
    (0xFF11, 0xBF),
    (0xFF12, 0xF3),
    (0xFF14, 0xBF),
    (0xFF16, 0x3F),
    (0xFF17, 0x00),
    (0xFF19, 0xBF),
    (0xFF1A, 0x7F),
    (0xFF1B, 0xFF),
    (0xFF1C, 0x9F),
    (0xFF1E, 0xBF),
    (0xFF20, 0xFF),
    (0xFF21, 0x00),
    (0xFF22, 0x00),
    (0xFF23, 0xBF),
    (0xFF24, 0x77),
    (0xFF25, 0xF3),
    (0xFF26, 0xF1),
];

/// Game Boy memory bus
pub struct GbBus {
    mapper: Mapper,
    /// Work RAM (8KB)
    wram: [u8; 0x2000],
    /// High RAM (127 bytes)
    hram: [u8; 0x7F],
    /// Backing store for I/O registers without an emulated peripheral
    io: [u8; 0x80],
    /// Interrupt Enable register (FFFF)
    pub ie: u8,
    /// Interrupt Flag register (FF0F)
    pub if_reg: u8,
    pub timer: Timer,
    pub ppu: Ppu,
    pub joypad: Joypad,
}

impl GbBus {
    pub fn new() -> Self {
        let mut bus = Self {
            mapper: Mapper::Mbc0(crate::mappers::Mbc0::new(Vec::new(), Vec::new())),
            wram: [0; 0x2000],
            hram: [0; 0x7F],
            io: [0; 0x80],
            ie: 0,
            if_reg: 0,
            timer: Timer::new(),
            ppu: Ppu::new(),
            joypad: Joypad::new(),
        };
        bus.reset_io();
        bus
    }

    /// Parse a cartridge blob and install its mapper.
    pub fn load_cart(&mut self, data: &[u8]) -> Result<(), CartridgeError> {
        let meta = CartridgeMetadata::parse(data)?;
        log::info!(
            "cartridge: \"{}\" type {:#04X}, {} ROM banks, {} RAM banks",
            meta.title,
            meta.cartridge_type,
            meta.rom_banks,
            meta.ram_banks
        );
        self.mapper = Mapper::from_cart(data.to_vec(), &meta)?;
        Ok(())
    }

    /// Restore post-boot register state; cartridge and memories stay.
    pub fn reset(&mut self) {
        self.ie = 0;
        self.if_reg = 0;
        self.timer = Timer::new();
        self.ppu.reset();
        self.joypad = Joypad::new();
        self.reset_io();
    }

    fn reset_io(&mut self) {
        self.io = [0; 0x80];
        for &(addr, val) in IO_DEFAULTS {
            self.io[(addr & 0x7F) as usize] = val;
        }
    }

    /// Feed one button transition into the joypad latch.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        if self.joypad.set_button(button, pressed) {
            self.if_reg |= INT_JOYPAD;
        }
    }

    /// OAM DMA: copy 160 bytes from (val << 8) into OAM in one burst.
    fn dma(&mut self, val: u8) {
        let base = (val as u16) << 8;
        for offset in 0..0xA0 {
            let byte = self.read(base + offset);
            self.ppu.write_oam(0xFE00 + offset, byte);
        }
    }
}

impl Default for GbBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLr35902 for GbBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // Cartridge ROM (both banks; the mapper decides what's visible)
            0x0000..=0x7FFF => self.mapper.read_rom(addr),
            // VRAM
            0x8000..=0x9FFF => self.ppu.read_vram(addr),
            // Cartridge external RAM
            0xA000..=0xBFFF => self.mapper.read_ram(addr),
            // Work RAM
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            // Echo RAM: redirect to work RAM
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            // OAM
            0xFE00..=0xFE9F => self.ppu.read_oam(addr),
            // Prohibited
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => self.joypad.read(),
            0xFF04..=0xFF07 => self.timer.read_register(addr),
            0xFF0F => self.if_reg,
            0xFF40..=0xFF4B => self.ppu.read_register(addr),
            // Unclaimed I/O registers keep their last written value
            0xFF01..=0xFF7F => self.io[(addr & 0x7F) as usize],
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            // ROM range writes are mapper control signals
            0x0000..=0x7FFF => self.mapper.write_rom(addr, val),
            0x8000..=0x9FFF => self.ppu.write_vram(addr, val),
            0xA000..=0xBFFF => self.mapper.write_ram(addr, val),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => self.ppu.write_oam(addr, val),
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.joypad.write(val),
            0xFF04..=0xFF07 => self.timer.write_register(addr, val),
            0xFF0F => self.if_reg = val,
            0xFF46 => self.dma(val),
            0xFF40..=0xFF4B => {
                let irq = self.ppu.write_register(addr, val);
                self.if_reg |= irq;
            }
            0xFF01..=0xFF7F => self.io[(addr & 0x7F) as usize] = val,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie = val,
        }
    }

    fn tick(&mut self, cycles: u32) {
        if cycles == 0 {
            return;
        }
        if self.timer.tick(cycles) {
            self.if_reg |= INT_TIMER;
        }
        self.if_reg |= self.ppu.step(cycles);
    }

    fn interrupt_enable(&self) -> u8 {
        self.ie
    }

    fn interrupt_flag(&self) -> u8 {
        self.if_reg
    }

    fn set_interrupt_flag(&mut self, val: u8) {
        self.if_reg = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus_with_rom() -> GbBus {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0000] = 0x11;
        rom[0x4000] = 0x22;
        let mut bus = GbBus::new();
        bus.load_cart(&rom).unwrap();
        bus
    }

    #[test]
    fn test_rom_reads_go_through_mapper() {
        let mut bus = bus_with_rom();
        assert_eq!(bus.read(0x0000), 0x11);
        assert_eq!(bus.read(0x4000), 0x22);
    }

    #[test]
    fn test_rom_writes_do_not_land() {
        let mut bus = bus_with_rom();
        bus.write(0x1000, 0x99);
        assert_eq!(bus.read(0x1000), 0x00);
    }

    #[test]
    fn test_wram_and_echo() {
        let mut bus = GbBus::new();
        bus.write(0xC123, 0x42);
        assert_eq!(bus.read(0xC123), 0x42);
        assert_eq!(bus.read(0xE123), 0x42, "echo RAM mirrors work RAM");

        bus.write(0xE456, 0x55);
        assert_eq!(bus.read(0xC456), 0x55);
    }

    #[test]
    fn test_hram() {
        let mut bus = GbBus::new();
        bus.write(0xFF80, 0x01);
        bus.write(0xFFFE, 0x02);
        assert_eq!(bus.read(0xFF80), 0x01);
        assert_eq!(bus.read(0xFFFE), 0x02);
    }

    #[test]
    fn test_prohibited_region() {
        let mut bus = GbBus::new();
        bus.write(0xFEA0, 0x42);
        bus.write(0xFEFF, 0x42);
        assert_eq!(bus.read(0xFEA0), 0xFF);
        assert_eq!(bus.read(0xFEFF), 0xFF);
    }

    #[test]
    fn test_vram_oam_routing() {
        let mut bus = GbBus::new();
        bus.write(0x8010, 0x33);
        assert_eq!(bus.ppu.read_vram(0x8010), 0x33);
        bus.write(0xFE04, 0x44);
        assert_eq!(bus.ppu.read_oam(0xFE04), 0x44);
    }

    #[test]
    fn test_interrupt_registers() {
        let mut bus = GbBus::new();
        bus.write(0xFFFF, 0x1F);
        bus.write(0xFF0F, 0x05);
        assert_eq!(bus.read(0xFFFF), 0x1F);
        assert_eq!(bus.read(0xFF0F), 0x05);
    }

    #[test]
    fn test_sound_register_defaults() {
        let mut bus = GbBus::new();
        assert_eq!(bus.read(0xFF10), 0x80);
        assert_eq!(bus.read(0xFF26), 0xF1);
        // writable scratch
        bus.write(0xFF26, 0x00);
        assert_eq!(bus.read(0xFF26), 0x00);
    }

    #[test]
    fn test_timer_register_routing() {
        let mut bus = GbBus::new();
        bus.write(0xFF06, 0xAB);
        assert_eq!(bus.read(0xFF06), 0xAB);
        bus.write(0xFF04, 0x42);
        assert_eq!(bus.read(0xFF04), 0x00, "DIV write resets it");
    }

    #[test]
    fn test_timer_overflow_sets_if_bit() {
        let mut bus = GbBus::new();
        bus.write(0xFF05, 0xFF);
        bus.write(0xFF07, 0x05);
        bus.tick(16);
        assert!(bus.if_reg & INT_TIMER != 0);
    }

    #[test]
    fn test_vblank_sets_if_bit() {
        let mut bus = GbBus::new();
        for _ in 0..144 {
            bus.tick(456);
        }
        assert!(bus.if_reg & INT_VBLANK != 0);
    }

    #[test]
    fn test_joypad_press_sets_if_bit() {
        let mut bus = GbBus::new();
        bus.write(0xFF00, 0x10); // buttons selected
        bus.set_button(Button::Start, true);
        assert!(bus.if_reg & INT_JOYPAD != 0);
        assert_eq!(bus.read(0xFF00) & 0x0F, 0b0111);
    }

    #[test]
    fn test_dma_copies_into_oam() {
        let mut bus = GbBus::new();
        for i in 0..0xA0u16 {
            bus.write(0xC000 + i, i as u8);
        }
        bus.write(0xFF46, 0xC0);
        for i in 0..0xA0u16 {
            assert_eq!(bus.ppu.read_oam(0xFE00 + i), i as u8);
        }
    }

    #[test]
    fn test_ly_register_is_read_only() {
        let mut bus = GbBus::new();
        let before = bus.read(0xFF44);
        bus.write(0xFF44, 0x77);
        assert_eq!(bus.read(0xFF44), before);
    }
}
