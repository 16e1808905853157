//! Game Boy Memory Bank Controllers (MBCs)
//!
//! Cartridge-side logic that maps large ROMs and external RAM into the
//! 16-bit address space. Writes to 0x0000-0x7FFF never land in ROM; they are
//! control signals decoded here.

mod mbc0;
mod mbc1;
mod mbc2;

pub use mbc0::Mbc0;
pub use mbc1::Mbc1;
pub use mbc2::Mbc2;

use crate::cartridge::{CartridgeError, CartridgeMetadata};

/// Unified mapper enum that dispatches to specific implementations
#[derive(Debug)]
pub enum Mapper {
    Mbc0(Mbc0),
    Mbc1(Mbc1),
    Mbc2(Mbc2),
}

impl Mapper {
    /// Create a mapper from ROM data and parsed header metadata.
    ///
    /// Cartridge types outside ROM-only / MBC1 / MBC2 are a startup error.
    pub fn from_cart(rom: Vec<u8>, meta: &CartridgeMetadata) -> Result<Self, CartridgeError> {
        let ram = vec![0; meta.ram_len()];
        match meta.cartridge_type {
            0x00 => Ok(Mapper::Mbc0(Mbc0::new(rom, ram))),
            0x01..=0x03 => Ok(Mapper::Mbc1(Mbc1::new(rom, ram))),
            0x05..=0x06 => Ok(Mapper::Mbc2(Mbc2::new(rom))),
            kind => Err(CartridgeError::UnsupportedCartridge { kind }),
        }
    }

    /// Read from ROM address space (0x0000-0x7FFF)
    pub fn read_rom(&self, addr: u16) -> u8 {
        match self {
            Mapper::Mbc0(m) => m.read_rom(addr),
            Mapper::Mbc1(m) => m.read_rom(addr),
            Mapper::Mbc2(m) => m.read_rom(addr),
        }
    }

    /// Write to ROM address space (mapper control registers)
    pub fn write_rom(&mut self, addr: u16, val: u8) {
        match self {
            Mapper::Mbc0(m) => m.write_rom(addr, val),
            Mapper::Mbc1(m) => m.write_rom(addr, val),
            Mapper::Mbc2(m) => m.write_rom(addr, val),
        }
    }

    /// Read from external RAM address space (0xA000-0xBFFF)
    pub fn read_ram(&self, addr: u16) -> u8 {
        match self {
            Mapper::Mbc0(m) => m.read_ram(addr),
            Mapper::Mbc1(m) => m.read_ram(addr),
            Mapper::Mbc2(m) => m.read_ram(addr),
        }
    }

    /// Write to external RAM address space
    pub fn write_ram(&mut self, addr: u16, val: u8) {
        match self {
            Mapper::Mbc0(m) => m.write_ram(addr, val),
            Mapper::Mbc1(m) => m.write_ram(addr, val),
            Mapper::Mbc2(m) => m.write_ram(addr, val),
        }
    }

    /// Get the mapper name
    #[cfg(test)]
    pub fn name(&self) -> &str {
        match self {
            Mapper::Mbc0(_) => "MBC0",
            Mapper::Mbc1(_) => "MBC1",
            Mapper::Mbc2(_) => "MBC2",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(kind: u8) -> CartridgeMetadata {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0147] = kind;
        CartridgeMetadata::parse(&rom).unwrap()
    }

    #[test]
    fn test_mapper_from_cart_type() {
        for kind in [0x00u8] {
            let m = Mapper::from_cart(vec![0; 0x8000], &meta(kind)).unwrap();
            assert_eq!(m.name(), "MBC0");
        }
        for kind in [0x01u8, 0x02, 0x03] {
            let m = Mapper::from_cart(vec![0; 0x8000], &meta(kind)).unwrap();
            assert_eq!(m.name(), "MBC1");
        }
        for kind in [0x05u8, 0x06] {
            let m = Mapper::from_cart(vec![0; 0x8000], &meta(kind)).unwrap();
            assert_eq!(m.name(), "MBC2");
        }
    }

    #[test]
    fn test_unsupported_types_are_fatal() {
        for kind in [0x0Fu8, 0x13, 0x19, 0xFF] {
            assert_eq!(
                Mapper::from_cart(vec![0; 0x8000], &meta(kind)).unwrap_err(),
                CartridgeError::UnsupportedCartridge { kind }
            );
        }
    }

    #[test]
    fn test_mapper_delegation() {
        let mut rom = vec![0; 0x8000];
        rom[0] = 0xAA;
        rom[0x4000] = 0xBB;

        let mapper = Mapper::from_cart(rom, &meta(0x00)).unwrap();
        assert_eq!(mapper.read_rom(0x0000), 0xAA);
        assert_eq!(mapper.read_rom(0x4000), 0xBB);
    }
}
