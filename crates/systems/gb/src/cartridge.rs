//! Cartridge header parsing.
//!
//! The cartridge is a plain byte blob; the header at 0x0100-0x014F describes
//! the hardware inside the shell. The fields the emulator cares about:
//!
//! - `0x0134-0x0143`: ASCII title
//! - `0x0147`: cartridge type (which mapper, if any)
//! - `0x0148`: ROM size code (bank count = 2^(code+1) banks of 16 KiB)
//! - `0x0149`: RAM size code (0=none, 1-2=one 8 KiB bank, 3=four, 4=sixteen,
//!   5=eight)

use thiserror::Error;

/// Smallest blob that still contains a full header.
pub const MIN_ROM_LEN: usize = 0x0150;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("ROM image too short to hold a header: {len} bytes")]
    RomTooShort { len: usize },
    #[error("unsupported cartridge type {kind:#04X}")]
    UnsupportedCartridge { kind: u8 },
}

/// Decoded cartridge header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeMetadata {
    pub title: String,
    pub cartridge_type: u8,
    /// Number of 16 KiB ROM banks
    pub rom_banks: usize,
    /// Number of 8 KiB external RAM banks
    pub ram_banks: usize,
}

impl CartridgeMetadata {
    pub fn parse(rom: &[u8]) -> Result<Self, CartridgeError> {
        if rom.len() < MIN_ROM_LEN {
            return Err(CartridgeError::RomTooShort { len: rom.len() });
        }

        let title_bytes = &rom[0x0134..0x0144];
        let end = title_bytes.iter().position(|&b| b == 0).unwrap_or(title_bytes.len());
        let title = String::from_utf8_lossy(&title_bytes[..end]).into_owned();

        let ram_banks = match rom[0x0149] {
            0x00 => 0,
            0x01 | 0x02 => 1,
            0x03 => 4,
            0x04 => 16,
            0x05 => 8,
            other => {
                log::warn!("unknown RAM size code {:#04X}, assuming no RAM", other);
                0
            }
        };

        Ok(Self {
            title,
            cartridge_type: rom[0x0147],
            rom_banks: 2usize << rom[0x0148],
            ram_banks,
        })
    }

    /// External RAM size in bytes.
    pub fn ram_len(&self) -> usize {
        self.ram_banks * 0x2000
    }
}
