//! SM83 opcode metadata table.
//!
//! The instruction set is described by a JSON resource embedded at build time:
//! two maps (`unprefixed`, `cbprefixed`) of 256 entries each, keyed by opcode
//! byte. Each entry carries the mnemonic, the total instruction length in
//! bytes, the cycle cost list (taken first, not-taken second for conditional
//! instructions) and an ordered operand list.
//!
//! The table is pure metadata: the executor dispatches on the opcode byte, not
//! on mnemonics. Decoders use the table for operand widths and cycle costs,
//! and the disassembler uses the operand descriptors for formatting.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpcodeTableError {
    #[error("malformed opcode table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("opcode table `{table}` has unparseable key `{key}`")]
    BadKey { table: &'static str, key: String },
    #[error("opcode table `{table}` is missing entry {opcode:#04X}")]
    MissingEntry { table: &'static str, opcode: u8 },
}

/// HL post-adjustment carried by an operand (`LD (HL+),A` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Increment,
    Decrement,
}

/// A single operand descriptor.
///
/// `immediate` distinguishes "use the value directly" from "use the value as a
/// pointer"; `bytes` is present for operands encoded in the instruction
/// stream.
#[derive(Debug, Clone)]
pub struct Operand {
    pub name: String,
    pub immediate: bool,
    pub bytes: Option<u8>,
    pub adjust: Option<Adjust>,
}

impl Operand {
    fn format(&self, value: Option<u16>) -> String {
        let mut inner = match (self.bytes, value) {
            (Some(2), Some(v)) => format!("${:04X}", v),
            (Some(_), Some(v)) => format!("${:02X}", v),
            _ => self.name.clone(),
        };
        match self.adjust {
            Some(Adjust::Increment) => inner.push('+'),
            Some(Adjust::Decrement) => inner.push('-'),
            None => {}
        }
        if self.immediate {
            inner
        } else {
            format!("({})", inner)
        }
    }
}

/// Taken / not-taken cycle costs in T-cycles.
///
/// Unconditional instructions have both fields equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycles {
    pub taken: u32,
    pub not_taken: u32,
}

/// Static metadata for one opcode.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: String,
    pub bytes: u8,
    pub cycles: Cycles,
    pub operands: Vec<Operand>,
}

impl Instruction {
    /// Number of operand bytes encoded after the opcode.
    pub fn immediate_bytes(&self) -> u8 {
        self.operands.iter().filter_map(|op| op.bytes).sum()
    }

    /// Render the instruction with a decoded immediate substituted in.
    pub fn format(&self, immediate: u16) -> String {
        if self.operands.is_empty() {
            return self.mnemonic.clone();
        }
        let ops: Vec<String> = self
            .operands
            .iter()
            .map(|op| op.format(op.bytes.map(|_| immediate)))
            .collect();
        format!("{} {}", self.mnemonic, ops.join(", "))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            return write!(f, "{}", self.mnemonic);
        }
        let ops: Vec<String> = self.operands.iter().map(|op| op.format(None)).collect();
        write!(f, "{} {}", self.mnemonic, ops.join(", "))
    }
}

#[derive(Deserialize)]
struct RawOperand {
    name: String,
    immediate: bool,
    #[serde(default)]
    bytes: Option<u8>,
    #[serde(default)]
    increment: bool,
    #[serde(default)]
    decrement: bool,
}

#[derive(Deserialize)]
struct RawInstruction {
    mnemonic: String,
    bytes: u8,
    cycles: Vec<u32>,
    operands: Vec<RawOperand>,
}

#[derive(Deserialize)]
struct RawTable {
    unprefixed: BTreeMap<String, RawInstruction>,
    cbprefixed: BTreeMap<String, RawInstruction>,
}

/// The two 256-entry instruction tables, indexed by opcode byte.
pub struct OpcodeTable {
    unprefixed: Vec<Instruction>,
    cbprefixed: Vec<Instruction>,
}

static GLOBAL_TABLE: OnceLock<OpcodeTable> = OnceLock::new();

impl OpcodeTable {
    /// Parse a table from its JSON source.
    pub fn load(json: &str) -> Result<Self, OpcodeTableError> {
        let raw: RawTable = serde_json::from_str(json)?;
        Ok(Self {
            unprefixed: build_bank("unprefixed", raw.unprefixed)?,
            cbprefixed: build_bank("cbprefixed", raw.cbprefixed)?,
        })
    }

    /// The process-wide table, loaded once from the embedded resource.
    pub fn global() -> &'static OpcodeTable {
        GLOBAL_TABLE.get_or_init(|| {
            OpcodeTable::load(include_str!("../assets/opcodes.json"))
                .expect("embedded opcode table is well-formed")
        })
    }

    #[inline]
    pub fn unprefixed(&self, opcode: u8) -> &Instruction {
        &self.unprefixed[opcode as usize]
    }

    #[inline]
    pub fn cbprefixed(&self, opcode: u8) -> &Instruction {
        &self.cbprefixed[opcode as usize]
    }
}

fn build_bank(
    table: &'static str,
    raw: BTreeMap<String, RawInstruction>,
) -> Result<Vec<Instruction>, OpcodeTableError> {
    let mut bank: Vec<Option<Instruction>> = vec![None; 256];
    for (key, instr) in raw {
        let opcode = key
            .strip_prefix("0x")
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .ok_or_else(|| OpcodeTableError::BadKey {
                table,
                key: key.clone(),
            })?;
        let taken = instr.cycles.first().copied().unwrap_or(0);
        let not_taken = instr.cycles.get(1).copied().unwrap_or(taken);
        bank[opcode as usize] = Some(Instruction {
            opcode,
            mnemonic: instr.mnemonic,
            bytes: instr.bytes,
            cycles: Cycles { taken, not_taken },
            operands: instr
                .operands
                .into_iter()
                .map(|op| Operand {
                    name: op.name,
                    immediate: op.immediate,
                    bytes: op.bytes,
                    adjust: if op.increment {
                        Some(Adjust::Increment)
                    } else if op.decrement {
                        Some(Adjust::Decrement)
                    } else {
                        None
                    },
                })
                .collect(),
        });
    }
    bank.into_iter()
        .enumerate()
        .map(|(opcode, slot)| {
            slot.ok_or(OpcodeTableError::MissingEntry {
                table,
                opcode: opcode as u8,
            })
        })
        .collect()
}
