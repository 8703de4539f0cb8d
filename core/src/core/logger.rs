//! Diagnostic instruction logging.
//!
//! The CPU is generic over a logger so that the no-logging case compiles
//! down to nothing: `NullLogger`'s methods are empty and `enabled()`
//! returns false, which lets the CPU skip the formatting work entirely.

/// Sink for per-instruction diagnostics.
pub trait InstructionLogger {
    /// Whether the CPU should bother formatting disassembly text.
    fn enabled(&self) -> bool {
        false
    }

    /// Called for every byte the CPU fetches or reads through the memory bus.
    fn log_mem_read(&mut self, _addr: u16, _data: u8) {}

    /// Free-form diagnostic line (one per decoded instruction).
    fn log(&mut self, _text: &str) {}

    /// Name of the 8-bit register selected by a 3-bit `r` field.
    fn reg_name_8(&self, idx: u8) -> &'static str {
        reg_name_8(idx)
    }

    /// Name of the 16-bit register pair selected by a 2-bit `rr` field.
    fn reg_name_16(&self, idx: u8) -> &'static str {
        reg_name_16(idx)
    }
}

/// Logger that discards everything.
pub struct NullLogger;

impl InstructionLogger for NullLogger {}

pub fn reg_name_8(idx: u8) -> &'static str {
    match idx & 0x07 {
        0 => "B",
        1 => "C",
        2 => "D",
        3 => "E",
        4 => "H",
        5 => "L",
        6 => "(HL)",
        _ => "A",
    }
}

pub fn reg_name_16(idx: u8) -> &'static str {
    match idx & 0x03 {
        0 => "BC",
        1 => "DE",
        2 => "HL",
        _ => "SP",
    }
}

const CONDITION_NAMES: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
const ALU_NAMES: [&str; 8] = ["ADD A,", "ADC A,", "SUB ", "SBC A,", "AND ", "XOR ", "OR ", "CP "];

/// Coarse one-line disassembly of a root-table opcode.
///
/// Covers the dense families; rarer encodings fall back to the raw byte.
/// Prefix bytes are named as such; the logger sees the sub-opcode on the
/// following fetch.
pub fn disasm(op: u8) -> String {
    match op {
        0x00 => "NOP".into(),
        0x76 => "HALT".into(),
        0xCB | 0xDD | 0xED | 0xFD => format!("prefix {op:02X}"),
        0x40..=0x7F => format!("LD {},{}", reg_name_8(op >> 3), reg_name_8(op)),
        0x80..=0xBF => format!("{}{}", ALU_NAMES[((op >> 3) & 0x07) as usize], reg_name_8(op)),
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
            format!("{}n", ALU_NAMES[((op >> 3) & 0x07) as usize])
        }
        0x01 | 0x11 | 0x21 | 0x31 => format!("LD {},nn", reg_name_16(op >> 4)),
        0x03 | 0x13 | 0x23 | 0x33 => format!("INC {}", reg_name_16(op >> 4)),
        0x0B | 0x1B | 0x2B | 0x3B => format!("DEC {}", reg_name_16(op >> 4)),
        0x09 | 0x19 | 0x29 | 0x39 => format!("ADD HL,{}", reg_name_16(op >> 4)),
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            format!("INC {}", reg_name_8(op >> 3))
        }
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            format!("DEC {}", reg_name_8(op >> 3))
        }
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
            format!("LD {},n", reg_name_8(op >> 3))
        }
        0x07 => "RLCA".into(),
        0x0F => "RRCA".into(),
        0x17 => "RLA".into(),
        0x1F => "RRA".into(),
        0x27 => "DAA".into(),
        0x2F => "CPL".into(),
        0x37 => "SCF".into(),
        0x3F => "CCF".into(),
        0x08 => "EX AF,AF'".into(),
        0xD9 => "EXX".into(),
        0xEB => "EX DE,HL".into(),
        0xE3 => "EX (SP),HL".into(),
        0x02 => "LD (BC),A".into(),
        0x12 => "LD (DE),A".into(),
        0x0A => "LD A,(BC)".into(),
        0x1A => "LD A,(DE)".into(),
        0x22 => "LD (nn),HL".into(),
        0x2A => "LD HL,(nn)".into(),
        0x32 => "LD (nn),A".into(),
        0x3A => "LD A,(nn)".into(),
        0xF9 => "LD SP,HL".into(),
        0x10 => "DJNZ e".into(),
        0x18 => "JR e".into(),
        0x20 | 0x28 | 0x30 | 0x38 => {
            format!("JR {},e", CONDITION_NAMES[(((op >> 3) & 0x03) as usize)])
        }
        0xC3 => "JP nn".into(),
        0xE9 => "JP (HL)".into(),
        0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
            format!("JP {},nn", CONDITION_NAMES[((op >> 3) & 0x07) as usize])
        }
        0xCD => "CALL nn".into(),
        0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
            format!("CALL {},nn", CONDITION_NAMES[((op >> 3) & 0x07) as usize])
        }
        0xC9 => "RET".into(),
        0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
            format!("RET {}", CONDITION_NAMES[((op >> 3) & 0x07) as usize])
        }
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            format!("RST {:02X}h", op & 0x38)
        }
        0xC5 | 0xD5 | 0xE5 => format!("PUSH {}", reg_name_16(op >> 4)),
        0xF5 => "PUSH AF".into(),
        0xC1 | 0xD1 | 0xE1 => format!("POP {}", reg_name_16(op >> 4)),
        0xF1 => "POP AF".into(),
        0xD3 => "OUT (n),A".into(),
        0xDB => "IN A,(n)".into(),
        0xF3 => "DI".into(),
        0xFB => "EI".into(),
        _ => format!("DB {op:02X}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ld_block_uses_register_names() {
        assert_eq!(disasm(0x48), "LD C,B");
        assert_eq!(disasm(0x7E), "LD A,(HL)");
    }

    #[test]
    fn alu_block() {
        assert_eq!(disasm(0x80), "ADD A,B");
        assert_eq!(disasm(0xBE), "CP (HL)");
    }

    #[test]
    fn conditions_and_restarts() {
        assert_eq!(disasm(0xC2), "JP NZ,nn");
        assert_eq!(disasm(0xFF), "RST 38h");
    }

    #[test]
    fn prefixes_are_named() {
        assert_eq!(disasm(0xED), "prefix ED");
    }
}
