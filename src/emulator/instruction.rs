use std::fmt;

use crate::error::Fault;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Register(pub u8);

impl Register {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("V{:X}", self.0))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One decoded instruction word with its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Cls,

    Ret,

    Jp {
        addr: u16,
    },

    Call {
        addr: u16,
    },

    SeImm {
        x: Register,
        imm: u8,
    },

    SneImm {
        x: Register,
        imm: u8,
    },

    SeReg {
        x: Register,
        y: Register,
    },

    LdImm {
        x: Register,
        imm: u8,
    },

    AddImm {
        x: Register,
        imm: u8,
    },

    LdReg {
        x: Register,
        y: Register,
    },

    Or {
        x: Register,
        y: Register,
    },

    And {
        x: Register,
        y: Register,
    },

    Xor {
        x: Register,
        y: Register,
    },

    AddReg {
        x: Register,
        y: Register,
    },

    Sub {
        x: Register,
        y: Register,
    },

    Shr {
        x: Register,
    },

    Subn {
        x: Register,
        y: Register,
    },

    Shl {
        x: Register,
    },

    SneReg {
        x: Register,
        y: Register,
    },

    LdI {
        addr: u16,
    },

    JpV0 {
        addr: u16,
    },

    Rnd {
        x: Register,
        imm: u8,
    },

    Drw {
        x: Register,
        y: Register,
        n: u8,
    },

    Skp {
        x: Register,
    },

    Sknp {
        x: Register,
    },

    LdFromDt {
        x: Register,
    },

    LdKey {
        x: Register,
    },

    LdToDt {
        x: Register,
    },

    LdToSt {
        x: Register,
    },

    AddI {
        x: Register,
    },

    LdGlyph {
        x: Register,
    },

    Bcd {
        x: Register,
    },

    StoreRegs {
        x: Register,
    },

    LoadRegs {
        x: Register,
    },
}

impl Instruction {
    pub fn decode(code: u16) -> Result<Self, Fault> {
        let x = Self::x(code);
        let y = Self::y(code);

        match Self::family(code) {
            0x0 => match code {
                0x00e0 => Ok(Self::Cls),
                0x00ee => Ok(Self::Ret),
                _ => Err(Fault::InvalidOpcode { opcode: code }),
            },

            0x1 => Ok(Self::Jp { addr: Self::nnn(code) }),

            0x2 => Ok(Self::Call { addr: Self::nnn(code) }),

            0x3 => Ok(Self::SeImm { x, imm: Self::kk(code) }),

            0x4 => Ok(Self::SneImm { x, imm: Self::kk(code) }),

            0x5 if Self::n(code) == 0 => Ok(Self::SeReg { x, y }),

            0x6 => Ok(Self::LdImm { x, imm: Self::kk(code) }),

            0x7 => Ok(Self::AddImm { x, imm: Self::kk(code) }),

            0x8 => match Self::n(code) {
                0x0 => Ok(Self::LdReg { x, y }),
                0x1 => Ok(Self::Or { x, y }),
                0x2 => Ok(Self::And { x, y }),
                0x3 => Ok(Self::Xor { x, y }),
                0x4 => Ok(Self::AddReg { x, y }),
                0x5 => Ok(Self::Sub { x, y }),
                0x6 => Ok(Self::Shr { x }),
                0x7 => Ok(Self::Subn { x, y }),
                0xe => Ok(Self::Shl { x }),
                _ => Err(Fault::InvalidOpcode { opcode: code }),
            },

            0x9 if Self::n(code) == 0 => Ok(Self::SneReg { x, y }),

            0xa => Ok(Self::LdI { addr: Self::nnn(code) }),

            0xb => Ok(Self::JpV0 { addr: Self::nnn(code) }),

            0xc => Ok(Self::Rnd { x, imm: Self::kk(code) }),

            0xd => Ok(Self::Drw { x, y, n: Self::n(code) }),

            0xe => match Self::kk(code) {
                0x9e => Ok(Self::Skp { x }),
                0xa1 => Ok(Self::Sknp { x }),
                _ => Err(Fault::InvalidOpcode { opcode: code }),
            },

            0xf => match Self::kk(code) {
                0x07 => Ok(Self::LdFromDt { x }),
                0x0a => Ok(Self::LdKey { x }),
                0x15 => Ok(Self::LdToDt { x }),
                0x18 => Ok(Self::LdToSt { x }),
                0x1e => Ok(Self::AddI { x }),
                0x29 => Ok(Self::LdGlyph { x }),
                0x33 => Ok(Self::Bcd { x }),
                0x55 => Ok(Self::StoreRegs { x }),
                0x65 => Ok(Self::LoadRegs { x }),
                _ => Err(Fault::InvalidOpcode { opcode: code }),
            },

            _ => Err(Fault::InvalidOpcode { opcode: code }),
        }
    }

    fn family(code: u16) -> u8 {
        (code >> 12) as u8
    }

    fn x(code: u16) -> Register {
        Register(((code >> 8) & 0xf) as u8)
    }

    fn y(code: u16) -> Register {
        Register(((code >> 4) & 0xf) as u8)
    }

    fn nnn(code: u16) -> u16 {
        code & 0xfff
    }

    fn kk(code: u16) -> u8 {
        (code & 0xff) as u8
    }

    fn n(code: u16) -> u8 {
        (code & 0xf) as u8
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Cls => write!(f, "CLS"),
            Self::Ret => write!(f, "RET"),
            Self::Jp { addr } => write!(f, "JP 0x{addr:03X}"),
            Self::Call { addr } => write!(f, "CALL 0x{addr:03X}"),
            Self::SeImm { x, imm } => write!(f, "SE {x}, 0x{imm:02X}"),
            Self::SneImm { x, imm } => write!(f, "SNE {x}, 0x{imm:02X}"),
            Self::SeReg { x, y } => write!(f, "SE {x}, {y}"),
            Self::LdImm { x, imm } => write!(f, "LD {x}, 0x{imm:02X}"),
            Self::AddImm { x, imm } => write!(f, "ADD {x}, 0x{imm:02X}"),
            Self::LdReg { x, y } => write!(f, "LD {x}, {y}"),
            Self::Or { x, y } => write!(f, "OR {x}, {y}"),
            Self::And { x, y } => write!(f, "AND {x}, {y}"),
            Self::Xor { x, y } => write!(f, "XOR {x}, {y}"),
            Self::AddReg { x, y } => write!(f, "ADD {x}, {y}"),
            Self::Sub { x, y } => write!(f, "SUB {x}, {y}"),
            Self::Shr { x } => write!(f, "SHR {x}"),
            Self::Subn { x, y } => write!(f, "SUBN {x}, {y}"),
            Self::Shl { x } => write!(f, "SHL {x}"),
            Self::SneReg { x, y } => write!(f, "SNE {x}, {y}"),
            Self::LdI { addr } => write!(f, "LD I, 0x{addr:03X}"),
            Self::JpV0 { addr } => write!(f, "JP V0, 0x{addr:03X}"),
            Self::Rnd { x, imm } => write!(f, "RND {x}, 0x{imm:02X}"),
            Self::Drw { x, y, n } => write!(f, "DRW {x}, {y}, 0x{n:X}"),
            Self::Skp { x } => write!(f, "SKP {x}"),
            Self::Sknp { x } => write!(f, "SKNP {x}"),
            Self::LdFromDt { x } => write!(f, "LD {x}, DT"),
            Self::LdKey { x } => write!(f, "LD {x}, K"),
            Self::LdToDt { x } => write!(f, "LD DT, {x}"),
            Self::LdToSt { x } => write!(f, "LD ST, {x}"),
            Self::AddI { x } => write!(f, "ADD I, {x}"),
            Self::LdGlyph { x } => write!(f, "LD F, {x}"),
            Self::Bcd { x } => write!(f, "LD B, {x}"),
            Self::StoreRegs { x } => write!(f, "LD [I], {x}"),
            Self::LoadRegs { x } => write!(f, "LD {x}, [I]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(code: u16) -> Instruction {
        Instruction::decode(code).unwrap()
    }

    #[test]
    fn fields_are_extracted_by_nibble() {
        assert_eq!(decode(0x1abc), Instruction::Jp { addr: 0xabc });
        assert_eq!(
            decode(0x3a7f),
            Instruction::SeImm {
                x: Register(0xa),
                imm: 0x7f
            }
        );
        assert_eq!(
            decode(0xd125),
            Instruction::Drw {
                x: Register(1),
                y: Register(2),
                n: 5
            }
        );
    }

    #[test]
    fn secondary_selectors() {
        assert_eq!(
            decode(0x8124),
            Instruction::AddReg {
                x: Register(1),
                y: Register(2)
            }
        );
        assert_eq!(decode(0x812e), Instruction::Shl { x: Register(1) });
        assert_eq!(decode(0xe3a1), Instruction::Sknp { x: Register(3) });
        assert_eq!(decode(0xf40a), Instruction::LdKey { x: Register(4) });
        assert_eq!(decode(0xf565), Instruction::LoadRegs { x: Register(5) });
    }

    #[test]
    fn every_word_decodes_the_same_way_twice() {
        for code in 0..=u16::MAX {
            assert_eq!(Instruction::decode(code), Instruction::decode(code));
        }
    }

    #[test]
    fn recognised_word_count() {
        let valid = (0..=u16::MAX)
            .filter(|code| Instruction::decode(*code).is_ok())
            .count();

        let expected = 2 // 00E0, 00EE
            + 10 * 0x1000 // 1, 2, 3, 4, 6, 7, A, B, C, D
            + 2 * 0x100 // 5xy0, 9xy0
            + 9 * 0x100 // 8xy0..8xyE
            + 2 * 0x10 // Ex9E, ExA1
            + 9 * 0x10; // Fx07..Fx65

        assert_eq!(valid, expected);
    }

    #[test]
    fn undefined_words_are_invalid() {
        for code in [
            0x0000, 0x0123, 0x00e1, 0x5123, 0x9ab1, 0x8008, 0x800f, 0xe09f, 0xf000, 0xf066,
        ] {
            assert_eq!(
                Instruction::decode(code),
                Err(Fault::InvalidOpcode { opcode: code }),
                "0x{code:04x}"
            );
        }
    }

    #[test]
    fn disassembly() {
        assert_eq!(decode(0x00e0).to_string(), "CLS");
        assert_eq!(decode(0x2345).to_string(), "CALL 0x345");
        assert_eq!(decode(0x6a0f).to_string(), "LD VA, 0x0F");
        assert_eq!(decode(0x8ab5).to_string(), "SUB VA, VB");
        assert_eq!(decode(0xd01f).to_string(), "DRW V0, V1, 0xF");
        assert_eq!(decode(0xf155).to_string(), "LD [I], V1");
        assert_eq!(decode(0xf265).to_string(), "LD V2, [I]");
    }
}
