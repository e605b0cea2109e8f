use log::{debug, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::Fault;

use super::{
    instruction::{Instruction, Register},
    machine::Machine,
    memory::map,
};

/// Whether the last step left the machine blocked on `LD Vx, K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Ready,
    AwaitingKey,
}

/// How many registers `LD [I], Vx` and `LD Vx, [I]` transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RegisterBlock {
    /// V0 through Vx
    #[default]
    Inclusive,
    /// All sixteen registers, whatever x is
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quirks {
    pub register_block: RegisterBlock,
}

pub struct Cpu {
    machine: Machine,
    mode: Mode,
    quirks: Quirks,
    rng: StdRng,
    cycles: u64,
}

impl Cpu {
    pub fn new(quirks: Quirks) -> Self {
        Self::with_rng(quirks, StdRng::from_entropy())
    }

    pub fn with_seed(quirks: Quirks, seed: u64) -> Self {
        Self::with_rng(quirks, StdRng::seed_from_u64(seed))
    }

    fn with_rng(quirks: Quirks, rng: StdRng) -> Self {
        Self {
            machine: Machine::new(),
            mode: Mode::Ready,
            quirks,
            rng,
            cycles: 0,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Fetches, decodes and executes one instruction. On error the machine is
    /// left exactly as it was before the call.
    pub fn step(&mut self) -> Result<(), Fault> {
        let pc = self.machine.pc;
        let code = self.machine.memory.load16(pc)?;
        let insn = Instruction::decode(code)?;

        trace!(
            "[cycle {:010}] 0x{:03x}: {:04x}  {}",
            self.cycles,
            pc,
            code,
            insn
        );

        self.execute(insn)?;

        self.cycles += 1;

        Ok(())
    }

    fn execute(&mut self, insn: Instruction) -> Result<(), Fault> {
        let m = &mut self.machine;
        let next = m.pc.wrapping_add(2);

        m.pc = match insn {
            Instruction::Cls => {
                m.framebuffer.clear();
                next
            }

            Instruction::Ret => m.stack.pop()?,

            Instruction::Jp { addr } => addr,

            Instruction::Call { addr } => {
                m.stack.push(next)?;
                addr
            }

            Instruction::SeImm { x, imm } => skip_if(next, m.reg(x) == imm),

            Instruction::SneImm { x, imm } => skip_if(next, m.reg(x) != imm),

            Instruction::SeReg { x, y } => skip_if(next, m.reg(x) == m.reg(y)),

            Instruction::SneReg { x, y } => skip_if(next, m.reg(x) != m.reg(y)),

            Instruction::LdImm { x, imm } => {
                m.v[x.index()] = imm;
                next
            }

            Instruction::AddImm { x, imm } => {
                let vx = m.reg(x);
                m.v[x.index()] = vx.wrapping_add(imm);
                next
            }

            Instruction::LdReg { x, y } => {
                let vy = m.reg(y);
                m.v[x.index()] = vy;
                next
            }

            Instruction::Or { x, y } => {
                let vy = m.reg(y);
                m.v[x.index()] |= vy;
                next
            }

            Instruction::And { x, y } => {
                let vy = m.reg(y);
                m.v[x.index()] &= vy;
                next
            }

            Instruction::Xor { x, y } => {
                let vy = m.reg(y);
                m.v[x.index()] ^= vy;
                next
            }

            // VF is written before the result, so the result wins when x is VF.
            Instruction::AddReg { x, y } => {
                let (sum, carry) = m.reg(x).overflowing_add(m.reg(y));
                m.set_flag(carry);
                m.v[x.index()] = sum;
                next
            }

            Instruction::Sub { x, y } => {
                let (vx, vy) = (m.reg(x), m.reg(y));
                m.set_flag(vx > vy);
                m.v[x.index()] = vx.wrapping_sub(vy);
                next
            }

            Instruction::Shr { x } => {
                let vx = m.reg(x);
                m.set_flag(vx & 0x01 != 0);
                m.v[x.index()] = vx >> 1;
                next
            }

            Instruction::Subn { x, y } => {
                let (vx, vy) = (m.reg(x), m.reg(y));
                m.set_flag(vy > vx);
                m.v[x.index()] = vy.wrapping_sub(vx);
                next
            }

            Instruction::Shl { x } => {
                let vx = m.reg(x);
                m.set_flag(vx & 0x80 != 0);
                m.v[x.index()] = vx << 1;
                next
            }

            Instruction::LdI { addr } => {
                m.i = addr;
                next
            }

            Instruction::JpV0 { addr } => addr + m.v[0] as u16,

            Instruction::Rnd { x, imm } => {
                m.v[x.index()] = self.rng.gen::<u8>() & imm;
                next
            }

            Instruction::Drw { x, y, n } => {
                let (vx, vy) = (m.reg(x), m.reg(y));
                let sprite = m.memory.load(m.i, n as usize)?;
                let collision = m.framebuffer.draw_sprite(vx, vy, sprite);
                m.set_flag(collision);
                next
            }

            Instruction::Skp { x } => {
                let down = m.key_down(m.reg(x))?;
                skip_if(next, down)
            }

            Instruction::Sknp { x } => {
                let down = m.key_down(m.reg(x))?;
                skip_if(next, !down)
            }

            Instruction::LdFromDt { x } => {
                m.v[x.index()] = m.delay_timer;
                next
            }

            Instruction::LdKey { x } => match m.first_key_down() {
                Some(key) => {
                    if self.mode == Mode::AwaitingKey {
                        debug!("CPU: key {:X} ends the wait at 0x{:03x}", key, m.pc);
                    }

                    self.mode = Mode::Ready;
                    m.v[x.index()] = key;
                    next
                }

                None => {
                    if self.mode == Mode::Ready {
                        debug!("CPU: waiting for a key at 0x{:03x}", m.pc);
                    }

                    self.mode = Mode::AwaitingKey;
                    m.pc
                }
            },

            Instruction::LdToDt { x } => {
                let vx = m.reg(x);
                m.delay_timer = vx;
                next
            }

            Instruction::LdToSt { x } => {
                let vx = m.reg(x);
                m.sound_timer = vx;
                next
            }

            Instruction::AddI { x } => {
                let vx = m.reg(x);
                m.i = m.i.wrapping_add(vx as u16);
                next
            }

            Instruction::LdGlyph { x } => {
                let value = m.reg(x);

                if value as usize >= map::GLYPH_COUNT {
                    return Err(Fault::InvalidGlyphIndex { value });
                }

                m.i = (map::FONT.start + value as usize * map::GLYPH_SIZE) as u16;
                next
            }

            Instruction::Bcd { x } => {
                let vx = m.reg(x);
                m.memory.store(m.i, &[vx / 100, vx / 10 % 10, vx % 10])?;
                next
            }

            Instruction::StoreRegs { x } => {
                let count = self.quirks.register_block.len(x);
                m.memory.store(m.i, &m.v[..count])?;
                next
            }

            Instruction::LoadRegs { x } => {
                let count = self.quirks.register_block.len(x);
                let bytes = m.memory.load(m.i, count)?;
                m.v[..count].copy_from_slice(bytes);
                next
            }
        };

        Ok(())
    }
}

impl RegisterBlock {
    fn len(self, x: Register) -> usize {
        match self {
            Self::Inclusive => x.index() + 1,
            Self::Full => 16,
        }
    }
}

fn skip_if(next: u16, cond: bool) -> u16 {
    if cond {
        next.wrapping_add(2)
    } else {
        next
    }
}
