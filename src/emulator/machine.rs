use crate::error::Fault;

use super::{
    display::Framebuffer,
    instruction::Register,
    memory::{map, Memory},
};

pub const KEY_COUNT: usize = 16;
pub const STACK_DEPTH: usize = 16;

/// Everything the program can observe or change: memory, registers, the call
/// stack, both timers, the keypad and the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub memory: Memory,
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub stack: Stack,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub keys: [bool; KEY_COUNT],
    pub framebuffer: Framebuffer,
}

impl Machine {
    pub fn new() -> Self {
        Self {
            memory: Memory::new(),
            v: [0; 16],
            i: 0,
            pc: map::PROGRAM_START,
            stack: Stack::new(),
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; KEY_COUNT],
            framebuffer: Framebuffer::new(),
        }
    }

    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Fault> {
        self.memory.load_program(program)
    }

    pub fn set_keys(&mut self, keys: [bool; KEY_COUNT]) {
        self.keys = keys;
    }

    pub fn decrement_timers(&mut self, ticks: u32) {
        let ticks = ticks.min(u8::MAX as u32) as u8;

        self.delay_timer = self.delay_timer.saturating_sub(ticks);
        self.sound_timer = self.sound_timer.saturating_sub(ticks);
    }

    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn key_down(&self, key: u8) -> Result<bool, Fault> {
        self.keys
            .get(key as usize)
            .copied()
            .ok_or(Fault::InvalidKey { value: key })
    }

    /// Lowest-indexed key currently held, if any.
    pub fn first_key_down(&self) -> Option<u8> {
        self.keys.iter().position(|&k| k).map(|k| k as u8)
    }

    pub fn reg(&self, r: Register) -> u8 {
        self.v[r.index()]
    }

    /// Writes the carry/borrow/collision flag into VF.
    pub fn set_flag(&mut self, flag: bool) {
        self.v[0xf] = flag as u8;
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

/// Return addresses of pending calls, at most [`STACK_DEPTH`] deep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    slots: [u16; STACK_DEPTH],
    sp: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            slots: [0; STACK_DEPTH],
            sp: 0,
        }
    }

    pub fn push(&mut self, addr: u16) -> Result<(), Fault> {
        let slot = self.slots.get_mut(self.sp).ok_or(Fault::StackOverflow)?;
        *slot = addr;
        self.sp += 1;

        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Fault> {
        self.sp = self.sp.checked_sub(1).ok_or(Fault::StackUnderflow)?;

        Ok(self.slots[self.sp])
    }

    pub fn depth(&self) -> usize {
        self.sp
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
