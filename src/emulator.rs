use std::{
    path::Path,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use log::{debug, info};

pub use cpu::{Cpu, Mode, Quirks, RegisterBlock};
pub use display::{Framebuffer, HEIGHT, WIDTH};
pub use instruction::{Instruction, Register};
pub use machine::{Machine, Stack, KEY_COUNT, STACK_DEPTH};
pub use memory::Memory;

mod cpu;
mod display;
mod instruction;
mod machine;
mod memory;

/// One 60 Hz timer period.
const FRAME: Duration = Duration::from_nanos(1_000_000_000 / 60);

#[derive(Debug, Clone)]
pub struct Settings {
    pub quirks: Quirks,
    pub instructions_per_frame: u32,
    /// Stop after this many frames; run until a fault when `None`.
    pub frame_limit: Option<u64>,
    /// Key state handed to the machine before every step.
    pub keys: [bool; KEY_COUNT],
    pub seed: Option<u64>,
    /// Print the screen every time it changes, not only at exit.
    pub render_frames: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quirks: Quirks::default(),
            instructions_per_frame: 10,
            frame_limit: None,
            keys: [false; KEY_COUNT],
            seed: None,
            render_frames: true,
        }
    }
}

pub struct Emulator {
    cpu: Cpu,
    settings: Settings,
    frames: u64,
}

impl Emulator {
    pub fn new(rom_path: &Path, settings: Settings) -> Result<Self> {
        use std::fs;

        let rom = fs::read(rom_path)
            .with_context(|| format!("ROM: error while reading {:?} from disk", rom_path))?;

        info!("ROM: read {} bytes from {:?}", rom.len(), rom_path);

        Self::with_program(&rom, settings)
    }

    pub fn with_program(program: &[u8], settings: Settings) -> Result<Self> {
        let mut cpu = match settings.seed {
            Some(seed) => Cpu::with_seed(settings.quirks, seed),
            None => Cpu::new(settings.quirks),
        };

        cpu.machine_mut()
            .load_program(program)
            .context("Emulator: error while loading the program into memory")?;

        Ok(Self {
            cpu,
            settings,
            frames: 0,
        })
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.cpu.machine().framebuffer()
    }

    /// Runs frames in real time until the frame limit or the first fault,
    /// then prints the final screen.
    pub fn run(&mut self) -> Result<()> {
        let result = self.run_frames();

        print!("{}", self.framebuffer());

        info!(
            "Emulator: stopped after {} frames, {} instructions",
            self.frames,
            self.cpu.cycles()
        );

        result
    }

    fn run_frames(&mut self) -> Result<()> {
        let start = Instant::now();
        let mut next_frame = start;
        let mut last_tick = 0;

        while self
            .settings
            .frame_limit
            .map_or(true, |limit| self.frames < limit)
        {
            let tick = (start.elapsed().as_nanos() / FRAME.as_nanos()) as u64;
            let ticks = u32::try_from(tick - last_tick).unwrap_or(u32::MAX);
            last_tick = tick;

            if self.frame(ticks)? && self.settings.render_frames {
                print!("{}", self.framebuffer());
            }

            next_frame += FRAME;

            if let Some(rest) = next_frame.checked_duration_since(Instant::now()) {
                thread::sleep(rest);
            }
        }

        Ok(())
    }

    /// Decays the timers by `ticks`, then executes one frame's worth of
    /// instructions. Returns whether the screen changed.
    pub fn frame(&mut self, ticks: u32) -> Result<bool> {
        self.cpu.machine_mut().decrement_timers(ticks);

        for _ in 0..self.settings.instructions_per_frame {
            self.cpu.machine_mut().set_keys(self.settings.keys);

            let pc = self.cpu.machine().pc;

            self.cpu.step().with_context(|| {
                format!(
                    "Emulator: fault at 0x{:03x} in frame {} (after {} instructions)",
                    pc,
                    self.frames,
                    self.cpu.cycles()
                )
            })?;
        }

        if self.cpu.mode() == Mode::AwaitingKey {
            debug!("Emulator: frame {} ended waiting for a key", self.frames);
        }

        self.frames += 1;

        Ok(self.cpu.machine_mut().framebuffer.take_dirty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;

    fn words(program: &[u16]) -> Vec<u8> {
        program.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    fn settings() -> Settings {
        Settings {
            seed: Some(1),
            render_frames: false,
            ..Settings::default()
        }
    }

    #[test]
    fn oversized_program_is_rejected() {
        let err = Emulator::with_program(&[0; 3585], settings()).err().unwrap();

        assert_eq!(
            err.downcast_ref::<Fault>(),
            Some(&Fault::ProgramTooLarge {
                size: 3585,
                max: 3584
            })
        );
    }

    #[test]
    fn missing_rom_reports_the_path() {
        let err = Emulator::new(Path::new("/nonexistent/pong.ch8"), settings())
            .err()
            .unwrap();

        assert!(err.to_string().contains("pong.ch8"));
    }

    #[test]
    fn frame_runs_the_configured_number_of_steps() -> Result<()> {
        // ADD V0, 1; JP 0x200
        let mut emu = Emulator::with_program(&words(&[0x7001, 0x1200]), settings())?;
        emu.frame(0)?;

        assert_eq!(emu.cpu().cycles(), 10);
        assert_eq!(emu.cpu().machine().v[0], 5);
        Ok(())
    }

    #[test]
    fn frame_decays_timers_before_stepping() -> Result<()> {
        // LD V0, 20; LD DT, V0; JP 0x204
        let mut emu = Emulator::with_program(&words(&[0x6014, 0xf015, 0x1204]), settings())?;
        emu.frame(5)?;
        assert_eq!(emu.cpu().machine().delay_timer, 20);

        emu.frame(5)?;
        assert_eq!(emu.cpu().machine().delay_timer, 15);

        emu.frame(100)?;
        assert_eq!(emu.cpu().machine().delay_timer, 0);
        Ok(())
    }

    #[test]
    fn frame_reports_screen_changes() -> Result<()> {
        // LD F, V0; DRW V0, V0, 5; JP 0x204
        let mut emu = Emulator::with_program(&words(&[0xf029, 0xd005, 0x1204]), settings())?;

        assert!(emu.frame(0)?);
        assert!(!emu.frame(0)?);
        assert!(emu.framebuffer().pixel(0, 0));
        Ok(())
    }

    #[test]
    fn held_keys_satisfy_key_wait() -> Result<()> {
        let mut keys = [false; KEY_COUNT];
        keys[0xa] = true;

        // LD V1, K; JP 0x202
        let program = words(&[0xf10a, 0x1202]);
        let mut emu = Emulator::with_program(&program, Settings { keys, ..settings() })?;
        emu.frame(0)?;

        assert_eq!(emu.cpu().machine().v[1], 0xa);
        assert_eq!(emu.cpu().mode(), Mode::Ready);

        let mut emu = Emulator::with_program(&program, settings())?;
        emu.frame(0)?;

        assert_eq!(emu.cpu().machine().pc, 0x200);
        assert_eq!(emu.cpu().mode(), Mode::AwaitingKey);
        Ok(())
    }

    #[test]
    fn fault_is_wrapped_with_location() -> Result<()> {
        let mut emu = Emulator::with_program(&words(&[0x6001, 0xffff]), settings())?;
        let err = emu.frame(0).err().unwrap();

        assert!(err.to_string().contains("0x202"));
        assert_eq!(
            err.downcast_ref::<Fault>(),
            Some(&Fault::InvalidOpcode { opcode: 0xffff })
        );
        Ok(())
    }

    #[test]
    fn run_stops_at_frame_limit() -> Result<()> {
        let mut emu = Emulator::with_program(
            &words(&[0x1200]),
            Settings {
                frame_limit: Some(3),
                ..settings()
            },
        )?;
        emu.run()?;

        assert_eq!(emu.cpu().cycles(), 30);
        Ok(())
    }

    #[test]
    fn run_paces_frames_at_60_hz() -> Result<()> {
        let mut emu = Emulator::with_program(
            &words(&[0x1200]),
            Settings {
                frame_limit: Some(6),
                ..settings()
            },
        )?;
        let start = Instant::now();
        emu.run()?;

        assert!(start.elapsed() >= FRAME * 6);
        Ok(())
    }
}
