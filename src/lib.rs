use std::path::PathBuf;

use anyhow::Result;

use emulator::{Emulator, Quirks, RegisterBlock, Settings, KEY_COUNT};

pub mod emulator;
pub mod error;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Params {
    /// A path to the ROM file
    rom: PathBuf,

    /// Stop after this many 60 Hz frames instead of running until a fault
    #[arg(long)]
    frames: Option<u64>,

    /// Instructions executed per frame
    #[arg(long, default_value_t = 10)]
    ipf: u32,

    /// Keys held down for the whole run, as hex digits (e.g. `--keys 5,a`)
    #[arg(long, value_delimiter = ',', value_parser = parse_key)]
    keys: Vec<u8>,

    /// Seed for the random number opcode
    #[arg(long)]
    seed: Option<u64>,

    /// Registers transferred by the register block load/store opcodes
    #[arg(long, value_enum, default_value_t = RegisterBlock::Inclusive)]
    register_block: RegisterBlock,

    /// Only print the screen once, when the run ends
    #[arg(long)]
    quiet: bool,
}

impl Params {
    fn settings(&self) -> Settings {
        let mut keys = [false; KEY_COUNT];
        for &k in &self.keys {
            keys[k as usize] = true;
        }

        Settings {
            quirks: Quirks {
                register_block: self.register_block,
            },
            instructions_per_frame: self.ipf,
            frame_limit: self.frames,
            keys,
            seed: self.seed,
            render_frames: !self.quiet,
        }
    }
}

fn parse_key(s: &str) -> Result<u8, String> {
    u8::from_str_radix(s, 16)
        .ok()
        .filter(|&k| (k as usize) < KEY_COUNT)
        .ok_or_else(|| format!("`{}` is not a key between 0 and F", s))
}

pub fn run(params: Params) -> Result<()> {
    let mut emulator = Emulator::new(&params.rom, params.settings())?;

    emulator.run()
}
