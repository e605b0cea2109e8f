use std::ops::Range;

use crate::error::Fault;

/// The 4 KiB address space. Every access is checked against the full range it
/// touches, an access that would reach past the last byte is a fault.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Zeroed memory with the font installed at the bottom of the reserved area.
    pub fn new() -> Self {
        let mut data = vec![0; map::SIZE];
        data[map::FONT].copy_from_slice(&FONT);

        Self { data }
    }

    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Fault> {
        if program.len() > map::PROGRAM.len() {
            return Err(Fault::ProgramTooLarge {
                size: program.len(),
                max: map::PROGRAM.len(),
            });
        }

        let start = map::PROGRAM.start;
        self.data[start..start + program.len()].copy_from_slice(program);

        Ok(())
    }

    pub fn load(&self, addr: u16, len: usize) -> Result<&[u8], Fault> {
        let range = checked_range(addr, len)?;

        Ok(&self.data[range])
    }

    pub fn load8(&self, addr: u16) -> Result<u8, Fault> {
        Ok(self.load(addr, 1)?[0])
    }

    /// Loads a big-endian word.
    pub fn load16(&self, addr: u16) -> Result<u16, Fault> {
        let bytes = self.load(addr, 2)?;

        Ok(((bytes[0] as u16) << 8) | bytes[1] as u16)
    }

    /// Writes `bytes` starting at `addr`. Nothing is written unless the whole
    /// range fits.
    pub fn store(&mut self, addr: u16, bytes: &[u8]) -> Result<(), Fault> {
        let range = checked_range(addr, bytes.len())?;

        self.data[range].copy_from_slice(bytes);

        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.data[map::PROGRAM]
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |p| p + 1);

        f.write_fmt(format_args!("Memory({} program bytes in use)", used))
    }
}

/// Empty accesses touch no memory, so they succeed wherever `addr` points.
fn checked_range(addr: u16, len: usize) -> Result<Range<usize>, Fault> {
    if len == 0 {
        return Ok(0..0);
    }

    let start = addr as usize;
    let end = start + len;

    if end > map::SIZE {
        return Err(Fault::MemoryOutOfBounds { addr, len });
    }

    Ok(start..end)
}

pub mod map {
    use std::ops::Range;

    pub const SIZE: usize = 4096;

    pub const GLYPH_SIZE: usize = 5;
    pub const GLYPH_COUNT: usize = 16;
    pub const FONT: Range<usize> = 0x000..GLYPH_SIZE * GLYPH_COUNT;

    pub const PROGRAM_START: u16 = 0x200;
    pub const PROGRAM: Range<usize> = PROGRAM_START as usize..SIZE;
}

#[rustfmt::skip]
const FONT: [u8; map::GLYPH_SIZE * map::GLYPH_COUNT] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_is_installed_and_program_area_zeroed() {
        let m = Memory::new();

        assert_eq!(m.data[map::FONT], FONT);
        assert!(m.data[map::FONT.end..].iter().all(|&b| b == 0));
    }

    #[test]
    fn glyph_for_a_is_at_fifty() -> Result<(), Fault> {
        let m = Memory::new();

        assert_eq!(m.load(0xA * 5, 5)?, &[0xF0, 0x90, 0xF0, 0x90, 0x90]);
        Ok(())
    }

    #[test]
    fn program_lands_at_0x200() -> Result<(), Fault> {
        let mut m = Memory::new();
        m.load_program(&[0x00, 0xe0])?;

        assert_eq!(m.load16(0x200)?, 0x00e0);
        Ok(())
    }

    #[test]
    fn largest_program_fits() -> Result<(), Fault> {
        let mut m = Memory::new();
        m.load_program(&[0xaa; 3584])?;

        assert_eq!(m.load8(0xfff)?, 0xaa);
        Ok(())
    }

    #[test]
    fn oversized_program_is_rejected_untouched() {
        let mut m = Memory::new();
        let before = m.clone();

        assert_eq!(
            m.load_program(&[0xaa; 3585]),
            Err(Fault::ProgramTooLarge {
                size: 3585,
                max: 3584
            })
        );
        assert!(m == before);
    }

    #[test]
    fn word_straddling_the_end_faults() {
        let m = Memory::new();

        assert_eq!(
            m.load16(0xfff),
            Err(Fault::MemoryOutOfBounds {
                addr: 0xfff,
                len: 2
            })
        );
    }

    #[test]
    fn empty_access_past_the_end_succeeds() -> Result<(), Fault> {
        let mut m = Memory::new();

        assert_eq!(m.load(0x1100, 0)?, &[] as &[u8]);
        m.store(0xffff, &[])?;
        Ok(())
    }

    #[test]
    fn partial_store_writes_nothing() -> Result<(), Fault> {
        let mut m = Memory::new();

        assert!(m.store(0xffe, &[1, 2, 3]).is_err());
        assert_eq!(m.load(0xffe, 2)?, &[0, 0]);

        m.store(0xffd, &[1, 2, 3])?;
        assert_eq!(m.load(0xffd, 3)?, &[1, 2, 3]);
        Ok(())
    }
}
