use std::fmt;

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;

const SPRITE_WIDTH: usize = 8;

/// The 64x32 monochrome screen. Only the clear and draw opcodes change it.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [[bool; WIDTH]; HEIGHT],
    dirty: bool,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self {
            pixels: [[false; WIDTH]; HEIGHT],
            dirty: false,
        }
    }

    /// Coordinates wrap like sprite drawing does: `pixel(64, 32)` reads the
    /// same pixel as `pixel(0, 0)`.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[y % HEIGHT][x % WIDTH]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool; WIDTH]> {
        self.pixels.iter()
    }

    pub fn is_blank(&self) -> bool {
        self.rows().all(|row| row.iter().all(|&p| !p))
    }

    pub fn clear(&mut self) {
        self.pixels = [[false; WIDTH]; HEIGHT];
        self.dirty = true;
    }

    /// XORs `sprite` onto the screen with its top-left corner at (`x`, `y`),
    /// wrapping every pixel on both axes. Returns whether a lit pixel was
    /// turned off.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let mut collision = false;

        for (row, bits) in sprite.iter().enumerate() {
            for col in 0..SPRITE_WIDTH {
                if bits & (0x80 >> col) == 0 {
                    continue;
                }

                let pixel =
                    &mut self.pixels[(y as usize + row) % HEIGHT][(x as usize + col) % WIDTH];

                collision |= *pixel;
                *pixel = !*pixel;
            }
        }

        self.dirty = true;

        collision
    }

    /// Reports whether the screen changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders lit pixels as full blocks, one text line per row.
impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: String = row.iter().map(|&p| if p { '█' } else { ' ' }).collect();
            writeln!(f, "{}", line.trim_end())?;
        }

        Ok(())
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lit = self
            .rows()
            .map(|row| row.iter().filter(|&&p| p).count())
            .sum::<usize>();

        f.write_fmt(format_args!("Framebuffer({} pixels lit)", lit))
    }
}
