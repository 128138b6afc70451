use bitvec::{BitArr, array::BitArray};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const MAX_SPRITE_ROWS: usize = 15;

/// Monochrome 64x32 framebuffer, one bit per pixel, row-major.
pub struct FrameBuffer {
    pixels: BitArr!(for DISPLAY_WIDTH * DISPLAY_HEIGHT),
    wrap: bool,
}

impl FrameBuffer {
    pub fn new(wrap: bool) -> Self {
        FrameBuffer {
            pixels: BitArray::ZERO,
            wrap,
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= DISPLAY_WIDTH || y >= DISPLAY_HEIGHT {
            return false;
        }
        self.pixels[y * DISPLAY_WIDTH + x]
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels.count_ones()
    }

    /// XORs `sprite` onto the display with its top-left corner at `(x, y)`.
    ///
    /// Each byte is one 8-pixel row, most significant bit leftmost. Pixels
    /// past the right or bottom edge are clipped, or wrapped to the opposite
    /// edge when the framebuffer was built with wrapping enabled. Returns
    /// `true` if any lit pixel was switched off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;

        for (row, &byte) in sprite.iter().take(MAX_SPRITE_ROWS).enumerate() {
            for bit in 0..8 {
                if (byte >> (7 - bit)) & 1 == 0 {
                    continue;
                }

                let (pixel_x, pixel_y) = if self.wrap {
                    ((x + bit) % DISPLAY_WIDTH, (y + row) % DISPLAY_HEIGHT)
                } else {
                    (x + bit, y + row)
                };
                if pixel_x >= DISPLAY_WIDTH || pixel_y >= DISPLAY_HEIGHT {
                    continue;
                }

                let index = pixel_y * DISPLAY_WIDTH + pixel_x;
                let current_pixel = self.pixels[index];
                collision |= current_pixel;
                self.pixels.set(index, !current_pixel);
            }
        }
        collision
    }
}
