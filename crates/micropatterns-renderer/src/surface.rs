//! Pixel surface contract and an in-memory monochrome implementation.
//!
//! A surface clips every write to its own bounds; callers may pass
//! coordinates outside `0..width` / `0..height`.

use micropatterns_lang::Color;

pub trait Surface {
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    fn set_pixel(&mut self, x: i32, y: i32, color: Color);

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        let (x0, y0) = (x.max(0), y.max(0));
        let x1 = x.saturating_add(w).min(self.width());
        let y1 = y.saturating_add(h).min(self.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.set_pixel(px, py, color);
            }
        }
    }

    fn clear(&mut self, color: Color) {
        let (w, h) = (self.width(), self.height());
        self.fill_rect(0, 0, w, h, color);
    }

    /// Paint the set bits of a row-major `w × h` bitmap at `(x, y)` in
    /// `color`. Clear bits leave the surface untouched.
    fn blit(&mut self, x: i32, y: i32, bitmap: &[u8], w: usize, h: usize, color: Color) {
        for by in 0..h {
            for bx in 0..w {
                if bitmap.get(by * w + bx).copied() == Some(1) {
                    self.set_pixel(x.saturating_add(bx as i32), y.saturating_add(by as i32), color);
                }
            }
        }
    }
}

// ─── MonoCanvas ───────────────────────────────────────────────────────────────

/// One byte per pixel: 0 = black, 1 = white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoCanvas {
    width: i32,
    height: i32,
    pixels: Vec<u8>,
}

impl MonoCanvas {
    /// A canvas filled with white.
    pub fn new(width: i32, height: i32) -> Self {
        let (width, height) = (width.max(0), height.max(0));
        Self { width, height, pixels: vec![1; (width * height) as usize] }
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height { return None; }
        Some((y * self.width + x) as usize)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| if self.pixels[i] == 0 { Color::Black } else { Color::White })
    }

    pub fn count(&self, color: Color) -> usize {
        let v = if color == Color::Black { 0 } else { 1 };
        self.pixels.iter().filter(|&&p| p == v).count()
    }

    /// Raw bytes, row-major, 0 = black.
    pub fn as_bytes(&self) -> &[u8] { &self.pixels }

    /// `#` for black, `.` for white, one line per row.
    pub fn to_ascii(&self) -> String {
        let mut s = String::with_capacity(((self.width + 1) * self.height) as usize);
        for row in self.pixels.chunks(self.width.max(1) as usize) {
            s.extend(row.iter().map(|&p| if p == 0 { '#' } else { '.' }));
            s.push('\n');
        }
        s
    }
}

impl Surface for MonoCanvas {
    fn width(&self) -> i32 { self.width }
    fn height(&self) -> i32 { self.height }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = if color == Color::Black { 0 } else { 1 };
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        let (x0, y0) = (x.max(0), y.max(0));
        let x1 = x.saturating_add(w).min(self.width);
        let y1 = y.saturating_add(h).min(self.height);
        if x0 >= x1 || y0 >= y1 { return; }
        let v = if color == Color::Black { 0 } else { 1 };
        for py in y0..y1 {
            let start = (py * self.width + x0) as usize;
            self.pixels[start..start + (x1 - x0) as usize].fill(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_outside_are_clipped() {
        let mut c = MonoCanvas::new(4, 3);
        c.set_pixel(-1, 0, Color::Black);
        c.set_pixel(4, 0, Color::Black);
        c.fill_rect(-2, -2, 3, 3, Color::Black);
        assert_eq!(c.count(Color::Black), 1);
        assert_eq!(c.pixel(0, 0), Some(Color::Black));
        assert_eq!(c.pixel(9, 9), None);
    }

    #[test]
    fn blit_skips_clear_bits() {
        let mut c = MonoCanvas::new(3, 2);
        c.blit(1, 0, &[1, 0, 0, 1], 2, 2, Color::Black);
        assert_eq!(c.to_ascii(), ".#.\n..#\n");
    }

    #[test]
    fn clear_covers_everything() {
        let mut c = MonoCanvas::new(5, 5);
        c.clear(Color::Black);
        assert_eq!(c.count(Color::Black), 25);
    }
}
