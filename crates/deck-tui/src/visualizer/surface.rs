//! Pixel raster blitted into the terminal with half blocks: one cell holds
//! two vertically stacked pixels (`▀` with fg = top, bg = bottom).

use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Accent used when a station colour cannot be parsed.
pub const FALLBACK_ACCENT: Rgb = Rgb::new(0, 255, 255);
pub const WHITE: Rgb = Rgb::new(255, 255, 255);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb` or `#rgb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let num = u32::from_str_radix(&expanded, 16).ok()?;
        Some(Self::new((num >> 16) as u8, (num >> 8) as u8, num as u8))
    }

    pub fn from_hex_or_fallback(hex: &str) -> Self {
        Self::from_hex(hex).unwrap_or(FALLBACK_ACCENT)
    }

    /// Mix `other` over `self` with coverage `alpha` (0..=1).
    pub fn blend(self, other: Rgb, alpha: f32) -> Rgb {
        let a = alpha.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * a).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl From<Rgb> for Color {
    fn from(c: Rgb) -> Self {
        Color::Rgb(c.r, c.g, c.b)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Surface {
    width: usize,
    height: usize,
    background: Rgb,
    pixels: Vec<Rgb>,
}

impl Surface {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Match the raster to a cell area. Returns true when the size changed.
    pub fn fit(&mut self, cols: u16, rows: u16) -> bool {
        let (w, h) = (cols as usize, rows as usize * 2);
        if w == self.width && h == self.height {
            return false;
        }
        self.width = w;
        self.height = h;
        self.pixels = vec![self.background; w * h];
        true
    }

    pub fn clear(&mut self, background: Rgb) {
        self.background = background;
        self.pixels.fill(background);
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn blend(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.pixels[idx] = self.pixels[idx].blend(color, alpha);
    }

    /// Vertical run from `top` (inclusive) down to the bottom edge, alpha
    /// fading linearly from `alpha_top` to `alpha_bottom`.
    pub fn column_gradient(&mut self, x: i32, top: f32, color: Rgb, alpha_top: f32, alpha_bottom: f32) {
        let h = self.height as f32;
        if h == 0.0 {
            return;
        }
        let start = top.max(0.0).floor() as i32;
        let span = (h - top).max(1.0);
        for y in start..self.height as i32 {
            let t = (y as f32 - top).max(0.0) / span;
            self.blend(x, y, color, alpha_top + (alpha_bottom - alpha_top) * t);
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb, alpha: f32) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.blend(xx, yy, color, alpha);
            }
        }
    }

    /// Bresenham.
    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb, alpha: f32) {
        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.blend(x, y, color, alpha);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn disc(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb, alpha: f32) {
        let r = radius.max(0.5);
        let (x0, x1) = ((cx - r).floor() as i32, (cx + r).ceil() as i32);
        let (y0, y1) = ((cy - r).floor() as i32, (cy + r).ceil() as i32);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (ddx, ddy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
                if ddx * ddx + ddy * ddy <= r * r {
                    self.blend(x, y, color, alpha);
                }
            }
        }
    }

    pub fn widget(&self) -> SurfaceWidget<'_> {
        SurfaceWidget { surface: self }
    }
}

pub struct SurfaceWidget<'a> {
    surface: &'a Surface,
}

impl Widget for SurfaceWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let s = self.surface;
        for row in 0..area.height {
            for col in 0..area.width {
                let (x, y) = (col as usize, row as usize * 2);
                let (Some(top), Some(bottom)) = (s.get(x, y), s.get(x, y + 1)) else {
                    continue;
                };
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_char('▀').set_fg(top.into()).set_bg(bottom.into());
                }
            }
        }
    }
}
