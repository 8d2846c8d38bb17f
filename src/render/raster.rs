use super::frame::{Bar, RenderFrame};
use super::style::Rgb;

/// CPU rasterizer for render frames into an RGBA8 buffer.
///
/// Used by the preview encoder; an interactive host would hand the
/// [`RenderFrame`] to its own painter instead.
pub struct Rasterizer {
    width: u32,
    height: u32,
    background: Rgb,
    pixels: Vec<u8>,
}

impl Rasterizer {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        Self {
            width,
            height,
            background,
            pixels: vec![0; buffer_len(width, height)],
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Clear to the background and draw every bar of `frame`.
    pub fn draw(&mut self, frame: &RenderFrame) -> &[u8] {
        let bg = [self.background.r, self.background.g, self.background.b, 255];
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bg);
        }

        for bar in &frame.bars {
            self.fill_bar(bar);
        }

        &self.pixels
    }

    fn fill_bar(&mut self, bar: &Bar) {
        if bar.width <= 0.0 || bar.height <= 0.0 {
            return;
        }

        let left = bar.x.floor().max(0.0) as u32;
        let right = ((bar.x + bar.width).ceil().max(0.0) as u32).min(self.width);
        let top = bar.y.floor().max(0.0) as u32;
        let bottom_edge = bar.y + bar.height;
        let bottom = (bottom_edge.ceil().max(0.0) as u32).min(self.height);

        let radius = bar.corner_radius.min(bar.width / 2.0).min(bar.height / 2.0).max(0.0);

        for py in top..bottom {
            let cy = py as f32 + 0.5;
            // 0 at the bar's base, 1 at its top
            let t = (bottom_edge - cy) / bar.height;
            let color = bar.color_at(t);

            for px in left..right {
                let cx = px as f32 + 0.5;
                if !inside_rounded_rect(cx, cy, bar, radius) {
                    continue;
                }
                let idx = (py as usize * self.width as usize + px as usize) * 4;
                self.pixels[idx] = color.r;
                self.pixels[idx + 1] = color.g;
                self.pixels[idx + 2] = color.b;
                self.pixels[idx + 3] = 255;
            }
        }
    }
}

/// RGBA8 byte length of a `width` x `height` image.
fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

fn inside_rounded_rect(x: f32, y: f32, bar: &Bar, radius: f32) -> bool {
    let (x0, y0) = (bar.x, bar.y);
    let (x1, y1) = (bar.x + bar.width, bar.y + bar.height);
    if x < x0 || x > x1 || y < y0 || y > y1 {
        return false;
    }
    if radius <= 0.0 {
        return true;
    }

    // Distance from the nearest corner circle center, only inside corner zones
    let cx = x.clamp(x0 + radius, x1 - radius);
    let cy = y.clamp(y0 + radius, y1 - radius);
    let (dx, dy) = (x - cx, y - cy);
    dx * dx + dy * dy <= radius * radius
}
