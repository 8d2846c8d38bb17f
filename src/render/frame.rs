use serde::Serialize;

use super::style::{Gradient, Rgb};

/// One bar's draw instruction. Coordinates are in viewport pixels with the
/// origin at the top-left corner.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bar {
    pub band: usize,
    /// Normalized energy that produced this bar, in `[0, 1]`.
    pub amplitude: f32,
    pub height: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub corner_radius: f32,
    pub gradient: Gradient,
}

impl Bar {
    /// Color at `t` of the way from the bar's bottom (0) to its top (1).
    pub fn color_at(&self, t: f32) -> Rgb {
        self.gradient.at(t)
    }
}

/// Everything the drawing surface needs for one display tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RenderFrame {
    pub frame_index: usize,
    pub bar_width: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub bars: Vec<Bar>,
}

impl RenderFrame {
    pub fn with_capacity(bars: usize) -> Self {
        Self {
            bars: Vec::with_capacity(bars),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn heights(&self) -> impl Iterator<Item = f32> + '_ {
        self.bars.iter().map(|b| b.height)
    }
}
