use super::analysis::WINDOW_SIZE;

/// Normalized band-by-time energy grid for one track.
///
/// Values are stored band-major: row `b` holds `frame_count` consecutive
/// values in `[0, 1]`. The map is never mutated after analysis finishes.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyMap {
    band_count: usize,
    frame_count: usize,
    sample_rate: u32,
    hop_length: usize,
    values: Vec<f32>,
}

impl EnergyMap {
    /// `values` must hold `band_count * frame_count` entries in band-major order.
    pub(crate) fn from_band_major(
        band_count: usize,
        frame_count: usize,
        sample_rate: u32,
        hop_length: usize,
        values: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(values.len(), band_count * frame_count);
        Self {
            band_count,
            frame_count,
            sample_rate,
            hop_length,
            values,
        }
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// All frames of one band, or `None` past the last band.
    pub fn row(&self, band: usize) -> Option<&[f32]> {
        if band >= self.band_count {
            return None;
        }
        let start = band * self.frame_count;
        Some(&self.values[start..start + self.frame_count])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on zero, and a map always has at least one frame
        self.values.chunks_exact(self.frame_count.max(1))
    }

    pub fn get(&self, band: usize, frame: usize) -> Option<f32> {
        if band >= self.band_count || frame >= self.frame_count {
            return None;
        }
        Some(self.values[band * self.frame_count + frame])
    }

    /// Length of audio spanned by the analysis windows, rounded down.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.frame_count == 0 {
            return 0;
        }
        let samples = (self.frame_count - 1) * self.hop_length + WINDOW_SIZE;
        samples as u64 * 1000 / self.sample_rate as u64
    }
}
