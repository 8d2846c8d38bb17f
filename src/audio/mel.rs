//! Triangular mel filterbank on the Slaney mel scale.
//!
//! Below 1 kHz the scale is linear (200/3 Hz per mel), above it is
//! logarithmic. Each filter is area-normalized so wide high-frequency bands
//! don't dominate narrow low ones.

const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

pub fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

/// One triangle: non-zero weights starting at FFT bin `start`.
#[derive(Clone, Debug)]
struct Triangle {
    start: usize,
    weights: Vec<f32>,
    center_hz: f32,
}

#[derive(Clone, Debug)]
pub struct MelFilterbank {
    filters: Vec<Triangle>,
    num_bins: usize,
}

impl MelFilterbank {
    /// Build `num_bands` filters spanning 0 Hz to Nyquist for an `fft_size`-point FFT.
    pub fn new(num_bands: usize, sample_rate: u32, fft_size: usize) -> Self {
        let num_bins = fft_size / 2 + 1;
        let nyquist = sample_rate as f32 / 2.0;
        let bin_hz: Vec<f32> = (0..num_bins)
            .map(|k| k as f32 * sample_rate as f32 / fft_size as f32)
            .collect();

        // num_bands + 2 edges evenly spaced in mel
        let max_mel = hz_to_mel(nyquist);
        let edges: Vec<f32> = (0..num_bands + 2)
            .map(|i| mel_to_hz(max_mel * i as f32 / (num_bands + 1) as f32))
            .collect();

        let filters = (0..num_bands)
            .map(|band| {
                let (lo, center, hi) = (edges[band], edges[band + 1], edges[band + 2]);
                let norm = 2.0 / (hi - lo);

                let mut start = None;
                let mut weights = Vec::new();
                for (k, &f) in bin_hz.iter().enumerate() {
                    let rising = (f - lo) / (center - lo);
                    let falling = (hi - f) / (hi - center);
                    let w = rising.min(falling).max(0.0) * norm;
                    if w > 0.0 {
                        start.get_or_insert(k);
                        weights.push(w);
                    } else if start.is_some() {
                        break;
                    }
                }

                Triangle {
                    start: start.unwrap_or(0),
                    weights,
                    center_hz: center,
                }
            })
            .collect::<Vec<_>>();

        let empty = filters.iter().filter(|t| t.weights.is_empty()).count();
        if empty > 0 {
            log::warn!(
                "{} of {} mel bands fall between FFT bins and will stay silent",
                empty,
                num_bands
            );
        }

        Self { filters, num_bins }
    }

    pub fn num_bands(&self) -> usize {
        self.filters.len()
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn center_frequencies(&self) -> Vec<f32> {
        self.filters.iter().map(|t| t.center_hz).collect()
    }

    /// Project a magnitude spectrum onto the bands, writing one value per band.
    pub fn apply_into(&self, magnitudes: &[f32], out: &mut [f32]) {
        for (filter, slot) in self.filters.iter().zip(out.iter_mut()) {
            let bins = magnitudes.iter().skip(filter.start);
            *slot = filter.weights.iter().zip(bins).map(|(w, m)| w * m).sum();
        }
    }
}
