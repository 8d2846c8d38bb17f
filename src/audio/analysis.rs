use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::energy::EnergyMap;
use super::mel::MelFilterbank;
use crate::error::AnalysisError;

pub const WINDOW_SIZE: usize = 2048;
pub const HOP_LENGTH: usize = 512;

/// Dynamic range kept below the track's peak, in dB.
pub const TOP_DB: f32 = 80.0;
/// Energies below this are treated as silence before taking the log.
const AMIN: f32 = 1e-5;

/// Cooperative cancellation for an in-flight analysis.
///
/// Holds the generation the analysis was started for; the run is stale as
/// soon as the shared counter moves past it.
#[derive(Clone, Debug)]
pub struct CancelToken {
    current: Arc<AtomicU64>,
    generation: u64,
}

impl CancelToken {
    pub fn new(current: Arc<AtomicU64>, generation: u64) -> Self {
        Self { current, generation }
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self::new(Arc::new(AtomicU64::new(0)), 0)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::Acquire) != self.generation
    }
}

/// Number of full analysis windows that fit in `num_samples`.
///
/// Frames start at sample 0 with no centre padding, so frame `i` covers
/// samples `i * HOP_LENGTH .. i * HOP_LENGTH + WINDOW_SIZE`.
pub fn frame_count(num_samples: usize) -> usize {
    if num_samples < WINDOW_SIZE {
        return 0;
    }
    (num_samples - WINDOW_SIZE) / HOP_LENGTH + 1
}

pub fn analyze(samples: &[f32], sample_rate: u32, band_count: usize) -> Result<EnergyMap, AnalysisError> {
    analyze_cancellable(samples, sample_rate, band_count, &CancelToken::never())
}

/// Build the normalized mel energy map for a whole track.
///
/// Pass 1 computes the mel-projected STFT magnitude of every frame in
/// parallel. Pass 2 finds the global peak and maps everything to
/// `[0, 1]` over an 80 dB range below it.
pub fn analyze_cancellable(
    samples: &[f32],
    sample_rate: u32,
    band_count: usize,
    cancel: &CancelToken,
) -> Result<EnergyMap, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidSampleRate);
    }
    let band_count = band_count.max(1);
    let frames = frame_count(samples.len());
    if frames == 0 {
        return Err(AnalysisError::TrackTooShort {
            samples: samples.len(),
            window: WINDOW_SIZE,
        });
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(AnalysisError::NonFinite);
    }

    log::info!("Pass 1: Mel spectrum ({} frames, {} bands)...", frames, band_count);
    let mel_frames = pass1_mel_frames(samples, sample_rate, band_count, frames, cancel)?;

    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }

    log::info!("Pass 2: dB scaling & normalization (range={}dB)...", TOP_DB);
    let values = pass2_normalize(&mel_frames, band_count, frames)?;

    Ok(EnergyMap::from_band_major(
        band_count,
        frames,
        sample_rate,
        HOP_LENGTH,
        values,
    ))
}

/// Frame-major mel energies: `result[frame][band]`.
fn pass1_mel_frames(
    samples: &[f32],
    sample_rate: u32,
    band_count: usize,
    frames: usize,
    cancel: &CancelToken,
) -> Result<Vec<Vec<f32>>, AnalysisError> {
    let filterbank = MelFilterbank::new(band_count, sample_rate, WINDOW_SIZE);
    let hann = hann_window(WINDOW_SIZE);
    let num_bins = filterbank.num_bins();

    // One plan shared by every rayon worker; scratch buffers are per worker
    let fft = FftPlanner::<f32>::new().plan_fft_forward(WINDOW_SIZE);
    let scratch_len = fft.get_inplace_scratch_len();

    (0..frames)
        .into_par_iter()
        .map_init(
            || {
                (
                    vec![Complex::new(0.0f32, 0.0); WINDOW_SIZE],
                    vec![Complex::new(0.0f32, 0.0); scratch_len],
                    vec![0.0f32; num_bins],
                )
            },
            |(buffer, scratch, magnitudes), frame_idx| {
                if cancel.is_cancelled() {
                    return Err(AnalysisError::Cancelled);
                }

                let start = frame_idx * HOP_LENGTH;
                let window = &samples[start..start + WINDOW_SIZE];
                for ((slot, &s), &w) in buffer.iter_mut().zip(window).zip(&hann) {
                    *slot = Complex::new(s * w, 0.0);
                }

                fft.process_with_scratch(buffer, scratch);

                for (m, c) in magnitudes.iter_mut().zip(buffer.iter()) {
                    *m = c.norm();
                }

                let mut mel = vec![0.0f32; band_count];
                filterbank.apply_into(magnitudes, &mut mel);
                Ok(mel)
            },
        )
        .collect()
}

fn pass2_normalize(
    mel_frames: &[Vec<f32>],
    band_count: usize,
    frames: usize,
) -> Result<Vec<f32>, AnalysisError> {
    let peak = mel_frames
        .iter()
        .flat_map(|f| f.iter().copied())
        .fold(0.0f32, f32::max);

    if !peak.is_finite() || mel_frames.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite);
    }

    if peak <= AMIN {
        log::info!("Track is silent, energy map stays at the floor");
        return Ok(vec![0.0; band_count * frames]);
    }

    let ref_db = 20.0 * peak.log10();
    let mut values = vec![0.0f32; band_count * frames];
    for (frame_idx, mel) in mel_frames.iter().enumerate() {
        for (band, &energy) in mel.iter().enumerate() {
            let db = (20.0 * energy.max(AMIN).log10() - ref_db).max(-TOP_DB);
            values[band * frames + frame_idx] = ((db + TOP_DB) / TOP_DB).clamp(0.0, 1.0);
        }
    }

    log::info!("Global: peak mel energy={:.4}", peak);
    Ok(values)
}

/// Periodic Hann window (the DFT-even form used for spectral analysis).
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}
