use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::DecodeError;

/// Input frames fed to the sinc resampler per call.
const CHUNK_SIZE: usize = 1024;

/// Resample mono f32 audio from `from_rate` to `to_rate` using rubato.
///
/// The output is aligned with the input: the sinc filter delay is trimmed
/// from the front and flushed from the tail, so `n` input samples yield
/// `ceil(n * to_rate / from_rate)` output samples.
pub fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, DecodeError> {
    if from_rate == 0 {
        return Err(DecodeError::UnknownSampleRate);
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0, // max relative ratio
        params,
        CHUNK_SIZE,
        1,
    )
    .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    let mut chunks = samples.chunks_exact(CHUNK_SIZE);
    for chunk in &mut chunks {
        let frames = resampler
            .process(&[chunk][..], None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let frames = resampler
            .process_partial(Some(&[remainder][..]), None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    // Push the delayed tail out of the filter
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);

    log::debug!(
        "Resampled {} samples {}Hz -> {} samples {}Hz (delay {})",
        samples.len(),
        from_rate,
        output.len(),
        to_rate,
        delay
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::analyze;

    #[test]
    fn same_rate_is_passthrough() {
        let samples = vec![0.25, -0.5, 1.0];
        let out = resample_mono(&samples, 22_050, 22_050).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn empty_input_stays_empty() {
        let out = resample_mono(&[], 44_100, 22_050).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn halving_the_rate_halves_the_length() {
        let samples: Vec<f32> = (0..44_100)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
            .collect();
        let out = resample_mono(&samples, 44_100, 22_050).unwrap();
        assert_eq!(out.len(), 22_050);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn one_window_of_audio_survives_resampling() {
        let samples: Vec<f32> = (0..4096)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
            .collect();
        let out = resample_mono(&samples, 44_100, 22_050).unwrap();
        assert_eq!(out.len(), 2048);

        let map = analyze(&out, 22_050, 10).unwrap();
        assert_eq!(map.frame_count(), 1);
    }

    #[test]
    fn odd_lengths_round_up() {
        let out = resample_mono(&[0.1; 1001], 44_100, 22_050).unwrap();
        assert_eq!(out.len(), 501);
    }

    #[test]
    fn filter_delay_is_trimmed() {
        let samples: Vec<f32> = (0..44_100)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
            .collect();
        let out = resample_mono(&samples, 44_100, 22_050).unwrap();

        // Away from the edges the output tracks the same sine at the new rate
        for n in 5_000..5_200 {
            let want = (2.0 * std::f32::consts::PI * 440.0 * n as f32 / 22_050.0).sin();
            assert!((out[n] - want).abs() < 0.2, "sample {}: {} vs {}", n, out[n], want);
        }
    }

    #[test]
    fn zero_source_rate_is_rejected() {
        assert!(matches!(
            resample_mono(&[0.0; 16], 0, 22_050),
            Err(DecodeError::UnknownSampleRate)
        ));
    }
}
