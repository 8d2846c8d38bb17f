use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::resample::resample_mono;
use super::ANALYSIS_SAMPLE_RATE;
use crate::error::DecodeError;

/// Mono samples at a known rate, ready for spectral analysis.
#[derive(Clone, Debug)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Source of analysis waveforms. The session only talks to this trait so the
/// decoder can be swapped out (tests feed synthetic signals through it).
pub trait TrackLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Waveform, DecodeError>;
}

/// Decodes with symphonia, downmixes to mono and resamples to the analysis rate.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaLoader;

impl TrackLoader for SymphoniaLoader {
    fn load(&self, path: &Path) -> Result<Waveform, DecodeError> {
        let decoded = decode_audio(path)?;
        let samples = resample_mono(&decoded.samples, decoded.sample_rate, ANALYSIS_SAMPLE_RATE)?;
        Ok(Waveform::new(samples, ANALYSIS_SAMPLE_RATE))
    }
}

/// Decode a file to mono at its native sample rate.
pub fn decode_audio(path: &Path) -> Result<Waveform, DecodeError> {
    let file = std::fs::File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(DecodeError::Probe)?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count()).max(1);
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(DecodeError::Codec)?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(DecodeError::Codec(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt packets are skipped, the rest of the stream is still usable
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(DecodeError::Codec(e)),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let samples = sample_buf.samples();

        if channels == 1 {
            mono.extend_from_slice(samples);
        } else {
            for frame_samples in samples.chunks(channels) {
                mono.push(frame_samples.iter().sum::<f32>() / channels as f32);
            }
        }
    }

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        mono.len(),
        sample_rate,
        mono.len() as f32 / sample_rate as f32
    );

    Ok(Waveform::new(mono, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::analyze;
    use std::io::Write;
    use std::path::PathBuf;

    /// Write interleaved stereo samples as a 16-bit PCM WAV file.
    fn write_stereo_wav(name: &str, sample_rate: u32, frames: &[(f32, f32)]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("melbars-{}-{}.wav", name, std::process::id()));
        let data_len = (frames.len() * 4) as u32;

        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 4).to_le_bytes());
        bytes.extend_from_slice(&4u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for &(l, r) in frames {
            bytes.extend_from_slice(&((l * i16::MAX as f32) as i16).to_le_bytes());
            bytes.extend_from_slice(&((r * i16::MAX as f32) as i16).to_le_bytes());
        }

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&bytes).unwrap();
        path
    }

    fn left_only_tone(seconds: f32) -> Vec<(f32, f32)> {
        let n = (44_100.0 * seconds) as usize;
        (0..n)
            .map(|i| (0.6 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin(), 0.0))
            .collect()
    }

    #[test]
    fn duration_rounds_down_to_whole_milliseconds() {
        let wave = Waveform::new(vec![0.0; 44_100], 22_050);
        assert_eq!(wave.duration_ms(), 2000);

        let wave = Waveform::new(vec![0.0; 22_060], 22_050);
        assert_eq!(wave.duration_ms(), 1000);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = decode_audio(Path::new("/definitely/not/here.mp3")).unwrap_err();
        assert!(matches!(err, DecodeError::Open { .. }));
    }

    #[test]
    fn stereo_wav_is_downmixed_at_native_rate() {
        let path = write_stereo_wav("downmix", 44_100, &left_only_tone(0.5));
        let wave = decode_audio(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(wave.sample_rate, 44_100);
        assert_eq!(wave.samples.len(), 22_050);
        // Left at 0.6, right silent: the mono mix peaks at 0.3
        let peak = wave.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.3).abs() < 0.01, "peak {}", peak);
    }

    #[test]
    fn symphonia_loader_resamples_to_the_analysis_rate() {
        let path = write_stereo_wav("loader", 44_100, &left_only_tone(2.0));
        let wave = SymphoniaLoader.load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(wave.sample_rate, ANALYSIS_SAMPLE_RATE);
        assert_eq!(wave.samples.len(), 44_100);

        let map = analyze(&wave.samples, wave.sample_rate, 10).unwrap();
        assert_eq!(map.band_count(), 10);
        assert_eq!(map.frame_count(), 83);
        assert!(map.rows().flatten().all(|v| (0.0..=1.0).contains(v)));
    }
}
