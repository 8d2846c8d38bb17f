use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a file on disk into an analysis waveform.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open audio file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to probe audio format: {0}")]
    Probe(#[source] symphonia::core::errors::Error),
    #[error("no audio tracks found")]
    NoTrack,
    #[error("unknown sample rate")]
    UnknownSampleRate,
    #[error("audio codec error: {0}")]
    Codec(#[source] symphonia::core::errors::Error),
    #[error("resampling failed: {0}")]
    Resample(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("track too short: {samples} samples, need at least {window}")]
    TrackTooShort { samples: usize, window: usize },
    #[error("waveform or spectrum contains non-finite values")]
    NonFinite,
    #[error("sample rate must be non-zero")]
    InvalidSampleRate,
    #[error("analysis cancelled by a newer submission")]
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
}

/// Everything that can go wrong between selecting a track and publishing its map.
#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("analysis worker exited without reporting a result")]
    WorkerLost,
}
