pub mod analysis;
pub mod decode;
pub mod energy;
pub mod mel;
pub mod resample;

/// Every track is resampled to this rate before analysis.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;
