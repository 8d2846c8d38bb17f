//! Audio-reactive bar equalizer core.
//!
//! [`audio`] turns a track into a normalized mel-band [`EnergyMap`];
//! [`render`] maps a playback position into that map and produces per-bar
//! draw instructions; [`session`] ties the two together with background
//! analysis and last-submitted-track-wins publication.

pub mod audio;
pub mod config;
pub mod error;
pub mod render;
pub mod session;

pub use audio::decode::{SymphoniaLoader, TrackLoader, Waveform};
pub use audio::energy::EnergyMap;
pub use error::{AnalysisError, ConfigurationError, DecodeError, VisualizerError};
pub use render::frame::{Bar, RenderFrame};
pub use render::style::{Gradient, Rgb, VisualStyle};
pub use session::{AnalysisHandle, AnalysisOutcome, SessionStatus, VisualizerSession};
