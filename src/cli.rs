use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "melbars", about = "Mel-band equalizer visualizer for audio tracks")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Render a preview video of the bars (muxed with the input audio)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write every tick's render frame as JSON lines
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Config file (defaults to ./melbars.toml or ~/.config/melbars/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of bars / mel bands
    #[arg(long, default_value_t = 60)]
    pub bands: i64,

    /// Bar color at the bottom (#rrggbb)
    #[arg(long, default_value = "#ffffff")]
    pub color_start: String,

    /// Bar color at the top (#rrggbb)
    #[arg(long, default_value = "#ffffff")]
    pub color_end: String,

    /// Bar intensity (5.0 = full height at peak level)
    #[arg(long, default_value_t = 5.0)]
    pub intensity: f32,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 120)]
    pub height: u32,

    /// Display tick period in milliseconds
    #[arg(long, default_value_t = 50)]
    pub tick_ms: u32,

    /// Background color (#rrggbb)
    #[arg(long, default_value = "#000000")]
    pub background: String,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,
}
