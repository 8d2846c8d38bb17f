use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VisualizerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_num_bars")]
    pub num_bars: i64,
    #[serde(default = "default_color")]
    pub color_start: String,
    #[serde(default = "default_color")]
    pub color_end: String,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u32,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
    #[serde(default = "default_crf")]
    pub crf: u32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            num_bars: default_num_bars(),
            color_start: default_color(),
            color_end: default_color(),
            intensity: default_intensity(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            tick_ms: default_tick_ms(),
            background: default_background(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
            crf: default_crf(),
        }
    }
}

fn default_enabled() -> bool { true }
fn default_num_bars() -> i64 { 60 }
fn default_color() -> String { "#ffffff".into() }
fn default_intensity() -> f32 { 5.0 }
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 120 }
fn default_tick_ms() -> u32 { 50 }
fn default_background() -> String { "#000000".into() }
fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }
fn default_crf() -> u32 { 18 }

/// Explicit path, then `./melbars.toml`, then the per-user config locations.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("melbars.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("melbars").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("melbars").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str(content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("Invalid config: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert!(cfg.visualizer.enabled);
        assert_eq!(cfg.visualizer.num_bars, 60);
        assert_eq!(cfg.visualizer.intensity, 5.0);
        assert_eq!(cfg.output.tick_ms, 50);
        assert_eq!(cfg.output.codec, "libx264");
    }

    #[test]
    fn partial_tables_fill_in_missing_fields() {
        let cfg = parse_config(
            r##"
            [visualizer]
            num_bars = 20
            color_start = "#FF0000"
            color_end = "#0000FF"
            intensity = 1.0

            [output]
            width = 1280
            "##,
        )
        .unwrap();
        assert_eq!(cfg.visualizer.num_bars, 20);
        assert_eq!(cfg.visualizer.color_start, "#FF0000");
        assert!(cfg.visualizer.enabled);
        assert_eq!(cfg.output.width, 1280);
        assert_eq!(cfg.output.height, 120);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(parse_config("[visualizer]\nnum_bars = \"many\"").is_none());
    }

    #[test]
    fn explicit_path_wins() {
        let p = Path::new("/tmp/somewhere.toml");
        assert_eq!(find_config_path(Some(p)), Some(p.to_path_buf()));
    }
}
