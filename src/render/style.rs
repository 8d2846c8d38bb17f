use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::VisualizerConfig;
use crate::error::ConfigurationError;

/// Band counts above this are clamped; the filterbank gets no finer than FFT bins anyway.
pub const MAX_BANDS: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Per-channel linear interpolation, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl FromStr for Rgb {
    type Err = ConfigurationError;

    /// Accepts `#rrggbb` or the short `#rgb` form, leading `#` optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigurationError::InvalidColor(s.to_string());
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Rgb::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Rgb::new(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Two-stop vertical gradient: `start` at the bottom of a bar, `end` at its top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Gradient {
    pub start: Rgb,
    pub end: Rgb,
}

impl Gradient {
    /// Color at `t` of the way up the bar (0 = bottom, 1 = top).
    pub fn at(&self, t: f32) -> Rgb {
        self.start.lerp(self.end, t)
    }
}

/// Validated display settings for the bar equalizer.
///
/// Built once per configuration change. Numeric fields are clamped into
/// range on construction, so every instance is safe to render with.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualStyle {
    enabled: bool,
    band_count: usize,
    gradient: Gradient,
    intensity: f32,
    viewport_width: u32,
    viewport_height: u32,
}

impl VisualStyle {
    pub fn new(
        band_count: usize,
        start_color: Rgb,
        end_color: Rgb,
        intensity: f32,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Self {
        Self {
            enabled: true,
            band_count: clamp_band_count(band_count),
            gradient: Gradient {
                start: start_color,
                end: end_color,
            },
            intensity: clamp_intensity(intensity),
            viewport_width: clamp_dimension("width", viewport_width),
            viewport_height: clamp_dimension("height", viewport_height),
        }
    }

    /// Build from the `[visualizer]` table plus the current viewport size.
    pub fn from_config(
        config: &VisualizerConfig,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Result<Self, ConfigurationError> {
        let start: Rgb = config.color_start.parse()?;
        let end: Rgb = config.color_end.parse()?;
        let band_count = usize::try_from(config.num_bars.max(0)).unwrap_or(0);
        Ok(Self::new(band_count, start, end, config.intensity, viewport_width, viewport_height)
            .with_enabled(config.enabled))
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_band_count(mut self, band_count: usize) -> Self {
        self.band_count = clamp_band_count(band_count);
        self
    }

    pub fn with_colors(mut self, start: Rgb, end: Rgb) -> Self {
        self.gradient = Gradient { start, end };
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = clamp_intensity(intensity);
        self
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = clamp_dimension("width", width);
        self.viewport_height = clamp_dimension("height", height);
        self
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn gradient(&self) -> Gradient {
        self.gradient
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }
}

fn clamp_band_count(band_count: usize) -> usize {
    if band_count == 0 {
        log::warn!("Band count must be at least 1, using 1");
        return 1;
    }
    if band_count > MAX_BANDS {
        log::warn!("Band count {} too large, using {}", band_count, MAX_BANDS);
        return MAX_BANDS;
    }
    band_count
}

fn clamp_intensity(intensity: f32) -> f32 {
    if intensity.is_finite() && intensity > 0.0 {
        return intensity;
    }
    log::warn!(
        "Intensity must be positive, got {}; using {}",
        intensity,
        super::bars::REFERENCE_INTENSITY
    );
    super::bars::REFERENCE_INTENSITY
}

fn clamp_dimension(name: &str, value: u32) -> u32 {
    if value == 0 {
        log::warn!("Viewport {} must be positive, using 1", name);
        return 1;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!("#FF0000".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 0));
        assert_eq!("0000ff".parse::<Rgb>().unwrap(), Rgb::new(0, 0, 255));
        assert_eq!("#fff".parse::<Rgb>().unwrap(), Rgb::WHITE);
        assert_eq!(" #d09dd2 ".parse::<Rgb>().unwrap(), Rgb::new(0xd0, 0x9d, 0xd2));
    }

    #[test]
    fn rejects_malformed_colors() {
        for bad in ["", "#ff00", "#gg0000", "red", "#ff00001", "#+1+1+1"] {
            assert_eq!(
                bad.parse::<Rgb>(),
                Err(ConfigurationError::InvalidColor(bad.to_string())),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        let c = Rgb::new(0x61, 0x35, 0x83);
        assert_eq!(c.to_string(), "#613583");
        assert_eq!(c.to_string().parse::<Rgb>().unwrap(), c);
    }

    #[test]
    fn gradient_endpoints_and_midpoint() {
        let g = Gradient {
            start: Rgb::new(200, 0, 100),
            end: Rgb::new(100, 50, 0),
        };
        assert_eq!(g.at(0.0), g.start);
        assert_eq!(g.at(1.0), g.end);
        assert_eq!(g.at(0.5), Rgb::new(150, 25, 50));
        assert_eq!(g.at(-3.0), g.start);
        assert_eq!(g.at(7.0), g.end);
    }

    #[test]
    fn out_of_range_numbers_are_clamped() {
        let style = VisualStyle::new(0, Rgb::WHITE, Rgb::BLACK, -2.0, 0, 0);
        assert_eq!(style.band_count(), 1);
        assert_eq!(style.intensity(), 5.0);
        assert_eq!(style.viewport_width(), 1);
        assert_eq!(style.viewport_height(), 1);

        let style = style.with_band_count(100_000).with_intensity(f32::NAN);
        assert_eq!(style.band_count(), MAX_BANDS);
        assert_eq!(style.intensity(), 5.0);
    }

    #[test]
    fn from_config_parses_colors_and_negative_bars() {
        let config = VisualizerConfig {
            enabled: false,
            num_bars: -4,
            color_start: "#FF0000".into(),
            color_end: "#0000FF".into(),
            intensity: 1.0,
        };
        let style = VisualStyle::from_config(&config, 400, 100).unwrap();
        assert!(!style.enabled());
        assert_eq!(style.band_count(), 1);
        assert_eq!(style.gradient().start, Rgb::new(255, 0, 0));
        assert_eq!(style.gradient().end, Rgb::new(0, 0, 255));

        let broken = VisualizerConfig {
            color_end: "blue".into(),
            ..config
        };
        assert!(VisualStyle::from_config(&broken, 400, 100).is_err());
    }
}
