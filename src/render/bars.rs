use super::frame::{Bar, RenderFrame};
use super::style::VisualStyle;
use crate::audio::energy::EnergyMap;

/// Intensity at which an amplitude of 1.0 fills the whole viewport height.
pub const REFERENCE_INTENSITY: f32 = 5.0;
/// Silent bands still show as a sliver this tall.
pub const MIN_BAR_HEIGHT: f32 = 2.0;
/// Horizontal gap on each side of a bar.
pub const BAR_GAP: f32 = 1.0;
pub const CORNER_RADIUS: f32 = 5.0;

/// Compute one tick's bars.
///
/// Pure function of its inputs; see [`render_into`] for the allocation-free form.
pub fn render(map: Option<&EnergyMap>, frame_index: usize, style: &VisualStyle) -> RenderFrame {
    let mut frame = RenderFrame::with_capacity(style.band_count());
    render_into(&mut frame, map, frame_index, style);
    frame
}

/// Refill `frame` in place. Once `frame` has grown to the band count, ticks
/// stop allocating.
pub fn render_into(frame: &mut RenderFrame, map: Option<&EnergyMap>, frame_index: usize, style: &VisualStyle) {
    let width = style.viewport_width() as f32;
    let height = style.viewport_height() as f32;
    let bar_width = width / style.band_count() as f32;
    let scale = height * (style.intensity() / REFERENCE_INTENSITY);

    frame.frame_index = frame_index;
    frame.bar_width = bar_width;
    frame.viewport_width = style.viewport_width();
    frame.viewport_height = style.viewport_height();
    frame.bars.clear();

    if !style.enabled() {
        return;
    }

    // A stale map may have fewer bands than the style asks for
    let bands = match map {
        Some(map) => style.band_count().min(map.band_count()),
        None => style.band_count(),
    };
    let drawn_width = (bar_width - 2.0 * BAR_GAP).max(1.0);
    let gradient = style.gradient();

    for band in 0..bands {
        let amplitude = map
            .and_then(|m| m.get(band, frame_index))
            .unwrap_or(0.0);
        let bar_height = (amplitude * scale).max(MIN_BAR_HEIGHT);

        frame.bars.push(Bar {
            band,
            amplitude,
            height: bar_height,
            x: band as f32 * bar_width + BAR_GAP,
            y: height - bar_height,
            width: drawn_width,
            corner_radius: CORNER_RADIUS,
            gradient,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::style::Rgb;

    fn style(bands: usize) -> VisualStyle {
        VisualStyle::new(bands, Rgb::new(255, 0, 0), Rgb::new(0, 0, 255), REFERENCE_INTENSITY, 600, 100)
    }

    fn map(bands: usize, frames: usize, value: f32) -> EnergyMap {
        EnergyMap::from_band_major(bands, frames, 22_050, 512, vec![value; bands * frames])
    }

    #[test]
    fn absent_map_draws_minimum_slivers_for_every_band_count() {
        for bands in 1..=128 {
            let s = style(bands);
            let frame = render(None, 17, &s);
            assert_eq!(frame.bars.len(), bands);
            for bar in &frame.bars {
                assert_eq!(bar.height, MIN_BAR_HEIGHT);
                assert_eq!(bar.amplitude, 0.0);
                assert_eq!(bar.color_at(0.0), Rgb::new(255, 0, 0));
                assert_eq!(bar.color_at(1.0), Rgb::new(0, 0, 255));
            }
        }
    }

    #[test]
    fn full_amplitude_at_reference_intensity_fills_viewport() {
        let m = map(4, 10, 1.0);
        let frame = render(Some(&m), 3, &style(4));
        assert!(frame.bars.iter().all(|b| b.height == 100.0 && b.y == 0.0));
    }

    #[test]
    fn intensity_scales_linearly() {
        let m = map(4, 10, 0.5);
        let half = style(4).with_intensity(REFERENCE_INTENSITY / 2.0);
        let frame = render(Some(&m), 0, &half);
        assert!(frame.bars.iter().all(|b| (b.height - 25.0).abs() < 1e-4));
    }

    #[test]
    fn frame_past_the_end_is_silent() {
        let m = map(4, 10, 1.0);
        let frame = render(Some(&m), 10, &style(4));
        assert!(frame.heights().all(|h| h == MIN_BAR_HEIGHT));
    }

    #[test]
    fn band_iteration_clamps_to_smaller_side() {
        let m = map(3, 10, 1.0);
        let frame = render(Some(&m), 0, &style(8));
        assert_eq!(frame.bars.len(), 3);
        assert_eq!(frame.bar_width, 600.0 / 8.0);

        let m = map(12, 10, 1.0);
        assert_eq!(render(Some(&m), 0, &style(5)).bars.len(), 5);
    }

    #[test]
    fn rendering_is_idempotent() {
        let values: Vec<f32> = (0..40).map(|i| i as f32 / 40.0).collect();
        let m = EnergyMap::from_band_major(4, 10, 22_050, 512, values);
        let s = style(4);
        assert_eq!(render(Some(&m), 6, &s), render(Some(&m), 6, &s));
    }

    #[test]
    fn doubling_width_doubles_bars_and_nothing_else() {
        let values: Vec<f32> = (0..40).map(|i| i as f32 / 40.0).collect();
        let m = EnergyMap::from_band_major(4, 10, 22_050, 512, values);
        let narrow = render(Some(&m), 2, &style(4));
        let wide = render(Some(&m), 2, &style(4).with_viewport(1200, 100));

        assert_eq!(wide.bar_width, narrow.bar_width * 2.0);
        for (n, w) in narrow.bars.iter().zip(&wide.bars) {
            assert_eq!(n.height, w.height);
            assert_eq!(n.gradient, w.gradient);
        }
    }

    #[test]
    fn bar_geometry_leaves_gaps() {
        let frame = render(None, 0, &style(6));
        let bar = &frame.bars[2];
        assert_eq!(bar.x, 2.0 * 100.0 + BAR_GAP);
        assert_eq!(bar.width, 100.0 - 2.0 * BAR_GAP);
        assert_eq!(bar.y, 100.0 - MIN_BAR_HEIGHT);
    }

    #[test]
    fn disabled_style_renders_nothing() {
        let frame = render(None, 0, &style(6).with_enabled(false));
        assert!(frame.is_empty());
    }

    #[test]
    fn render_into_reuses_the_allocation() {
        let s = style(32);
        let mut frame = RenderFrame::default();
        render_into(&mut frame, None, 0, &s);
        let capacity = frame.bars.capacity();
        let ptr = frame.bars.as_ptr();
        render_into(&mut frame, None, 1, &s);
        assert_eq!(frame.bars.capacity(), capacity);
        assert_eq!(frame.bars.as_ptr(), ptr);
    }
}
