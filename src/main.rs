mod cli;
mod encode;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;

use cli::Cli;
use encode::ffmpeg::{EncoderSettings, FfmpegEncoder};
use melbars::config::{self, VisualizerConfig};
use melbars::render::raster::Rasterizer;
use melbars::{AnalysisOutcome, RenderFrame, Rgb, SymphoniaLoader, VisualStyle, VisualizerSession};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();
    let mut enabled = true;

    // Config values apply only where the CLI flag is left at its default
    if let Some(path) = config::find_config_path(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            let (viz, out) = (cfg.visualizer, cfg.output);
            enabled = viz.enabled;
            if cli.bands == 60 { cli.bands = viz.num_bars; }
            if cli.color_start == "#ffffff" { cli.color_start = viz.color_start; }
            if cli.color_end == "#ffffff" { cli.color_end = viz.color_end; }
            if cli.intensity == 5.0 { cli.intensity = viz.intensity; }
            if cli.width == 800 { cli.width = out.width; }
            if cli.height == 120 { cli.height = out.height; }
            if cli.tick_ms == 50 { cli.tick_ms = out.tick_ms; }
            if cli.background == "#000000" { cli.background = out.background; }
            if cli.crf == 18 { cli.crf = out.crf; }
            if cli.codec == "libx264" { cli.codec = out.codec; }
            if cli.pix_fmt == "yuv420p" { cli.pix_fmt = out.pix_fmt; }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let viz = VisualizerConfig {
        enabled,
        num_bars: cli.bands,
        color_start: cli.color_start.clone(),
        color_end: cli.color_end.clone(),
        intensity: cli.intensity,
    };
    let style = VisualStyle::from_config(&viz, cli.width, cli.height).context("Invalid bar colors")?;
    let background: Rgb = cli.background.parse().context("Invalid background color")?;
    let tick_ms = cli.tick_ms.max(1);

    log::info!("melbars - mel-band equalizer visualizer");
    log::info!("Input: {}", cli.input.display());
    log::info!(
        "Bars: {} @ {}x{}, intensity {:.1}, tick {}ms",
        style.band_count(),
        style.viewport_width(),
        style.viewport_height(),
        style.intensity(),
        tick_ms
    );

    // 1. Analyze on the session's worker while the spinner keeps ticking
    let mut session = VisualizerSession::new(Arc::new(SymphoniaLoader), style.clone());
    let handle = session.load_track(cli.input.clone());

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Analyzing audio...");
    let outcome = loop {
        if let Some(outcome) = handle.try_outcome() {
            break outcome;
        }
        spinner.tick();
        std::thread::sleep(Duration::from_millis(tick_ms as u64));
    };
    spinner.finish_and_clear();
    log::debug!("Session status after analysis: {:?}", session.status());

    let map = match outcome {
        AnalysisOutcome::Ready(map) => map,
        AnalysisOutcome::Failed(e) => {
            return Err(e).with_context(|| format!("Nothing to render for {}", cli.input.display()));
        }
        AnalysisOutcome::Superseded => {
            log::info!("Visualizer disabled, nothing to render");
            return Ok(());
        }
    };

    if cli.output.is_none() && cli.dump.is_none() {
        log::info!(
            "Analysis only: {} bands x {} frames. Pass --output or --dump to render.",
            map.band_count(),
            map.frame_count()
        );
        return Ok(());
    }

    // 2. Optional sinks
    let mut dump = match cli.dump {
        Some(ref path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => None,
    };

    let mut encoder = match cli.output {
        Some(ref path) => {
            log::info!("Starting FFmpeg encoder...");
            let settings = EncoderSettings {
                width: style.viewport_width(),
                height: style.viewport_height(),
                tick_ms,
                codec: &cli.codec,
                pix_fmt: &cli.pix_fmt,
                crf: cli.crf,
            };
            Some(FfmpegEncoder::new(path, &cli.input, &settings)?)
        }
        None => None,
    };
    let mut rasterizer = Rasterizer::new(style.viewport_width(), style.viewport_height(), background);

    // 3. Simulated playback clock: one tick per period until the end of the track
    let total_ticks = map.duration_ms() / tick_ms as u64 + 1;
    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let mut frame = RenderFrame::with_capacity(style.band_count());
    for tick in 0..total_ticks {
        let position_ms = (tick * tick_ms as u64) as i64;
        session.tick_into(&mut frame, position_ms);

        if let Some(ref mut out) = dump {
            serde_json::to_writer(&mut *out, &frame).context("Failed to serialize render frame")?;
            out.write_all(b"\n").context("Failed to write frame dump")?;
        }
        if let Some(ref mut enc) = encoder {
            enc.write_frame(rasterizer.draw(&frame))?;
        }
        pb.set_position(tick + 1);
    }

    pb.finish_with_message("Rendering complete");

    if let Some(mut out) = dump {
        out.flush().context("Failed to flush frame dump")?;
    }
    if let Some(enc) = encoder {
        log::info!("Finishing encoding...");
        enc.finish()?;
    }

    log::info!("Done! Rendered {} ticks", total_ticks);
    Ok(())
}
