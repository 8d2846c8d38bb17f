//! Per-track visualizer session.
//!
//! Owns the current style and the published energy map. Analysis runs on a
//! worker thread; the caller gets an [`AnalysisHandle`] to wait on or poll.
//!
//! A shared generation counter identifies the most recent submission. Workers
//! check it between frames (cancellation) and again under the publication
//! lock, so a stale analysis can never replace the map of a newer track.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, PoisonError, RwLock};

use crate::audio::analysis::{analyze_cancellable, CancelToken};
use crate::audio::decode::TrackLoader;
use crate::audio::energy::EnergyMap;
use crate::error::{AnalysisError, VisualizerError};
use crate::render::bars::render_into;
use crate::render::frame::RenderFrame;
use crate::render::style::VisualStyle;
use crate::render::timing::frame_index;

/// How a submitted analysis ended.
#[derive(Debug)]
pub enum AnalysisOutcome {
    Ready(Arc<EnergyMap>),
    Failed(VisualizerError),
    /// A newer track was submitted before this one finished.
    Superseded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Analyzing,
    Ready,
    Failed,
    Disabled,
}

/// Completion side of one submitted analysis.
pub struct AnalysisHandle {
    generation: u64,
    rx: Receiver<AnalysisOutcome>,
}

impl AnalysisHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Block until the worker reports.
    pub fn wait(self) -> AnalysisOutcome {
        self.rx
            .recv()
            .unwrap_or(AnalysisOutcome::Failed(VisualizerError::WorkerLost))
    }

    /// Non-blocking check, for hosts that poll from their UI tick.
    pub fn try_outcome(&self) -> Option<AnalysisOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(AnalysisOutcome::Failed(VisualizerError::WorkerLost)),
        }
    }
}

#[derive(Debug)]
struct Published {
    generation: u64,
    status: SessionStatus,
    map: Option<Arc<EnergyMap>>,
}

pub struct VisualizerSession {
    loader: Arc<dyn TrackLoader>,
    style: VisualStyle,
    track: Option<PathBuf>,
    generation: Arc<AtomicU64>,
    published: Arc<RwLock<Published>>,
}

impl VisualizerSession {
    pub fn new(loader: Arc<dyn TrackLoader>, style: VisualStyle) -> Self {
        let status = if style.enabled() {
            SessionStatus::Idle
        } else {
            SessionStatus::Disabled
        };
        Self {
            loader,
            style,
            track: None,
            generation: Arc::new(AtomicU64::new(0)),
            published: Arc::new(RwLock::new(Published {
                generation: 0,
                status,
                map: None,
            })),
        }
    }

    pub fn style(&self) -> &VisualStyle {
        &self.style
    }

    pub fn track(&self) -> Option<&Path> {
        self.track.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.published.read().unwrap_or_else(PoisonError::into_inner).status
    }

    /// The map currently shown, if analysis of the active track has finished.
    pub fn energy_map(&self) -> Option<Arc<EnergyMap>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .clone()
    }

    /// Select a new track. Any in-flight analysis is cancelled and the
    /// display drops to idle bars until the new map is published.
    pub fn load_track(&mut self, path: impl Into<PathBuf>) -> AnalysisHandle {
        let path = path.into();
        self.track = Some(path.clone());
        self.submit(path)
    }

    /// Apply a new style. Re-analyzes the current track only when the band
    /// count changed (or the visualizer was just enabled); colors, intensity
    /// and viewport take effect on the next tick.
    pub fn set_style(&mut self, style: VisualStyle) -> Option<AnalysisHandle> {
        let needs_analysis = style.band_count() != self.style.band_count()
            || (style.enabled() && !self.style.enabled());
        let disabling = !style.enabled() && self.style.enabled();
        let enabling = style.enabled() && !self.style.enabled();
        self.style = style;

        if disabling {
            self.reset(SessionStatus::Disabled);
            return None;
        }
        match (&self.track, needs_analysis) {
            (Some(track), true) => {
                log::info!("Band count changed to {}, re-analyzing", self.style.band_count());
                let track = track.clone();
                Some(self.submit(track))
            }
            (None, _) if enabling => {
                self.reset(SessionStatus::Idle);
                None
            }
            _ => None,
        }
    }

    /// Render the bars for the given playback position. Never blocks on
    /// analysis and never fails: with no map the bars are flat.
    pub fn tick(&self, position_ms: i64) -> RenderFrame {
        let mut frame = RenderFrame::with_capacity(self.style.band_count());
        self.tick_into(&mut frame, position_ms);
        frame
    }

    pub fn tick_into(&self, frame: &mut RenderFrame, position_ms: i64) {
        let map = self.energy_map();
        let index = map.as_deref().map_or(0, |m| {
            frame_index(position_ms, m.sample_rate(), m.hop_length(), m.frame_count())
        });
        render_into(frame, map.as_deref(), index, &self.style);
    }

    /// Bump the generation and clear the published map in one step.
    fn reset(&self, status: SessionStatus) -> u64 {
        let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        published.generation = generation;
        published.status = status;
        published.map = None;
        generation
    }

    fn submit(&self, path: PathBuf) -> AnalysisHandle {
        let (tx, rx) = mpsc::channel();

        if !self.style.enabled() {
            let generation = self.reset(SessionStatus::Disabled);
            log::debug!("Visualizer disabled, not analyzing {}", path.display());
            let _ = tx.send(AnalysisOutcome::Superseded);
            return AnalysisHandle { generation, rx };
        }

        let generation = self.reset(SessionStatus::Analyzing);
        let token = CancelToken::new(self.generation.clone(), generation);
        let loader = self.loader.clone();
        let published = self.published.clone();
        let band_count = self.style.band_count();

        let spawned = std::thread::Builder::new()
            .name(format!("melbars-analysis-{}", generation))
            .spawn(move || {
                let outcome = run_analysis(loader.as_ref(), &path, band_count, &token, &published);
                // The caller may have dropped the handle; that's fine
                let _ = tx.send(outcome);
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn analysis worker: {}", e);
            let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
            if published.generation == generation {
                published.status = SessionStatus::Failed;
            }
        }

        AnalysisHandle { generation, rx }
    }
}

impl Drop for VisualizerSession {
    fn drop(&mut self) {
        // Stops any worker at its next frame
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

fn run_analysis(
    loader: &dyn TrackLoader,
    path: &Path,
    band_count: usize,
    token: &CancelToken,
    published: &RwLock<Published>,
) -> AnalysisOutcome {
    log::info!("Analyzing {} ({} bands)", path.display(), band_count);

    let result = loader
        .load(path)
        .map_err(VisualizerError::from)
        .and_then(|wave| {
            if token.is_cancelled() {
                return Err(AnalysisError::Cancelled.into());
            }
            analyze_cancellable(&wave.samples, wave.sample_rate, band_count, token)
                .map_err(VisualizerError::from)
        });

    let mut slot = published.write().unwrap_or_else(PoisonError::into_inner);
    if slot.generation != token.generation() {
        log::debug!("Discarding stale analysis of {}", path.display());
        return AnalysisOutcome::Superseded;
    }

    match result {
        Ok(map) => {
            let map = Arc::new(map);
            slot.map = Some(map.clone());
            slot.status = SessionStatus::Ready;
            log::info!(
                "Energy map ready: {} bands x {} frames ({:.1}s)",
                map.band_count(),
                map.frame_count(),
                map.duration_ms() as f32 / 1000.0
            );
            AnalysisOutcome::Ready(map)
        }
        Err(VisualizerError::Analysis(AnalysisError::Cancelled)) => AnalysisOutcome::Superseded,
        Err(e) => {
            log::warn!("Visualizer idle for {}: {}", path.display(), e);
            slot.map = None;
            slot.status = SessionStatus::Failed;
            AnalysisOutcome::Failed(e)
        }
    }
}
