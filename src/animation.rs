// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Animations: a run of frames interpolated between two parameter
//! bundles, rendered in parallel (one frame per job) and handed to a
//! sink, by default a looping GIF.
//!
//! A request moves through `Init → Allocating → Dispatching →
//! Awaiting → Encoding → Done`, or ends early in `Cancelled` or
//! `Failed`.  Progress counts five phase steps plus one step per
//! finished frame.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};

use crate::config::{DEFAULT_ANIMATION_PATH, FRAME_DELAY_MS};
use crate::databox::DataBox;
use crate::error::{FractalError, Result};
use crate::fractal::{Evaluator, FractalVariant};
use crate::palette::ColorPalette;
use crate::render::{elapsed_ms, GridRenderer};
use crate::surface::PixelSurface;
use crate::task::{CancelToken, NoopObserver, Progress, RenderObserver, RenderOutcome};
use crate::workers::{default_threads, dispatch};

// allocate, pool-create, dispatch, all-frames-done, encode-done
const PHASE_STEPS: usize = 5;

/// What to animate.
#[derive(Clone, Debug)]
pub struct AnimationRequest {
    variant: FractalVariant,
    frame_count: u32,
    start: DataBox,
    end: DataBox,
    palette: ColorPalette,
}

impl AnimationRequest {
    /// Look up the variant and check the frame count.  At least two
    /// frames are needed to have a start and an end.
    pub fn new(
        name: &str,
        frame_count: u32,
        start: DataBox,
        end: DataBox,
        palette: &ColorPalette,
    ) -> Result<Self> {
        let variant = name.parse()?;
        if frame_count < 2 {
            return Err(FractalError::InvalidFrameCount(frame_count));
        }
        Ok(AnimationRequest {
            variant,
            frame_count,
            start,
            end,
            palette: palette.clone(),
        })
    }

    /// Number of frames.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// The variant every frame is rendered with.
    pub fn variant(&self) -> FractalVariant {
        self.variant
    }

    /// Parameters of frame `k`, `k / (frames - 1)` of the way from the
    /// start bundle to the end bundle.
    pub fn frame(&self, k: u32) -> Result<DataBox> {
        let f = f64::from(k) / f64::from(self.frame_count - 1);
        self.start.interpolate(&self.end, f)
    }
}

/// Where an animation is in its life.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnimationPhase {
    /// Accepted, not started.
    Init,
    /// Allocating one buffer per frame.
    Allocating,
    /// Building the per-frame renders.
    Dispatching,
    /// Waiting for the frames to finish.
    Awaiting,
    /// Handing the frames to the sink.
    Encoding,
    /// The sink accepted every frame.
    Done,
    /// Stopped early on request.
    Cancelled,
    /// Stopped by an error, including a sink failure.
    Failed,
}

const PHASES: [AnimationPhase; 8] = [
    AnimationPhase::Init,
    AnimationPhase::Allocating,
    AnimationPhase::Dispatching,
    AnimationPhase::Awaiting,
    AnimationPhase::Encoding,
    AnimationPhase::Done,
    AnimationPhase::Cancelled,
    AnimationPhase::Failed,
];

#[derive(Debug)]
struct PhaseCell(AtomicU8);

impl PhaseCell {
    fn get(&self) -> AnimationPhase {
        PHASES[usize::from(self.0.load(Ordering::Acquire)).min(PHASES.len() - 1)]
    }

    fn set(&self, phase: AnimationPhase) {
        let raw = PHASES.iter().position(|&p| p == phase).unwrap_or(PHASES.len() - 1);
        self.0.store(raw as u8, Ordering::Release);
    }
}

/// How an animation ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnimationOutcome {
    /// Every frame was rendered and written.
    Completed {
        /// Wall time of the whole request.
        elapsed_ms: u64,
    },
    /// At least one frame was cancelled; nothing was written.
    Cancelled {
        /// Wall time until the frames stopped.
        elapsed_ms: u64,
    },
    /// Every frame was rendered but the sink failed.  The frames are
    /// still readable from the handle.
    EncodingFailed {
        /// Wall time of the whole request.
        elapsed_ms: u64,
        /// The sink's error.
        reason: String,
    },
}

/// Consumes the finished frames.
pub trait AnimationSink: Send {
    /// Write `frames` in order, each shown for `delay_ms`.
    fn write_frames(&mut self, frames: Vec<RgbaImage>, delay_ms: u32) -> Result<()>;
}

/// Writes a GIF that loops forever.
#[derive(Clone, Debug)]
pub struct GifFileSink {
    path: PathBuf,
}

impl GifFileSink {
    /// A sink writing to `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        GifFileSink {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Where the GIF goes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for GifFileSink {
    fn default() -> Self {
        GifFileSink::new(DEFAULT_ANIMATION_PATH)
    }
}

impl AnimationSink for GifFileSink {
    fn write_frames(&mut self, frames: Vec<RgbaImage>, delay_ms: u32) -> Result<()> {
        // The file is only touched once the whole stream has encoded.
        let mut encoded = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut encoded);
            encoder.set_repeat(Repeat::Infinite)?;
            let delay = Delay::from_numer_denom_ms(delay_ms, 1);
            encoder.encode_frames(
                frames
                    .into_iter()
                    .map(|buffer| Frame::from_parts(buffer, 0, 0, delay)),
            )?;
        }
        fs::write(&self.path, &encoded)?;
        log::info!("wrote {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug)]
struct AnimationState {
    token: CancelToken,
    frame_tokens: OnceLock<Vec<CancelToken>>,
    frames: OnceLock<Vec<Arc<PixelSurface>>>,
    progress: Progress,
    phase: PhaseCell,
}

impl AnimationState {
    fn step(&self, observer: &dyn RenderObserver) {
        observer.on_progress(self.progress.advance());
    }

    fn cancel_frames(&self) {
        if let Some(tokens) = self.frame_tokens.get() {
            for token in tokens {
                token.cancel();
            }
        }
    }
}

/// Renders the frames of one request and feeds them to a sink.
pub struct AnimationEngine {
    request: AnimationRequest,
    sink: Box<dyn AnimationSink>,
    threads: usize,
}

impl AnimationEngine {
    /// An engine rendering one frame per core at a time.
    pub fn new(request: AnimationRequest, sink: Box<dyn AnimationSink>) -> Self {
        AnimationEngine {
            request,
            sink,
            threads: default_threads(),
        }
    }

    /// Render at most `threads` frames at a time.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    fn cancelled(&self, state: &AnimationState, started: Instant) -> AnimationOutcome {
        state.phase.set(AnimationPhase::Cancelled);
        log::info!("animation cancelled");
        AnimationOutcome::Cancelled {
            elapsed_ms: elapsed_ms(started),
        }
    }

    fn run(mut self, state: &AnimationState, observer: &dyn RenderObserver) -> Result<AnimationOutcome> {
        let started = Instant::now();
        let count = self.request.frame_count;

        state.phase.set(AnimationPhase::Allocating);
        let frames: Vec<Arc<PixelSurface>> = (0..count)
            .map(|_| Arc::new(self.request.start.surface()))
            .collect();
        state.frames.set(frames.clone()).ok();
        state.step(observer);
        if state.token.is_cancelled() {
            return Ok(self.cancelled(state, started));
        }

        let tokens: Vec<CancelToken> = (0..count).map(|_| state.token.child()).collect();
        state.frame_tokens.set(tokens.clone()).ok();
        state.step(observer);
        if state.token.is_cancelled() {
            return Ok(self.cancelled(state, started));
        }

        state.phase.set(AnimationPhase::Dispatching);
        let mut jobs = Vec::with_capacity(count as usize);
        for k in 0..count {
            let data = self.request.frame(k)?;
            let evaluator = Evaluator::new(self.request.variant, &data, &self.request.palette);
            jobs.push((data, evaluator));
        }
        log::debug!("dispatching {} frames of {}", count, self.request.variant);
        state.step(observer);
        if state.token.is_cancelled() {
            return Ok(self.cancelled(state, started));
        }

        state.phase.set(AnimationPhase::Awaiting);
        let finished = AtomicUsize::new(0);
        let first_error: Mutex<Option<FractalError>> = Mutex::new(None);
        dispatch(jobs.len(), self.threads, &state.token, |k| {
            let (data, evaluator) = &jobs[k];
            let rows = Progress::new(data.plane.pixel_height());
            let result = GridRenderer::new(evaluator).with_threads(1).run(
                &data.plane,
                &frames[k],
                &tokens[k],
                &rows,
                &NoopObserver,
            );
            match result {
                Ok(RenderOutcome::Completed { elapsed_ms }) => {
                    log::debug!("frame {} done in {} ms", k, elapsed_ms);
                    finished.fetch_add(1, Ordering::Relaxed);
                    state.step(observer);
                }
                Ok(RenderOutcome::Cancelled { .. }) => {}
                Err(e) => {
                    if let Ok(mut slot) = first_error.lock() {
                        slot.get_or_insert(e);
                    }
                }
            }
        })?;
        if let Some(e) = first_error.into_inner().ok().and_then(|slot| slot) {
            return Err(e);
        }
        if finished.load(Ordering::Relaxed) < jobs.len() {
            return Ok(self.cancelled(state, started));
        }
        state.step(observer);

        state.phase.set(AnimationPhase::Encoding);
        let images = frames.iter().map(|frame| frame.to_rgba_image()).collect();
        if let Err(e) = self.sink.write_frames(images, FRAME_DELAY_MS) {
            log::error!("could not write the animation: {}", e);
            state.phase.set(AnimationPhase::Failed);
            return Ok(AnimationOutcome::EncodingFailed {
                elapsed_ms: elapsed_ms(started),
                reason: e.to_string(),
            });
        }
        state.step(observer);

        state.phase.set(AnimationPhase::Done);
        let elapsed_ms = elapsed_ms(started);
        observer.on_complete(elapsed_ms);
        Ok(AnimationOutcome::Completed { elapsed_ms })
    }

    /// Start the request on its own thread.
    pub fn spawn(self, observer: Arc<dyn RenderObserver>) -> Result<AnimationHandle> {
        let state = Arc::new(AnimationState {
            token: CancelToken::new(),
            frame_tokens: OnceLock::new(),
            frames: OnceLock::new(),
            progress: Progress::new(self.request.frame_count as usize + PHASE_STEPS),
            phase: PhaseCell(AtomicU8::new(0)),
        });
        let thread = {
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name("fractal-animation".to_string())
                .spawn(move || {
                    let result = self.run(&state, observer.as_ref());
                    if let Err(ref e) = result {
                        log::error!("animation failed: {}", e);
                        state.phase.set(AnimationPhase::Failed);
                    }
                    result
                })?
        };
        Ok(AnimationHandle { state, thread })
    }
}

/// A running animation.
pub struct AnimationHandle {
    state: Arc<AnimationState>,
    thread: JoinHandle<Result<AnimationOutcome>>,
}

impl AnimationHandle {
    /// Stop the animation and every frame still rendering.
    /// Idempotent.
    pub fn cancel(&self) {
        self.state.token.cancel();
        self.state.cancel_frames();
    }

    /// Stop the frames still rendering.  The animation then ends
    /// `Cancelled` without writing anything.  Before the frames exist
    /// this does nothing.
    pub fn cancel_frame_threads(&self) {
        self.state.cancel_frames();
    }

    /// Fraction of the request finished, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.state.progress.fraction()
    }

    /// Current phase.
    pub fn phase(&self) -> AnimationPhase {
        self.state.phase.get()
    }

    /// The frame buffers, once allocated.
    pub fn frames(&self) -> Option<Vec<Arc<PixelSurface>>> {
        self.state.frames.get().cloned()
    }

    /// Block until the animation thread exits.
    pub fn wait(self) -> Result<AnimationOutcome> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => {
                self.state.phase.set(AnimationPhase::Failed);
                Err(FractalError::WorkerPanicked)
            }
        }
    }
}

/// Animate the variant registered as `name` from `start` to `end` in
/// `frame_count` frames, writing the result to `sink`.
pub fn animate(
    name: &str,
    frame_count: u32,
    start: DataBox,
    end: DataBox,
    palette: &ColorPalette,
    sink: Box<dyn AnimationSink>,
    observer: Arc<dyn RenderObserver>,
) -> Result<AnimationHandle> {
    let request = AnimationRequest::new(name, frame_count, start, end, palette)?;
    log::info!(
        "animating {} over {} frames",
        request.variant(),
        request.frame_count()
    );
    AnimationEngine::new(request, sink).spawn(observer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complex::Complex;
    use crate::palette::WHITE;
    use crate::planes::CartesianPlane;
    use image::Rgb;
    use std::fs::File;
    use std::io::Read;

    #[derive(Clone, Default)]
    struct RecordingSink {
        calls: Arc<Mutex<Vec<(usize, u32)>>>,
    }

    impl AnimationSink for RecordingSink {
        fn write_frames(&mut self, frames: Vec<RgbaImage>, delay_ms: u32) -> Result<()> {
            self.calls.lock().unwrap().push((frames.len(), delay_ms));
            Ok(())
        }
    }

    struct FailingSink;

    impl AnimationSink for FailingSink {
        fn write_frames(&mut self, _frames: Vec<RgbaImage>, _delay_ms: u32) -> Result<()> {
            Err(FractalError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    fn palette(length: usize) -> ColorPalette {
        ColorPalette::new(length, &[Rgb([0, 0, 0]), WHITE], &[0.0, 1.0], Rgb([9, 9, 9])).unwrap()
    }

    fn bundle(size: f64, iterations: u32, power: f64, ul: (f64, f64), dr: (f64, f64)) -> DataBox {
        DataBox::new(
            iterations,
            Complex::new(power, 0.0),
            Complex::new(0.285, 0.013),
            CartesianPlane::new(size, size, Complex::new(ul.0, ul.1), Complex::new(dr.0, dr.1))
                .unwrap(),
        )
    }

    fn small(power: f64) -> DataBox {
        bundle(12.0, 20, power, (-2.0, 2.0), (2.0, -2.0))
    }

    fn slow() -> DataBox {
        bundle(200.0, 50_000, 2.0, (-0.1, 0.1), (0.1, -0.1))
    }

    #[test]
    fn middle_frame_power_is_exact() {
        let request =
            AnimationRequest::new("Mandelbrot Simple", 3, small(2.0), small(4.0), &palette(20)).unwrap();
        assert_eq!(request.frame(1).unwrap().power, Complex::new(3.0, 0.0));
        assert_eq!(request.frame(0).unwrap().power, Complex::new(2.0, 0.0));
        assert_eq!(request.frame(2).unwrap().power, Complex::new(4.0, 0.0));
        assert_eq!(request.frame(1).unwrap().max_iterations, 20);
    }

    #[test]
    fn a_single_frame_is_rejected() {
        let result = AnimationRequest::new("Mandelbrot Simple", 1, small(2.0), small(4.0), &palette(20));
        match result {
            Err(FractalError::InvalidFrameCount(1)) => {}
            other => panic!("unexpected {:?}", other.map(|r| r.frame_count())),
        }
    }

    #[test]
    fn unknown_fractal_is_rejected() {
        let result = animate(
            "Koch",
            3,
            small(2.0),
            small(4.0),
            &palette(20),
            Box::new(RecordingSink::default()),
            Arc::new(NoopObserver),
        );
        assert!(result.is_err());
    }

    #[test]
    fn finished_frames_reach_the_sink_in_order() {
        let sink = RecordingSink::default();
        let calls = Arc::clone(&sink.calls);
        let handle = animate(
            "Mandelbrot Simple",
            4,
            small(2.0),
            small(3.0),
            &palette(20),
            Box::new(sink),
            Arc::new(NoopObserver),
        )
        .unwrap();
        let state = Arc::clone(&handle.state);
        let outcome = handle.wait().unwrap();
        assert!(matches!(outcome, AnimationOutcome::Completed { .. }));
        assert_eq!(*calls.lock().unwrap(), vec![(4, FRAME_DELAY_MS)]);
        assert_eq!(state.phase.get(), AnimationPhase::Done);
        assert_eq!(state.progress.done(), 4 + PHASE_STEPS);
        assert_eq!(state.progress.fraction(), 1.0);
    }

    #[test]
    fn first_frame_matches_a_plain_render() {
        let start = small(2.0);
        let handle = AnimationEngine::new(
            AnimationRequest::new("Julia Simple", 2, start.clone(), small(3.0), &palette(20)).unwrap(),
            Box::new(RecordingSink::default()),
        )
        .with_threads(2)
        .spawn(Arc::new(NoopObserver))
        .unwrap();
        let state = Arc::clone(&handle.state);
        handle.wait().unwrap();
        let frames = state.frames.get().unwrap();
        let evaluator = Evaluator::new("Julia Simple".parse().unwrap(), &start, &palette(20));
        for y in 0..12 {
            for x in 0..12 {
                let expected = evaluator.evaluate(start.plane.to_complex(x as f64, y as f64));
                assert_eq!(frames[0].get(x, y), Some(expected));
            }
        }
    }

    #[test]
    fn cancelled_animation_never_reaches_the_sink() {
        let sink = RecordingSink::default();
        let calls = Arc::clone(&sink.calls);
        let handle = animate(
            "Mandelbrot Simple",
            3,
            slow(),
            slow(),
            &palette(50_000),
            Box::new(sink),
            Arc::new(NoopObserver),
        )
        .unwrap();
        handle.cancel();
        handle.cancel();
        assert!(handle.progress() <= 1.0);
        let state = Arc::clone(&handle.state);
        let outcome = handle.wait().unwrap();
        assert!(matches!(outcome, AnimationOutcome::Cancelled { .. }));
        assert_eq!(state.phase.get(), AnimationPhase::Cancelled);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn cancelling_frame_threads_ends_the_animation() {
        let sink = RecordingSink::default();
        let calls = Arc::clone(&sink.calls);
        let handle = animate(
            "Mandelbrot Simple",
            2,
            slow(),
            slow(),
            &palette(50_000),
            Box::new(sink),
            Arc::new(NoopObserver),
        )
        .unwrap();
        while handle.phase() != AnimationPhase::Awaiting {
            assert!(handle.phase() != AnimationPhase::Failed);
            thread::yield_now();
        }
        let frames = handle.frames().unwrap();
        assert_eq!(frames.len(), 2);
        let before = handle.progress();
        assert!(before < 1.0);

        handle.cancel_frame_threads();
        let after = handle.progress();
        assert!(after >= before);
        let outcome = handle.wait().unwrap();
        assert!(matches!(outcome, AnimationOutcome::Cancelled { .. }));
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn sink_failure_keeps_the_frames() {
        let handle = animate(
            "Mandelbrot Simple",
            2,
            small(2.0),
            small(2.0),
            &palette(20),
            Box::new(FailingSink),
            Arc::new(NoopObserver),
        )
        .unwrap();
        let state = Arc::clone(&handle.state);
        match handle.wait().unwrap() {
            AnimationOutcome::EncodingFailed { reason, .. } => assert!(reason.contains("disk full")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state.phase.get(), AnimationPhase::Failed);
        assert_eq!(state.frames.get().map(Vec::len), Some(2));
    }

    #[test]
    fn gif_sink_writes_a_gif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anime.gif");
        let mut sink = GifFileSink::new(&path);
        let frames = vec![
            RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255])),
            RgbaImage::from_pixel(3, 2, image::Rgba([0, 0, 255, 255])),
        ];
        sink.write_frames(frames, FRAME_DELAY_MS).unwrap();
        let mut header = [0u8; 6];
        File::open(&path).unwrap().read_exact(&mut header).unwrap();
        assert_eq!(&header, b"GIF89a");
    }

    #[test]
    fn failed_encoding_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anime.gif");
        let mut sink = GifFileSink::new(&path);
        // Wider than a GIF logical screen can describe.
        let frames = vec![RgbaImage::from_pixel(70_000, 1, image::Rgba([0, 0, 0, 255]))];
        assert!(sink.write_frames(frames, FRAME_DELAY_MS).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn default_sink_targets_anime_gif() {
        assert_eq!(GifFileSink::default().path(), Path::new("anime.gif"));
    }
}
