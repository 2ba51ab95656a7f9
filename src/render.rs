// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Grid rendering: every pixel of a plane through an evaluator, in
//! parallel, with progress after each row and cooperative
//! cancellation.  [`render`] runs the grid on a background thread and
//! hands back a [`RenderHandle`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::databox::DataBox;
use crate::error::{FractalError, Result};
use crate::fractal::{Evaluator, FractalVariant};
use crate::palette::ColorPalette;
use crate::planes::CartesianPlane;
use crate::surface::PixelSurface;
use crate::task::{CancelToken, Progress, RenderObserver, RenderOutcome, StateCell, TaskState};
use crate::workers::{default_threads, dispatch};

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    let elapsed = started.elapsed();
    elapsed.as_secs() * 1000 + u64::from(elapsed.subsec_millis())
}

pub(crate) fn check_surface(plane: &CartesianPlane, surface: &PixelSurface) -> Result<()> {
    if plane.pixel_width() != surface.width() || plane.pixel_height() != surface.height() {
        return Err(FractalError::SurfaceMismatch(
            surface.width(),
            surface.height(),
            plane.pixel_width(),
            plane.pixel_height(),
        ));
    }
    Ok(())
}

/// Maps every pixel of a plane through one evaluator.
pub struct GridRenderer<'a> {
    evaluator: &'a Evaluator,
    threads: usize,
}

impl<'a> GridRenderer<'a> {
    /// A renderer using one thread per core.
    pub fn new(evaluator: &'a Evaluator) -> Self {
        GridRenderer {
            evaluator,
            threads: default_threads(),
        }
    }

    /// Use `threads` workers instead.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Render `plane` into `surface`.  Rows are handed to the workers
    /// one at a time; the token is polled before every row and every
    /// pixel.  After each finished row `progress` advances and the
    /// observer hears about it.  On completion the observer's
    /// `on_complete` runs once, after the last pixel is written.  A
    /// cancelled render keeps what it wrote and returns `Cancelled`.
    pub fn run(
        &self,
        plane: &CartesianPlane,
        surface: &PixelSurface,
        token: &CancelToken,
        progress: &Progress,
        observer: &dyn RenderObserver,
    ) -> Result<RenderOutcome> {
        check_surface(plane, surface)?;
        let started = Instant::now();
        let (width, height) = (plane.pixel_width(), plane.pixel_height());
        let rows_done = AtomicUsize::new(0);

        dispatch(height, self.threads, token, |y| {
            for x in 0..width {
                if token.is_cancelled() {
                    return;
                }
                let c = plane.to_complex(x as f64, y as f64);
                surface.set(x, y, self.evaluator.evaluate(c));
            }
            if token.is_cancelled() {
                return;
            }
            rows_done.fetch_add(1, Ordering::Relaxed);
            observer.on_progress(progress.advance());
        })?;

        let elapsed_ms = elapsed_ms(started);
        if rows_done.load(Ordering::Relaxed) == height {
            observer.on_complete(elapsed_ms);
            Ok(RenderOutcome::Completed { elapsed_ms })
        } else {
            Ok(RenderOutcome::Cancelled { elapsed_ms })
        }
    }
}

/// A request running on its own thread.
pub struct RenderHandle {
    token: CancelToken,
    progress: Arc<Progress>,
    state: Arc<StateCell>,
    surface: Arc<PixelSurface>,
    thread: JoinHandle<Result<RenderOutcome>>,
}

impl RenderHandle {
    /// Start `job` on a new thread.  The job receives the surface to
    /// fill, the token to poll and a progress counter of `total`
    /// steps.
    pub fn spawn<F>(name: &str, surface: PixelSurface, total: usize, job: F) -> Result<Self>
    where
        F: FnOnce(&PixelSurface, &CancelToken, &Progress) -> Result<RenderOutcome> + Send + 'static,
    {
        let token = CancelToken::new();
        let progress = Arc::new(Progress::new(total));
        let state = Arc::new(StateCell::new());
        let surface = Arc::new(surface);

        let thread = {
            let (token, progress, state, surface) = (
                token.clone(),
                Arc::clone(&progress),
                Arc::clone(&state),
                Arc::clone(&surface),
            );
            thread::Builder::new().name(name.to_string()).spawn(move || {
                let result = job(&surface, &token, &progress);
                match result {
                    Ok(outcome) => state.set(outcome.state()),
                    Err(ref e) => {
                        log::error!("render failed: {}", e);
                        state.set(TaskState::Failed)
                    }
                }
                result
            })?
        };

        Ok(RenderHandle {
            token,
            progress,
            state,
            surface,
            thread,
        })
    }

    /// Ask the render to stop.  Safe to call any number of times.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fraction of rows finished, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress.fraction()
    }

    /// Where the request is in its life.
    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    /// The buffer the render writes into.
    pub fn surface(&self) -> Arc<PixelSurface> {
        Arc::clone(&self.surface)
    }

    /// Block until the render thread exits.
    pub fn wait(self) -> Result<RenderOutcome> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => {
                self.state.set(TaskState::Failed);
                Err(FractalError::WorkerPanicked)
            }
        }
    }
}

/// Start rendering the variant registered as `name` in the
/// background.  Unknown names fail before anything is started.
pub fn render(
    name: &str,
    data: DataBox,
    palette: &ColorPalette,
    observer: Arc<dyn RenderObserver>,
) -> Result<RenderHandle> {
    let variant: FractalVariant = name.parse()?;
    let evaluator = Evaluator::new(variant, &data, palette);
    log::info!(
        "rendering {} at {}x{}, {} iterations",
        variant,
        data.plane.pixel_width(),
        data.plane.pixel_height(),
        data.max_iterations
    );
    let surface = data.surface();
    let rows = data.plane.pixel_height();
    RenderHandle::spawn("fractal-render", surface, rows, move |surface, token, progress| {
        GridRenderer::new(&evaluator).run(&data.plane, surface, token, progress, observer.as_ref())
    })
}

/// Owns the render currently targeting one view.  Starting a new
/// render cancels the previous one and waits for it to stop, so two
/// requests never write to the same view at once.
#[derive(Default)]
pub struct RenderSession {
    current: Option<RenderHandle>,
}

impl RenderSession {
    /// An idle session.
    pub fn new() -> Self {
        RenderSession::default()
    }

    /// Cancel and reap the running render, if any.
    pub fn stop(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.cancel();
            match previous.wait() {
                Ok(outcome) => log::debug!("superseded render ended {:?}", outcome),
                Err(e) => log::warn!("superseded render failed: {}", e),
            }
        }
    }

    /// Replace the running render with a new one.
    pub fn start(
        &mut self,
        name: &str,
        data: DataBox,
        palette: &ColorPalette,
        observer: Arc<dyn RenderObserver>,
    ) -> Result<&RenderHandle> {
        self.stop();
        let handle = render(name, data, palette, observer)?;
        Ok(self.current.get_or_insert(handle))
    }

    /// The running (or last finished) render.
    pub fn current(&self) -> Option<&RenderHandle> {
        self.current.as_ref()
    }

    /// Wait for the current render and release it.
    pub fn finish(&mut self) -> Option<Result<RenderOutcome>> {
        self.current.take().map(RenderHandle::wait)
    }
}
