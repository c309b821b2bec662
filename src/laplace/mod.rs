mod config;
mod events;
mod field;
mod model;
mod progress;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::warn;

pub use config::{Area, GridMap, SolveConfig, MAX_NODES};
pub use events::{EventSink, NullSink, Outcome, SolverEvent};
pub use field::{PotentialField, SolvedField};
pub use model::{FieldModel, BORDER_TOLERANCE};
pub use progress::ProgressTracker;

use events::Emitter;

use crate::error::SolveError;
use crate::lattice::{Lattice, RelaxConfig, Relaxation};
use crate::math::{Point2, Vector2};
use crate::model::ElementList;

/// State visible to both the owner and the solve thread.
#[derive(Debug, Default)]
struct Shared {
    running: AtomicBool,
    ready: AtomicBool,
    field: RwLock<Option<Arc<SolvedField>>>,
}

impl Shared {
    fn field(&self) -> Option<Arc<SolvedField>> {
        self.field
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, field: Option<Arc<SolvedField>>) {
        *self.field.write().unwrap_or_else(PoisonError::into_inner) = field;
    }
}

/// Owner of the solve parameters and the most recent solved field.
///
/// A solve snapshots the geometry, builds a [`Lattice`] from it and relaxes
/// the lattice on a dedicated thread. Progress and completion are reported
/// through an [`EventSink`]; once a solve finishes the field can be queried
/// through [`PotentialField`].
///
/// At most one solve runs at a time. Parameter changes are ignored while a
/// solve is in flight.
#[derive(Debug)]
pub struct Laplace {
    config: SolveConfig,
    shared: Arc<Shared>,
    emitter: Emitter,
    abort: Arc<AtomicBool>,
    worker: Option<JoinHandle<Outcome>>,
}

impl Default for Laplace {
    fn default() -> Self {
        Self::new()
    }
}

impl Laplace {
    /// Creates an idle solver with default parameters that discards events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SolveConfig::default(),
            shared: Arc::new(Shared::default()),
            emitter: Emitter::new(Arc::new(NullSink)),
            abort: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Routes solver events to `sink`.
    #[must_use]
    pub fn with_sink<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.emitter = Emitter::new(Arc::new(sink));
        self
    }

    /// Uses `config` as the solve parameters.
    #[must_use]
    pub fn with_config(mut self, config: SolveConfig) -> Self {
        self.config = config;
        self
    }

    /// Current solve parameters.
    #[must_use]
    pub fn config(&self) -> &SolveConfig {
        &self.config
    }

    /// Replaces every parameter at once. Ignored while running.
    pub fn set_config(&mut self, config: SolveConfig) {
        if !self.is_running() {
            self.config = config;
        }
    }

    /// Sets the solve area from its corners. Ignored while running.
    pub fn set_area(&mut self, top_left: Point2, bottom_right: Point2) {
        if !self.is_running() {
            self.config.area = Area::from_corners(top_left, bottom_right);
        }
    }

    /// Ignored while running or for a non-positive pitch.
    pub fn set_grid(&mut self, grid: f64) {
        if !self.is_running() && grid > 0.0 {
            self.config.grid = grid;
        }
    }

    /// Ignored while running or for zero threads.
    pub fn set_threads(&mut self, threads: usize) {
        if !self.is_running() && threads > 0 {
            self.config.threads = threads;
        }
    }

    /// Ignored while running or for a non-positive threshold.
    pub fn set_threshold(&mut self, threshold: f64) {
        if !self.is_running() && threshold > 0.0 {
            self.config.threshold = threshold;
        }
    }

    /// Holds the area outline at 0 V. Ignored while running.
    pub fn set_grounded_borders(&mut self, grounded: bool) {
        if !self.is_running() {
            self.config.grounded_borders = grounded;
        }
    }

    /// Weights every node as free space. Ignored while running.
    pub fn set_ignore_dielectric(&mut self, ignore: bool) {
        if !self.is_running() {
            self.config.ignore_dielectric = ignore;
        }
    }

    /// Ignored while running or for a zero ceiling.
    pub fn set_max_iterations(&mut self, max_iterations: u64) {
        if !self.is_running() && max_iterations > 0 {
            self.config.max_iterations = max_iterations;
        }
    }

    /// Returns `true` while a solve thread is working.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Returns `true` if a solved field is available for queries.
    #[must_use]
    pub fn is_result_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    /// Marks the current result stale. Queries return NaN until the next
    /// solve completes.
    pub fn invalidate_result(&self) {
        self.shared.ready.store(false, Ordering::SeqCst);
    }

    /// Invalidates the result if `list` changed since it was solved.
    ///
    /// Returns `true` if the result was invalidated.
    pub fn invalidate_if_stale(&self, list: &ElementList) -> bool {
        let stale = self
            .shared
            .field()
            .is_some_and(|f| f.revision() != list.revision());
        if stale && self.is_result_ready() {
            self.invalidate_result();
            return true;
        }
        false
    }

    /// The solved field, if a result is ready.
    #[must_use]
    pub fn field(&self) -> Option<Arc<SolvedField>> {
        if !self.is_result_ready() {
            return None;
        }
        self.shared.field()
    }

    /// Starts a solve of `list` on a background thread.
    ///
    /// Returns `false` without starting if a solve is already running, the
    /// parameters are invalid or the thread cannot be spawned; the latter two
    /// also emit [`SolverEvent::Error`].
    pub fn start_calculation(&mut self, list: &ElementList) -> bool {
        if self.is_running() {
            warn!("Laplace calculation already running");
            return false;
        }
        // The previous worker cleared `running` just before returning.
        self.wait();

        let map = match self.config.validate() {
            Ok(map) => map,
            Err(e) => {
                self.emitter.error(format!("Invalid solve parameters: {e}"));
                return false;
            }
        };

        self.shared.ready.store(false, Ordering::SeqCst);
        self.shared.publish(None);
        self.abort = Arc::new(AtomicBool::new(false));
        self.shared.running.store(true, Ordering::SeqCst);

        self.emitter.info("Starting Laplace calculation");
        let model = FieldModel::new(
            list.clone(),
            map,
            self.config.grounded_borders,
            self.config.ignore_dielectric,
        );
        let relax = RelaxConfig {
            threads: self.config.threads,
            threshold: self.config.threshold,
            max_iterations: self.config.max_iterations,
        };
        let shared = Arc::clone(&self.shared);
        let emitter = self.emitter.clone();
        let abort = Arc::clone(&self.abort);

        let spawned = thread::Builder::new()
            .name("rf2d-laplace".into())
            .spawn(move || {
                panic::catch_unwind(AssertUnwindSafe(|| {
                    solve(&model, &relax, &shared, &emitter, &abort)
                }))
                .unwrap_or_else(|payload| {
                    let error = SolveError::Panicked(panic_message(payload.as_ref()));
                    fail(&shared, &emitter, &error)
                })
            });
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.emitter.info("Laplace thread started");
                true
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.emitter.error(SolveError::ThreadSpawn(e.to_string()).to_string());
                false
            }
        }
    }

    /// Asks the running solve to stop after its current sweep. No effect
    /// when idle.
    pub fn abort_calculation(&self) {
        if self.is_running() {
            self.abort.store(true, Ordering::SeqCst);
        }
    }

    /// Blocks until the last started solve finishes and returns its outcome.
    ///
    /// Returns `None` if no solve was started since the last call.
    pub fn wait(&mut self) -> Option<Outcome> {
        let handle = self.worker.take()?;
        match handle.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.emitter.error("Laplace thread panicked");
                Some(Outcome::Failed("solve thread panicked".into()))
            }
        }
    }
}

impl Drop for Laplace {
    fn drop(&mut self) {
        self.abort.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl PotentialField for Laplace {
    fn potential(&self, p: &Point2) -> f64 {
        self.field().map_or(f64::NAN, |f| f.potential(p))
    }

    fn gradient(&self, p: &Point2) -> Vector2 {
        self.field().map_or_else(Vector2::zeros, |f| f.gradient(p))
    }
}

/// Body of the solve thread.
fn solve(
    model: &FieldModel,
    relax: &RelaxConfig,
    shared: &Shared,
    emitter: &Emitter,
    abort: &AtomicBool,
) -> Outcome {
    let map = *model.map();
    emitter.info(format!(
        "Creating lattice of {} x {} nodes",
        map.columns, map.rows
    ));
    let lattice = Lattice::new(
        map.columns,
        map.rows,
        |i, j| model.boundary(i, j),
        |i, j| model.weight(i, j),
    );
    let mut lattice = match lattice {
        Ok(lattice) => lattice,
        Err(e) => return fail(shared, emitter, &e),
    };
    emitter.info("Lattice creation complete");

    let threads = relax.bands(map.rows).len();
    emitter.info(format!("Starting {threads} calculation threads"));
    let started = Instant::now();
    let mut tracker = ProgressTracker::new(relax.threshold);
    let relaxation = lattice.compute_parallel(relax, abort, |diff| {
        if let Some(percent) = tracker.update(diff) {
            emitter.emit(SolverEvent::Percentage(percent));
        }
    });
    let relaxation = match relaxation {
        Ok(relaxation) => relaxation,
        Err(e) => return fail(shared, emitter, &e),
    };

    if abort.load(Ordering::SeqCst) {
        return aborted(shared, emitter, relaxation.iterations());
    }
    match relaxation {
        Relaxation::Aborted { iterations } => aborted(shared, emitter, iterations),
        Relaxation::Converged { iterations } => {
            publish(shared, lattice, model);
            emitter.info(format!(
                "Laplace calculation complete, took {iterations} iterations in {:.2?}",
                started.elapsed()
            ));
            emitter.emit(SolverEvent::Percentage(100));
            emitter.emit(SolverEvent::CalculationDone);
            Outcome::Converged { iterations }
        }
        Relaxation::MaxIterations {
            iterations,
            residual,
        } => {
            publish(shared, lattice, model);
            emitter.warning(format!(
                "Laplace calculation did not converge after {iterations} iterations (residual {residual:e})"
            ));
            emitter.emit(SolverEvent::CalculationNonConvergent);
            Outcome::NonConvergent {
                iterations,
                residual,
            }
        }
    }
}

/// Stores the field and leaves the running state before any terminal event.
fn publish(shared: &Shared, lattice: Lattice, model: &FieldModel) {
    let field = SolvedField::new(lattice, *model.map(), model.revision());
    shared.publish(Some(Arc::new(field)));
    shared.ready.store(true, Ordering::SeqCst);
    shared.running.store(false, Ordering::SeqCst);
}

fn aborted(shared: &Shared, emitter: &Emitter, iterations: u64) -> Outcome {
    shared.running.store(false, Ordering::SeqCst);
    emitter.warning("Laplace calculation aborted");
    emitter.emit(SolverEvent::Percentage(0));
    emitter.emit(SolverEvent::CalculationAborted);
    Outcome::Aborted { iterations }
}

fn fail(shared: &Shared, emitter: &Emitter, error: &SolveError) -> Outcome {
    shared.running.store(false, Ordering::SeqCst);
    emitter.error(error.to_string());
    emitter.emit(SolverEvent::CalculationAborted);
    Outcome::Failed(error.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
