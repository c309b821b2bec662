use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::debug;

use super::{Condition, Lattice, Relaxation};
use crate::error::SolveError;

/// Fewest rows a worker band may hold.
pub const MIN_BAND_ROWS: usize = 5;

/// Parameters of a banded parallel solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxConfig {
    /// Requested worker count; capped so every band holds at least
    /// [`MIN_BAND_ROWS`] rows.
    pub threads: usize,
    /// Stop once the largest change of a sweep falls below this.
    pub threshold: f64,
    /// Hard sweep ceiling.
    pub max_iterations: u64,
}

impl RelaxConfig {
    /// Row counts of the bands a grid of `rows` rows is split into, one band
    /// per effective worker.
    ///
    /// The remainder is spread over the leading bands, so no band is more
    /// than one row larger than another.
    #[must_use]
    pub fn bands(&self, rows: usize) -> Vec<usize> {
        let threads = self.threads.min(rows / MIN_BAND_ROWS).max(1);
        let base = rows / threads;
        let extra = rows % threads;
        (0..threads).map(|k| base + usize::from(k < extra)).collect()
    }
}

/// Copies of the rows bordering a band, taken before the sweep.
pub(super) struct Halo<'a> {
    pub above: &'a [f64],
    pub below: &'a [f64],
}

/// Gauss-Seidel sweep over one band of full rows starting at `first_row`.
///
/// Rows outside the band are read from `halo`; the band is updated in place.
/// Returns the largest absolute change.
pub(super) fn relax_band(
    band: &mut [f64],
    first_row: usize,
    halo: Halo<'_>,
    conditions: &[Condition],
    weights: &[f64],
    stride: usize,
) -> f64 {
    let band_rows = band.len() / stride;
    let mut max_diff: f64 = 0.0;

    let value = |band: &[f64], x: usize, y: usize| -> f64 {
        if y < first_row {
            halo.above[x]
        } else if y >= first_row + band_rows {
            halo.below[x]
        } else {
            band[(y - first_row) * stride + x]
        }
    };
    let inside = |x: usize, y: usize| !matches!(conditions[y * stride + x], Condition::Outside);

    for r in 0..band_rows {
        let y = first_row + r;
        for x in 1..stride - 1 {
            if !matches!(conditions[y * stride + x], Condition::Free) {
                continue;
            }

            let mut num = 0.0;
            let mut den = 0.0;
            for [(ax, ay), (bx, by)] in [[(x - 1, y), (x + 1, y)], [(x, y - 1), (x, y + 1)]] {
                let wa = weights[ay * stride + ax];
                let wb = weights[by * stride + bx];
                match (inside(ax, ay), inside(bx, by)) {
                    (true, true) => {
                        num += value(band, ax, ay) * wa + value(band, bx, by) * wb;
                        den += wa + wb;
                    }
                    (true, false) => {
                        num += 2.0 * value(band, ax, ay) * wa;
                        den += 2.0 * wa;
                    }
                    (false, true) => {
                        num += 2.0 * value(band, bx, by) * wb;
                        den += 2.0 * wb;
                    }
                    (false, false) => {}
                }
            }
            if den <= 0.0 {
                continue;
            }

            let slot = &mut band[r * stride + x];
            let next = num / den;
            max_diff = max_diff.max((next - *slot).abs());
            *slot = next;
        }
    }
    max_diff
}

impl Lattice {
    /// Solves with the interior rows split into bands relaxed concurrently.
    ///
    /// Each sweep snapshots the rows bordering every band, relaxes all bands
    /// in parallel (a band only writes its own rows), then joins before the
    /// global change is reduced and reported to `progress`. `abort` is polled
    /// between sweeps.
    ///
    /// # Errors
    ///
    /// Returns `SolveError::ThreadPool` if the worker pool cannot be built.
    pub fn compute_parallel<P>(
        &mut self,
        config: &RelaxConfig,
        abort: &AtomicBool,
        mut progress: P,
    ) -> Result<Relaxation, SolveError>
    where
        P: FnMut(f64),
    {
        let band_sizes = config.bands(self.rows);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(band_sizes.len())
            .build()
            .map_err(|e| SolveError::ThreadPool(e.to_string()))?;
        debug!(threads = band_sizes.len(), rows = self.rows, "relaxing lattice");

        let stride = self.stride;
        let rows = self.rows;
        let band_starts: Vec<usize> = band_sizes
            .iter()
            .scan(1, |next, &size| {
                let first = *next;
                *next += size;
                Some(first)
            })
            .collect();

        let mut iterations = 0;
        let mut residual = f64::INFINITY;
        loop {
            if abort.load(Ordering::Relaxed) {
                return Ok(Relaxation::Aborted { iterations });
            }
            if iterations >= config.max_iterations {
                return Ok(Relaxation::MaxIterations {
                    iterations,
                    residual,
                });
            }

            // Neighbour rows as they stood after the previous sweep.
            let halos: Vec<(Vec<f64>, Vec<f64>)> = band_starts
                .iter()
                .zip(&band_sizes)
                .map(|(&first, &size)| {
                    let last = first + size;
                    (
                        self.values[(first - 1) * stride..first * stride].to_vec(),
                        self.values[last * stride..(last + 1) * stride].to_vec(),
                    )
                })
                .collect();

            let conditions: &[Condition] = &self.conditions;
            let weights: &[f64] = &self.weights;
            let mut rest = &mut self.values[stride..(rows + 1) * stride];
            let mut bands = Vec::with_capacity(band_sizes.len());
            for &size in &band_sizes {
                let (band, tail) = std::mem::take(&mut rest).split_at_mut(size * stride);
                bands.push(band);
                rest = tail;
            }

            residual = pool.install(|| {
                bands
                    .into_par_iter()
                    .zip(halos.par_iter())
                    .zip(band_starts.par_iter())
                    .map(|((band, (above, below)), &first)| {
                        relax_band(
                            band,
                            first,
                            Halo { above, below },
                            conditions,
                            weights,
                            stride,
                        )
                    })
                    .reduce(|| 0.0, f64::max)
            });
            iterations += 1;
            progress(residual);

            if residual < config.threshold {
                return Ok(Relaxation::Converged { iterations });
            }
        }
    }
}
