mod relax;

use std::sync::atomic::{AtomicBool, Ordering};

pub use relax::RelaxConfig;

use crate::error::SolveError;

/// Boundary condition of a single node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// Outer ring, never updated, reads as NaN.
    Outside,
    /// Unconstrained; relaxed every sweep.
    Free,
    /// Potential fixed to the given value.
    Dirichlet(f64),
}

/// Snapshot of a single node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub value: f64,
    pub condition: Condition,
    pub weight: f64,
}

/// How a relaxation run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relaxation {
    /// The largest per-sweep change dropped below the threshold.
    Converged { iterations: u64 },
    /// The abort flag was observed between sweeps.
    Aborted { iterations: u64 },
    /// The iteration ceiling was reached first.
    MaxIterations { iterations: u64, residual: f64 },
}

impl Relaxation {
    #[must_use]
    pub fn iterations(&self) -> u64 {
        match *self {
            Self::Converged { iterations }
            | Self::Aborted { iterations }
            | Self::MaxIterations { iterations, .. } => iterations,
        }
    }
}

/// `len` copies of `value`, or `None` if the allocation fails.
fn filled<T: Clone>(len: usize, value: T) -> Option<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).ok()?;
    v.resize(len, value);
    Some(v)
}

/// Potential grid with per-node conditions and weights.
///
/// The grid holds `columns × rows` interior nodes surrounded by a one-node
/// ring of [`Condition::Outside`] cells whose value is NaN. Interior node
/// `(i, j)` lives at full index `(i + 1, j + 1)`; `j = 0` is the bottom row.
///
/// Free nodes relax towards the weighted average of their four neighbours,
/// the weights being `√εr` of each neighbour. A neighbour in the outer ring
/// is mirrored: the opposite neighbour is counted twice, which makes an
/// ungrounded domain edge a zero-normal-derivative boundary.
#[derive(Debug, Clone)]
pub struct Lattice {
    columns: usize,
    rows: usize,
    stride: usize,
    values: Vec<f64>,
    conditions: Vec<Condition>,
    weights: Vec<f64>,
}

impl Lattice {
    /// Builds a lattice of `columns × rows` interior nodes.
    ///
    /// `boundary(i, j)` and `weight(i, j)` are evaluated once per interior
    /// node. Free nodes start at 0 V.
    ///
    /// # Errors
    ///
    /// Returns `SolveError::EmptyDomain` if either dimension is zero and
    /// `SolveError::LatticeAllocation` if the storage cannot be allocated.
    pub fn new<B, W>(columns: usize, rows: usize, boundary: B, weight: W) -> Result<Self, SolveError>
    where
        B: Fn(usize, usize) -> Condition,
        W: Fn(usize, usize) -> f64,
    {
        if columns == 0 || rows == 0 {
            #[allow(clippy::cast_precision_loss)]
            return Err(SolveError::EmptyDomain {
                width: columns as f64,
                height: rows as f64,
            });
        }

        let too_large = || SolveError::LatticeAllocation { columns, rows };
        let stride = columns.checked_add(2).ok_or_else(too_large)?;
        let len = rows
            .checked_add(2)
            .and_then(|full_rows| full_rows.checked_mul(stride))
            .ok_or_else(too_large)?;
        let mut values = filled(len, f64::NAN).ok_or_else(too_large)?;
        let mut conditions = filled(len, Condition::Outside).ok_or_else(too_large)?;
        let mut weights = filled(len, 0.0).ok_or_else(too_large)?;

        for j in 0..rows {
            for i in 0..columns {
                let idx = (j + 1) * stride + (i + 1);
                let condition = match boundary(i, j) {
                    Condition::Outside => Condition::Free,
                    c => c,
                };
                values[idx] = match condition {
                    Condition::Dirichlet(v) => v,
                    _ => 0.0,
                };
                conditions[idx] = condition;
                weights[idx] = weight(i, j);
            }
        }

        Ok(Self {
            columns,
            rows,
            stride,
            values,
            conditions,
            weights,
        })
    }

    /// Number of interior columns.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of interior rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Full width including the outer ring (`columns + 2`).
    #[must_use]
    pub fn full_columns(&self) -> usize {
        self.stride
    }

    /// Full height including the outer ring (`rows + 2`).
    #[must_use]
    pub fn full_rows(&self) -> usize {
        self.rows + 2
    }

    /// Node at full index `(x, y)`, ring included.
    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        if x >= self.stride || y >= self.full_rows() {
            return None;
        }
        let idx = y * self.stride + x;
        Some(Cell {
            value: self.values[idx],
            condition: self.conditions[idx],
            weight: self.weights[idx],
        })
    }

    /// Potential at full index `(x, y)`; NaN outside the array.
    #[must_use]
    pub fn value(&self, x: usize, y: usize) -> f64 {
        self.cell(x, y).map_or(f64::NAN, |c| c.value)
    }

    /// Potential of interior node `(i, j)`.
    #[must_use]
    pub fn interior_value(&self, i: usize, j: usize) -> f64 {
        if i >= self.columns || j >= self.rows {
            return f64::NAN;
        }
        self.value(i + 1, j + 1)
    }

    /// Runs one sequential sweep and returns the largest change.
    pub fn iterate(&mut self) -> f64 {
        let (first, last) = (1, self.rows + 1);
        let stride = self.stride;
        let above = self.values[..stride].to_vec();
        let below = self.values[last * stride..].to_vec();
        relax::relax_band(
            &mut self.values[first * stride..last * stride],
            first,
            relax::Halo {
                above: &above,
                below: &below,
            },
            &self.conditions,
            &self.weights,
            stride,
        )
    }

    /// Sweeps sequentially until the largest change drops below `threshold`,
    /// `max_iterations` is reached, or `abort` is set.
    pub fn compute(&mut self, threshold: f64, max_iterations: u64, abort: &AtomicBool) -> Relaxation {
        let mut iterations = 0;
        let mut residual = f64::INFINITY;
        loop {
            if abort.load(Ordering::Relaxed) {
                return Relaxation::Aborted { iterations };
            }
            if iterations >= max_iterations {
                return Relaxation::MaxIterations {
                    iterations,
                    residual,
                };
            }
            residual = self.iterate();
            iterations += 1;
            if residual < threshold {
                return Relaxation::Converged { iterations };
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grounded_box(n: usize) -> impl Fn(usize, usize) -> Condition {
        move |i, j| {
            if i == 0 || j == 0 || i == n - 1 || j == n - 1 {
                Condition::Dirichlet(0.0)
            } else {
                Condition::Free
            }
        }
    }

    fn never() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn construction_sets_ring_and_conditions() {
        let lattice = Lattice::new(
            3,
            2,
            |i, j| {
                if i == 1 && j == 1 {
                    Condition::Dirichlet(0.7)
                } else {
                    Condition::Free
                }
            },
            |i, _| if i == 0 { 2.0 } else { 1.0 },
        )
        .unwrap();

        assert_eq!(lattice.full_columns(), 5);
        assert_eq!(lattice.full_rows(), 4);

        let ring = lattice.cell(0, 2).unwrap();
        assert_eq!(ring.condition, Condition::Outside);
        assert!(ring.value.is_nan());
        assert!(lattice.value(4, 3).is_nan());
        assert!(lattice.cell(5, 0).is_none());

        let fixed = lattice.cell(2, 2).unwrap();
        assert_eq!(fixed.condition, Condition::Dirichlet(0.7));
        assert_abs_diff_eq!(fixed.value, 0.7);

        let free = lattice.cell(1, 1).unwrap();
        assert_eq!(free.condition, Condition::Free);
        assert_abs_diff_eq!(free.value, 0.0);
        assert_abs_diff_eq!(free.weight, 2.0);
    }

    #[test]
    fn empty_dimensions_are_rejected() {
        assert!(Lattice::new(0, 5, |_, _| Condition::Free, |_, _| 1.0).is_err());
        assert!(Lattice::new(5, 0, |_, _| Condition::Free, |_, _| 1.0).is_err());
    }

    #[test]
    fn oversized_lattice_is_an_error() {
        for (columns, rows) in [(usize::MAX, 1), (1 << 40, 1 << 40), (1 << 32, 1 << 29)] {
            let lattice = Lattice::new(columns, rows, |_, _| Condition::Free, |_, _| 1.0);
            assert!(
                matches!(lattice, Err(SolveError::LatticeAllocation { .. })),
                "{columns} x {rows}"
            );
        }
    }

    #[test]
    fn grounded_box_stays_at_zero() {
        let n = 11;
        let mut lattice = Lattice::new(n, n, grounded_box(n), |_, _| 1.0).unwrap();
        let outcome = lattice.compute(1e-9, 10_000, &never());
        assert!(matches!(outcome, Relaxation::Converged { .. }));
        assert_abs_diff_eq!(lattice.interior_value(5, 5), 0.0);
    }

    #[test]
    fn point_source_decays_monotonically() {
        let n = 21;
        let c = n / 2;
        let inner = grounded_box(n);
        let boundary = move |i: usize, j: usize| {
            if i == c && j == c {
                Condition::Dirichlet(1.0)
            } else {
                inner(i, j)
            }
        };
        let mut lattice = Lattice::new(n, n, boundary, |_, _| 1.0).unwrap();
        let outcome = lattice.compute(1e-11, 1_000_000, &never());
        assert!(matches!(outcome, Relaxation::Converged { .. }), "{outcome:?}");

        for j in 0..n {
            for i in 0..n {
                let v = lattice.interior_value(i, j);
                assert!((0.0..=1.0).contains(&v), "v({i},{j}) = {v}");
            }
        }
        assert_abs_diff_eq!(lattice.interior_value(c, c), 1.0);
        for i in c..n - 1 {
            let here = lattice.interior_value(i, c);
            let next = lattice.interior_value(i + 1, c);
            assert!(next < here, "not decreasing at {i}: {here} -> {next}");
        }
        for j in 1..c {
            assert!(lattice.interior_value(c, j) > lattice.interior_value(c, j - 1));
        }
    }

    #[test]
    fn dirichlet_nodes_never_change() {
        let n = 15;
        let boundary = |i: usize, j: usize| match (i, j) {
            (3, 3) => Condition::Dirichlet(1.0),
            (10, 9) => Condition::Dirichlet(-1.0),
            (0, _) | (_, 0) => Condition::Dirichlet(0.25),
            _ => Condition::Free,
        };
        let mut lattice = Lattice::new(n, n, boundary, |_, _| 1.0).unwrap();
        for _ in 0..50 {
            lattice.iterate();
        }
        assert_abs_diff_eq!(lattice.interior_value(3, 3), 1.0);
        assert_abs_diff_eq!(lattice.interior_value(10, 9), -1.0);
        assert_abs_diff_eq!(lattice.interior_value(0, 7), 0.25);
        assert_abs_diff_eq!(lattice.interior_value(7, 0), 0.25);
    }

    #[test]
    fn open_edges_mirror_to_linear_profile() {
        // Left column at 1 V, right column at 0 V, top and bottom open.
        let n = 11;
        let boundary = move |i: usize, _| {
            if i == 0 {
                Condition::Dirichlet(1.0)
            } else if i == n - 1 {
                Condition::Dirichlet(0.0)
            } else {
                Condition::Free
            }
        };
        let mut lattice = Lattice::new(n, 7, boundary, |_, _| 1.0).unwrap();
        let outcome = lattice.compute(1e-12, 1_000_000, &never());
        assert!(matches!(outcome, Relaxation::Converged { .. }));

        #[allow(clippy::cast_precision_loss)]
        for j in 0..7 {
            for i in 0..n {
                let expected = 1.0 - i as f64 / (n - 1) as f64;
                assert_abs_diff_eq!(lattice.interior_value(i, j), expected, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn uniform_weight_does_not_change_solution() {
        let n = 13;
        let boundary = move |i: usize, j: usize| {
            if j == n - 1 {
                Condition::Dirichlet(1.0)
            } else if i == 0 || j == 0 || i == n - 1 {
                Condition::Dirichlet(0.0)
            } else {
                Condition::Free
            }
        };
        let mut unit = Lattice::new(n, n, boundary, |_, _| 1.0).unwrap();
        let mut heavy = Lattice::new(n, n, boundary, |_, _| 2.0).unwrap();
        unit.compute(1e-12, 1_000_000, &never());
        heavy.compute(1e-12, 1_000_000, &never());
        for j in 0..n {
            for i in 0..n {
                assert_abs_diff_eq!(
                    unit.interior_value(i, j),
                    heavy.interior_value(i, j),
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn preset_abort_stops_before_first_sweep() {
        let mut lattice = Lattice::new(9, 9, grounded_box(9), |_, _| 1.0).unwrap();
        let abort = AtomicBool::new(true);
        assert_eq!(
            lattice.compute(1e-9, 100, &abort),
            Relaxation::Aborted { iterations: 0 }
        );
    }

    #[test]
    fn iteration_ceiling_is_reported() {
        let n = 31;
        let boundary = move |_, j: usize| {
            if j == n - 1 {
                Condition::Dirichlet(1.0)
            } else if j == 0 {
                Condition::Dirichlet(0.0)
            } else {
                Condition::Free
            }
        };
        let mut lattice = Lattice::new(n, n, boundary, |_, _| 1.0).unwrap();
        match lattice.compute(1e-15, 5, &never()) {
            Relaxation::MaxIterations {
                iterations,
                residual,
            } => {
                assert_eq!(iterations, 5);
                assert!(residual > 1e-15);
            }
            other => panic!("expected iteration ceiling, got {other:?}"),
        }
    }
}
