use super::config::GridMap;
use crate::lattice::Condition;
use crate::model::ElementList;

/// Distance within which a node counts as lying on the area outline.
pub const BORDER_TOLERANCE: f64 = 1e-6;

/// Frozen copy of the geometry a solve runs on.
///
/// Compiled once before the worker starts, so the caller may keep editing
/// its own list while the solve is in flight.
#[derive(Debug, Clone)]
pub struct FieldModel {
    elements: ElementList,
    map: GridMap,
    grounded_borders: bool,
    ignore_dielectric: bool,
}

impl FieldModel {
    #[must_use]
    pub fn new(elements: ElementList, map: GridMap, grounded_borders: bool, ignore_dielectric: bool) -> Self {
        Self {
            elements,
            map,
            grounded_borders,
            ignore_dielectric,
        }
    }

    #[must_use]
    pub fn map(&self) -> &GridMap {
        &self.map
    }

    /// Revision of the element list this model was compiled from.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.elements.revision()
    }

    /// Condition of interior node `(i, j)`.
    ///
    /// Grounded borders take precedence; otherwise the first conductor
    /// containing the node fixes its potential.
    #[must_use]
    pub fn boundary(&self, i: usize, j: usize) -> Condition {
        let p = self.map.node_position(i, j);
        if self.grounded_borders && self.map.on_border(&p, BORDER_TOLERANCE) {
            return Condition::Dirichlet(0.0);
        }
        self.elements
            .conductor_at(&p)
            .and_then(|e| e.kind.potential())
            .map_or(Condition::Free, Condition::Dirichlet)
    }

    /// Stencil weight of interior node `(i, j)`: `√εr` at its position.
    #[must_use]
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        if self.ignore_dielectric {
            return 1.0;
        }
        let p = self.map.node_position(i, j);
        self.elements.dielectric_constant_at(&p).sqrt()
    }
}
