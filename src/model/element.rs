use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::math::polygon_2d;
use crate::math::Point2;

/// Electrical role of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Insulating region with a relative permittivity.
    #[serde(rename = "Dielectric")]
    Dielectric,
    /// Conductor driven to +1 V.
    #[serde(rename = "Trace+")]
    TracePos,
    /// Conductor driven to -1 V.
    #[serde(rename = "Trace-")]
    TraceNeg,
    /// Conductor held at 0 V.
    #[serde(rename = "GND")]
    Gnd,
}

impl ElementKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 4] = [Self::Dielectric, Self::TracePos, Self::TraceNeg, Self::Gnd];

    /// Returns `true` for traces and ground.
    #[must_use]
    pub fn is_conductor(self) -> bool {
        !matches!(self, Self::Dielectric)
    }

    /// Fixed potential of a conductor, `None` for dielectrics.
    #[must_use]
    pub fn potential(self) -> Option<f64> {
        match self {
            Self::Dielectric => None,
            Self::TracePos => Some(1.0),
            Self::TraceNeg => Some(-1.0),
            Self::Gnd => Some(0.0),
        }
    }

    /// Name given to newly created elements of this kind.
    #[must_use]
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Dielectric => "Substrate",
            Self::TracePos => "RF+",
            Self::TraceNeg => "RF-",
            Self::Gnd => "GND",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Dielectric => "Dielectric",
            Self::TracePos => "Trace+",
            Self::TraceNeg => "Trace-",
            Self::Gnd => "GND",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownKind(s.to_owned()))
    }
}

/// A named polygon with an electrical role.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub kind: ElementKind,
    /// Relative permittivity; only meaningful for dielectrics.
    pub epsilon_r: f64,
    vertices: Vec<Point2>,
}

impl Element {
    /// Default relative permittivity of new elements (FR-4).
    pub const DEFAULT_EPSILON_R: f64 = 4.3;

    /// Creates an empty element with the default name for `kind`.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            name: kind.default_name().to_owned(),
            kind,
            epsilon_r: Self::DEFAULT_EPSILON_R,
            vertices: Vec::new(),
        }
    }

    /// Creates an element from a vertex list.
    #[must_use]
    pub fn with_vertices(kind: ElementKind, vertices: Vec<Point2>) -> Self {
        Self {
            vertices,
            ..Self::new(kind)
        }
    }

    /// Sets the relative permittivity.
    #[must_use]
    pub fn with_epsilon_r(mut self, epsilon_r: f64) -> Self {
        self.epsilon_r = epsilon_r;
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Creates an axis-aligned rectangle spanning two corners, wound
    /// counter-clockwise.
    #[must_use]
    pub fn rectangle(kind: ElementKind, a: Point2, b: Point2) -> Self {
        let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
        let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
        Self::with_vertices(
            kind,
            vec![
                Point2::new(x0, y0),
                Point2::new(x1, y0),
                Point2::new(x1, y1),
                Point2::new(x0, y1),
            ],
        )
    }

    #[must_use]
    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    pub fn append_vertex(&mut self, p: Point2) {
        self.vertices.push(p);
    }

    /// Inserts a vertex before `index`; indices past the end append.
    pub fn insert_vertex(&mut self, index: usize, p: Point2) {
        let index = index.min(self.vertices.len());
        self.vertices.insert(index, p);
    }

    /// Removes a vertex; out-of-range indices are ignored.
    pub fn remove_vertex(&mut self, index: usize) -> Option<Point2> {
        (index < self.vertices.len()).then(|| self.vertices.remove(index))
    }

    /// Moves a vertex; out-of-range indices are ignored.
    pub fn change_vertex(&mut self, index: usize, p: Point2) {
        if let Some(v) = self.vertices.get_mut(index) {
            *v = p;
        }
    }

    /// Even-odd containment test against the element outline.
    #[must_use]
    pub fn contains(&self, p: &Point2) -> bool {
        polygon_2d::contains_point(&self.vertices, p)
    }

    #[must_use]
    pub fn self_intersects(&self) -> bool {
        polygon_2d::self_intersects(&self.vertices)
    }
}
