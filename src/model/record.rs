use serde::{Deserialize, Serialize};

use super::element::{Element, ElementKind};
use crate::math::Point2;

/// Serialized vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub x: f64,
    pub y: f64,
}

/// Plain data record of an [`Element`]; carries no solver state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default = "default_epsilon_r")]
    pub e_r: f64,
    #[serde(default)]
    pub vertices: Vec<VertexRecord>,
}

fn default_epsilon_r() -> f64 {
    Element::DEFAULT_EPSILON_R
}

impl From<&Element> for ElementRecord {
    fn from(e: &Element) -> Self {
        Self {
            name: e.name.clone(),
            kind: e.kind,
            e_r: e.epsilon_r,
            vertices: e
                .vertices()
                .iter()
                .map(|p| VertexRecord { x: p.x, y: p.y })
                .collect(),
        }
    }
}

impl From<ElementRecord> for Element {
    fn from(r: ElementRecord) -> Self {
        let vertices = r.vertices.iter().map(|v| Point2::new(v.x, v.y)).collect();
        Element::with_vertices(r.kind, vertices)
            .with_name(r.name)
            .with_epsilon_r(r.e_r)
    }
}

/// Top-level document layout: `{ "elements": [...] }`.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ElementListRecord {
    pub elements: Vec<ElementRecord>,
}
