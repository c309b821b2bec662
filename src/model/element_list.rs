use slotmap::SlotMap;

use super::element::{Element, ElementKind};
use super::record::{ElementListRecord, ElementRecord};
use crate::error::{ModelError, Result};
use crate::math::Point2;

slotmap::new_key_type! {
    /// Unique identifier for an element in an [`ElementList`].
    pub struct ElementId;
}

/// Insertion-ordered collection of elements.
///
/// Order is significant: containment queries scan elements front to back and
/// the first match wins. Every mutating access bumps [`revision`](Self::revision)
/// so solved fields can detect that the geometry they were computed from is
/// stale.
#[derive(Debug, Clone, Default)]
pub struct ElementList {
    elements: SlotMap<ElementId, Element>,
    order: Vec<ElementId>,
    revision: u64,
}

impl ElementList {
    /// Creates a new, empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an element and returns its ID.
    pub fn add(&mut self, element: Element) -> ElementId {
        let id = self.elements.insert(element);
        self.order.push(id);
        self.revision += 1;
        id
    }

    /// Removes an element by ID.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        let element = self.elements.remove(id)?;
        self.order.retain(|&other| other != id);
        self.revision += 1;
        Some(element)
    }

    /// Removes the element at list position `index`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::IndexOutOfRange` if `index` is past the end.
    pub fn remove_at(&mut self, index: usize) -> Result<Element> {
        let id = self.id_at(index).ok_or(ModelError::IndexOutOfRange {
            index,
            len: self.len(),
        })?;
        self.remove(id).ok_or_else(|| {
            ModelError::IndexOutOfRange {
                index,
                len: self.len(),
            }
            .into()
        })
    }

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Mutable access to an element. Counts as a modification.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        let element = self.elements.get_mut(id)?;
        self.revision += 1;
        Some(element)
    }

    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<ElementId> {
        self.order.get(index).copied()
    }

    #[must_use]
    pub fn element_at(&self, index: usize) -> Option<&Element> {
        self.id_at(index).and_then(|id| self.elements.get(id))
    }

    /// Iterates elements in list order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.elements.get(id).map(|e| (id, e)))
    }

    /// Iterates elements of one kind in list order.
    pub fn of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &Element> + '_ {
        self.iter()
            .map(|(_, e)| e)
            .filter(move |e| e.kind == kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Modification counter; changes whenever the list or an element changes.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Relative permittivity at `p`.
    ///
    /// The first element containing `p` decides: dielectrics report their
    /// `epsilon_r`, conductors report 1. Free space is 1.
    #[must_use]
    pub fn dielectric_constant_at(&self, p: &Point2) -> f64 {
        self.iter()
            .map(|(_, e)| e)
            .find(|e| e.contains(p))
            .map_or(1.0, |e| match e.kind {
                ElementKind::Dielectric => e.epsilon_r,
                ElementKind::TracePos | ElementKind::TraceNeg | ElementKind::Gnd => 1.0,
            })
    }

    /// First conductor containing `p`, skipping dielectrics.
    #[must_use]
    pub fn conductor_at(&self, p: &Point2) -> Option<&Element> {
        self.iter()
            .map(|(_, e)| e)
            .find(|e| e.kind.is_conductor() && e.contains(p))
    }

    /// Plain data records in list order.
    #[must_use]
    pub fn to_records(&self) -> Vec<ElementRecord> {
        self.iter().map(|(_, e)| ElementRecord::from(e)).collect()
    }

    /// Builds a list from records, preserving their order.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = ElementRecord>) -> Self {
        let mut list = Self::new();
        for record in records {
            list.add(record.into());
        }
        list
    }

    /// Serializes the list as `{ "elements": [...] }`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let doc = ElementListRecord {
            elements: self.to_records(),
        };
        Ok(serde_json::to_string_pretty(&doc).map_err(ModelError::from)?)
    }

    /// Parses a list written by [`to_json`](Self::to_json).
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Json` for malformed input or unknown element types.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ElementListRecord = serde_json::from_str(json).map_err(ModelError::from)?;
        Ok(Self::from_records(doc.elements))
    }
}
