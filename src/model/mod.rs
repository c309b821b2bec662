mod element;
mod element_list;
mod record;

pub use element::{Element, ElementKind};
pub use element_list::{ElementId, ElementList};
pub use record::{ElementRecord, VertexRecord};
