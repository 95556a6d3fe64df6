//! The event sink implemented by every output target.

use super::property::{PropertyList, PropertyListVector};

/// Receives the ordered stream of structural events of a document.
///
/// Start and end calls nest as a well-formed stack; `insert_element` is
/// self-closing.
pub trait DocumentHandler {
    fn start_element(&mut self, name: &str, properties: &PropertyList);

    /// Starts an element that also carries a vector of property lists
    /// (tab stops, columns). Handlers that ignore vectors can rely on the
    /// default.
    fn start_element_with_vector(
        &mut self,
        name: &str,
        properties: &PropertyList,
        vector: &PropertyListVector,
    ) {
        let _ = vector;
        self.start_element(name, properties);
    }

    fn end_element(&mut self, name: &str);

    fn insert_element(&mut self, name: &str);

    fn characters(&mut self, text: &str);
}

impl<H: DocumentHandler + ?Sized> DocumentHandler for &mut H {
    fn start_element(&mut self, name: &str, properties: &PropertyList) {
        (**self).start_element(name, properties)
    }

    fn start_element_with_vector(
        &mut self,
        name: &str,
        properties: &PropertyList,
        vector: &PropertyListVector,
    ) {
        (**self).start_element_with_vector(name, properties, vector)
    }

    fn end_element(&mut self, name: &str) {
        (**self).end_element(name)
    }

    fn insert_element(&mut self, name: &str) {
        (**self).insert_element(name)
    }

    fn characters(&mut self, text: &str) {
        (**self).characters(text)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

impl DocumentHandler for NullHandler {
    fn start_element(&mut self, _name: &str, _properties: &PropertyList) {}

    fn end_element(&mut self, _name: &str) {}

    fn insert_element(&mut self, _name: &str) {}

    fn characters(&mut self, _text: &str) {}
}
