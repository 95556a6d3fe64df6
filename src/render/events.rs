//! Recording handler.

use crate::codec::{DocumentHandler, PropertyList, PropertyListVector};
use serde::Serialize;

/// One structural event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Start {
        name: String,
        properties: PropertyList,
    },
    StartWithVector {
        name: String,
        properties: PropertyList,
        vector: PropertyListVector,
    },
    End(String),
    Insert(String),
    Characters(String),
}

impl Event {
    pub fn start(name: impl Into<String>, properties: PropertyList) -> Self {
        Event::Start {
            name: name.into(),
            properties,
        }
    }

    /// Sends this event to `handler`.
    pub fn replay<H: DocumentHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            Event::Start { name, properties } => handler.start_element(name, properties),
            Event::StartWithVector {
                name,
                properties,
                vector,
            } => handler.start_element_with_vector(name, properties, vector),
            Event::End(name) => handler.end_element(name),
            Event::Insert(name) => handler.insert_element(name),
            Event::Characters(text) => handler.characters(text),
        }
    }
}

/// Collects every event it receives.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Vec<Event>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Names of all started elements, in order.
    pub fn started(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Start { name, .. } | Event::StartWithVector { name, .. } => {
                    Some(name.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Properties of the first started element called `name`.
    pub fn first_properties(&self, name: &str) -> Option<&PropertyList> {
        self.events.iter().find_map(|e| match e {
            Event::Start {
                name: n,
                properties,
            }
            | Event::StartWithVector {
                name: n,
                properties,
                ..
            } if n == name => Some(properties),
            _ => None,
        })
    }
}

impl DocumentHandler for EventRecorder {
    fn start_element(&mut self, name: &str, properties: &PropertyList) {
        self.events.push(Event::start(name, properties.clone()));
    }

    fn start_element_with_vector(
        &mut self,
        name: &str,
        properties: &PropertyList,
        vector: &PropertyListVector,
    ) {
        self.events.push(Event::StartWithVector {
            name: name.to_string(),
            properties: properties.clone(),
            vector: vector.clone(),
        });
    }

    fn end_element(&mut self, name: &str) {
        self.events.push(Event::End(name.to_string()));
    }

    fn insert_element(&mut self, name: &str) {
        self.events.push(Event::Insert(name.to_string()));
    }

    fn characters(&mut self, text: &str) {
        self.events.push(Event::Characters(text.to_string()));
    }
}
