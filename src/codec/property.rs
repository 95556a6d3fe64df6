//! Property values and lists attached to structural events.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// Unit of a [`PropertyValue::Double`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Unit {
    Inch,
    Point,
    Percent,
    #[default]
    Generic,
}

impl Unit {
    /// Suffix used in the string form.
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Inch => "in",
            Unit::Point => "pt",
            Unit::Percent => "%",
            Unit::Generic => "",
        }
    }
}

/// A typed scalar property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Double { value: f64, unit: Unit },
    String(String),
}

impl PropertyValue {
    pub fn inches(value: f64) -> Self {
        PropertyValue::Double {
            value,
            unit: Unit::Inch,
        }
    }

    pub fn points(value: f64) -> Self {
        PropertyValue::Double {
            value,
            unit: Unit::Point,
        }
    }

    /// A percentage; `1.0` is 100%.
    pub fn percent(value: f64) -> Self {
        PropertyValue::Double {
            value,
            unit: Unit::Percent,
        }
    }

    /// The wire representation of the value.
    pub fn to_wire_string(&self) -> String {
        self.to_string()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; string values are parsed.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            PropertyValue::Bool(b) => Some(i32::from(*b)),
            PropertyValue::String(s) => s.trim().parse().ok(),
            PropertyValue::Double { .. } => None,
        }
    }

    /// Numeric view without unit; string values are parsed with their
    /// unit suffix stripped. Percentages come back as fractions.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(f64::from(*v)),
            PropertyValue::Double { value, .. } => Some(*value),
            PropertyValue::Bool(_) => None,
            PropertyValue::String(s) => {
                let s = s.trim();
                if let Some(pct) = s.strip_suffix('%') {
                    return pct.parse::<f64>().ok().map(|v| v / 100.0);
                }
                let number = s
                    .strip_suffix("in")
                    .or_else(|| s.strip_suffix("pt"))
                    .unwrap_or(s);
                number.parse().ok()
            }
        }
    }

    /// Boolean view; accepts `true`/`false` and integers.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::Int(v) => Some(*v != 0),
            PropertyValue::String(s) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                other => other.parse::<i32>().ok().map(|v| v != 0),
            },
            PropertyValue::Double { .. } => None,
        }
    }
}

/// Formats a number with at most four decimals and no trailing zeros.
fn format_number(value: f64) -> String {
    let mut s = format!("{:.4}", value);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Double {
                value,
                unit: Unit::Percent,
            } => write!(f, "{}%", format_number(value * 100.0)),
            PropertyValue::Double { value, unit } => {
                write!(f, "{}{}", format_number(*value), unit.suffix())
            }
            PropertyValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double {
            value,
            unit: Unit::Generic,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

/// An ordered map from property names to values.
///
/// Keys are unique; inserting an existing key replaces its value in place,
/// so serialization order is the order of first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyList {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        let at = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(at).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropertyValue::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(PropertyValue::as_int)
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropertyValue::as_double)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PropertyValue::as_bool)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The list as it comes back from the wire: every value a string.
    pub fn stringified(&self) -> PropertyList {
        PropertyList {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), PropertyValue::String(v.to_wire_string())))
                .collect(),
        }
    }
}

impl Serialize for PropertyList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, &v.to_wire_string())?;
        }
        map.end()
    }
}

/// An ordered sequence of property lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyListVector {
    lists: Vec<PropertyList>,
}

impl PropertyListVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, list: PropertyList) {
        self.lists.push(list);
    }

    pub fn get(&self, index: usize) -> Option<&PropertyList> {
        self.lists.get(index)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyList> {
        self.lists.iter()
    }

    pub fn stringified(&self) -> PropertyListVector {
        PropertyListVector {
            lists: self.lists.iter().map(PropertyList::stringified).collect(),
        }
    }
}

impl FromIterator<PropertyList> for PropertyListVector {
    fn from_iter<I: IntoIterator<Item = PropertyList>>(iter: I) -> Self {
        Self {
            lists: iter.into_iter().collect(),
        }
    }
}
