//! Hierarchical metric namespaces.
//!
//! A namespace is an ordered list of elements. Static elements match one
//! literal; dynamic elements stand for "any resource of this kind" and carry
//! a name and description. In the catalog a dynamic element has the value
//! `*`; in collected metrics it holds the concrete resource id while keeping
//! its name, so callers can tell which position was materialized.
//!
//! The string form joins values with a separator and starts with it. The
//! separator is `/` unless a value contains one (mount points do), in which
//! case the first unused character from [`SEPARATORS`] is used instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value of a dynamic element that has not been materialized.
pub const WILDCARD: &str = "*";

/// Separator candidates, in order of preference.
pub const SEPARATORS: &[char] = &['/', '|', '%', ':', ';', ',', '^', '>', '<', '+', '=', '&'];

/// One element of a [`Namespace`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceElement {
    pub value: String,
    /// Set for dynamic elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl NamespaceElement {
    pub fn fixed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name: None,
            description: String::new(),
        }
    }

    pub fn dynamic(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: WILDCARD.to_string(),
            name: Some(name.into()),
            description: description.into(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.name.is_some()
    }

    pub fn is_wildcard(&self) -> bool {
        self.value == WILDCARD
    }
}

/// Error returned when parsing a namespace string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceParseError {
    Empty,
    /// Element at the given position is empty (`/intel//psutil`).
    EmptyElement(usize),
}

impl fmt::Display for NamespaceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceParseError::Empty => write!(f, "empty namespace"),
            NamespaceParseError::EmptyElement(i) => {
                write!(f, "namespace element {} is empty", i)
            }
        }
    }
}

impl std::error::Error for NamespaceParseError {}

/// An ordered sequence of namespace elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(Vec<NamespaceElement>);

impl Namespace {
    /// Creates a namespace of static elements.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(NamespaceElement::fixed).collect())
    }

    pub fn add_static(mut self, value: impl Into<String>) -> Self {
        self.0.push(NamespaceElement::fixed(value));
        self
    }

    pub fn add_dynamic(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.0.push(NamespaceElement::dynamic(name, description));
        self
    }

    pub fn elements(&self) -> &[NamespaceElement] {
        &self.0
    }

    pub fn element(&self, index: usize) -> Option<&NamespaceElement> {
        self.0.get(index)
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(|e| e.value.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.value.as_str())
    }

    /// Value of the last element, the metric name.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(|e| e.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of the dynamic element, if any.
    pub fn dynamic_index(&self) -> Option<usize> {
        self.0.iter().position(NamespaceElement::is_dynamic)
    }

    /// True when no element holds the wildcard value.
    pub fn is_concrete(&self) -> bool {
        !self.0.iter().any(NamespaceElement::is_wildcard)
    }

    /// Returns true if every value equals the corresponding value of `other`.
    ///
    /// Element kinds are ignored, so a parsed request compares equal to the
    /// metric it produced.
    pub fn same_values(&self, other: &Namespace) -> bool {
        self.len() == other.len() && self.values().eq(other.values())
    }

    /// Returns a copy with the element at `index` set to `value`.
    ///
    /// Dynamic elements keep their name and description.
    pub fn with_value(&self, index: usize, value: impl Into<String>) -> Self {
        let mut ns = self.clone();
        if let Some(element) = ns.0.get_mut(index) {
            element.value = value.into();
        }
        ns
    }

    /// Returns true if `request` fits this template: same length, equal
    /// static values, and any non-empty value where the template is dynamic.
    pub fn matches(&self, request: &Namespace) -> bool {
        self.len() == request.len()
            && self.0.iter().zip(request.values()).all(|(t, v)| {
                if t.is_dynamic() {
                    !v.is_empty()
                } else {
                    t.value == v
                }
            })
    }

    /// Separator used by the string form.
    pub fn separator(&self) -> char {
        SEPARATORS
            .iter()
            .copied()
            .find(|sep| !self.0.iter().any(|e| e.value.contains(*sep)))
            .unwrap_or('/')
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = self.separator();
        for element in &self.0 {
            write!(f, "{}{}", sep, element.value)?;
        }
        Ok(())
    }
}

impl FromStr for Namespace {
    type Err = NamespaceParseError;

    /// Parses the string form. The first character is the separator; strings
    /// starting with a letter are read as `/`-separated without the leading
    /// separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(first) = s.chars().next() else {
            return Err(NamespaceParseError::Empty);
        };

        let (sep, body) = if SEPARATORS.contains(&first) {
            (first, &s[first.len_utf8()..])
        } else {
            ('/', s)
        };
        if body.is_empty() {
            return Err(NamespaceParseError::Empty);
        }

        let mut elements = Vec::new();
        for (i, value) in body.split(sep).enumerate() {
            if value.is_empty() {
                return Err(NamespaceParseError::EmptyElement(i));
            }
            elements.push(NamespaceElement::fixed(value));
        }

        Ok(Self(elements))
    }
}
