//! Pending attribute changes and how they are applied.

use serde::{Deserialize, Serialize};

use crate::document::{Attribute, Element, ElementPath, ManifestDocument, QName};
use crate::writer::{append_attribute, render_start_tag, replace_attribute_value};
use crate::ManifestError;

/// One pending change: set `name` to `value` on the element at `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMutation {
    /// Element the change applies to.
    pub target: ElementPath,

    /// Tag of the target element, for reporting.
    pub element: String,

    /// Attribute being set.
    pub name: QName,

    /// New (unescaped) value.
    pub value: String,

    /// Value before the change, if the attribute existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl AttributeMutation {
    /// Human-readable one-liner.
    pub fn describe(&self) -> String {
        match &self.previous {
            Some(prev) => format!(
                "<{}> {}: {:?} -> {:?}",
                self.element, self.name, prev, self.value
            ),
            None => format!("<{}> {}={:?} added", self.element, self.name, self.value),
        }
    }
}

impl ManifestDocument {
    /// Apply one mutation. Returns whether the document changed.
    pub fn apply(&mut self, mutation: &AttributeMutation) -> Result<bool, ManifestError> {
        let element = self
            .element_mut(&mutation.target)
            .ok_or_else(|| ManifestError::ElementNotFound(mutation.target.clone()))?;
        Ok(element.set_attribute(mutation.name.clone(), &mutation.value))
    }

    /// Apply mutations in order. Returns how many changed the document.
    pub fn apply_all<'a, I>(&mut self, mutations: I) -> Result<usize, ManifestError>
    where
        I: IntoIterator<Item = &'a AttributeMutation>,
    {
        let mut changed = 0;
        for mutation in mutations {
            if self.apply(mutation)? {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

impl Element {
    /// Set an attribute, editing the start tag in place.
    ///
    /// An existing attribute in the same slot keeps its position; a new one
    /// is appended. Returns false when the value was already set.
    pub fn set_attribute(&mut self, name: QName, value: &str) -> bool {
        let raw = quick_xml::escape::escape(value).into_owned();

        if let Some(index) = self.attributes.iter().position(|a| a.name.same_slot(&name)) {
            let existing = &self.attributes[index];
            if existing.value() == value {
                return false;
            }
            let qualified = existing.name.qualified();
            let edited =
                replace_attribute_value(&self.start_tag, &qualified, &existing.raw_value, &raw);
            self.attributes[index].raw_value = raw;
            let tag = match edited {
                Some(tag) => tag,
                None => render_start_tag(self),
            };
            self.start_tag = tag;
            return true;
        }

        self.start_tag = append_attribute(&self.start_tag, &name.qualified(), &raw);
        self.attributes.push(Attribute {
            name,
            raw_value: raw,
        });
        true
    }
}
