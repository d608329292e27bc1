//! Attributes attached to notes.

use serde::{Deserialize, Serialize};

/// Attribute kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Label,
    Relation,
}

/// A typed name/value pair on a note.
///
/// Names are unique by convention only; when a name repeats, the last
/// occurrence is the one that counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn label(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_type: AttributeType::Label,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn relation(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_type: AttributeType::Relation,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn is_label(&self) -> bool {
        self.attribute_type == AttributeType::Label
    }
}

/// Value of the last label called `name`, if any.
pub fn label_value<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .rev()
        .find(|attr| attr.is_label() && attr.name == name)
        .map(|attr| attr.value.as_str())
}
