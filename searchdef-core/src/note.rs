//! Note entity as seen by the panel.

use crate::attribute::{label_value, Attribute};
use crate::identity::NoteId;
use serde::{Deserialize, Serialize};

/// Note type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteType {
    Text,
    Code,
    Search,
    Book,
    File,
    Image,
    RelationMap,
    Render,
    #[serde(other)]
    Other,
}

/// A persisted note: identity, title and its ordered attribute list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: NoteId,
    pub title: String,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Note {
    pub fn new(note_id: impl Into<NoteId>, title: impl Into<String>, note_type: NoteType) -> Self {
        Self {
            note_id: note_id.into(),
            title: title.into(),
            note_type,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn is_search(&self) -> bool {
        self.note_type == NoteType::Search
    }

    /// Value of the label `name`, last occurrence winning.
    pub fn label_value(&self, name: &str) -> Option<&str> {
        label_value(&self.attributes, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_server_payload() {
        let payload = serde_json::json!({
            "noteId": "n1",
            "title": "Search: rock",
            "type": "search",
            "attributes": [
                { "type": "label", "name": "searchString", "value": "rock" }
            ]
        });
        let note: Note = serde_json::from_value(payload).unwrap();
        assert_eq!(note.note_id, NoteId::new("n1"));
        assert!(note.is_search());
        assert_eq!(note.label_value("searchString"), Some("rock"));
    }

    #[test]
    fn unknown_note_type_maps_to_other() {
        let payload = serde_json::json!({
            "noteId": "n2",
            "title": "Canvas",
            "type": "canvas"
        });
        let note: Note = serde_json::from_value(payload).unwrap();
        assert_eq!(note.note_type, NoteType::Other);
        assert!(note.attributes.is_empty());
    }
}
