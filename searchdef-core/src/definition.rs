//! Search definition and its attribute encoding.
//!
//! A search definition is never stored as its own record. It lives on the
//! owning note as three labels:
//!
//! | label                | value                                   |
//! |----------------------|-----------------------------------------|
//! | `searchString`       | the query text                          |
//! | `includeNoteContent` | the literal string `"true"` or `"false"` |
//! | `subTreeNoteId`      | scope note id, omitted when unrestricted |
//!
//! The string-encoded boolean is part of the wire contract with the note
//! server and other consumers, so it stays a string on the wire.

use crate::attribute::{label_value, Attribute};
use crate::identity::NoteId;
use serde::{Deserialize, Serialize};

pub const ATTR_SEARCH_STRING: &str = "searchString";
pub const ATTR_INCLUDE_NOTE_CONTENT: &str = "includeNoteContent";
pub const ATTR_SUB_TREE_NOTE_ID: &str = "subTreeNoteId";

/// Prefix marking a title as generated from the search string.
pub const SEARCH_TITLE_PREFIX: &str = "Search: ";

/// Search strings this long or longer are cut in generated titles.
pub const TITLE_TRUNCATE_CHARS: usize = 30;

const TITLE_ELLIPSIS: char = '…';

/// The user-editable part of a search note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDefinition {
    pub search_string: String,
    pub include_note_content: bool,
    pub sub_tree_note_id: Option<NoteId>,
}

impl Default for SearchDefinition {
    /// A fresh definition searches note content too.
    fn default() -> Self {
        Self {
            search_string: String::new(),
            include_note_content: true,
            sub_tree_note_id: None,
        }
    }
}

impl SearchDefinition {
    pub fn new(search_string: impl Into<String>) -> Self {
        Self {
            search_string: search_string.into(),
            ..Self::default()
        }
    }

    /// Encode as the full label set, in a stable order.
    pub fn to_attributes(&self) -> Vec<Attribute> {
        let mut attributes = vec![
            Attribute::label(ATTR_SEARCH_STRING, self.search_string.clone()),
            Attribute::label(
                ATTR_INCLUDE_NOTE_CONTENT,
                if self.include_note_content { "true" } else { "false" },
            ),
        ];
        if let Some(sub_tree) = self.sub_tree_note_id.as_ref().filter(|id| !id.as_str().is_empty()) {
            attributes.push(Attribute::label(ATTR_SUB_TREE_NOTE_ID, sub_tree.as_str()));
        }
        attributes
    }

    /// Decode from a note's attribute list.
    ///
    /// Missing `includeNoteContent` decodes as `false`: only the exact
    /// string `"true"` enables content search.
    pub fn from_attributes(attributes: &[Attribute]) -> Self {
        Self {
            search_string: label_value(attributes, ATTR_SEARCH_STRING)
                .unwrap_or_default()
                .to_string(),
            include_note_content: label_value(attributes, ATTR_INCLUDE_NOTE_CONTENT)
                == Some("true"),
            sub_tree_note_id: label_value(attributes, ATTR_SUB_TREE_NOTE_ID).and_then(NoteId::parse),
        }
    }

    /// New title for a note currently titled `current_title`, or `None`
    /// when the title was not generated and must be left alone.
    pub fn rewritten_title(&self, current_title: &str) -> Option<String> {
        if current_title.starts_with(SEARCH_TITLE_PREFIX) {
            Some(search_note_title(&self.search_string))
        } else {
            None
        }
    }
}

/// Generated title for a search string.
pub fn search_note_title(search_string: &str) -> String {
    if search_string.chars().count() < TITLE_TRUNCATE_CHARS {
        format!("{SEARCH_TITLE_PREFIX}{search_string}")
    } else {
        let head: String = search_string.chars().take(TITLE_TRUNCATE_CHARS).collect();
        format!("{SEARCH_TITLE_PREFIX}{head}{TITLE_ELLIPSIS}")
    }
}

/// Content export handed to the note-content saver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchContent {
    pub search_string: String,
}

impl SearchContent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
