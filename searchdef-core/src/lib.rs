//! Searchdef Core - Note and Search Definition Types
//!
//! Data types shared by every other crate: note identities, attributes,
//! the search definition codec and the collaborator traits the panel
//! talks to. No runtime or transport code lives here.

pub mod attribute;
pub mod definition;
pub mod error;
pub mod identity;
pub mod note;
pub mod traits;

pub use attribute::{Attribute, AttributeType};
pub use definition::{
    search_note_title, SearchContent, SearchDefinition, ATTR_INCLUDE_NOTE_CONTENT,
    ATTR_SEARCH_STRING, ATTR_SUB_TREE_NOTE_ID, SEARCH_TITLE_PREFIX, TITLE_TRUNCATE_CHARS,
};
pub use error::{StorageError, StorageResult};
pub use identity::NoteId;
pub use note::{Note, NoteType};
pub use traits::{NoteAutocomplete, NoteCache, NoteStore, NoteSuggestion};
