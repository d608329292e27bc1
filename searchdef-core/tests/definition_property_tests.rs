use proptest::prelude::*;
use searchdef_core::{
    search_note_title, NoteId, SearchDefinition, SEARCH_TITLE_PREFIX, TITLE_TRUNCATE_CHARS,
};

fn definition_strategy() -> impl Strategy<Value = SearchDefinition> {
    (
        ".{0,60}",
        any::<bool>(),
        proptest::option::of("[a-zA-Z0-9]{0,12}"),
    )
        .prop_map(|(search_string, include_note_content, sub_tree)| SearchDefinition {
            search_string,
            include_note_content,
            sub_tree_note_id: sub_tree.map(NoteId::new),
        })
}

fn normalized(mut def: SearchDefinition) -> SearchDefinition {
    def.sub_tree_note_id = def
        .sub_tree_note_id
        .and_then(|id| NoteId::parse(id.as_str()));
    def
}

proptest! {
    #[test]
    fn attributes_round_trip(def in definition_strategy()) {
        let decoded = SearchDefinition::from_attributes(&def.to_attributes());
        prop_assert_eq!(decoded, normalized(def));
    }

    #[test]
    fn attribute_order_is_stable(def in definition_strategy()) {
        let first = def.to_attributes();
        let second = def.to_attributes();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first[0].name.as_str(), "searchString");
        prop_assert_eq!(first[1].name.as_str(), "includeNoteContent");
    }

    #[test]
    fn generated_title_keeps_prefix_and_bounds(search in ".{0,80}") {
        let title = search_note_title(&search);
        prop_assert!(title.starts_with(SEARCH_TITLE_PREFIX));
        let body = &title[SEARCH_TITLE_PREFIX.len()..];
        let len = search.chars().count();
        if len < TITLE_TRUNCATE_CHARS {
            prop_assert_eq!(body, search.as_str());
        } else {
            prop_assert_eq!(body.chars().count(), TITLE_TRUNCATE_CHARS + 1);
            prop_assert!(body.ends_with('…'));
        }
    }
}
