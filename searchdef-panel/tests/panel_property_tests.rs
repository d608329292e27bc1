use proptest::prelude::*;
use searchdef_panel::{PanelPhase, SearchDefinitionPanel};
use searchdef_test_utils::{
    arb_search_definition, search_note, text_note, MockNoteCache, MockNoteStore,
};
use std::sync::Arc;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    // Binding a note and committing it unchanged writes back exactly the
    // labels it was loaded from.
    #[test]
    fn bind_then_commit_preserves_definition(def in arb_search_definition()) {
        let rt = runtime();
        rt.block_on(async {
            let store = MockNoteStore::new();
            let cache = MockNoteCache::new();
            if let Some(sub_tree) = &def.sub_tree_note_id {
                cache.insert(text_note(sub_tree.as_str(), "Scope"));
            }
            let panel = SearchDefinitionPanel::new(
                Arc::new(store.clone()),
                Arc::new(cache.clone()),
                Duration::from_millis(2000),
            );

            panel.bind(&search_note("s1", "Plain", &def)).await;
            prop_assert_eq!(panel.fields().definition(), def.clone());

            // A no-op edit still pushes the full label set.
            panel.set_search_string(def.search_string.clone());
            panel.flush().await.unwrap();
            prop_assert_eq!(panel.phase(), PanelPhase::Bound);
            let writes = store.attribute_writes();
            prop_assert_eq!(writes.len(), 1);
            prop_assert_eq!(&writes[0].1, &def.to_attributes());
            Ok(())
        })?;
    }
}
