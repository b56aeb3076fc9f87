use super::*;
use crate::foundation::error::{ArtstreamError, ArtstreamResult};
use crate::registry::store::{InMemoryBlockStore, SavedBlock};

const OPEN: &str = "Here:\n<OUTPUT_START type=\"code\" title=\"demo\"/>\n";

fn registry() -> OutputRegistry<InMemoryBlockStore> {
    OutputRegistry::new(InMemoryBlockStore::new(), RegistryOpts::default())
}

#[derive(Default)]
struct FailingStore {
    attempts: usize,
}

impl BlockStore for FailingStore {
    fn save(&mut self, _block: &FinalizedBlock) -> ArtstreamResult<SavedBlock> {
        self.attempts += 1;
        Err(ArtstreamError::persistence("backend unavailable"))
    }
}

#[test]
fn new_streaming_block_is_selected_and_opens_panel() {
    let mut reg = registry();
    let up = reg.on_text_update(&format!("{OPEN}line1\n"), "m1", "c1");

    assert_eq!(up.inserted.len(), 1);
    let id = up.inserted[0].clone();
    assert_eq!(up.selected.as_deref(), Some(id.as_str()));
    assert!(up.finalized.is_empty());
    assert_eq!(reg.streaming_block_id(), Some(id.as_str()));
    assert_eq!(reg.display().selected_block_id.as_deref(), Some(id.as_str()));
    assert!(reg.display().panel_open);
    assert_eq!(reg.block(&id).unwrap().chat_id.as_deref(), Some("c1"));
}

#[test]
fn redundant_updates_are_no_ops() {
    let mut reg = registry();
    let text = format!("{OPEN}line1\n");
    reg.on_text_update(&text, "m1", "c1");
    let again = reg.on_text_update(&text, "m1", "c1");
    assert!(again.is_empty());
    assert_eq!(reg.blocks().len(), 1);
}

#[test]
fn growth_updates_in_place_and_completion_persists_once() {
    let mut reg = registry();
    let first = reg.on_text_update(&format!("{OPEN}line1\n"), "m1", "c1");
    let id = first.inserted[0].clone();

    let grown = reg.on_text_update(&format!("{OPEN}line1\nline2\n"), "m1", "c1");
    assert_eq!(grown.updated, vec![id.clone()]);
    assert!(grown.inserted.is_empty());
    assert!(grown.selected.is_none());

    let done_text = format!("{OPEN}line1\nline2\n<OUTPUT_END/>\nThanks");
    let done = reg.on_text_update(&done_text, "m1", "c1");
    assert_eq!(done.finalized, vec![id.clone()]);
    assert_eq!(reg.streaming_block_id(), None);
    assert!(reg.block(&id).unwrap().is_complete);

    let repeat = reg.on_text_update(&done_text, "m1", "c1");
    assert!(repeat.is_empty());

    let saved = reg.store().saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, id);
    assert_eq!(saved[0].content, "line1\nline2\n");
    assert!(!saved[0].metadata.forced);
}

#[test]
fn block_complete_on_first_sight_is_inserted_and_persisted() {
    let mut reg = registry();
    let text = "<OUTPUT_START type=\"table\" title=\"t\"/>\n|a|\n<OUTPUT_END/>";
    let up = reg.on_text_update(text, "m1", "c1");
    assert_eq!(up.inserted.len(), 1);
    assert_eq!(up.finalized, up.inserted);
    assert_eq!(up.selected, up.inserted.first().cloned());
    assert_eq!(reg.streaming_block_id(), None);
    assert_eq!(reg.store().saved().len(), 1);
}

#[test]
fn each_new_block_signals_selection_once() {
    let mut reg = registry();
    let a = "<OUTPUT_START type=\"code\" title=\"a\"/>\nx\n<OUTPUT_END/>\n";
    let first = reg.on_text_update(a, "m1", "c1");
    let a_id = first.inserted[0].clone();

    let b = format!("{a}<OUTPUT_START type=\"code\" title=\"b\"/>\ny");
    let second = reg.on_text_update(&b, "m1", "c1");
    assert_eq!(second.inserted.len(), 1);
    let b_id = second.inserted[0].clone();
    assert_ne!(a_id, b_id);
    assert_eq!(second.selected.as_deref(), Some(b_id.as_str()));

    reg.close_panel();
    let third = reg.on_text_update(&format!("{b}y"), "m1", "c1");
    assert!(third.selected.is_none());
    assert!(!reg.display().panel_open);
}

#[test]
fn persistence_failures_do_not_touch_memory() {
    let mut reg = OutputRegistry::new(FailingStore::default(), RegistryOpts::default());
    let text = "<OUTPUT_START type=\"code\" title=\"a\"/>\nx\n<OUTPUT_END/>";
    let up = reg.on_text_update(text, "m1", "c1");
    assert_eq!(up.finalized.len(), 1);
    assert_eq!(reg.blocks().len(), 1);
    assert!(reg.blocks()[0].is_complete);
    assert_eq!(reg.blocks()[0].content, "x\n");

    // Finalization is one-shot: no retry on repeat.
    reg.on_text_update(text, "m1", "c1");
    assert_eq!(reg.store().attempts, 1);
}

#[test]
fn new_message_tears_down_previous_without_deleting() {
    let mut reg = registry();
    let up = reg.on_text_update(&format!("{OPEN}partial"), "m1", "c1");
    let old_id = up.inserted[0].clone();

    let next = reg.on_text_update("Next reply, no blocks", "m2", "c1");
    assert_eq!(next.finalized, vec![old_id.clone()]);
    assert_eq!(reg.message_id(), Some("m2"));
    assert_eq!(reg.streaming_block_id(), None);

    let old = reg.block(&old_id).unwrap();
    assert!(old.is_complete);
    assert_eq!(old.content, "partial");
    assert_eq!(reg.blocks_for_message("m1").count(), 1);

    let saved = reg.store().saved();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].metadata.forced);
}

#[test]
fn same_layout_in_new_message_gets_new_identity() {
    let mut reg = registry();
    let text = format!("{OPEN}x\n<OUTPUT_END/>");
    reg.on_text_update(&text, "m1", "c1");
    let up = reg.on_text_update(&text, "m2", "c1");
    assert_eq!(up.inserted.len(), 1);
    assert_eq!(reg.blocks().len(), 2);
    assert_eq!(reg.store().saved().len(), 2);
}

#[test]
fn abort_force_completes_streaming_block() {
    let mut reg = registry();
    let text = format!("{OPEN}half of it");
    let up = reg.on_text_update(&text, "m1", "c1");
    let id = up.inserted[0].clone();

    let aborted = reg.abort();
    assert_eq!(aborted.finalized, vec![id.clone()]);
    assert!(reg.block(&id).unwrap().is_complete);
    assert_eq!(reg.streaming_block_id(), None);

    // Late text for the aborted message neither reopens nor re-persists the block.
    let late = reg.on_text_update(&format!("{text} more"), "m1", "c1");
    assert!(late.is_empty());
    assert_eq!(reg.store().saved().len(), 1);
    assert!(reg.abort().is_empty());
}

#[test]
fn forced_blocks_skip_persistence_when_disabled() {
    let opts = RegistryOpts {
        persist_forced: false,
        ..RegistryOpts::default()
    };
    let mut reg = OutputRegistry::new(InMemoryBlockStore::new(), opts);
    reg.on_text_update(&format!("{OPEN}x"), "m1", "c1");
    let up = reg.end_message();
    assert_eq!(up.finalized.len(), 1);
    assert!(reg.store().saved().is_empty());
    assert_eq!(reg.message_id(), None);
}

#[test]
fn selection_side_effects_follow_opts() {
    let opts = RegistryOpts {
        auto_open_panel: false,
        select_new_blocks: false,
        ..RegistryOpts::default()
    };
    let mut reg = OutputRegistry::new(InMemoryBlockStore::new(), opts);
    let up = reg.on_text_update(&format!("{OPEN}x"), "m1", "c1");
    assert!(up.selected.is_none());
    assert_eq!(reg.display(), &DisplaySurface::default());

    let id = up.inserted[0].clone();
    assert!(reg.select(&id));
    assert!(reg.display().panel_open);
    assert!(!reg.select("missing"));
}

#[test]
fn duplicate_ids_keep_one_entry_and_persist_once() {
    let mut reg = registry();
    let text = "<OUTPUT_START id=\"dup\" type=\"code\" title=\"a\"/>\none\n<OUTPUT_END/>\n\
                <OUTPUT_START id=\"dup\" type=\"code\" title=\"b\"/>\ntwo\n<OUTPUT_END/>";
    let up = reg.on_text_update(text, "m1", "c1");
    assert_eq!(up.inserted, vec!["dup".to_string()]);
    assert_eq!(reg.blocks().len(), 1);
    let block = reg.block("dup").unwrap();
    assert_eq!(block.title, "b");
    assert_eq!(block.content, "two\n");
    assert_eq!(reg.store().saved().len(), 1);
    assert_eq!(reg.store().saved()[0].content, "two\n");

    let again = reg.on_text_update(text, "m1", "c1");
    assert!(again.is_empty(), "{again:?}");
    assert_eq!(reg.block("dup").unwrap().content, "two\n");
    assert_eq!(reg.store().saved().len(), 1);
}

#[test]
fn streaming_duplicate_does_not_displace_complete_block() {
    let mut reg = registry();
    let text = "<OUTPUT_START id=\"dup\" type=\"code\" title=\"a\"/>\none\n<OUTPUT_END/>\n\
                <OUTPUT_START id=\"dup\" type=\"code\" title=\"b\"/>\ntw";
    let up = reg.on_text_update(text, "m1", "c1");
    assert_eq!(up.finalized, vec!["dup".to_string()]);
    assert_eq!(reg.block("dup").unwrap().content, "one\n");
    assert_eq!(reg.streaming_block_id(), None);
    assert!(reg.on_text_update(text, "m1", "c1").is_empty());

    let done = format!("{text}o\n<OUTPUT_END/>");
    let up = reg.on_text_update(&done, "m1", "c1");
    assert_eq!(up.updated, vec!["dup".to_string()]);
    assert!(up.finalized.is_empty());
    assert_eq!(reg.block("dup").unwrap().content, "two\n");
    assert_eq!(reg.store().saved().len(), 1);
}

#[test]
fn into_store_hands_back_persisted_blocks() {
    let opts = RegistryOpts {
        persist_forced: false,
        ..RegistryOpts::default()
    };
    let mut reg = OutputRegistry::new(InMemoryBlockStore::new(), opts.clone());
    assert_eq!(reg.opts(), &opts);

    reg.on_text_update(
        "<OUTPUT_START type=\"json\" title=\"j\"/>\n{}\n<OUTPUT_END/>\n\
         <OUTPUT_START type=\"text\" title=\"t\"/>\nopen",
        "m1",
        "c1",
    );
    assert_eq!(reg.abort().finalized.len(), 1);

    let store = reg.into_store();
    assert_eq!(store.saved().len(), 1);
    assert_eq!(store.saved()[0].title, "j");
    assert!(!store.saved()[0].metadata.forced);
}

#[test]
fn registry_opts_load_from_partial_json() {
    let opts: RegistryOpts = serde_json::from_str(r#"{"auto_open_panel":false}"#).unwrap();
    assert!(!opts.auto_open_panel);
    assert!(opts.select_new_blocks);
    assert!(opts.persist_forced);
}
