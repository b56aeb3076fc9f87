use super::*;

fn block(content: &str) -> OutputBlock {
    OutputBlock {
        id: "b1".to_string(),
        title: "demo".to_string(),
        kind: BlockKind::Code,
        content: content.to_string(),
        is_complete: true,
        start_index: 0,
        end_index: 10,
        message_id: "m1".to_string(),
        chat_id: Some("c1".to_string()),
    }
}

#[test]
fn finalized_block_carries_metadata() {
    let f = FinalizedBlock::from_block(&block("a\nbé\n"), false);
    assert_eq!(f.id, "b1");
    assert_eq!(f.metadata.message_id, "m1");
    assert_eq!(f.metadata.chat_id.as_deref(), Some("c1"));
    assert_eq!(f.metadata.char_count, 5);
    assert_eq!(f.metadata.line_count, 2);
    assert!(!f.metadata.forced);
}

#[test]
fn in_memory_store_records_in_order() {
    let mut store = InMemoryBlockStore::new();
    let mut boxed: Box<dyn BlockStore> = Box::new(InMemoryBlockStore::new());
    let a = FinalizedBlock::from_block(&block("a"), false);
    assert_eq!(store.save(&a).unwrap().id, "b1");
    assert_eq!(boxed.save(&a).unwrap().id, "b1");
    assert_eq!(store.saved().len(), 1);
    assert_eq!(store.saved()[0], a);
}

#[test]
fn jsonl_store_appends_lines() {
    let dir = PathBuf::from("target").join("artstream_store_test");
    let path = dir.join("blocks.jsonl");
    let _ = std::fs::remove_file(&path);

    {
        let mut store = JsonlBlockStore::open(&path).unwrap();
        store
            .save(&FinalizedBlock::from_block(&block("one"), false))
            .unwrap();
        store
            .save(&FinalizedBlock::from_block(&block("two"), true))
            .unwrap();
        assert_eq!(store.path(), path.as_path());
    }

    let raw = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<FinalizedBlock> = raw
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].content, "one");
    assert!(lines[1].metadata.forced);
    assert!(raw.contains("\"type\":\"code\""));
}
