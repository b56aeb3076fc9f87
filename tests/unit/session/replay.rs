use super::*;
use crate::registry::store::InMemoryBlockStore;

fn session() -> GenerationSession<InMemoryBlockStore> {
    GenerationSession::new(InMemoryBlockStore::new(), RegistryOpts::default())
}

fn text(message_id: &str, chunk: &str) -> SessionEvent {
    SessionEvent::Text {
        message_id: message_id.to_string(),
        chat_id: "c1".to_string(),
        chunk: chunk.to_string(),
    }
}

#[test]
fn transcript_accumulates_per_message() {
    let mut t = TranscriptBuffer::default();
    assert_eq!(t.push("m1", "ab"), "ab");
    assert_eq!(t.push("m2", "x"), "x");
    assert_eq!(t.push("m1", "cd"), "abcd");
    assert_eq!(t.get("m2"), Some("x"));
    assert_eq!(t.get("m3"), None);
    let ids: Vec<&str> = t.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, ["m1", "m2"]);
}

#[test]
fn chunks_drive_registry_and_lifecycle_drives_machine() {
    let mut s = session();
    let rejected = s.replay([
        SessionEvent::Start {
            prompt: "cat".to_string(),
        },
        SessionEvent::GenerationCreated {
            generation_id: "g1".to_string(),
        },
        text("m1", "Drawing a cat.\n<OUTPUT_START type=\"code\" ti"),
        text("m1", "tle=\"cat\"/>\n /\\_/\\\n"),
        SessionEvent::PlanReady {
            plan: GenerationPlan {
                fps: Some(12),
                ..GenerationPlan::default()
            },
            total_frames: 2,
        },
        SessionEvent::Frame {
            frame: "f1".to_string(),
            index: 1,
        },
        text("m1", "( o.o )\n<OUTPUT_END/>\nDone."),
    ]);
    assert_eq!(rejected, 0);
    assert_eq!(s.machine().progress(), Some(50.0));
    assert_eq!(s.machine().state().frames(), ["f1".to_string()]);
    let secs = s.summary().playback_secs.unwrap();
    assert!((secs - 2.0 / 12.0).abs() < 1e-9);

    let blocks = s.registry().blocks();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].is_complete);
    assert_eq!(blocks[0].content, " /\\_/\\\n( o.o )\n");
    assert_eq!(s.registry().store().saved().len(), 1);
    assert_eq!(
        s.visible_text("m1").as_deref(),
        Some("Drawing a cat.\n\nDone.")
    );

    assert!(s.apply(SessionEvent::Frame {
        frame: "f2".to_string(),
        index: 2
    })
    .applied);
    assert!(s.apply(SessionEvent::Complete {
        artwork_id: Some("art1".to_string())
    })
    .applied);

    let summary = s.summary();
    assert_eq!(summary.phase, "completed");
    assert!(summary.can_start);
    assert_eq!(summary.progress, None);
    assert_eq!(summary.playback_secs, None);
    assert_eq!(summary.state.frames().len(), 2);
    assert_eq!(summary.messages.len(), 1);
    assert!(summary.display.panel_open);
}

#[test]
fn abort_finalizes_streaming_block_and_errors_machine() {
    let mut s = session();
    s.apply(SessionEvent::Start {
        prompt: "cat".to_string(),
    });
    s.apply(text("m1", "<OUTPUT_START type=\"text\" title=\"t\"/>\nhalf"));

    let step = s.apply(SessionEvent::Abort);
    assert!(step.applied);
    assert_eq!(step.update.finalized.len(), 1);
    assert_eq!(s.machine().state().phase(), "error");
    assert!(s.registry().blocks()[0].is_complete);

    let saved = s.registry().store().saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].content, "half");
    assert!(saved[0].metadata.forced);
}

#[test]
fn text_end_only_closes_current_message() {
    let mut s = session();
    s.apply(text("m1", "<OUTPUT_START type=\"text\" title=\"t\"/>\nopen"));
    let other = s.apply(SessionEvent::TextEnd {
        message_id: "m0".to_string(),
    });
    assert!(other.update.is_empty());

    let step = s.apply(SessionEvent::TextEnd {
        message_id: "m1".to_string(),
    });
    assert_eq!(step.update.finalized.len(), 1);
    assert_eq!(s.registry().message_id(), None);
}

#[test]
fn out_of_order_events_are_counted_not_applied() {
    let mut s = session();
    let rejected = s.replay([
        SessionEvent::Frame {
            frame: "f1".to_string(),
            index: 0,
        },
        SessionEvent::Complete { artwork_id: None },
        SessionEvent::Start {
            prompt: "cat".to_string(),
        },
        SessionEvent::Start {
            prompt: "dog".to_string(),
        },
    ]);
    assert_eq!(rejected, 3);
    assert_eq!(s.machine().state().prompt(), Some("cat"));
}

#[test]
fn events_read_from_jsonl() {
    let raw = r#"{"type":"start","prompt":"cat"}

{"type":"plan_ready","plan":{"fps":12},"total_frames":4}
{"type":"text","message_id":"m1","chat_id":"c1","chunk":"hi"}
{"type":"abort"}
"#;
    let events = read_events(raw.as_bytes()).unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events[3], SessionEvent::Abort);

    let err = read_events("{\"type\":\"start\"}\n".as_bytes()).unwrap_err();
    assert!(err.to_string().contains("event line 1"));
}
