use luna_core::{
    DispatchContext, DispatchSettings, Dispatcher, Intent, IntentClassifier, MemoryDocument,
    PatternClassifier, SectionTarget, Block,
};
use std::io::Write;

const INTENTS: &str = r#"{
  "intents": [
    {"tag": "greeting", "patterns": ["hi", "hello", "good morning"]},
    {"tag": "about", "patterns": ["who are you", "what are you"]},
    {"tag": "create_todo_today", "patterns": ["add a todo today", "remind me today"]},
    {"tag": "create_todo_tomorrow", "patterns": ["add a todo tomorrow", "remind me tomorrow"]},
    {"tag": "read_todos_today", "patterns": ["what are my tasks for today"]},
    {"tag": "read_todos_tomorrow", "patterns": ["what are my tasks for tomorrow"]}
  ]
}"#;

fn intents_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(INTENTS.as_bytes()).expect("write intents");
    file
}

#[test]
fn loads_tags_in_file_order() {
    let file = intents_file();
    let classifier = PatternClassifier::from_path(file.path()).expect("load intents");
    let tags: Vec<&str> = classifier.tags().collect();
    assert_eq!(tags[0], "greeting");
    assert_eq!(tags.len(), 6);
}

#[test]
fn exact_pattern_dispatches_confidently() {
    let file = intents_file();
    let classifier = PatternClassifier::from_path(file.path()).expect("load intents");

    let top = classifier
        .classify("What are my tasks for tomorrow?")
        .expect("classify")
        .top()
        .expect("top label");
    assert_eq!(top.label, "read_todos_tomorrow");
    assert!(top.confidence >= 0.85);

    let doc = MemoryDocument::new("page");
    let root = doc.root().clone();
    let tomorrow = doc.insert(&root, Block::toggle_heading("tomorrow", "TOMORROW"));
    doc.insert(&tomorrow, Block::todo("t1", "Book flights"));

    let dispatcher = Dispatcher::new(DispatchContext {
        classifier,
        document: &doc,
        root_id: root,
        settings: DispatchSettings::default(),
    });
    let result = dispatcher
        .classify_and_dispatch("Hi!")
        .expect("dispatch greeting");
    assert_eq!(result.intent, Intent::Greeting);

    let result = dispatcher
        .classify_and_dispatch("what are my tasks for tomorrow")
        .expect("dispatch read");
    assert_eq!(result.intent, Intent::ReadTodosTomorrow);
    assert_eq!(result.target, Some(SectionTarget::Tomorrow));
    assert_eq!(result.response, "You have 1 tasks for tomorrow: Book flights");
}

#[test]
fn unrelated_utterance_is_rejected_by_gate() {
    let file = intents_file();
    let classifier = PatternClassifier::from_path(file.path()).expect("load intents");
    let doc = MemoryDocument::new("page");
    let dispatcher = Dispatcher::new(DispatchContext {
        classifier,
        document: &doc,
        root_id: doc.root().clone(),
        settings: DispatchSettings::default(),
    });
    let result = dispatcher
        .classify_and_dispatch("quantum chromodynamics")
        .expect("dispatch");
    assert_eq!(result.intent, Intent::None);
    assert_eq!(result.task_text, "");
}

#[test]
fn missing_intents_file_is_invalid_model() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = PatternClassifier::from_path(dir.path().join("absent.json"))
        .expect_err("missing file");
    assert!(err.to_string().contains("absent.json"));
}
