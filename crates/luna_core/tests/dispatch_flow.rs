use luna_core::{
    Block, BlockId, BlockKind, ClassifierError, DispatchContext, DispatchError, DispatchSettings,
    Dispatcher, DocumentAdapter, DocumentError, Deadline, Intent, IntentClassifier,
    LabelDistribution, MemoryDocument, SectionTarget,
};
use std::time::Duration;

/// Classifier double that always answers with the same distribution.
struct Scripted(Vec<(String, f64)>);

impl Scripted {
    /// `label` wins with `confidence`; the remainder goes to one other label,
    /// so `confidence` must keep `label` on top.
    fn top(label: &str, confidence: f64) -> Self {
        assert!(confidence >= 0.5, "use Scripted::with below 0.5");
        let other = if label == "about" { "greeting" } else { "about" };
        Self(vec![
            (label.to_string(), confidence),
            (other.to_string(), 1.0 - confidence),
        ])
    }

    fn with(entries: &[(&str, f64)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(label, probability)| (label.to_string(), *probability))
                .collect(),
        )
    }
}

impl IntentClassifier for Scripted {
    fn classify(&self, _text: &str) -> Result<LabelDistribution, ClassifierError> {
        Ok(LabelDistribution::new(self.0.clone()))
    }
}

struct Offline;

impl IntentClassifier for Offline {
    fn classify(&self, _text: &str) -> Result<LabelDistribution, ClassifierError> {
        Err(ClassifierError::Unavailable("model not loaded".to_string()))
    }
}

fn task_page() -> MemoryDocument {
    let doc = MemoryDocument::new("page");
    let root = doc.root().clone();
    doc.insert(&root, Block::new("intro", BlockKind::Other, "My tasks"));
    doc.insert(&root, Block::toggle_heading("today", "TODAY"));
    doc.insert(&root, Block::toggle_heading("tomorrow", "Tomorrow "));
    doc
}

fn dispatcher<C: IntentClassifier>(
    classifier: C,
    doc: &MemoryDocument,
) -> Dispatcher<C, &MemoryDocument> {
    Dispatcher::new(DispatchContext {
        classifier,
        document: doc,
        root_id: doc.root().clone(),
        settings: DispatchSettings::default(),
    })
}

fn children_of(doc: &MemoryDocument, id: &str) -> Vec<Block> {
    doc.fetch_children(&BlockId::new(id), &Deadline::unbounded())
        .expect("fetch children")
}

#[test]
fn create_with_day_label_normalizes_without_appending() {
    let doc = task_page();
    let result = dispatcher(Scripted::top("create_todo_tomorrow", 0.97), &doc)
        .classify_and_dispatch("remind me to-do call mom tomorrow")
        .expect("dispatch");

    assert_eq!(result.intent, Intent::CreateTodo);
    assert_eq!(result.target, Some(SectionTarget::Tomorrow));
    assert_eq!(result.confidence, 0.97);
    assert_eq!(result.task_text, "Call mom");
    assert_eq!(
        result.response,
        "Got it. I've added that to your TOMORROW to-do list."
    );
    assert!(children_of(&doc, "tomorrow").is_empty());
}

#[test]
fn greeting_is_canned_and_touches_no_document() {
    let doc = task_page();
    let result = dispatcher(Scripted::top("greeting", 0.99), &doc)
        .classify_and_dispatch("hi")
        .expect("dispatch");

    assert_eq!(result.intent, Intent::Greeting);
    assert_eq!(result.response, "Hi! How are you doing today?");
    assert_eq!(result.task_text, "hi");
    assert_eq!(doc.fetch_count(), 0);
}

#[test]
fn about_is_canned() {
    let doc = task_page();
    let result = dispatcher(Scripted::top("about", 0.9), &doc)
        .classify_and_dispatch("who are you")
        .expect("dispatch");
    assert_eq!(
        result.response,
        "I am Luna, an AI agent for Kareem. I help manage his Notion tasks."
    );
    assert_eq!(doc.fetch_count(), 0);
}

#[test]
fn low_confidence_routes_to_none() {
    let doc = task_page();
    let scripted = Scripted::with(&[("create_todo", 0.4), ("about", 0.3), ("greeting", 0.3)]);
    let result = dispatcher(scripted, &doc)
        .classify_and_dispatch("add a todo for tomorrow buy bread")
        .expect("dispatch");

    assert_eq!(result.intent, Intent::None);
    assert_eq!(result.target, None);
    assert_eq!(result.task_text, "");
    assert_eq!(result.response, "");
    assert_eq!(result.confidence, 0.4);
    assert_eq!(doc.fetch_count(), 0);
}

#[test]
fn empty_section_reads_as_no_tasks() {
    let doc = task_page();
    let result = dispatcher(Scripted::top("read_todos_today", 0.95), &doc)
        .classify_and_dispatch("what do I have today")
        .expect("dispatch");

    assert_eq!(result.intent, Intent::ReadTodosToday);
    assert_eq!(result.target, Some(SectionTarget::Today));
    assert_eq!(result.response, "You have no tasks for today.");
    assert_eq!(result.task_text, "what do I have today");
}

#[test]
fn read_lists_first_text_runs_in_order() {
    let doc = task_page();
    let today = BlockId::new("today");
    doc.insert(&today, Block::todo("t1", "Buy milk"));
    doc.insert(&today, Block::new("note", BlockKind::Other, "not a task"));
    doc.insert(&today, Block::todo("t2", "Call mom").with_checked(true));

    let result = dispatcher(Scripted::top("read_todos_today", 0.95), &doc)
        .classify_and_dispatch("read my list")
        .expect("dispatch");
    assert_eq!(result.target, None);
    assert_eq!(
        result.response,
        "You have 2 tasks for today: Buy milk, Call mom"
    );
}

#[test]
fn create_without_day_needs_clarification() {
    let doc = task_page();
    let result = dispatcher(Scripted::top("create_todo", 0.92), &doc)
        .classify_and_dispatch("add a todo buy milk")
        .expect("dispatch");

    assert_eq!(result.intent, Intent::CreateTodo);
    assert_eq!(result.target, None);
    assert_eq!(result.task_text, "Buy milk");
    assert_eq!(result.response, "");
    assert!(result.needs_clarification());
    assert_eq!(doc.fetch_count(), 0);
}

#[test]
fn generic_create_uses_keyword_target() {
    let doc = task_page();
    let result = dispatcher(Scripted::top("create_todo", 0.92), &doc)
        .classify_and_dispatch("put a todo today to pay rent")
        .expect("dispatch");
    assert_eq!(result.target, Some(SectionTarget::Today));
    assert_eq!(result.task_text, "Pay rent");
}

#[test]
fn missing_section_is_404() {
    let doc = MemoryDocument::new("page");
    let err = dispatcher(Scripted::top("create_todo_today", 0.97), &doc)
        .classify_and_dispatch("add todo water plants today")
        .expect_err("no TODAY heading");

    assert!(matches!(
        err,
        DispatchError::SectionNotFound(SectionTarget::Today)
    ));
    assert_eq!(err.status_code(), 404);
}

#[test]
fn collaborator_failure_is_500_with_block_id() {
    let doc = task_page();
    doc.fail_on(&BlockId::new("page"));
    let err = dispatcher(Scripted::top("read_todos_tomorrow", 0.97), &doc)
        .classify_and_dispatch("what's on tomorrow")
        .expect_err("fetch fails");

    assert_eq!(err.status_code(), 500);
    match err {
        DispatchError::Collaborator(inner) => assert_eq!(inner.block_id().as_str(), "page"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_confident_label_is_classification_failure() {
    let doc = task_page();
    let err = dispatcher(Scripted::top("weather", 0.99), &doc)
        .classify_and_dispatch("will it rain")
        .expect_err("unknown label");
    assert!(matches!(
        err,
        DispatchError::Classification(ClassifierError::UnknownLabel(_))
    ));
    assert_eq!(err.status_code(), 500);
}

#[test]
fn classifier_outage_propagates() {
    let doc = task_page();
    let err = dispatcher(Offline, &doc)
        .classify_and_dispatch("hi")
        .expect_err("classifier down");
    assert!(matches!(err, DispatchError::Classification(_)));
}

#[test]
fn exhausted_budget_is_504() {
    let doc = task_page();
    let dispatcher = Dispatcher::new(DispatchContext {
        classifier: Scripted::top("read_todos_today", 0.95),
        document: &doc,
        root_id: doc.root().clone(),
        settings: DispatchSettings {
            request_timeout: Some(Duration::ZERO),
            ..DispatchSettings::default()
        },
    });
    let err = dispatcher
        .classify_and_dispatch("what do I have today")
        .expect_err("no time left");
    assert_eq!(err.status_code(), 504);
    assert_eq!(doc.fetch_count(), 0);
}

#[test]
fn creation_path_appends_and_reads_back() {
    let doc = task_page();
    let dispatcher = dispatcher(Scripted::top("greeting", 0.99), &doc);

    let created = dispatcher
        .create_todo("create a to-do to buy eggs", SectionTarget::from_section_name("Today"))
        .expect("create");
    assert_eq!(created.text, "Buy eggs");
    assert_eq!(created.heading_id.as_str(), "today");

    let todos = dispatcher
        .read_todos(SectionTarget::Today)
        .expect("read back");
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].text, "Buy eggs");
    assert!(!todos[0].checked);
}

#[test]
fn creation_path_never_appends_to_missing_section() {
    let doc = MemoryDocument::new("page");
    let dispatcher = dispatcher(Scripted::top("greeting", 0.99), &doc);
    let err = dispatcher
        .create_todo("buy eggs", SectionTarget::Tomorrow)
        .expect_err("no section");
    assert_eq!(err.status_code(), 404);
    assert!(children_of(&doc, "page").is_empty());
}

#[test]
fn append_failure_is_not_retried_or_hidden() {
    let doc = task_page();
    doc.fail_on(&BlockId::new("tomorrow"));
    let dispatcher = dispatcher(Scripted::top("greeting", 0.99), &doc);
    let err = dispatcher
        .create_todo("buy eggs", SectionTarget::Tomorrow)
        .expect_err("append fails");
    match err {
        DispatchError::Collaborator(DocumentError::Status { block_id, .. }) => {
            assert_eq!(block_id.as_str(), "tomorrow");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn result_serializes_with_wire_names() {
    let doc = task_page();
    let result = dispatcher(Scripted::top("create_todo_tomorrow", 0.97), &doc)
        .classify_and_dispatch("remind me to-do call mom tomorrow")
        .expect("dispatch");
    let value = serde_json::to_value(&result).expect("serialize");
    assert_eq!(
        value,
        serde_json::json!({
            "intent": "create_todo",
            "target": "TOMORROW",
            "confidence": 0.97,
            "task_text": "Call mom",
            "response": "Got it. I've added that to your TOMORROW to-do list."
        })
    );

    let scripted = Scripted::with(&[("greeting", 0.4), ("about", 0.35), ("create_todo", 0.25)]);
    let none = dispatcher(scripted, &doc)
        .classify_and_dispatch("mumble")
        .expect("dispatch");
    let value = serde_json::to_value(&none).expect("serialize");
    assert_eq!(value["intent"], "none");
    assert_eq!(value["confidence"], 0.4);
    assert!(value["target"].is_null());
}
