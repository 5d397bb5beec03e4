use luna_core::db::open_db;
use luna_core::{
    BlockDraft, BlockId, ClassifierError, Deadline, DispatchContext, DispatchSettings, Dispatcher,
    IntentClassifier, LabelDistribution, SectionLocator, SectionTarget, SqliteDocument,
    TodoService,
};

struct Fixed(&'static str);

impl IntentClassifier for Fixed {
    fn classify(&self, _text: &str) -> Result<LabelDistribution, ClassifierError> {
        Ok(LabelDistribution::from_pairs([(self.0, 0.99), ("about", 0.01)]))
    }
}

fn seed(document: &SqliteDocument<'_>) -> (BlockId, BlockId, BlockId) {
    let page = document.create_page("Tasks").expect("create page");
    let today = document
        .insert_block(&page, &BlockDraft::section_heading("TODAY"))
        .expect("today heading");
    let tomorrow = document
        .insert_block(&page, &BlockDraft::section_heading("TOMORROW"))
        .expect("tomorrow heading");
    (page, today, tomorrow)
}

#[test]
fn appended_item_is_read_back_after_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tasks.db");

    {
        let conn = open_db(&path).expect("open db");
        let document = SqliteDocument::try_new(&conn).expect("store");
        let (page, _, _) = seed(&document);
        let service = TodoService::new(&document, page);
        let created = service
            .create_todo(
                "add todo pick up laundry tomorrow",
                SectionTarget::Tomorrow,
                &Deadline::unbounded(),
            )
            .expect("create");
        assert_eq!(created.text, "Pick up laundry");
    }

    let conn = open_db(&path).expect("reopen db");
    let document = SqliteDocument::try_new(&conn).expect("store");
    let page = document
        .first_page()
        .expect("query page")
        .expect("page exists");
    let service = TodoService::new(&document, page);
    let todos = service
        .read_todos(SectionTarget::Tomorrow, &Deadline::unbounded())
        .expect("read tomorrow");
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].text, "Pick up laundry");
    assert!(!todos[0].checked);

    let today = service
        .read_todos(SectionTarget::Today, &Deadline::unbounded())
        .expect("read today");
    assert!(today.is_empty());
}

#[test]
fn locator_finds_nested_heading_first() {
    let dir = tempfile::tempdir().expect("temp dir");
    let conn = open_db(dir.path().join("nested.db")).expect("open db");
    let document = SqliteDocument::try_new(&conn).expect("store");

    let page = document.create_page("Tasks").expect("create page");
    let week = document
        .insert_block(&page, &BlockDraft::section_heading("THIS WEEK"))
        .expect("week heading");
    let nested = document
        .insert_block(&week, &BlockDraft::section_heading("today"))
        .expect("nested heading");
    document
        .insert_block(&page, &BlockDraft::section_heading("TODAY"))
        .expect("top-level heading");

    let locator = SectionLocator::new(&document);
    let first = locator
        .locate(&page, SectionTarget::Today, &Deadline::unbounded())
        .expect("locate");
    let second = locator
        .locate(&page, SectionTarget::Today, &Deadline::unbounded())
        .expect("locate again");
    assert_eq!(first, nested);
    assert_eq!(first, second);
}

#[test]
fn dispatcher_reads_from_local_store() {
    let dir = tempfile::tempdir().expect("temp dir");
    let conn = open_db(dir.path().join("dispatch.db")).expect("open db");
    let document = SqliteDocument::try_new(&conn).expect("store");
    let (page, today, _) = seed(&document);
    document
        .insert_block(&today, &BlockDraft::todo("Stretch"))
        .expect("todo");

    let dispatcher = Dispatcher::new(DispatchContext {
        classifier: Fixed("read_todos_today"),
        document: &document,
        root_id: page,
        settings: DispatchSettings::default(),
    });
    let result = dispatcher
        .classify_and_dispatch("what's on today")
        .expect("dispatch");
    assert_eq!(result.response, "You have 1 tasks for today: Stretch");
}
