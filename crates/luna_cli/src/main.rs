//! `luna` command line entry point.
//!
//! # Responsibility
//! - Build the classifier and document adapter from configuration.
//! - Expose dispatch, creation, listing and local seeding as subcommands.
//!
//! # Invariants
//! - Every failure exits non-zero and prints its status class.

use clap::{Parser, Subcommand};
use log::info;
use luna_core::config::AssistantConfig;
use luna_core::db::{open_db, DbError};
use luna_core::{
    default_log_level, init_logging, BlockDraft, BlockId, ClassifierError, ConfigError, Deadline,
    DispatchContext, DispatchError, Dispatcher, DocumentAdapter, DocumentError, HttpClassifier,
    IntentClassifier, LabelDistribution, LoggingError, NotionDocument, PatternClassifier,
    SectionError, SectionTarget, SqliteDocument, TodoService,
};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "luna")]
#[command(version)]
#[command(about = "Voice-style task assistant over a sectioned to-do page")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a local SQLite document instead of Notion
    #[arg(long, global = true, value_name = "DB_PATH")]
    local: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Classify an utterance and print the dispatch result as JSON
    Ask {
        /// Utterance text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Append a checklist item to a section
    Add {
        /// Section name: `today`, anything else means tomorrow
        #[arg(long, short, default_value = "tomorrow")]
        section: String,
        /// Item text, normalized before it is appended
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Print the checklist items of a section
    List {
        /// Section name: `today`, anything else means tomorrow
        section: String,
    },
    /// Seed a local document with TODAY and TOMORROW toggle headings
    InitLocal,
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(LoggingError),
    Classifier(ClassifierError),
    Db(DbError),
    Document(DocumentError),
    Dispatch(DispatchError),
    Output(serde_json::Error),
    Usage(String),
}

impl CliError {
    fn status_code(&self) -> u16 {
        match self {
            Self::Dispatch(err) => err.status_code(),
            Self::Usage(_) => 400,
            _ => 500,
        }
    }

    fn exit_code(&self) -> u8 {
        match self.status_code() {
            400 => 2,
            404 => 3,
            504 => 4,
            _ => 1,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Classifier(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Document(err) => write!(f, "{err}"),
            Self::Dispatch(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to encode output: {err}"),
            Self::Usage(message) => write!(f, "{message}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<ClassifierError> for CliError {
    fn from(value: ClassifierError) -> Self {
        Self::Classifier(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<DocumentError> for CliError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value)
    }
}

impl From<DispatchError> for CliError {
    fn from(value: DispatchError) -> Self {
        Self::Dispatch(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {err}", err.status_code());
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }
    let config = AssistantConfig::load(cli.config.as_deref())?;

    match cli.local {
        Some(db_path) => {
            let conn = open_db(&db_path)?;
            let document = SqliteDocument::try_new(&conn)?;
            if let Command::InitLocal = cli.command {
                return init_local(&document);
            }
            let root = document.first_page()?.ok_or_else(|| {
                CliError::Usage(format!(
                    "local document `{}` has no page; run `luna --local {} init-local` first",
                    db_path.display(),
                    db_path.display()
                ))
            })?;
            run_command(cli.command, &config, &document, root)
        }
        None => {
            if let Command::InitLocal = cli.command {
                return Err(CliError::Usage(
                    "init-local requires --local <DB_PATH>".to_string(),
                ));
            }
            let notion = &config.notion;
            let document = NotionDocument::with_options(
                notion.require_api_key()?,
                notion.api_url.as_str(),
                notion.notion_version.as_str(),
                notion.retry_policy(),
            )?;
            let root = BlockId::new(notion.require_page_id()?);
            run_command(cli.command, &config, document, root)
        }
    }
}

fn run_command<D: DocumentAdapter>(
    command: Command,
    config: &AssistantConfig,
    document: D,
    root: BlockId,
) -> Result<(), CliError> {
    // Only `ask` classifies; `add` and `list` must work without a model.
    let classifier: Box<dyn IntentClassifier> = match command {
        Command::Ask { .. } => build_classifier(config)?,
        _ => Box::new(Unconfigured),
    };
    let dispatcher = Dispatcher::new(DispatchContext {
        classifier,
        document,
        root_id: root,
        settings: config.dispatch_settings(),
    });

    match command {
        Command::Ask { text } => {
            let result = dispatcher.classify_and_dispatch(&text.join(" "))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Add { section, text } => {
            let section = SectionTarget::from_section_name(&section);
            let created = dispatcher.create_todo(&text.join(" "), section)?;
            println!("Added \"{}\" to {}", created.text, created.section);
        }
        Command::List { section } => {
            let section = SectionTarget::from_section_name(&section);
            let todos = dispatcher.read_todos(section)?;
            if todos.is_empty() {
                println!("No tasks for {}.", section.period());
            }
            for item in todos {
                let mark = if item.checked { "x" } else { " " };
                println!("- [{mark}] {}", item.text);
            }
        }
        Command::InitLocal => {
            return Err(CliError::Usage(
                "init-local requires --local <DB_PATH>".to_string(),
            ));
        }
    }
    Ok(())
}

/// Stand-in for commands that never classify.
struct Unconfigured;

impl IntentClassifier for Unconfigured {
    fn classify(&self, _text: &str) -> Result<LabelDistribution, ClassifierError> {
        Err(ClassifierError::Unavailable(
            "no classifier configured for this command".to_string(),
        ))
    }
}

fn build_classifier(config: &AssistantConfig) -> Result<Box<dyn IntentClassifier>, CliError> {
    if let Some(url) = config.classifier.remote_url.as_deref() {
        return Ok(Box::new(HttpClassifier::with_timeout(
            url,
            config.request_timeout(),
        )?));
    }
    let path = config
        .classifier
        .intents_path
        .as_deref()
        .ok_or(ConfigError::Missing("classifier.intents_path"))?;
    Ok(Box::new(PatternClassifier::from_path(path)?))
}

/// Creates the page and any missing section headings; existing ones are kept.
fn init_local(document: &SqliteDocument<'_>) -> Result<(), CliError> {
    let root = match document.first_page()? {
        Some(root) => root,
        None => document.create_page("Tasks")?,
    };
    let deadline = Deadline::unbounded();
    let service = TodoService::new(document, root.clone());
    for section in [SectionTarget::Today, SectionTarget::Tomorrow] {
        match service.locate_section(section, &deadline) {
            Ok(_) => {}
            Err(SectionError::NotFound(_)) => {
                document.insert_block(&root, &BlockDraft::section_heading(section.name()))?;
                info!(
                    "event=init_local module=cli status=ok section={} root_id={}",
                    section, root
                );
            }
            Err(err) => return Err(DispatchError::from_section(err, &deadline).into()),
        }
    }
    println!("{root}");
    Ok(())
}
