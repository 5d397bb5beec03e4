//! Task text normalization.
//!
//! # Responsibility
//! - Strip command phrasing ("remind me to do ...", "add a todo for me
//!   today to ...") so only the task description remains.
//!
//! # Invariants
//! - Never fails; unmatched input comes back trimmed and otherwise untouched.
//! - Idempotent: `normalize_task_text(normalize_task_text(x))` equals
//!   `normalize_task_text(x)`.
//! - Preamble matching is anchored at the start of the text only.

use once_cell::sync::Lazy;
use regex::Regex;

static COMMAND_PREAMBLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^
        (?:create|add|put|remind\sme)
        (?:\s+a)?
        \s+to[\s-]?do\b
        (?:\s+for\sme\b)?
        (?:\s+(?:today|tomorrow)\b)?
        (?:\s+to\b)?
        \s*",
    )
    .expect("valid command preamble regex")
});

static TRAILING_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:for\s+)?(?:today|tomorrow)\s*[.!]?\s*$")
        .expect("valid trailing day regex")
});

/// Words that bind a trailing day to the task itself ("call Mom about today").
const DAY_BINDING_WORDS: &[&str] = &[
    "about", "after", "before", "by", "from", "of", "on", "since", "than", "till", "until",
];

/// Recovers the bare task description from a create-style utterance.
///
/// When a command preamble is found it is removed (repeatedly, for stacked
/// preambles), a trailing `today`/`tomorrow` is dropped unless a binding word
/// such as `about` precedes it, and the first letter of the remainder is
/// upper-cased. Otherwise the trimmed input is returned.
pub fn normalize_task_text(raw: &str) -> String {
    let mut text = raw.trim();
    let mut stripped = false;

    while let Some(found) = COMMAND_PREAMBLE_RE.find(text) {
        text = text[found.end()..].trim();
        stripped = true;
    }

    if !stripped {
        return text.to_string();
    }

    while let Some(found) = TRAILING_DAY_RE.find(text) {
        let head = text[..found.start()].trim_end();
        if ends_with_binding_word(head) {
            break;
        }
        text = head;
    }

    capitalize_first(text)
}

fn ends_with_binding_word(text: &str) -> bool {
    text.split_whitespace().next_back().is_some_and(|word| {
        DAY_BINDING_WORDS
            .iter()
            .any(|binding| word.eq_ignore_ascii_case(binding))
    })
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
