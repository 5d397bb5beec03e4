//! Pattern-overlap classifier backed by an intents file.
//!
//! # Responsibility
//! - Load tagged example utterances (`{"intents": [{"tag", "patterns"}]}`).
//! - Score an utterance against every tag and emit a softmax distribution.
//!
//! # Invariants
//! - Tag order in the distribution follows first appearance in the file.
//! - Tokenization lower-cases and treats punctuation as whitespace, so
//!   `to-do` and `to do` tokenize identically.

use super::{ClassifierError, ClassifierResult, IntentClassifier, LabelDistribution};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

const TOKEN_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~";
const DEFAULT_SHARPNESS: f64 = 12.0;

#[derive(Debug, Deserialize)]
struct IntentsFile {
    intents: Vec<IntentEntry>,
}

#[derive(Debug, Deserialize)]
struct IntentEntry {
    tag: String,
    #[serde(default)]
    patterns: Vec<String>,
}

#[derive(Debug, Clone)]
struct TagPatterns {
    tag: String,
    patterns: Vec<BTreeSet<String>>,
}

/// Nearest-pattern classifier.
///
/// Each tag scores the best Jaccard overlap between the utterance tokens and
/// one of its patterns; scores are turned into probabilities with a
/// temperature-scaled softmax.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    tags: Vec<TagPatterns>,
}

impl PatternClassifier {
    /// Loads an intents file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> ClassifierResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            ClassifierError::InvalidModel(format!(
                "failed to read intents file `{}`: {err}",
                path.display()
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Parses intents JSON content.
    pub fn from_json_str(content: &str) -> ClassifierResult<Self> {
        let file: IntentsFile = serde_json::from_str(content)
            .map_err(|err| ClassifierError::InvalidModel(format!("invalid intents json: {err}")))?;
        Self::from_intents(
            file.intents
                .into_iter()
                .map(|entry| (entry.tag, entry.patterns)),
        )
    }

    /// Builds a classifier from `(tag, patterns)` pairs.
    ///
    /// Repeated tags are merged. Patterns without any token are ignored.
    ///
    /// # Errors
    /// - `InvalidModel` when a tag is blank or no tag has a usable pattern.
    pub fn from_intents<I, P>(intents: I) -> ClassifierResult<Self>
    where
        I: IntoIterator<Item = (String, P)>,
        P: IntoIterator<Item = String>,
    {
        let mut tags: Vec<TagPatterns> = Vec::new();
        for (tag, patterns) in intents {
            let tag = tag.trim().to_string();
            if tag.is_empty() {
                return Err(ClassifierError::InvalidModel(
                    "intent tag must not be blank".to_string(),
                ));
            }

            let token_sets = patterns
                .into_iter()
                .map(|pattern| tokenize(&pattern))
                .filter(|tokens| !tokens.is_empty());

            match tags.iter().position(|existing| existing.tag == tag) {
                Some(index) => tags[index].patterns.extend(token_sets),
                None => tags.push(TagPatterns {
                    tag,
                    patterns: token_sets.collect(),
                }),
            }
        }

        tags.retain(|entry| !entry.patterns.is_empty());
        if tags.is_empty() {
            return Err(ClassifierError::InvalidModel(
                "intents file has no usable patterns".to_string(),
            ));
        }

        Ok(Self { tags })
    }

    /// Known tags in distribution order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|entry| entry.tag.as_str())
    }

    fn tag_score(&self, entry: &TagPatterns, tokens: &BTreeSet<String>) -> f64 {
        entry
            .patterns
            .iter()
            .map(|pattern| jaccard(tokens, pattern))
            .fold(0.0, f64::max)
    }
}

impl IntentClassifier for PatternClassifier {
    fn classify(&self, text: &str) -> ClassifierResult<LabelDistribution> {
        let tokens = tokenize(text);
        let scores: Vec<f64> = self
            .tags
            .iter()
            .map(|entry| self.tag_score(entry, &tokens) * DEFAULT_SHARPNESS)
            .collect();

        let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores
            .iter()
            .map(|score| (score - max_score).exp())
            .collect();
        let total: f64 = exps.iter().sum();

        Ok(LabelDistribution::new(
            self.tags
                .iter()
                .zip(exps)
                .map(|(entry, value)| (entry.tag.clone(), (value / total).clamp(0.0, 1.0)))
                .collect(),
        ))
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if TOKEN_FILTERS.contains(c) || c.is_whitespace() {
                ' '
            } else {
                c
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    let union = left.union(right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(right).count() as f64 / union as f64
}
