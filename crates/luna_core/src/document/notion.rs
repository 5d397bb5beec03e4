//! Notion blocks API adapter.
//!
//! # Responsibility
//! - List block children (following pagination) and append checklist items
//!   through the public blocks endpoints.
//! - Decode the type-tagged block payloads into `Block`.
//!
//! # Invariants
//! - Only `fetch_children` is retried; `append_block` is sent exactly once.
//! - Every call is bounded by the request deadline.
//! - The API key never appears in logs or error messages.

use super::{DocumentAdapter, DocumentError, DocumentResult};
use crate::deadline::Deadline;
use crate::model::block::{Block, BlockDraft, BlockId, BlockKind};
use log::{debug, error, warn};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};

/// Default API base URL.
pub const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com/v1";
/// API version header value the decoder understands.
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

/// Bounded exponential backoff for idempotent reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Backoff to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Blocking client for the Notion blocks API.
pub struct NotionDocument {
    client: Client,
    api_url: String,
    api_key: String,
    notion_version: String,
    retry: RetryPolicy,
}

impl NotionDocument {
    pub fn new(api_key: impl Into<String>) -> DocumentResult<Self> {
        Self::with_options(
            api_key,
            DEFAULT_NOTION_API_URL,
            DEFAULT_NOTION_VERSION,
            RetryPolicy::default(),
        )
    }

    pub fn with_options(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        notion_version: impl Into<String>,
        retry: RetryPolicy,
    ) -> DocumentResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|err| DocumentError::Transport {
                block_id: BlockId::new(""),
                message: format!("failed to build http client: {err}"),
            })?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            notion_version: notion_version.into(),
            retry: RetryPolicy {
                max_attempts: retry.max_attempts.max(1),
                ..retry
            },
        })
    }

    fn children_url(&self, block_id: &BlockId) -> String {
        format!("{}/blocks/{}/children", self.api_url, block_id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("Notion-Version", &self.notion_version)
    }

    fn send(
        &self,
        request: RequestBuilder,
        block_id: &BlockId,
        deadline: &Deadline,
    ) -> DocumentResult<Response> {
        let request = match deadline.remaining() {
            Some(left) if left.is_zero() => {
                return Err(DocumentError::Timeout {
                    block_id: block_id.clone(),
                })
            }
            Some(left) => request.timeout(left),
            None => request,
        };

        let response = request.send().map_err(|err| {
            if err.is_timeout() {
                DocumentError::Timeout {
                    block_id: block_id.clone(),
                }
            } else {
                DocumentError::Transport {
                    block_id: block_id.clone(),
                    message: err.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(DocumentError::Status {
                block_id: block_id.clone(),
                status: status.as_u16(),
                message: error_summary(&message),
            });
        }
        Ok(response)
    }

    fn fetch_page(
        &self,
        block_id: &BlockId,
        cursor: Option<&str>,
        deadline: &Deadline,
    ) -> DocumentResult<ChildrenPage> {
        let mut query: Vec<(&str, String)> = vec![("page_size", PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor.to_string()));
        }
        let request = self.authorized(self.client.get(self.children_url(block_id)).query(&query));
        let response = self.send(request, block_id, deadline)?;
        let body: Value = response.json().map_err(|err| DocumentError::Decode {
            block_id: block_id.clone(),
            message: err.to_string(),
        })?;
        decode_children_page(body).map_err(|message| DocumentError::Decode {
            block_id: block_id.clone(),
            message,
        })
    }

    fn fetch_page_with_retry(
        &self,
        block_id: &BlockId,
        cursor: Option<&str>,
        deadline: &Deadline,
    ) -> DocumentResult<ChildrenPage> {
        let mut attempt = 1;
        loop {
            match self.fetch_page(block_id, cursor, deadline) {
                Ok(page) => return Ok(page),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff_for(attempt);
                    if matches!(deadline.remaining(), Some(left) if left <= backoff) {
                        return Err(err);
                    }
                    warn!(
                        "event=fetch_children module=document status=retry store=notion block_id={} attempt={} backoff_ms={} error={}",
                        block_id,
                        attempt,
                        backoff.as_millis(),
                        err
                    );
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl DocumentAdapter for NotionDocument {
    fn fetch_children(
        &self,
        block_id: &BlockId,
        deadline: &Deadline,
    ) -> DocumentResult<Vec<Block>> {
        let started_at = Instant::now();
        let mut children = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = match self.fetch_page_with_retry(block_id, cursor.as_deref(), deadline) {
                Ok(page) => page,
                Err(err) => {
                    error!(
                        "event=fetch_children module=document status=error store=notion block_id={} duration_ms={} error={}",
                        block_id,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    return Err(err);
                }
            };
            children.extend(page.blocks);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(
            "event=fetch_children module=document status=ok store=notion block_id={} children={} duration_ms={}",
            block_id,
            children.len(),
            started_at.elapsed().as_millis()
        );
        Ok(children)
    }

    fn append_block(
        &self,
        parent_id: &BlockId,
        block: &BlockDraft,
        deadline: &Deadline,
    ) -> DocumentResult<()> {
        let started_at = Instant::now();
        let request = self
            .authorized(self.client.patch(self.children_url(parent_id)))
            .json(&json!({ "children": [encode_draft(block)] }));

        match self.send(request, parent_id, deadline) {
            Ok(_) => {
                debug!(
                    "event=append_block module=document status=ok store=notion parent_id={} kind={} duration_ms={}",
                    parent_id,
                    block.kind.as_str(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=append_block module=document status=error store=notion parent_id={} duration_ms={} error={}",
                    parent_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

#[derive(Debug)]
struct ChildrenPage {
    blocks: Vec<Block>,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChildren {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireBlock {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    has_children: bool,
    #[serde(flatten)]
    payloads: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePayload {
    #[serde(default)]
    rich_text: Vec<WireRichText>,
    #[serde(default)]
    is_toggleable: bool,
    #[serde(default)]
    checked: bool,
}

#[derive(Debug, Deserialize)]
struct WireRichText {
    #[serde(default)]
    plain_text: String,
}

fn decode_children_page(body: Value) -> Result<ChildrenPage, String> {
    let wire: WireChildren = serde_json::from_value(body).map_err(|err| err.to_string())?;
    let blocks = wire
        .results
        .into_iter()
        .map(decode_block)
        .collect::<Result<Vec<_>, _>>()?;
    let next_cursor = if wire.has_more { wire.next_cursor } else { None };
    Ok(ChildrenPage {
        blocks,
        next_cursor,
    })
}

fn decode_block(value: Value) -> Result<Block, String> {
    let mut wire: WireBlock = serde_json::from_value(value).map_err(|err| err.to_string())?;
    let kind = BlockKind::from_wire(&wire.kind);
    let payload = match wire.payloads.remove(&wire.kind) {
        Some(raw) => match serde_json::from_value::<WirePayload>(raw) {
            Ok(payload) => payload,
            Err(err) if kind != BlockKind::Other => {
                return Err(format!("invalid `{}` payload for block {}: {err}", wire.kind, wire.id));
            }
            Err(_) => WirePayload::default(),
        },
        None if kind != BlockKind::Other => {
            return Err(format!("missing `{}` payload for block {}", wire.kind, wire.id));
        }
        None => WirePayload::default(),
    };

    Ok(Block {
        id: BlockId::new(wire.id),
        kind,
        text: payload
            .rich_text
            .into_iter()
            .map(|run| run.plain_text)
            .collect(),
        is_toggleable: payload.is_toggleable,
        has_children: wire.has_children,
        checked: kind == BlockKind::ToDo && payload.checked,
    })
}

fn encode_draft(draft: &BlockDraft) -> Value {
    let rich_text = json!([{ "type": "text", "text": { "content": draft.text } }]);
    let (kind, payload) = match draft.kind {
        BlockKind::ToDo => (
            "to_do",
            json!({ "rich_text": rich_text, "checked": draft.checked }),
        ),
        BlockKind::Heading1 | BlockKind::Heading2 | BlockKind::Heading3 => (
            draft.kind.as_str(),
            json!({ "rich_text": rich_text, "is_toggleable": draft.is_toggleable }),
        ),
        BlockKind::Other => ("paragraph", json!({ "rich_text": rich_text })),
    };
    let mut block = Map::new();
    block.insert("object".to_string(), Value::from("block"));
    block.insert("type".to_string(), Value::from(kind));
    block.insert(kind.to_string(), payload);
    Value::Object(block)
}

fn error_summary(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
