//! SQLite-backed local block store.
//!
//! # Responsibility
//! - Persist a block tree with the same shape the remote store exposes.
//! - Serve the `DocumentAdapter` contract for offline use.
//!
//! # Invariants
//! - Child listing is deterministic: `sort_order ASC, block_id ASC`.
//! - `has_children` is derived from stored rows, never stored.
//! - Text runs are stored as a JSON array to keep run boundaries.

use super::{DocumentAdapter, DocumentError, DocumentResult};
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::deadline::Deadline;
use crate::model::block::{Block, BlockDraft, BlockId, BlockKind};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const CHILDREN_SQL: &str = "SELECT
    b.block_id AS block_id,
    b.kind AS kind,
    b.text_runs AS text_runs,
    b.is_toggleable AS is_toggleable,
    b.checked AS checked,
    EXISTS(SELECT 1 FROM blocks c WHERE c.parent_id = b.block_id) AS has_children
 FROM blocks b
 WHERE b.parent_id = ?1
 ORDER BY b.sort_order ASC, b.block_id ASC;";

/// Block store over a migrated SQLite connection.
pub struct SqliteDocument<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocument<'conn> {
    /// Creates the store from a connection opened through `db::open_db*`.
    ///
    /// # Errors
    /// - `UnsupportedSchemaVersion` when the connection is not at the
    ///   latest migration.
    pub fn try_new(conn: &'conn Connection) -> Result<Self, DbError> {
        let actual = current_user_version(conn)?;
        let expected = latest_version();
        if actual != expected {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: actual,
                latest_supported: expected,
            });
        }
        Ok(Self { conn })
    }

    /// Creates a top-level page block and returns its id.
    pub fn create_page(&self, title: &str) -> Result<BlockId, DbError> {
        let block_id = BlockId::new(Uuid::new_v4().to_string());
        let sort_order: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM blocks WHERE parent_id IS NULL;",
            [],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO blocks (block_id, parent_id, kind, text_runs, sort_order)
             VALUES (?1, NULL, 'other', ?2, ?3);",
            params![block_id.as_str(), encode_runs(&[title])?, sort_order],
        )?;
        Ok(block_id)
    }

    /// Oldest top-level page, if any.
    pub fn first_page(&self) -> Result<Option<BlockId>, DbError> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT block_id FROM blocks
                 WHERE parent_id IS NULL
                 ORDER BY sort_order ASC, block_id ASC
                 LIMIT 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(BlockId::new))
    }

    /// Inserts `draft` as the last child of `parent_id` and returns its id.
    pub fn insert_block(&self, parent_id: &BlockId, draft: &BlockDraft) -> DocumentResult<BlockId> {
        let store_err = |source: DbError| DocumentError::Store {
            block_id: parent_id.clone(),
            source,
        };

        if !self.exists(parent_id).map_err(store_err)? {
            return Err(DocumentError::UnknownBlock(parent_id.clone()));
        }

        let block_id = BlockId::new(Uuid::new_v4().to_string());
        let text_runs = encode_runs(&[draft.text.as_str()]).map_err(store_err)?;
        self.conn
            .execute(
                "INSERT INTO blocks (
                    block_id,
                    parent_id,
                    kind,
                    text_runs,
                    is_toggleable,
                    checked,
                    sort_order
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6,
                    (SELECT COALESCE(MAX(sort_order), -1) + 1 FROM blocks WHERE parent_id = ?2)
                );",
                params![
                    block_id.as_str(),
                    parent_id.as_str(),
                    draft.kind.as_str(),
                    text_runs,
                    bool_to_int(draft.is_toggleable),
                    bool_to_int(draft.checked),
                ],
            )
            .map_err(|err| store_err(err.into()))?;

        debug!(
            "event=block_insert module=document status=ok store=sqlite parent_id={} kind={}",
            parent_id,
            draft.kind.as_str()
        );
        Ok(block_id)
    }

    fn exists(&self, block_id: &BlockId) -> Result<bool, DbError> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM blocks WHERE block_id = ?1);",
            [block_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_children(&self, block_id: &BlockId) -> Result<Vec<Block>, DbError> {
        let mut stmt = self.conn.prepare(CHILDREN_SQL)?;
        let mut rows = stmt.query([block_id.as_str()])?;
        let mut children = Vec::new();
        while let Some(row) = rows.next()? {
            children.push(parse_block_row(row)?);
        }
        Ok(children)
    }
}

impl DocumentAdapter for SqliteDocument<'_> {
    fn fetch_children(
        &self,
        block_id: &BlockId,
        deadline: &Deadline,
    ) -> DocumentResult<Vec<Block>> {
        if deadline.is_expired() {
            return Err(DocumentError::Timeout {
                block_id: block_id.clone(),
            });
        }
        let store_err = |source: DbError| DocumentError::Store {
            block_id: block_id.clone(),
            source,
        };
        if !self.exists(block_id).map_err(store_err)? {
            return Err(DocumentError::UnknownBlock(block_id.clone()));
        }
        self.list_children(block_id).map_err(store_err)
    }

    fn append_block(
        &self,
        parent_id: &BlockId,
        block: &BlockDraft,
        deadline: &Deadline,
    ) -> DocumentResult<()> {
        if deadline.is_expired() {
            return Err(DocumentError::Timeout {
                block_id: parent_id.clone(),
            });
        }
        self.insert_block(parent_id, block).map(|_| ())
    }
}

fn parse_block_row(row: &Row<'_>) -> Result<Block, DbError> {
    let kind_text: String = row.get("kind")?;
    let kind = match kind_text.as_str() {
        "heading_1" | "heading_2" | "heading_3" | "to_do" | "other" => {
            BlockKind::from_wire(&kind_text)
        }
        other => {
            return Err(DbError::InvalidData(format!(
                "invalid block kind `{other}` in blocks.kind"
            )));
        }
    };

    let runs_text: String = row.get("text_runs")?;
    let text: Vec<String> = serde_json::from_str(&runs_text).map_err(|err| {
        DbError::InvalidData(format!("invalid text runs in blocks.text_runs: {err}"))
    })?;

    Ok(Block {
        id: BlockId::new(row.get::<_, String>("block_id")?),
        kind,
        text,
        is_toggleable: int_to_bool(row.get("is_toggleable")?, "blocks.is_toggleable")?,
        has_children: int_to_bool(row.get("has_children")?, "has_children")?,
        checked: int_to_bool(row.get("checked")?, "blocks.checked")?,
    })
}

fn encode_runs(runs: &[&str]) -> Result<String, DbError> {
    serde_json::to_string(runs)
        .map_err(|err| DbError::InvalidData(format!("cannot encode text runs: {err}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64, column: &'static str) -> Result<bool, DbError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(DbError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
