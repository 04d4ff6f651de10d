//! Controller rows and their patch chains.
//!
//! Patches live in `controller_patches`, one row per patch, keyed by
//! `(controller_id, seq)`. Rows are only ever inserted. Patch text is stored
//! zstd-compressed.

use jiff::Timestamp;
use rusqlite::{ErrorCode, Row};
use uuid::Uuid;

use crate::chain::{PatchChain, Revision};
use crate::model::{Controller, Language, Page, Paging, Patch};

use super::{
    Result, StorageError, UnitOfWork, expect_row, parse_id, parse_status, parse_timestamp,
    to_micros,
};

const COLUMNS: &str = "id, app, name, description, language, status, creator, created_at, updated_at";

const COMPRESSION_LEVEL: i32 = 3;

impl UnitOfWork<'_> {
    /// Inserts a controller together with its initial chain.
    pub fn insert_controller(&self, controller: &Controller) -> Result<()> {
        self.tx.execute(
            &format!("INSERT INTO controllers ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            rusqlite::params![
                controller.id.to_string(),
                controller.app.to_string(),
                &controller.name,
                &controller.description,
                controller.language.as_str(),
                controller.status.as_str(),
                &controller.creator,
                to_micros(controller.created_at),
                to_micros(controller.updated_at),
            ],
        )?;
        for (seq, patch) in controller.patches.patches().iter().enumerate() {
            self.insert_patch(controller.id, seq, patch)?;
        }
        Ok(())
    }

    /// Updates controller metadata. The chain is untouched.
    pub fn update_controller(&self, controller: &Controller) -> Result<()> {
        let rows = self.tx.execute(
            "UPDATE controllers SET description = ?1, updated_at = ?2
             WHERE id = ?3 AND status != 'deleted'",
            rusqlite::params![
                &controller.description,
                to_micros(controller.updated_at),
                controller.id.to_string(),
            ],
        )?;
        expect_row(rows, "controller", controller.id)
    }

    /// Appends a revision to a controller's persisted chain.
    ///
    /// Fails with [`StorageError::StaleChain`] if the chain no longer has
    /// the length the revision was computed against.
    pub fn append_patch(&self, controller: Uuid, revision: &Revision) -> Result<()> {
        let actual = self.patch_count(controller)?;
        if actual != revision.expected_len {
            return Err(StorageError::StaleChain {
                controller,
                expected: revision.expected_len,
                actual,
            });
        }
        match self.insert_patch(controller, revision.expected_len, &revision.patch) {
            Err(StorageError::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::StaleChain {
                    controller,
                    expected: revision.expected_len,
                    actual: self.patch_count(controller)?,
                })
            }
            other => other,
        }?;
        let rows = self.tx.execute(
            "UPDATE controllers SET updated_at = ?1 WHERE id = ?2 AND status != 'deleted'",
            rusqlite::params![to_micros(revision.patch.created_at), controller.to_string()],
        )?;
        expect_row(rows, "controller", controller)
    }

    pub fn controller_by_id(&self, id: Uuid) -> Result<Option<Controller>> {
        let row = self.query_one(
            &format!("SELECT {COLUMNS} FROM controllers WHERE id = ?1 AND status != 'deleted'"),
            [id.to_string()],
            controller_from_row,
        )?;
        row.map(|c| self.with_patches(c)).transpose()
    }

    pub fn controller_by_name(&self, app: Uuid, name: &str) -> Result<Option<Controller>> {
        let row = self.query_one(
            &format!(
                "SELECT {COLUMNS} FROM controllers
                 WHERE app = ?1 AND name = ?2 AND status != 'deleted'"
            ),
            rusqlite::params![app.to_string(), name],
            controller_from_row,
        )?;
        row.map(|c| self.with_patches(c)).transpose()
    }

    pub fn list_controllers(&self, app: Uuid, paging: Paging) -> Result<Page<Controller>> {
        let app = app.to_string();
        self.page("controllers", COLUMNS, "AND app = ?", &[&app], paging, controller_from_row)?
            .try_map(|c| self.with_patches(c))
    }

    /// Logically deletes a controller. Its patches are kept.
    pub fn delete_controller(&self, id: Uuid, at: Timestamp) -> Result<()> {
        self.mark_deleted("controllers", "controller", id, at)
    }

    fn with_patches(&self, mut controller: Controller) -> Result<Controller> {
        let patches = self.query_all(
            "SELECT author, content, created_at FROM controller_patches
             WHERE controller_id = ?1 ORDER BY seq",
            [controller.id.to_string()],
            patch_from_row,
        )?;
        controller.patches = PatchChain::from_patches(patches);
        Ok(controller)
    }

    fn patch_count(&self, controller: Uuid) -> Result<usize> {
        let n = self.count(
            "SELECT COUNT(*) FROM controller_patches WHERE controller_id = ?1",
            [controller.to_string()],
        )?;
        usize::try_from(n).map_err(|e| StorageError::Corrupt(format!("patch count: {e}")))
    }

    fn insert_patch(&self, controller: Uuid, seq: usize, patch: &Patch) -> Result<()> {
        let content = zstd::encode_all(patch.content.as_bytes(), COMPRESSION_LEVEL)?;
        let seq = i64::try_from(seq).map_err(|e| StorageError::Corrupt(format!("patch seq: {e}")))?;
        self.tx.execute(
            "INSERT INTO controller_patches (controller_id, seq, author, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                controller.to_string(),
                seq,
                &patch.author,
                content,
                to_micros(patch.created_at),
            ],
        )?;
        Ok(())
    }
}

/// Reads the controller row. The chain is filled in by `with_patches`.
fn controller_from_row(row: &Row<'_>) -> Result<Controller> {
    let language: String = row.get("language")?;
    Ok(Controller {
        id: parse_id(row, "id")?,
        app: parse_id(row, "app")?,
        name: row.get("name")?,
        description: row.get("description")?,
        language: Language::parse(&language)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown language: {language}")))?,
        patches: PatchChain::default(),
        status: parse_status(row)?,
        creator: row.get("creator")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn patch_from_row(row: &Row<'_>) -> Result<Patch> {
    let compressed: Vec<u8> = row.get("content")?;
    let content = String::from_utf8(zstd::decode_all(compressed.as_slice())?)
        .map_err(|e| StorageError::Corrupt(format!("patch is not UTF-8: {e}")))?;
    Ok(Patch {
        author: row.get("author")?,
        content,
        created_at: parse_timestamp(row, "created_at")?,
    })
}
