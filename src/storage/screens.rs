//! Screen rows.

use jiff::Timestamp;
use rusqlite::Row;
use uuid::Uuid;

use crate::model::{Page, Paging, Screen};

use super::{
    Result, UnitOfWork, expect_row, parse_id, parse_status, parse_timestamp, to_micros,
};

const COLUMNS: &str = "id, app, name, title, description, slug, content, controller, \
                       status, creator, created_at, updated_at";

impl UnitOfWork<'_> {
    pub fn insert_screen(&self, screen: &Screen) -> Result<()> {
        self.tx.execute(
            &format!("INSERT INTO screens ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
            rusqlite::params![
                screen.id.to_string(),
                screen.app.to_string(),
                &screen.name,
                &screen.title,
                &screen.description,
                &screen.slug,
                &screen.content,
                screen.controller.to_string(),
                screen.status.as_str(),
                &screen.creator,
                to_micros(screen.created_at),
                to_micros(screen.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn update_screen(&self, screen: &Screen) -> Result<()> {
        let rows = self.tx.execute(
            "UPDATE screens
             SET title = ?1, description = ?2, slug = ?3, content = ?4, updated_at = ?5
             WHERE id = ?6 AND status != 'deleted'",
            rusqlite::params![
                &screen.title,
                &screen.description,
                &screen.slug,
                &screen.content,
                to_micros(screen.updated_at),
                screen.id.to_string(),
            ],
        )?;
        expect_row(rows, "screen", screen.id)
    }

    pub fn screen_by_id(&self, id: Uuid) -> Result<Option<Screen>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM screens WHERE id = ?1 AND status != 'deleted'"),
            [id.to_string()],
            screen_from_row,
        )
    }

    pub fn screen_by_name(&self, app: Uuid, name: &str) -> Result<Option<Screen>> {
        self.query_one(
            &format!(
                "SELECT {COLUMNS} FROM screens WHERE app = ?1 AND name = ?2 AND status != 'deleted'"
            ),
            rusqlite::params![app.to_string(), name],
            screen_from_row,
        )
    }

    pub fn list_screens(&self, app: Uuid, paging: Paging) -> Result<Page<Screen>> {
        let app = app.to_string();
        self.page("screens", COLUMNS, "AND app = ?", &[&app], paging, screen_from_row)
    }

    pub fn delete_screen(&self, id: Uuid, at: Timestamp) -> Result<()> {
        self.mark_deleted("screens", "screen", id, at)
    }
}

fn screen_from_row(row: &Row<'_>) -> Result<Screen> {
    Ok(Screen {
        id: parse_id(row, "id")?,
        app: parse_id(row, "app")?,
        name: row.get("name")?,
        title: row.get("title")?,
        description: row.get("description")?,
        slug: row.get("slug")?,
        content: row.get("content")?,
        controller: parse_id(row, "controller")?,
        status: parse_status(row)?,
        creator: row.get("creator")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}
