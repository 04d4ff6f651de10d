//! App rows: insert, update, lookup, listing, logical delete.

use jiff::Timestamp;
use rusqlite::Row;
use uuid::Uuid;

use crate::model::{App, Page, Paging};

use super::{
    Result, UnitOfWork, expect_row, parse_id, parse_ids, parse_status, parse_timestamp, to_micros,
};

const COLUMNS: &str = "id, name, title, slug, description, group_ids, screens, controllers, \
                       status, creator, created_at, updated_at";

impl UnitOfWork<'_> {
    pub fn insert_app(&self, app: &App) -> Result<()> {
        self.tx.execute(
            &format!("INSERT INTO apps ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
            rusqlite::params![
                app.id.to_string(),
                &app.name,
                &app.title,
                &app.slug,
                &app.description,
                serde_json::to_string(&app.groups)?,
                serde_json::to_string(&app.screens)?,
                serde_json::to_string(&app.controllers)?,
                app.status.as_str(),
                &app.creator,
                to_micros(app.created_at),
                to_micros(app.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Overwrites every mutable field of a live app.
    pub fn update_app(&self, app: &App) -> Result<()> {
        let rows = self.tx.execute(
            "UPDATE apps
             SET name = ?1, title = ?2, slug = ?3, description = ?4,
                 group_ids = ?5, screens = ?6, controllers = ?7, updated_at = ?8
             WHERE id = ?9 AND status != 'deleted'",
            rusqlite::params![
                &app.name,
                &app.title,
                &app.slug,
                &app.description,
                serde_json::to_string(&app.groups)?,
                serde_json::to_string(&app.screens)?,
                serde_json::to_string(&app.controllers)?,
                to_micros(app.updated_at),
                app.id.to_string(),
            ],
        )?;
        expect_row(rows, "app", app.id)
    }

    pub fn app_by_id(&self, id: Uuid) -> Result<Option<App>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM apps WHERE id = ?1 AND status != 'deleted'"),
            [id.to_string()],
            app_from_row,
        )
    }

    pub fn app_by_name(&self, name: &str) -> Result<Option<App>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM apps WHERE name = ?1 AND status != 'deleted'"),
            [name],
            app_from_row,
        )
    }

    pub fn list_apps(&self, paging: Paging) -> Result<Page<App>> {
        self.page("apps", COLUMNS, "", &[], paging, app_from_row)
    }

    pub fn delete_app(&self, id: Uuid, at: Timestamp) -> Result<()> {
        self.mark_deleted("apps", "app", id, at)
    }
}

fn app_from_row(row: &Row<'_>) -> Result<App> {
    Ok(App {
        id: parse_id(row, "id")?,
        name: row.get("name")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        groups: parse_ids(row, "group_ids")?,
        screens: parse_ids(row, "screens")?,
        controllers: parse_ids(row, "controllers")?,
        status: parse_status(row)?,
        creator: row.get("creator")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}
