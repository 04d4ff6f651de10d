//! Query template rows.

use jiff::Timestamp;
use rusqlite::Row;
use uuid::Uuid;

use crate::model::{Lifecycle, Page, Paging, QueryTemplate};

use super::{
    Result, StorageError, UnitOfWork, expect_row, parse_id, parse_status, parse_timestamp,
    to_micros,
};

const COLUMNS: &str = "id, app, resource, name, description, content, lifecycle, \
                       status, creator, created_at, updated_at";

impl UnitOfWork<'_> {
    pub fn insert_query_template(&self, template: &QueryTemplate) -> Result<()> {
        self.tx.execute(
            &format!("INSERT INTO query_templates ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            rusqlite::params![
                template.id.to_string(),
                template.app.to_string(),
                template.resource.to_string(),
                &template.name,
                &template.description,
                &template.content,
                template.lifecycle.as_str(),
                template.status.as_str(),
                &template.creator,
                to_micros(template.created_at),
                to_micros(template.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn update_query_template(&self, template: &QueryTemplate) -> Result<()> {
        let rows = self.tx.execute(
            "UPDATE query_templates
             SET name = ?1, description = ?2, content = ?3, updated_at = ?4
             WHERE id = ?5 AND status != 'deleted'",
            rusqlite::params![
                &template.name,
                &template.description,
                &template.content,
                to_micros(template.updated_at),
                template.id.to_string(),
            ],
        )?;
        expect_row(rows, "query template", template.id)
    }

    pub fn query_template_by_id(&self, id: Uuid) -> Result<Option<QueryTemplate>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM query_templates WHERE id = ?1 AND status != 'deleted'"),
            [id.to_string()],
            query_template_from_row,
        )
    }

    pub fn query_template_by_name(&self, app: Uuid, name: &str) -> Result<Option<QueryTemplate>> {
        self.query_one(
            &format!(
                "SELECT {COLUMNS} FROM query_templates
                 WHERE app = ?1 AND name = ?2 AND status != 'deleted'"
            ),
            rusqlite::params![app.to_string(), name],
            query_template_from_row,
        )
    }

    pub fn list_query_templates(&self, app: Uuid, paging: Paging) -> Result<Page<QueryTemplate>> {
        let app = app.to_string();
        self.page(
            "query_templates",
            COLUMNS,
            "AND app = ?",
            &[&app],
            paging,
            query_template_from_row,
        )
    }

    pub fn delete_query_template(&self, id: Uuid, at: Timestamp) -> Result<()> {
        self.mark_deleted("query_templates", "query template", id, at)
    }

    /// Logically deletes every live static template of `app`. Returns how
    /// many were deleted.
    pub fn delete_static_query_templates(&self, app: Uuid, at: Timestamp) -> Result<usize> {
        let rows = self.tx.execute(
            "UPDATE query_templates SET status = 'deleted', updated_at = ?1
             WHERE app = ?2 AND lifecycle = 'static' AND status != 'deleted'",
            rusqlite::params![to_micros(at), app.to_string()],
        )?;
        Ok(rows)
    }
}

fn query_template_from_row(row: &Row<'_>) -> Result<QueryTemplate> {
    let lifecycle: String = row.get("lifecycle")?;
    Ok(QueryTemplate {
        id: parse_id(row, "id")?,
        app: parse_id(row, "app")?,
        resource: parse_id(row, "resource")?,
        name: row.get("name")?,
        description: row.get("description")?,
        content: row.get("content")?,
        lifecycle: Lifecycle::parse(&lifecycle)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown lifecycle: {lifecycle}")))?,
        status: parse_status(row)?,
        creator: row.get("creator")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}
