//! Group rows, stored in `user_groups`.

use rusqlite::Row;
use uuid::Uuid;

use crate::model::{Group, Page, Paging};

use super::{Result, UnitOfWork, parse_id, parse_status, parse_timestamp, to_micros};

const COLUMNS: &str = "id, name, description, status, creator, created_at, updated_at";

impl UnitOfWork<'_> {
    pub fn insert_group(&self, group: &Group) -> Result<()> {
        self.tx.execute(
            &format!("INSERT INTO user_groups ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            rusqlite::params![
                group.id.to_string(),
                &group.name,
                &group.description,
                group.status.as_str(),
                &group.creator,
                to_micros(group.created_at),
                to_micros(group.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn group_by_id(&self, id: Uuid) -> Result<Option<Group>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM user_groups WHERE id = ?1 AND status != 'deleted'"),
            [id.to_string()],
            group_from_row,
        )
    }

    pub fn group_by_name(&self, name: &str) -> Result<Option<Group>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM user_groups WHERE name = ?1 AND status != 'deleted'"),
            [name],
            group_from_row,
        )
    }

    pub fn list_groups(&self, paging: Paging) -> Result<Page<Group>> {
        self.page("user_groups", COLUMNS, "", &[], paging, group_from_row)
    }
}

fn group_from_row(row: &Row<'_>) -> Result<Group> {
    Ok(Group {
        id: parse_id(row, "id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status: parse_status(row)?,
        creator: row.get("creator")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}
