//! Resource rows. Connection settings are stored as a JSON document.

use rusqlite::Row;
use uuid::Uuid;

use crate::model::{Page, Paging, Resource, ResourceKind};

use super::{
    Result, StorageError, UnitOfWork, parse_id, parse_status, parse_timestamp, to_micros,
};

const COLUMNS: &str = "id, name, description, kind, connection, status, creator, created_at, updated_at";

impl UnitOfWork<'_> {
    pub fn insert_resource(&self, resource: &Resource) -> Result<()> {
        self.tx.execute(
            &format!("INSERT INTO resources ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            rusqlite::params![
                resource.id.to_string(),
                &resource.name,
                &resource.description,
                resource.kind.as_str(),
                serde_json::to_string(&resource.connection)?,
                resource.status.as_str(),
                &resource.creator,
                to_micros(resource.created_at),
                to_micros(resource.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn resource_by_id(&self, id: Uuid) -> Result<Option<Resource>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM resources WHERE id = ?1 AND status != 'deleted'"),
            [id.to_string()],
            resource_from_row,
        )
    }

    pub fn resource_by_name(&self, name: &str) -> Result<Option<Resource>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM resources WHERE name = ?1 AND status != 'deleted'"),
            [name],
            resource_from_row,
        )
    }

    pub fn list_resources(&self, paging: Paging) -> Result<Page<Resource>> {
        self.page("resources", COLUMNS, "", &[], paging, resource_from_row)
    }
}

fn resource_from_row(row: &Row<'_>) -> Result<Resource> {
    let kind: String = row.get("kind")?;
    let connection: String = row.get("connection")?;
    Ok(Resource {
        id: parse_id(row, "id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        kind: ResourceKind::parse(&kind)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown resource kind: {kind}")))?,
        connection: serde_json::from_str(&connection)?,
        status: parse_status(row)?,
        creator: row.get("creator")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}
