use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;

/// The kind of data source a resource connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Mysql,
    Postgres,
    Mongodb,
    Bigquery,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Mongodb => "mongodb",
            Self::Bigquery => "bigquery",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mysql" => Some(Self::Mysql),
            "postgres" => Some(Self::Postgres),
            "mongodb" => Some(Self::Mongodb),
            "bigquery" => Some(Self::Bigquery),
            _ => None,
        }
    }
}

/// A data source shared across apps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Kind-specific connection settings, always a JSON object.
    pub connection: serde_json::Value,
    pub status: Status,
    pub creator: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
