use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;

/// How a query template came to exist.
///
/// Static templates are owned by a deployed manifest; dynamic ones are
/// authored interactively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Static,
    Dynamic,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "static" => Some(Self::Static),
            "dynamic" => Some(Self::Dynamic),
            _ => None,
        }
    }
}

/// A parameterized query an app runs against one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTemplate {
    pub id: Uuid,
    pub app: Uuid,
    pub resource: Uuid,
    pub name: String,
    pub description: String,
    pub content: String,
    pub lifecycle: Lifecycle,
    pub status: Status,
    pub creator: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
