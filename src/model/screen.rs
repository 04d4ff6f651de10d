use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;

/// A screen of an app. Created together with its controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: Uuid,
    pub app: Uuid,
    pub name: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    /// Serialized node tree from the visual builder. Opaque here.
    pub content: String,
    pub controller: Uuid,
    pub status: Status,
    pub creator: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
