//! Apps and the groups they are shared with.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;

/// An application under construction.
///
/// `screens` and `controllers` are back-references pushed when the child is
/// created, not computed by query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub groups: Vec<Uuid>,
    pub screens: Vec<Uuid>,
    pub controllers: Vec<Uuid>,
    pub status: Status,
    pub creator: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A named set of users an app can be shared with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: Status,
    pub creator: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
