//! Core data model for appforge.
//!
//! Apps aggregate screens and controllers; every screen owns exactly one
//! controller whose source lives in a patch chain. Query templates and
//! resources describe the data an app talks to.

mod app;
mod controller;
mod page;
mod query_template;
mod resource;
mod screen;

use serde::{Deserialize, Serialize};

pub use app::{App, Group};
pub use controller::{Controller, ExternalController, Language, Patch};
pub use page::{Page, Paging};
pub use query_template::{Lifecycle, QueryTemplate};
pub use resource::{Resource, ResourceKind};
pub use screen::Screen;

/// Where a stored document stands in its lifecycle.
///
/// Documents only ever move `Created → Deleted`. Deleted documents keep
/// their data and are hidden from every read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Created,
    Deleted,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}
