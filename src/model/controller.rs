//! Controllers: versioned source attached to a screen.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;
use crate::chain::PatchChain;

/// One revision step of a controller's source.
///
/// `content` is unified diff text, opaque to everything except the
/// patch module. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub author: String,
    pub content: String,
    pub created_at: Timestamp,
}

/// Source language of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Typescript,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "javascript" => Some(Self::Javascript),
            "typescript" => Some(Self::Typescript),
            _ => None,
        }
    }
}

/// A controller as stored: metadata plus its patch chain.
///
/// The source text is never stored; it is the fold of `patches`.
#[derive(Debug, Clone, PartialEq)]
pub struct Controller {
    pub id: Uuid,
    pub app: Uuid,
    pub name: String,
    pub description: String,
    pub language: Language,
    pub patches: PatchChain,
    pub status: Status,
    pub creator: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A controller as handed to callers, with its materialized source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalController {
    pub id: Uuid,
    pub app: Uuid,
    pub name: String,
    pub description: String,
    pub language: Language,
    pub creator: String,
    pub patches: Vec<Patch>,
    /// Reconstructed source: the fold of `patches` over the empty string.
    pub patched: String,
    /// SHA-256 of `patched`, hex encoded.
    pub digest: String,
    pub status: Status,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
