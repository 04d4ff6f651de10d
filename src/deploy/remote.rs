//! The remote deployment as the reconciler sees it.
//!
//! Entities are addressed by name. "Not found" is [`RemoteError::NotFound`]
//! and is ordinary control flow; everything else is a failure.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::model::ResourceKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("not found")]
    NotFound,

    #[error("rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Whether trying the same call again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_) | Self::Transport(_))
    }
}

/// Kinds of human-readable references a manifest may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Group,
    Resource,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Group => "group",
            Self::Resource => "resource",
        })
    }
}

/// A deployed app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteApp {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub groups: Vec<Uuid>,
}

/// A deployed query template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteQueryTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub content: String,
    pub resource: Uuid,
}

/// A deployed resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteResource {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub connection: serde_json::Value,
}

/// Full desired state of an app, references resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppPayload {
    pub name: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub groups: Vec<Uuid>,
}

/// Full desired state of a query template, references resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryTemplatePayload {
    pub name: String,
    pub description: String,
    pub content: String,
    pub resource: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourcePayload {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub connection: serde_json::Value,
}

/// What a resource create did. Creates deduplicate by name.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceCreation {
    Created(Uuid),
    Existing(RemoteResource),
}

/// Operations the reconciler needs from a deployment.
pub trait RemoteApi {
    fn app_by_name(&self, name: &str) -> Result<RemoteApp, RemoteError>;

    fn create_app(&self, payload: &AppPayload) -> Result<Uuid, RemoteError>;

    fn update_app(&self, id: Uuid, payload: &AppPayload) -> Result<(), RemoteError>;

    fn query_template_by_name(&self, app: Uuid, name: &str) -> Result<RemoteQueryTemplate, RemoteError>;

    fn create_query_template(&self, app: Uuid, payload: &QueryTemplatePayload) -> Result<Uuid, RemoteError>;

    fn update_query_template(&self, id: Uuid, payload: &QueryTemplatePayload) -> Result<(), RemoteError>;

    /// Creates a resource unless one with the same name exists, in which
    /// case the existing one is returned untouched.
    fn create_resource(&self, payload: &ResourcePayload) -> Result<ResourceCreation, RemoteError>;

    /// Looks up the id behind a human-readable reference.
    fn resolve(&self, kind: RefKind, name: &str) -> Result<Uuid, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(RemoteError::DeadlineExceeded(Duration::from_secs(1)).is_retryable());
        assert!(RemoteError::Transport("reset".into()).is_retryable());
        assert!(!RemoteError::NotFound.is_retryable());
        assert!(
            !RemoteError::Rejected {
                code: "FORBIDDEN_ERROR".into(),
                message: "no".into()
            }
            .is_retryable()
        );
    }
}
