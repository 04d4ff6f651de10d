//! The application-builder API: one method per operation, per entity kind.
//!
//! Every mutating operation runs in a single unit of work. Writes happen
//! first, then the permission oracle sees the updated documents; commit
//! happens only if it allows the action. Any error along the way, denial
//! included, rolls every write back.

mod apps;
mod controllers;
mod groups;
mod query_templates;
mod resources;
mod screens;
mod validate;

use crate::chain::ChainError;
use crate::permission::{Action, PermissionOracle, Subject};
use crate::storage::{Storage, StorageError};

pub use apps::{AppUpdate, NewApp};
pub use controllers::{ControllerUpdate, NewController, NewPatch};
pub use groups::NewGroup;
pub use query_templates::{NewQueryTemplate, QueryTemplateUpdate};
pub use resources::NewResource;
pub use screens::{NewScreen, ScreenUpdate};

/// Errors surfaced to API callers. Each kind carries a stable code.
///
/// Internal failures keep their details out of the message; they are
/// logged where they happen.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Authorization(String),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "BAD_REQUEST_ERROR",
            Self::NotFound(_) => "NOT_FOUND_ERROR",
            Self::Conflict(_) => "CONFLICT_ERROR",
            Self::Authorization(_) => "FORBIDDEN_ERROR",
            Self::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Missing { kind, id } => Self::NotFound(format!("{kind} not found: {id}")),
            StorageError::StaleChain { .. } => Self::Conflict(err.to_string()),
            other => {
                tracing::error!(error = %other, "storage failure");
                Self::Internal
            }
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Stale { .. } => Self::Conflict(err.to_string()),
            ChainError::Corrupt { .. } => {
                tracing::error!(error = %err, "corrupt patch chain");
                Self::Internal
            }
        }
    }
}

pub type Result<T> = core::result::Result<T, ApiError>;

/// The API core over a store and a permission oracle.
#[derive(Clone, Copy)]
pub struct Api<'a> {
    storage: &'a Storage,
    oracle: &'a dyn PermissionOracle,
}

impl<'a> Api<'a> {
    pub fn new(storage: &'a Storage, oracle: &'a dyn PermissionOracle) -> Self {
        Self { storage, oracle }
    }

    fn authorize(&self, user: &str, action: Action, subjects: &[Subject<'_>]) -> Result<()> {
        self.oracle.check(user, action, subjects)
    }
}

fn not_found(kind: &str, key: impl std::fmt::Display) -> ApiError {
    ApiError::NotFound(format!("{kind} not found: {key}"))
}

fn conflict(kind: &str, name: &str) -> ApiError {
    ApiError::Conflict(format!("{kind} named {name:?} already exists"))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the service tests.

    use tempfile::TempDir;

    use super::*;
    use crate::permission::OwnerPolicy;

    /// Denies everything.
    pub struct DenyAll;

    impl PermissionOracle for DenyAll {
        fn check(&self, _: &str, action: Action, _: &[Subject<'_>]) -> Result<()> {
            Err(ApiError::Authorization(format!("denied: {action}")))
        }
    }

    pub fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("store.sqlite")).unwrap();
        (dir, storage)
    }

    pub fn owner_policy() -> OwnerPolicy {
        OwnerPolicy::new(["admin".to_string()])
    }

    pub fn new_app(name: &str) -> NewApp {
        NewApp {
            name: name.into(),
            title: "Customers".into(),
            slug: "customers".into(),
            description: String::new(),
            groups: vec![],
        }
    }

    pub fn new_screen(app: uuid::Uuid, name: &str) -> NewScreen {
        NewScreen {
            app,
            name: name.into(),
            title: "Home".into(),
            description: String::new(),
            slug: "home".into(),
            content: "{}".into(),
        }
    }
}
