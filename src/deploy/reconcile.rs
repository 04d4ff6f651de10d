//! Bringing one remote entity into agreement with its desired state.
//!
//! Lookup by name; create when absent; otherwise compare the comparable
//! fields and update only when they differ. Updates always carry the full
//! desired payload.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::DeployError;
use super::remote::RemoteError;

/// Kinds of entity a manifest deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    App,
    QueryTemplate,
    Resource,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::App => "app",
            Self::QueryTemplate => "query template",
            Self::Resource => "resource",
        })
    }
}

/// What reconciling one entity did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        })
    }
}

/// The outcome of one reconcile and the remote id of the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub outcome: Outcome,
    pub id: Uuid,
}

/// One kind of remote entity, as far as reconciliation is concerned.
pub trait Target {
    /// The manifest's description of the entity.
    type Desired;
    /// The entity as the remote reports it.
    type Remote: Serialize;
    /// What create and update send: the desired state, references resolved.
    type Payload: Serialize;

    const KIND: EntityKind;

    /// Fields that decide whether an update is needed. Everything else
    /// (ids, timestamps, status) is ignored.
    const COMPARISON_KEYS: &'static [&'static str];

    fn name(desired: &Self::Desired) -> &str;

    fn remote_id(remote: &Self::Remote) -> Uuid;

    fn lookup(&self, name: &str) -> Result<Self::Remote, RemoteError>;

    /// Builds the payload, resolving human-readable references to ids.
    fn payload(&self, desired: &Self::Desired) -> Result<Self::Payload, DeployError>;

    fn create(&self, payload: &Self::Payload) -> Result<Uuid, RemoteError>;

    fn update(&self, id: Uuid, payload: &Self::Payload) -> Result<(), RemoteError>;
}

/// A pick of an entity's serialized form. Keys the entity doesn't have
/// stay absent.
pub type Projection = BTreeMap<String, serde_json::Value>;

pub fn project<T: Serialize>(value: &T, keys: &[&str]) -> Result<Projection, serde_json::Error> {
    let serde_json::Value::Object(mut fields) = serde_json::to_value(value)? else {
        return Ok(Projection::new());
    };
    Ok(keys
        .iter()
        .filter_map(|&key| fields.remove(key).map(|v| (key.to_string(), v)))
        .collect())
}

/// Reconciles one entity.
pub fn reconcile<T: Target>(target: &T, desired: &T::Desired) -> Result<Reconciled, DeployError> {
    let name = T::name(desired);
    let remote_failure = |source| DeployError::Remote {
        kind: T::KIND,
        name: name.to_string(),
        source,
    };

    let remote = match target.lookup(name) {
        Ok(remote) => remote,
        Err(RemoteError::NotFound) => {
            let payload = target.payload(desired)?;
            let id = target.create(&payload).map_err(remote_failure)?;
            tracing::info!(kind = %T::KIND, name, %id, "created");
            return Ok(Reconciled {
                outcome: Outcome::Created,
                id,
            });
        }
        Err(e) => return Err(remote_failure(e)),
    };

    let id = T::remote_id(&remote);
    let payload = target.payload(desired)?;
    let current = project(&remote, T::COMPARISON_KEYS)?;
    let wanted = project(&payload, T::COMPARISON_KEYS)?;
    if current == wanted {
        tracing::debug!(kind = %T::KIND, name, %id, "unchanged");
        return Ok(Reconciled {
            outcome: Outcome::Unchanged,
            id,
        });
    }

    target.update(id, &payload).map_err(remote_failure)?;
    tracing::info!(kind = %T::KIND, name, %id, "updated");
    Ok(Reconciled {
        outcome: Outcome::Updated,
        id,
    })
}
