//! Declarative deploys: make a deployment match a manifest.
//!
//! The app is reconciled first, since its id scopes the query templates.
//! Resources are synced before the query templates rather than after them:
//! a query template names its resource, and that name has to resolve when
//! the template is created, so a manifest that introduces both in one run
//! would otherwise fail. Processing is sequential and the first failure stops
//! the run. Re-running is safe because applied changes compare equal.

mod deadline;
mod local;
mod manifest;
mod reconcile;
mod remote;

use serde::Serialize;
use uuid::Uuid;

pub use deadline::Deadline;
pub use local::LocalRemote;
pub use manifest::Manifest;
pub use reconcile::{EntityKind, Outcome};
pub use remote::{RefKind, RemoteApi, RemoteError};

use manifest::{AppSpec, QuerySpec, ResourceSpec};
use reconcile::{Reconciled, Target, project, reconcile};
use remote::{
    AppPayload, QueryTemplatePayload, RemoteApp, RemoteQueryTemplate, ResourceCreation,
    ResourcePayload,
};

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("{kind} {name:?}: {source}")]
    Remote {
        kind: EntityKind,
        name: String,
        source: RemoteError,
    },

    #[error("{kind} {name:?} refers to unknown {reference} {value:?}")]
    UnresolvedReference {
        kind: EntityKind,
        name: String,
        reference: RefKind,
        value: String,
    },

    #[error("failed to project entity: {0}")]
    Projection(#[from] serde_json::Error),
}

impl DeployError {
    /// Whether re-running the deploy may succeed without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote { source, .. } if source.is_retryable())
    }
}

/// One line of a deploy report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub kind: EntityKind,
    pub name: String,
    pub outcome: Outcome,
    pub id: Uuid,
}

/// What a deploy did, one entry per entity, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub entries: Vec<ReportEntry>,
}

impl DeployReport {
    fn record(&mut self, kind: EntityKind, name: &str, reconciled: Reconciled) {
        self.entries.push(ReportEntry {
            kind,
            name: name.to_string(),
            outcome: reconciled.outcome,
            id: reconciled.id,
        });
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }
}

/// Brings `remote` into agreement with `manifest`.
pub fn sync_manifest<R: RemoteApi>(remote: &R, manifest: &Manifest) -> Result<DeployReport, DeployError> {
    let mut report = DeployReport::default();

    let app = reconcile(&AppTarget { remote }, &manifest.app)?;
    report.record(EntityKind::App, &manifest.app.name, app);

    for spec in &manifest.resources {
        let reconciled = sync_resource(remote, spec)?;
        report.record(EntityKind::Resource, &spec.name, reconciled);
    }

    let queries = QueryTarget { remote, app: app.id };
    for spec in &manifest.queries {
        let reconciled = reconcile(&queries, spec)?;
        report.record(EntityKind::QueryTemplate, &spec.name, reconciled);
    }

    tracing::info!(
        app = %manifest.app.name,
        created = report.count(Outcome::Created),
        updated = report.count(Outcome::Updated),
        unchanged = report.count(Outcome::Unchanged),
        "deploy finished"
    );
    Ok(report)
}

const RESOURCE_KEYS: &[&str] = &["name", "description", "type", "connection"];

/// Resources are create-only. An existing resource is left alone; if its
/// settings differ from the manifest, the drift is logged.
fn sync_resource<R: RemoteApi>(remote: &R, spec: &ResourceSpec) -> Result<Reconciled, DeployError> {
    let payload = ResourcePayload {
        name: spec.name.clone(),
        description: spec.description.clone(),
        kind: spec.kind,
        connection: spec.connection.clone(),
    };
    let creation = remote
        .create_resource(&payload)
        .map_err(|source| DeployError::Remote {
            kind: EntityKind::Resource,
            name: spec.name.clone(),
            source,
        })?;

    match creation {
        ResourceCreation::Created(id) => {
            tracing::info!(kind = %EntityKind::Resource, name = %spec.name, %id, "created");
            Ok(Reconciled {
                outcome: Outcome::Created,
                id,
            })
        }
        ResourceCreation::Existing(existing) => {
            if project(&existing, RESOURCE_KEYS)? != project(&payload, RESOURCE_KEYS)? {
                tracing::warn!(
                    name = %spec.name,
                    id = %existing.id,
                    "existing resource differs from manifest; leaving it as is"
                );
            }
            Ok(Reconciled {
                outcome: Outcome::Unchanged,
                id: existing.id,
            })
        }
    }
}

/// Looks up a reference, turning "not found" into a hard failure.
fn resolve<R: RemoteApi>(
    remote: &R,
    kind: EntityKind,
    name: &str,
    reference: RefKind,
    value: &str,
) -> Result<Uuid, DeployError> {
    remote.resolve(reference, value).map_err(|e| match e {
        RemoteError::NotFound => DeployError::UnresolvedReference {
            kind,
            name: name.to_string(),
            reference,
            value: value.to_string(),
        },
        source => DeployError::Remote {
            kind,
            name: name.to_string(),
            source,
        },
    })
}

struct AppTarget<'r, R> {
    remote: &'r R,
}

impl<R: RemoteApi> Target for AppTarget<'_, R> {
    type Desired = AppSpec;
    type Remote = RemoteApp;
    type Payload = AppPayload;

    const KIND: EntityKind = EntityKind::App;
    const COMPARISON_KEYS: &'static [&'static str] = &["name", "slug", "description", "title", "groups"];

    fn name(desired: &AppSpec) -> &str {
        &desired.name
    }

    fn remote_id(remote: &RemoteApp) -> Uuid {
        remote.id
    }

    fn lookup(&self, name: &str) -> Result<RemoteApp, RemoteError> {
        self.remote.app_by_name(name)
    }

    fn payload(&self, desired: &AppSpec) -> Result<AppPayload, DeployError> {
        let groups = desired
            .groups
            .iter()
            .map(|group| resolve(self.remote, Self::KIND, &desired.name, RefKind::Group, group))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AppPayload {
            name: desired.name.clone(),
            title: desired.title.clone(),
            slug: desired.slug.clone(),
            description: desired.description.clone(),
            groups,
        })
    }

    fn create(&self, payload: &AppPayload) -> Result<Uuid, RemoteError> {
        self.remote.create_app(payload)
    }

    fn update(&self, id: Uuid, payload: &AppPayload) -> Result<(), RemoteError> {
        self.remote.update_app(id, payload)
    }
}

struct QueryTarget<'r, R> {
    remote: &'r R,
    app: Uuid,
}

impl<R: RemoteApi> Target for QueryTarget<'_, R> {
    type Desired = QuerySpec;
    type Remote = RemoteQueryTemplate;
    type Payload = QueryTemplatePayload;

    const KIND: EntityKind = EntityKind::QueryTemplate;
    const COMPARISON_KEYS: &'static [&'static str] = &["name", "description", "content"];

    fn name(desired: &QuerySpec) -> &str {
        &desired.name
    }

    fn remote_id(remote: &RemoteQueryTemplate) -> Uuid {
        remote.id
    }

    fn lookup(&self, name: &str) -> Result<RemoteQueryTemplate, RemoteError> {
        self.remote.query_template_by_name(self.app, name)
    }

    fn payload(&self, desired: &QuerySpec) -> Result<QueryTemplatePayload, DeployError> {
        let resource = resolve(
            self.remote,
            Self::KIND,
            &desired.name,
            RefKind::Resource,
            &desired.resource,
        )?;
        Ok(QueryTemplatePayload {
            name: desired.name.clone(),
            description: desired.description.clone(),
            content: desired.content.clone(),
            resource,
        })
    }

    fn create(&self, payload: &QueryTemplatePayload) -> Result<Uuid, RemoteError> {
        self.remote.create_query_template(self.app, payload)
    }

    fn update(&self, id: Uuid, payload: &QueryTemplatePayload) -> Result<(), RemoteError> {
        self.remote.update_query_template(id, payload)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::deploy::remote::RemoteResource;
    use crate::model::ResourceKind;

    /// An in-memory deployment that records every mutating call.
    #[derive(Default)]
    struct Recorder {
        apps: RefCell<Vec<RemoteApp>>,
        queries: RefCell<Vec<(Uuid, RemoteQueryTemplate)>>,
        resources: RefCell<Vec<RemoteResource>>,
        groups: BTreeMap<String, Uuid>,
        calls: RefCell<Vec<String>>,
        failing_query_lookup: Option<RemoteError>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn mutations(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|c| c.starts_with("create") || c.starts_with("update"))
                .collect()
        }

        fn with_app(self, name: &str, title: &str) -> Self {
            self.apps.borrow_mut().push(RemoteApp {
                id: Uuid::new_v4(),
                name: name.into(),
                title: title.into(),
                slug: "x".into(),
                description: String::new(),
                groups: vec![],
            });
            self
        }
    }

    impl RemoteApi for Recorder {
        fn app_by_name(&self, name: &str) -> Result<RemoteApp, RemoteError> {
            self.calls.borrow_mut().push(format!("app_by_name {name}"));
            self.apps
                .borrow()
                .iter()
                .find(|a| a.name == name)
                .cloned()
                .ok_or(RemoteError::NotFound)
        }

        fn create_app(&self, payload: &AppPayload) -> Result<Uuid, RemoteError> {
            self.calls.borrow_mut().push(format!("create_app {}", payload.name));
            let id = Uuid::new_v4();
            self.apps.borrow_mut().push(RemoteApp {
                id,
                name: payload.name.clone(),
                title: payload.title.clone(),
                slug: payload.slug.clone(),
                description: payload.description.clone(),
                groups: payload.groups.clone(),
            });
            Ok(id)
        }

        fn update_app(&self, id: Uuid, payload: &AppPayload) -> Result<(), RemoteError> {
            self.calls
                .borrow_mut()
                .push(format!("update_app {} title={}", payload.name, payload.title));
            let mut apps = self.apps.borrow_mut();
            let app = apps.iter_mut().find(|a| a.id == id).ok_or(RemoteError::NotFound)?;
            app.name = payload.name.clone();
            app.title = payload.title.clone();
            app.slug = payload.slug.clone();
            app.description = payload.description.clone();
            app.groups = payload.groups.clone();
            Ok(())
        }

        fn query_template_by_name(&self, app: Uuid, name: &str) -> Result<RemoteQueryTemplate, RemoteError> {
            self.calls.borrow_mut().push(format!("query_template_by_name {name}"));
            if let Some(e) = &self.failing_query_lookup {
                return Err(e.clone());
            }
            self.queries
                .borrow()
                .iter()
                .find(|(owner, q)| *owner == app && q.name == name)
                .map(|(_, q)| q.clone())
                .ok_or(RemoteError::NotFound)
        }

        fn create_query_template(&self, app: Uuid, payload: &QueryTemplatePayload) -> Result<Uuid, RemoteError> {
            self.calls.borrow_mut().push(format!(
                "create_query_template {} content={} resource={}",
                payload.name, payload.content, payload.resource
            ));
            let id = Uuid::new_v4();
            self.queries.borrow_mut().push((
                app,
                RemoteQueryTemplate {
                    id,
                    name: payload.name.clone(),
                    description: payload.description.clone(),
                    content: payload.content.clone(),
                    resource: payload.resource,
                },
            ));
            Ok(id)
        }

        fn update_query_template(&self, id: Uuid, payload: &QueryTemplatePayload) -> Result<(), RemoteError> {
            self.calls.borrow_mut().push(format!("update_query_template {}", payload.name));
            let mut queries = self.queries.borrow_mut();
            let (_, q) = queries.iter_mut().find(|(_, q)| q.id == id).ok_or(RemoteError::NotFound)?;
            q.name = payload.name.clone();
            q.description = payload.description.clone();
            q.content = payload.content.clone();
            q.resource = payload.resource;
            Ok(())
        }

        fn create_resource(&self, payload: &ResourcePayload) -> Result<ResourceCreation, RemoteError> {
            self.calls.borrow_mut().push(format!("create_resource {}", payload.name));
            let mut resources = self.resources.borrow_mut();
            if let Some(existing) = resources.iter().find(|r| r.name == payload.name) {
                return Ok(ResourceCreation::Existing(existing.clone()));
            }
            let id = Uuid::new_v4();
            resources.push(RemoteResource {
                id,
                name: payload.name.clone(),
                description: payload.description.clone(),
                kind: payload.kind,
                connection: payload.connection.clone(),
            });
            Ok(ResourceCreation::Created(id))
        }

        fn resolve(&self, kind: RefKind, name: &str) -> Result<Uuid, RemoteError> {
            match kind {
                RefKind::Group => self.groups.get(name).copied().ok_or(RemoteError::NotFound),
                RefKind::Resource => self
                    .resources
                    .borrow()
                    .iter()
                    .find(|r| r.name == name)
                    .map(|r| r.id)
                    .ok_or(RemoteError::NotFound),
            }
        }
    }

    fn app_spec(name: &str, title: &str) -> AppSpec {
        AppSpec {
            name: name.into(),
            title: title.into(),
            slug: "x".into(),
            description: String::new(),
            groups: vec![],
        }
    }

    fn manifest(app: AppSpec) -> Manifest {
        Manifest {
            app,
            queries: vec![],
            resources: vec![],
        }
    }

    fn full_manifest() -> Manifest {
        Manifest {
            app: app_spec("x", "X"),
            resources: vec![ResourceSpec {
                name: "warehouse".into(),
                description: String::new(),
                kind: ResourceKind::Postgres,
                connection: json!({ "host": "db" }),
            }],
            queries: vec![QuerySpec {
                name: "q1".into(),
                description: "Open orders".into(),
                content: "select * from orders".into(),
                resource: "warehouse".into(),
            }],
        }
    }

    #[test]
    fn matching_app_is_unchanged() {
        let remote = Recorder::default().with_app("x", "X");

        let report = sync_manifest(&remote, &manifest(app_spec("x", "X"))).unwrap();

        assert_eq!(report.entries[0].outcome, Outcome::Unchanged);
        assert_eq!(report.entries[0].id, remote.apps.borrow()[0].id);
        assert!(remote.mutations().is_empty());
    }

    #[test]
    fn changed_title_updates_app() {
        let remote = Recorder::default().with_app("x", "X");

        let report = sync_manifest(&remote, &manifest(app_spec("x", "X2"))).unwrap();

        assert_eq!(report.entries[0].outcome, Outcome::Updated);
        assert_eq!(remote.mutations(), ["update_app x title=X2"]);
    }

    #[test]
    fn missing_query_is_created_with_full_spec() {
        let remote = Recorder::default().with_app("x", "X");

        let report = sync_manifest(&remote, &full_manifest()).unwrap();

        let warehouse = remote.resources.borrow()[0].id;
        assert_eq!(
            remote.mutations(),
            [
                "create_resource warehouse".to_string(),
                format!("create_query_template q1 content=select * from orders resource={warehouse}"),
            ]
        );
        let outcomes: Vec<_> = report.entries.iter().map(|e| e.outcome).collect();
        assert_eq!(outcomes, [Outcome::Unchanged, Outcome::Created, Outcome::Created]);
        let (_, created) = &remote.queries.borrow()[0];
        assert_eq!(created.description, "Open orders");
    }

    #[test]
    fn rerun_changes_nothing() {
        let remote = Recorder::default();

        sync_manifest(&remote, &full_manifest()).unwrap();
        let before = remote.mutations().len();
        let report = sync_manifest(&remote, &full_manifest()).unwrap();

        assert_eq!(report.count(Outcome::Unchanged), 3);
        // Resources are offered to the remote on every run; it deduplicates.
        assert_eq!(remote.mutations()[before..], ["create_resource warehouse"]);
        assert_eq!(remote.apps.borrow().len(), 1);
        assert_eq!(remote.resources.borrow().len(), 1);
        assert_eq!(remote.queries.borrow().len(), 1);
    }

    #[test]
    fn app_then_resources_then_queries() {
        let remote = Recorder::default();

        sync_manifest(&remote, &full_manifest()).unwrap();

        let calls = remote.calls();
        let app = calls.iter().position(|c| c == "create_app x").unwrap();
        let resource = calls
            .iter()
            .position(|c| c == "create_resource warehouse")
            .unwrap();
        let query = calls
            .iter()
            .position(|c| c.starts_with("query_template_by_name"))
            .unwrap();
        assert!(app < resource);
        assert!(resource < query);
    }

    #[test]
    fn group_names_resolve_to_ids() {
        let staff = Uuid::new_v4();
        let mut remote = Recorder::default();
        remote.groups.insert("staff".into(), staff);
        let mut spec = app_spec("x", "X");
        spec.groups = vec!["staff".into()];

        sync_manifest(&remote, &manifest(spec.clone())).unwrap();
        assert_eq!(remote.apps.borrow()[0].groups, vec![staff]);

        let again = sync_manifest(&remote, &manifest(spec)).unwrap();
        assert_eq!(again.entries[0].outcome, Outcome::Unchanged);
    }

    #[test]
    fn unknown_group_is_a_hard_failure() {
        let remote = Recorder::default();
        let mut spec = app_spec("x", "X");
        spec.groups = vec!["nobody".into()];

        let err = sync_manifest(&remote, &manifest(spec)).unwrap_err();

        assert!(matches!(
            err,
            DeployError::UnresolvedReference {
                reference: RefKind::Group,
                ..
            }
        ));
        assert!(remote.mutations().is_empty());
    }

    #[test]
    fn query_lookup_failure_aborts_the_run() {
        let remote = Recorder {
            failing_query_lookup: Some(RemoteError::Transport("reset".into())),
            ..Recorder::default()
        };

        let err = sync_manifest(&remote, &full_manifest()).unwrap_err();

        assert!(matches!(
            err,
            DeployError::Remote {
                kind: EntityKind::QueryTemplate,
                source: RemoteError::Transport(_),
                ..
            }
        ));
        assert!(err.is_retryable());
        assert!(!remote.mutations().iter().any(|c| c.starts_with("create_query")));
    }

    #[test]
    fn existing_resource_is_not_modified() {
        let remote = Recorder::default();
        let mut first = full_manifest();
        sync_manifest(&remote, &first).unwrap();

        first.resources[0].connection = json!({ "host": "elsewhere" });
        let report = sync_manifest(&remote, &first).unwrap();

        assert_eq!(report.entries[1].outcome, Outcome::Unchanged);
        assert_eq!(remote.resources.borrow()[0].connection, json!({ "host": "db" }));
    }
}
