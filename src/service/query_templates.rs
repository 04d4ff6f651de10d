//! Query template operations.

use uuid::Uuid;

use crate::model::{Lifecycle, Page, Paging, QueryTemplate, Status};
use crate::permission::{Action, Scope, Subject, Verb};
use crate::storage;

use super::{Api, Result, conflict, not_found, validate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueryTemplate {
    pub app: Uuid,
    pub resource: Uuid,
    pub name: String,
    pub description: String,
    pub content: String,
    pub lifecycle: Lifecycle,
}

/// Fields to change on a query template. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
}

impl Api<'_> {
    pub fn create_query_template(&self, user: &str, new: NewQueryTemplate) -> Result<QueryTemplate> {
        validate::name(&new.name)?;
        validate::description(&new.description)?;

        self.storage.write(|uow| {
            let app = uow.app_by_id(new.app)?.ok_or_else(|| not_found("app", new.app))?;
            if uow.resource_by_id(new.resource)?.is_none() {
                return Err(not_found("resource", new.resource));
            }
            if uow.query_template_by_name(app.id, &new.name)?.is_some() {
                return Err(conflict("query template", &new.name));
            }

            let now = storage::now();
            let template = QueryTemplate {
                id: Uuid::new_v4(),
                app: app.id,
                resource: new.resource,
                name: new.name,
                description: new.description,
                content: new.content,
                lifecycle: new.lifecycle,
                status: Status::Created,
                creator: user.to_string(),
                created_at: now,
                updated_at: now,
            };
            uow.insert_query_template(&template)?;
            self.authorize(
                user,
                Action::new(Scope::QueryTemplates, Verb::Create),
                &[Subject::QueryTemplate(&template), Subject::App(&app)],
            )?;
            tracing::info!(app = %app.id, query = %template.id, name = %template.name, "created query template");
            Ok(template)
        })
    }

    pub fn query_template_by_id(&self, user: &str, id: Uuid) -> Result<QueryTemplate> {
        self.storage.read(|uow| {
            let template = uow
                .query_template_by_id(id)?
                .ok_or_else(|| not_found("query template", id))?;
            self.authorize(
                user,
                Action::new(Scope::QueryTemplates, Verb::View),
                &[Subject::QueryTemplate(&template)],
            )?;
            Ok(template)
        })
    }

    pub fn query_template_by_name(&self, user: &str, app: Uuid, name: &str) -> Result<QueryTemplate> {
        self.storage.read(|uow| {
            let template = uow
                .query_template_by_name(app, name)?
                .ok_or_else(|| not_found("query template", name))?;
            self.authorize(
                user,
                Action::new(Scope::QueryTemplates, Verb::View),
                &[Subject::QueryTemplate(&template)],
            )?;
            Ok(template)
        })
    }

    pub fn list_query_templates(
        &self,
        user: &str,
        app: Uuid,
        paging: Paging,
    ) -> Result<Page<QueryTemplate>> {
        self.authorize(user, Action::new(Scope::QueryTemplates, Verb::List), &[])?;
        Ok(self.storage.read(|uow| uow.list_query_templates(app, paging))?)
    }

    /// Fetches query templates by id, in the order given. Every id must
    /// resolve.
    pub fn query_templates_by_ids(&self, user: &str, ids: &[Uuid]) -> Result<Vec<QueryTemplate>> {
        self.storage.read(|uow| {
            let templates = ids
                .iter()
                .map(|&id| {
                    uow.query_template_by_id(id)?
                        .ok_or_else(|| not_found("query template", id))
                })
                .collect::<Result<Vec<_>>>()?;
            let subjects: Vec<_> = templates.iter().map(Subject::QueryTemplate).collect();
            self.authorize(user, Action::new(Scope::QueryTemplates, Verb::List), &subjects)?;
            Ok(templates)
        })
    }

    pub fn update_query_template(
        &self,
        user: &str,
        id: Uuid,
        update: QueryTemplateUpdate,
    ) -> Result<QueryTemplate> {
        self.storage.write(|uow| {
            let mut template = uow
                .query_template_by_id(id)?
                .ok_or_else(|| not_found("query template", id))?;
            if let Some(name) = update.name {
                validate::name(&name)?;
                if name != template.name && uow.query_template_by_name(template.app, &name)?.is_some() {
                    return Err(conflict("query template", &name));
                }
                template.name = name;
            }
            if let Some(description) = update.description {
                validate::description(&description)?;
                template.description = description;
            }
            if let Some(content) = update.content {
                template.content = content;
            }
            template.updated_at = storage::now();

            uow.update_query_template(&template)?;
            self.authorize(
                user,
                Action::new(Scope::QueryTemplates, Verb::Update),
                &[Subject::QueryTemplate(&template)],
            )?;
            tracing::info!(query = %id, "updated query template");
            Ok(template)
        })
    }

    pub fn remove_query_template(&self, user: &str, id: Uuid) -> Result<()> {
        self.storage.write(|uow| {
            let template = uow
                .query_template_by_id(id)?
                .ok_or_else(|| not_found("query template", id))?;
            uow.delete_query_template(id, storage::now())?;
            self.authorize(
                user,
                Action::new(Scope::QueryTemplates, Verb::Delete),
                &[Subject::QueryTemplate(&template)],
            )?;
            tracing::info!(query = %id, "removed query template");
            Ok(())
        })
    }

    /// Logically deletes every static query template of an app. Returns how
    /// many were removed.
    pub fn remove_static_query_templates(&self, user: &str, app: Uuid) -> Result<usize> {
        self.storage.write(|uow| {
            let owner = uow.app_by_id(app)?.ok_or_else(|| not_found("app", app))?;
            let removed = uow.delete_static_query_templates(app, storage::now())?;
            self.authorize(
                user,
                Action::new(Scope::QueryTemplates, Verb::Delete),
                &[Subject::App(&owner)],
            )?;
            tracing::info!(%app, removed, "removed static query templates");
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::ResourceKind;
    use crate::service::NewResource;
    use crate::service::testing::{new_app, owner_policy, test_storage};

    fn setup(api: &Api<'_>) -> (Uuid, Uuid) {
        let app = api.create_app("u1", new_app("crm")).unwrap();
        let resource = api
            .create_resource(
                "u1",
                NewResource {
                    name: "warehouse".into(),
                    description: String::new(),
                    kind: ResourceKind::Postgres,
                    connection: json!({ "host": "db" }),
                },
            )
            .unwrap();
        (app.id, resource.id)
    }

    fn new_query(app: Uuid, resource: Uuid, name: &str, lifecycle: Lifecycle) -> NewQueryTemplate {
        NewQueryTemplate {
            app,
            resource,
            name: name.into(),
            description: String::new(),
            content: "select * from orders".into(),
            lifecycle,
        }
    }

    #[test]
    fn create_fetch_update() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let (app, resource) = setup(&api);

        let created = api
            .create_query_template("u1", new_query(app, resource, "orders", Lifecycle::Static))
            .unwrap();
        assert_eq!(api.query_template_by_name("u1", app, "orders").unwrap(), created);

        let updated = api
            .update_query_template(
                "u1",
                created.id,
                QueryTemplateUpdate {
                    content: Some("select 1".into()),
                    ..QueryTemplateUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.content, "select 1");
        assert_eq!(api.query_template_by_id("u1", created.id).unwrap(), updated);
    }

    #[test]
    fn unknown_resource_is_not_found() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let (app, _) = setup(&api);

        let err = api
            .create_query_template("u1", new_query(app, Uuid::new_v4(), "orders", Lifecycle::Static))
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND_ERROR");
    }

    #[test]
    fn rename_onto_existing_name_conflicts() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let (app, resource) = setup(&api);

        api.create_query_template("u1", new_query(app, resource, "orders", Lifecycle::Static))
            .unwrap();
        let other = api
            .create_query_template("u1", new_query(app, resource, "customers", Lifecycle::Static))
            .unwrap();

        let err = api
            .update_query_template(
                "u1",
                other.id,
                QueryTemplateUpdate {
                    name: Some("orders".into()),
                    ..QueryTemplateUpdate::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT_ERROR");
    }

    #[test]
    fn prune_removes_only_static_templates() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let (app, resource) = setup(&api);

        let a = api
            .create_query_template("u1", new_query(app, resource, "orders", Lifecycle::Static))
            .unwrap();
        let b = api
            .create_query_template("u1", new_query(app, resource, "adhoc", Lifecycle::Dynamic))
            .unwrap();

        assert_eq!(api.remove_static_query_templates("u1", app).unwrap(), 1);
        assert!(api.query_templates_by_ids("u1", &[a.id]).is_err());
        assert_eq!(api.query_templates_by_ids("u1", &[b.id]).unwrap(), vec![b]);
    }

    #[test]
    fn removed_template_frees_its_name() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let (app, resource) = setup(&api);

        let first = api
            .create_query_template("u1", new_query(app, resource, "orders", Lifecycle::Static))
            .unwrap();
        api.remove_query_template("u1", first.id).unwrap();
        api.create_query_template("u1", new_query(app, resource, "orders", Lifecycle::Static))
            .unwrap();

        let page = api.list_query_templates("u1", app, Paging::default()).unwrap();
        assert_eq!(page.total_records, 1);
    }
}
