//! A [`RemoteApi`] backed by the local services.
//!
//! Deploying through it reconciles a manifest against the local store, with
//! every call subject to the same validation and permission checks as the
//! CLI commands.

use uuid::Uuid;

use crate::model::Lifecycle;
use crate::service::{
    Api, ApiError, AppUpdate, NewApp, NewQueryTemplate, NewResource, QueryTemplateUpdate,
};

use super::remote::{
    AppPayload, QueryTemplatePayload, RefKind, RemoteApi, RemoteApp, RemoteError,
    RemoteQueryTemplate, RemoteResource, ResourceCreation, ResourcePayload,
};

pub struct LocalRemote<'a> {
    api: Api<'a>,
    user: String,
}

impl<'a> LocalRemote<'a> {
    /// Acts as `user` for every call.
    pub fn new(api: Api<'a>, user: impl Into<String>) -> Self {
        Self {
            api,
            user: user.into(),
        }
    }
}

impl From<ApiError> for RemoteError {
    fn from(err: ApiError) -> Self {
        match &err {
            ApiError::NotFound(_) => Self::NotFound,
            ApiError::Internal => Self::Transport(err.to_string()),
            _ => Self::Rejected {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl RemoteApi for LocalRemote<'_> {
    fn app_by_name(&self, name: &str) -> Result<RemoteApp, RemoteError> {
        let app = self.api.app_by_name(&self.user, name)?;
        Ok(RemoteApp {
            id: app.id,
            name: app.name,
            title: app.title,
            slug: app.slug,
            description: app.description,
            groups: app.groups,
        })
    }

    fn create_app(&self, payload: &AppPayload) -> Result<Uuid, RemoteError> {
        let app = self.api.create_app(
            &self.user,
            NewApp {
                name: payload.name.clone(),
                title: payload.title.clone(),
                slug: payload.slug.clone(),
                description: payload.description.clone(),
                groups: payload.groups.clone(),
            },
        )?;
        Ok(app.id)
    }

    fn update_app(&self, id: Uuid, payload: &AppPayload) -> Result<(), RemoteError> {
        self.api.update_app(
            &self.user,
            id,
            AppUpdate {
                name: Some(payload.name.clone()),
                title: Some(payload.title.clone()),
                slug: Some(payload.slug.clone()),
                description: Some(payload.description.clone()),
                groups: Some(payload.groups.clone()),
            },
        )?;
        Ok(())
    }

    fn query_template_by_name(&self, app: Uuid, name: &str) -> Result<RemoteQueryTemplate, RemoteError> {
        let template = self.api.query_template_by_name(&self.user, app, name)?;
        Ok(RemoteQueryTemplate {
            id: template.id,
            name: template.name,
            description: template.description,
            content: template.content,
            resource: template.resource,
        })
    }

    /// Templates created by a deploy belong to the manifest: they are static.
    fn create_query_template(&self, app: Uuid, payload: &QueryTemplatePayload) -> Result<Uuid, RemoteError> {
        let template = self.api.create_query_template(
            &self.user,
            NewQueryTemplate {
                app,
                resource: payload.resource,
                name: payload.name.clone(),
                description: payload.description.clone(),
                content: payload.content.clone(),
                lifecycle: Lifecycle::Static,
            },
        )?;
        Ok(template.id)
    }

    fn update_query_template(&self, id: Uuid, payload: &QueryTemplatePayload) -> Result<(), RemoteError> {
        self.api.update_query_template(
            &self.user,
            id,
            QueryTemplateUpdate {
                name: Some(payload.name.clone()),
                description: Some(payload.description.clone()),
                content: Some(payload.content.clone()),
            },
        )?;
        Ok(())
    }

    fn create_resource(&self, payload: &ResourcePayload) -> Result<ResourceCreation, RemoteError> {
        match self.api.resource_by_name(&self.user, &payload.name) {
            Ok(existing) => {
                return Ok(ResourceCreation::Existing(RemoteResource {
                    id: existing.id,
                    name: existing.name,
                    description: existing.description,
                    kind: existing.kind,
                    connection: existing.connection,
                }));
            }
            Err(ApiError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        let created = self.api.create_resource(
            &self.user,
            NewResource {
                name: payload.name.clone(),
                description: payload.description.clone(),
                kind: payload.kind,
                connection: payload.connection.clone(),
            },
        )?;
        Ok(ResourceCreation::Created(created.id))
    }

    fn resolve(&self, kind: RefKind, name: &str) -> Result<Uuid, RemoteError> {
        let id = match kind {
            RefKind::Group => self.api.group_by_name(&self.user, name)?.id,
            RefKind::Resource => self.api.resource_by_name(&self.user, name)?.id,
        };
        Ok(id)
    }
}
