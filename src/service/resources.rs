//! Resource operations.

use uuid::Uuid;

use crate::model::{Page, Paging, Resource, ResourceKind, Status};
use crate::permission::{Action, Scope, Subject, Verb};
use crate::storage;

use super::{Api, ApiError, Result, conflict, not_found, validate};

#[derive(Debug, Clone, PartialEq)]
pub struct NewResource {
    pub name: String,
    pub description: String,
    pub kind: ResourceKind,
    /// Must be a JSON object.
    pub connection: serde_json::Value,
}

impl Api<'_> {
    pub fn create_resource(&self, user: &str, new: NewResource) -> Result<Resource> {
        validate::name(&new.name)?;
        validate::description(&new.description)?;
        if !new.connection.is_object() {
            return Err(ApiError::Validation(
                "resource connection must be a JSON object".to_string(),
            ));
        }

        self.storage.write(|uow| {
            if uow.resource_by_name(&new.name)?.is_some() {
                return Err(conflict("resource", &new.name));
            }
            let now = storage::now();
            let resource = Resource {
                id: Uuid::new_v4(),
                name: new.name,
                description: new.description,
                kind: new.kind,
                connection: new.connection,
                status: Status::Created,
                creator: user.to_string(),
                created_at: now,
                updated_at: now,
            };
            uow.insert_resource(&resource)?;
            self.authorize(
                user,
                Action::new(Scope::Resources, Verb::Create),
                &[Subject::Resource(&resource)],
            )?;
            tracing::info!(resource = %resource.id, name = %resource.name, "created resource");
            Ok(resource)
        })
    }

    pub fn resource_by_name(&self, user: &str, name: &str) -> Result<Resource> {
        self.storage.read(|uow| {
            let resource = uow
                .resource_by_name(name)?
                .ok_or_else(|| not_found("resource", name))?;
            self.authorize(
                user,
                Action::new(Scope::Resources, Verb::View),
                &[Subject::Resource(&resource)],
            )?;
            Ok(resource)
        })
    }

    pub fn list_resources(&self, user: &str, paging: Paging) -> Result<Page<Resource>> {
        self.authorize(user, Action::new(Scope::Resources, Verb::List), &[])?;
        Ok(self.storage.read(|uow| uow.list_resources(paging))?)
    }
}
