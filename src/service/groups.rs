//! Group operations.

use uuid::Uuid;

use crate::model::{Group, Page, Paging, Status};
use crate::permission::{Action, Scope, Subject, Verb};
use crate::storage;

use super::{Api, Result, conflict, not_found, validate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
}

impl Api<'_> {
    pub fn create_group(&self, user: &str, new: NewGroup) -> Result<Group> {
        validate::name(&new.name)?;
        validate::description(&new.description)?;

        self.storage.write(|uow| {
            if uow.group_by_name(&new.name)?.is_some() {
                return Err(conflict("group", &new.name));
            }
            let now = storage::now();
            let group = Group {
                id: Uuid::new_v4(),
                name: new.name,
                description: new.description,
                status: Status::Created,
                creator: user.to_string(),
                created_at: now,
                updated_at: now,
            };
            uow.insert_group(&group)?;
            self.authorize(user, Action::new(Scope::Groups, Verb::Create), &[Subject::Group(&group)])?;
            tracing::info!(group = %group.id, name = %group.name, "created group");
            Ok(group)
        })
    }

    pub fn group_by_name(&self, user: &str, name: &str) -> Result<Group> {
        self.storage.read(|uow| {
            let group = uow.group_by_name(name)?.ok_or_else(|| not_found("group", name))?;
            self.authorize(user, Action::new(Scope::Groups, Verb::View), &[Subject::Group(&group)])?;
            Ok(group)
        })
    }

    pub fn list_groups(&self, user: &str, paging: Paging) -> Result<Page<Group>> {
        self.authorize(user, Action::new(Scope::Groups, Verb::List), &[])?;
        Ok(self.storage.read(|uow| uow.list_groups(paging))?)
    }
}
