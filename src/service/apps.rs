//! App operations.

use uuid::Uuid;

use crate::model::{App, Page, Paging, Status};
use crate::permission::{Action, Scope, Subject, Verb};
use crate::storage::{self, UnitOfWork};

use super::{Api, ApiError, Result, conflict, not_found, validate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApp {
    pub name: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub groups: Vec<Uuid>,
}

/// Fields to change on an app. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub groups: Option<Vec<Uuid>>,
}

impl Api<'_> {
    pub fn create_app(&self, user: &str, new: NewApp) -> Result<App> {
        validate::name(&new.name)?;
        validate::title(&new.title)?;
        validate::slug(&new.slug)?;
        validate::description(&new.description)?;

        self.storage.write(|uow| {
            if uow.app_by_name(&new.name)?.is_some() {
                return Err(conflict("app", &new.name));
            }
            require_groups(uow, &new.groups)?;

            let now = storage::now();
            let app = App {
                id: Uuid::new_v4(),
                name: new.name,
                title: new.title,
                slug: new.slug,
                description: new.description,
                groups: new.groups,
                screens: Vec::new(),
                controllers: Vec::new(),
                status: Status::Created,
                creator: user.to_string(),
                created_at: now,
                updated_at: now,
            };
            uow.insert_app(&app)?;
            self.authorize(user, Action::new(Scope::Apps, Verb::Create), &[Subject::App(&app)])?;
            tracing::info!(app = %app.id, name = %app.name, "created app");
            Ok(app)
        })
    }

    pub fn app_by_id(&self, user: &str, id: Uuid) -> Result<App> {
        self.storage.read(|uow| {
            let app = uow.app_by_id(id)?.ok_or_else(|| not_found("app", id))?;
            self.authorize(user, Action::new(Scope::Apps, Verb::View), &[Subject::App(&app)])?;
            Ok(app)
        })
    }

    pub fn app_by_name(&self, user: &str, name: &str) -> Result<App> {
        self.storage.read(|uow| {
            let app = uow.app_by_name(name)?.ok_or_else(|| not_found("app", name))?;
            self.authorize(user, Action::new(Scope::Apps, Verb::View), &[Subject::App(&app)])?;
            Ok(app)
        })
    }

    pub fn list_apps(&self, user: &str, paging: Paging) -> Result<Page<App>> {
        self.authorize(user, Action::new(Scope::Apps, Verb::List), &[])?;
        Ok(self.storage.read(|uow| uow.list_apps(paging))?)
    }

    pub fn update_app(&self, user: &str, id: Uuid, update: AppUpdate) -> Result<App> {
        self.storage.write(|uow| {
            let mut app = uow.app_by_id(id)?.ok_or_else(|| not_found("app", id))?;

            if let Some(name) = update.name {
                validate::name(&name)?;
                if name != app.name && uow.app_by_name(&name)?.is_some() {
                    return Err(conflict("app", &name));
                }
                app.name = name;
            }
            if let Some(title) = update.title {
                validate::title(&title)?;
                app.title = title;
            }
            if let Some(slug) = update.slug {
                validate::slug(&slug)?;
                app.slug = slug;
            }
            if let Some(description) = update.description {
                validate::description(&description)?;
                app.description = description;
            }
            if let Some(groups) = update.groups {
                require_groups(uow, &groups)?;
                app.groups = groups;
            }
            app.updated_at = storage::now();

            uow.update_app(&app)?;
            self.authorize(user, Action::new(Scope::Apps, Verb::Update), &[Subject::App(&app)])?;
            tracing::info!(app = %app.id, "updated app");
            Ok(app)
        })
    }

    pub fn remove_app(&self, user: &str, id: Uuid) -> Result<()> {
        self.storage.write(|uow| {
            let app = uow.app_by_id(id)?.ok_or_else(|| not_found("app", id))?;
            uow.delete_app(id, storage::now())?;
            self.authorize(user, Action::new(Scope::Apps, Verb::Delete), &[Subject::App(&app)])?;
            tracing::info!(app = %id, "removed app");
            Ok(())
        })
    }
}

fn require_groups(uow: &UnitOfWork<'_>, groups: &[Uuid]) -> Result<()> {
    for &id in groups {
        if uow.group_by_id(id)?.is_none() {
            return Err(ApiError::Validation(format!("unknown group: {id}")));
        }
    }
    Ok(())
}
