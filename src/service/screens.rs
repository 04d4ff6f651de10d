//! Screen operations. Creating a screen also creates its controller.

use uuid::Uuid;

use crate::chain::PatchChain;
use crate::model::{Controller, Language, Page, Paging, Screen, Status};
use crate::permission::{Action, Scope, Subject, Verb};
use crate::storage;

use super::{Api, Result, conflict, not_found, validate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScreen {
    pub app: Uuid,
    pub name: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub content: String,
}

/// Fields to change on a screen. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
}

impl Api<'_> {
    /// Creates a screen, its controller (same name, javascript, empty
    /// chain), and links both to the app, all in one unit of work.
    pub fn create_screen(&self, user: &str, new: NewScreen) -> Result<Screen> {
        validate::name(&new.name)?;
        validate::title(&new.title)?;
        validate::slug(&new.slug)?;
        validate::description(&new.description)?;

        self.storage.write(|uow| {
            let mut app = uow.app_by_id(new.app)?.ok_or_else(|| not_found("app", new.app))?;
            if uow.screen_by_name(app.id, &new.name)?.is_some() {
                return Err(conflict("screen", &new.name));
            }
            if uow.controller_by_name(app.id, &new.name)?.is_some() {
                return Err(conflict("controller", &new.name));
            }

            let now = storage::now();
            let controller = Controller {
                id: Uuid::new_v4(),
                app: app.id,
                name: new.name.clone(),
                description: String::new(),
                language: Language::Javascript,
                patches: PatchChain::default(),
                status: Status::Created,
                creator: user.to_string(),
                created_at: now,
                updated_at: now,
            };
            uow.insert_controller(&controller)?;

            let screen = Screen {
                id: Uuid::new_v4(),
                app: app.id,
                name: new.name,
                title: new.title,
                description: new.description,
                slug: new.slug,
                content: new.content,
                controller: controller.id,
                status: Status::Created,
                creator: user.to_string(),
                created_at: now,
                updated_at: now,
            };
            uow.insert_screen(&screen)?;

            app.screens.push(screen.id);
            app.controllers.push(controller.id);
            app.updated_at = now;
            uow.update_app(&app)?;

            self.authorize(
                user,
                Action::new(Scope::Screens, Verb::Create),
                &[
                    Subject::Screen(&screen),
                    Subject::Controller(&controller),
                    Subject::App(&app),
                ],
            )?;
            tracing::info!(
                app = %app.id,
                screen = %screen.id,
                controller = %controller.id,
                "created screen"
            );
            Ok(screen)
        })
    }

    pub fn screen_by_id(&self, user: &str, id: Uuid) -> Result<Screen> {
        self.storage.read(|uow| {
            let screen = uow.screen_by_id(id)?.ok_or_else(|| not_found("screen", id))?;
            self.authorize(user, Action::new(Scope::Screens, Verb::View), &[Subject::Screen(&screen)])?;
            Ok(screen)
        })
    }

    pub fn screen_by_name(&self, user: &str, app: Uuid, name: &str) -> Result<Screen> {
        self.storage.read(|uow| {
            let screen = uow
                .screen_by_name(app, name)?
                .ok_or_else(|| not_found("screen", name))?;
            self.authorize(user, Action::new(Scope::Screens, Verb::View), &[Subject::Screen(&screen)])?;
            Ok(screen)
        })
    }

    pub fn list_screens(&self, user: &str, app: Uuid, paging: Paging) -> Result<Page<Screen>> {
        self.authorize(user, Action::new(Scope::Screens, Verb::List), &[])?;
        Ok(self.storage.read(|uow| uow.list_screens(app, paging))?)
    }

    /// Fetches screens by id, in the order given. Every id must resolve.
    pub fn screens_by_ids(&self, user: &str, ids: &[Uuid]) -> Result<Vec<Screen>> {
        self.storage.read(|uow| {
            let screens = ids
                .iter()
                .map(|&id| uow.screen_by_id(id)?.ok_or_else(|| not_found("screen", id)))
                .collect::<Result<Vec<_>>>()?;
            let subjects: Vec<_> = screens.iter().map(Subject::Screen).collect();
            self.authorize(user, Action::new(Scope::Screens, Verb::List), &subjects)?;
            Ok(screens)
        })
    }

    pub fn update_screen(&self, user: &str, id: Uuid, update: ScreenUpdate) -> Result<Screen> {
        self.storage.write(|uow| {
            let mut screen = uow.screen_by_id(id)?.ok_or_else(|| not_found("screen", id))?;
            if let Some(title) = update.title {
                validate::title(&title)?;
                screen.title = title;
            }
            if let Some(description) = update.description {
                validate::description(&description)?;
                screen.description = description;
            }
            if let Some(slug) = update.slug {
                validate::slug(&slug)?;
                screen.slug = slug;
            }
            if let Some(content) = update.content {
                screen.content = content;
            }
            screen.updated_at = storage::now();

            uow.update_screen(&screen)?;
            self.authorize(user, Action::new(Scope::Screens, Verb::Update), &[Subject::Screen(&screen)])?;
            tracing::info!(screen = %screen.id, "updated screen");
            Ok(screen)
        })
    }

    pub fn remove_screen(&self, user: &str, id: Uuid) -> Result<()> {
        self.storage.write(|uow| {
            let screen = uow.screen_by_id(id)?.ok_or_else(|| not_found("screen", id))?;
            uow.delete_screen(id, storage::now())?;
            self.authorize(user, Action::new(Scope::Screens, Verb::Delete), &[Subject::Screen(&screen)])?;
            tracing::info!(screen = %id, "removed screen");
            Ok(())
        })
    }
}
