//! Controller operations.
//!
//! Callers only ever see [`ExternalController`]: the stored chain plus its
//! reconstructed source and digest. Reconstruction happens on every read.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::chain::PatchChain;
use crate::model::{Controller, ExternalController, Language, Page, Paging, Patch, Status};
use crate::permission::{Action, Scope, Subject, Verb};
use crate::storage;

use super::{Api, ApiError, Result, conflict, not_found, validate};

/// One patch of an initial chain, authored by the creating user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatch {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewController {
    pub app: Uuid,
    pub name: String,
    pub description: String,
    pub language: Language,
    pub patches: Vec<NewPatch>,
}

/// Controller metadata that may change. The chain only grows through
/// [`Api::revise_controller`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerUpdate {
    pub description: Option<String>,
}

impl Api<'_> {
    /// Creates a controller and links it to its app.
    ///
    /// A supplied initial chain must reconstruct cleanly.
    pub fn create_controller(&self, user: &str, new: NewController) -> Result<ExternalController> {
        validate::name(&new.name)?;
        validate::description(&new.description)?;

        let now = storage::now();
        let patches = PatchChain::from_patches(
            new.patches
                .into_iter()
                .map(|p| Patch {
                    author: user.to_string(),
                    content: p.content,
                    created_at: now,
                })
                .collect(),
        );
        if let Err(e) = patches.reconstruct() {
            return Err(ApiError::Validation(format!("initial patches do not apply: {e}")));
        }

        self.storage.write(|uow| {
            let mut app = uow.app_by_id(new.app)?.ok_or_else(|| not_found("app", new.app))?;
            if uow.controller_by_name(app.id, &new.name)?.is_some() {
                return Err(conflict("controller", &new.name));
            }

            let controller = Controller {
                id: Uuid::new_v4(),
                app: app.id,
                name: new.name,
                description: new.description,
                language: new.language,
                patches,
                status: Status::Created,
                creator: user.to_string(),
                created_at: now,
                updated_at: now,
            };
            uow.insert_controller(&controller)?;
            app.controllers.push(controller.id);
            app.updated_at = now;
            uow.update_app(&app)?;

            self.authorize(
                user,
                Action::new(Scope::Controllers, Verb::Create),
                &[Subject::Controller(&controller), Subject::App(&app)],
            )?;
            tracing::info!(app = %app.id, controller = %controller.id, "created controller");
            to_external(controller)
        })
    }

    pub fn controller_by_id(&self, user: &str, id: Uuid) -> Result<ExternalController> {
        let controller = self.storage.read(|uow| {
            let controller = uow
                .controller_by_id(id)?
                .ok_or_else(|| not_found("controller", id))?;
            self.authorize(
                user,
                Action::new(Scope::Controllers, Verb::View),
                &[Subject::Controller(&controller)],
            )?;
            Ok::<_, ApiError>(controller)
        })?;
        to_external(controller)
    }

    pub fn controller_by_name(&self, user: &str, app: Uuid, name: &str) -> Result<ExternalController> {
        let controller = self.storage.read(|uow| {
            let controller = uow
                .controller_by_name(app, name)?
                .ok_or_else(|| not_found("controller", name))?;
            self.authorize(
                user,
                Action::new(Scope::Controllers, Verb::View),
                &[Subject::Controller(&controller)],
            )?;
            Ok::<_, ApiError>(controller)
        })?;
        to_external(controller)
    }

    pub fn list_controllers(
        &self,
        user: &str,
        app: Uuid,
        paging: Paging,
    ) -> Result<Page<ExternalController>> {
        self.authorize(user, Action::new(Scope::Controllers, Verb::List), &[])?;
        self.storage
            .read(|uow| uow.list_controllers(app, paging))?
            .try_map(to_external)
    }

    /// Fetches controllers by id, in the order given. Every id must resolve.
    pub fn controllers_by_ids(&self, user: &str, ids: &[Uuid]) -> Result<Vec<ExternalController>> {
        let controllers = self.storage.read(|uow| {
            let controllers = ids
                .iter()
                .map(|&id| {
                    uow.controller_by_id(id)?
                        .ok_or_else(|| not_found("controller", id))
                })
                .collect::<Result<Vec<_>>>()?;
            let subjects: Vec<_> = controllers.iter().map(Subject::Controller).collect();
            self.authorize(user, Action::new(Scope::Controllers, Verb::List), &subjects)?;
            Ok::<_, ApiError>(controllers)
        })?;
        controllers.into_iter().map(to_external).collect()
    }

    pub fn update_controller(
        &self,
        user: &str,
        id: Uuid,
        update: ControllerUpdate,
    ) -> Result<ExternalController> {
        self.storage.write(|uow| {
            let mut controller = uow
                .controller_by_id(id)?
                .ok_or_else(|| not_found("controller", id))?;
            if let Some(description) = update.description {
                validate::description(&description)?;
                controller.description = description;
            }
            controller.updated_at = storage::now();

            uow.update_controller(&controller)?;
            self.authorize(
                user,
                Action::new(Scope::Controllers, Verb::Update),
                &[Subject::Controller(&controller)],
            )?;
            tracing::info!(controller = %id, "updated controller");
            to_external(controller)
        })
    }

    /// Records a new revision of a controller's source.
    ///
    /// Diffs `source` against the current source and appends the patch,
    /// attributed to `user`. Saving an unchanged source still appends a
    /// patch. A chain that grew since it was read is a conflict.
    pub fn revise_controller(&self, user: &str, id: Uuid, source: &str) -> Result<ExternalController> {
        self.storage.with_controller_lock(id, || self.append_revision(user, id, source))
    }

    fn append_revision(&self, user: &str, id: Uuid, source: &str) -> Result<ExternalController> {
        self.storage.write(|uow| {
            let current = uow
                .controller_by_id(id)?
                .ok_or_else(|| not_found("controller", id))?;
            let revision = current
                .patches
                .revise(&current.name, source, user, storage::now())?;
            let at = revision.patch.created_at;
            uow.append_patch(id, &revision)?;

            let mut revised = current;
            revised.patches.append(revision)?;
            revised.updated_at = at;
            self.authorize(
                user,
                Action::new(Scope::Controllers, Verb::Update),
                &[Subject::Controller(&revised)],
            )?;
            tracing::info!(controller = %id, patches = revised.patches.len(), "revised controller");
            to_external(revised)
        })
    }

    /// Logically deletes a controller. Its patches are kept.
    pub fn remove_controller(&self, user: &str, id: Uuid) -> Result<()> {
        self.storage.write(|uow| {
            let controller = uow
                .controller_by_id(id)?
                .ok_or_else(|| not_found("controller", id))?;
            uow.delete_controller(id, storage::now())?;
            self.authorize(
                user,
                Action::new(Scope::Controllers, Verb::Delete),
                &[Subject::Controller(&controller)],
            )?;
            tracing::info!(controller = %id, "removed controller");
            Ok(())
        })
    }
}

/// Materializes the caller-facing view. A chain that fails to reconstruct
/// is an internal error, never a partial result.
fn to_external(controller: Controller) -> Result<ExternalController> {
    let patched = controller.patches.reconstruct().map_err(|e| {
        tracing::error!(controller = %controller.id, error = %e, "controller source does not reconstruct");
        ApiError::Internal
    })?;
    let digest = hex::encode(Sha256::digest(patched.as_bytes()));
    Ok(ExternalController {
        id: controller.id,
        app: controller.app,
        name: controller.name,
        description: controller.description,
        language: controller.language,
        creator: controller.creator,
        patches: controller.patches.patches().to_vec(),
        patched,
        digest,
        status: controller.status,
        created_at: controller.created_at,
        updated_at: controller.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch;
    use crate::service::testing::{DenyAll, new_app, new_screen, owner_policy, test_storage};

    fn new_controller(app: Uuid, name: &str, patches: Vec<NewPatch>) -> NewController {
        NewController {
            app,
            name: name.into(),
            description: String::new(),
            language: Language::Typescript,
            patches,
        }
    }

    #[test]
    fn revisions_by_two_authors() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();
        let screen = api.create_screen("u1", new_screen(app.id, "home")).unwrap();

        let first = api.revise_controller("u1", screen.controller, "print(1)").unwrap();
        assert_eq!(first.patched, "print(1)");

        let second = api.revise_controller("admin", screen.controller, "print(2)").unwrap();
        assert_eq!(second.patched, "print(2)");
        assert_eq!(second.patches.len(), 2);
        assert_eq!(second.patches[0].author, "u1");
        assert_eq!(second.patches[1].author, "admin");
        assert_eq!(
            api.controller_by_id("u1", screen.controller).unwrap().patched,
            "print(2)"
        );
    }

    #[test]
    fn concurrent_revisions_all_land() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();
        let screen = api.create_screen("u1", new_screen(app.id, "home")).unwrap();

        let failures = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|worker| {
                    let (storage, policy) = (&storage, &policy);
                    scope.spawn(move || {
                        let api = Api::new(storage, policy);
                        (0..5)
                            .filter_map(|round| {
                                let source = format!("worker {worker}\nround {round}\n");
                                api.revise_controller("u1", screen.controller, &source).err()
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|worker| worker.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert!(failures.is_empty(), "{failures:?}");
        let controller = api.controller_by_id("u1", screen.controller).unwrap();
        assert_eq!(controller.patches.len(), 40);
        assert!(controller.patched.starts_with("worker "));
    }

    #[test]
    fn unchanged_source_is_still_recorded() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();
        let screen = api.create_screen("u1", new_screen(app.id, "home")).unwrap();

        api.revise_controller("u1", screen.controller, "print(1)").unwrap();
        let again = api.revise_controller("u1", screen.controller, "print(1)").unwrap();

        assert_eq!(again.patches.len(), 2);
        assert_eq!(again.patched, "print(1)");
    }

    #[test]
    fn digest_tracks_source() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();
        let screen = api.create_screen("u1", new_screen(app.id, "home")).unwrap();

        let empty = api.controller_by_id("u1", screen.controller).unwrap();
        assert_eq!(
            empty.digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let revised = api.revise_controller("u1", screen.controller, "x").unwrap();
        assert_ne!(revised.digest, empty.digest);
        assert_eq!(revised.digest.len(), 64);
    }

    #[test]
    fn denied_revision_appends_nothing() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();
        let screen = api.create_screen("u1", new_screen(app.id, "home")).unwrap();
        api.revise_controller("u1", screen.controller, "print(1)").unwrap();

        let err = api.revise_controller("u2", screen.controller, "print(2)").unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN_ERROR");

        let current = api.controller_by_id("u1", screen.controller).unwrap();
        assert_eq!(current.patches.len(), 1);
        assert_eq!(current.patched, "print(1)");
    }

    #[test]
    fn create_with_initial_chain() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();

        let controller = api
            .create_controller(
                "u1",
                new_controller(
                    app.id,
                    "shared",
                    vec![NewPatch {
                        content: patch::diff("shared", "", "export const x = 1;\n"),
                    }],
                ),
            )
            .unwrap();

        assert_eq!(controller.patched, "export const x = 1;\n");
        assert_eq!(controller.language, Language::Typescript);
        assert_eq!(api.app_by_id("u1", app.id).unwrap().controllers, vec![controller.id]);
        assert_eq!(
            api.controller_by_name("u1", app.id, "shared").unwrap(),
            controller
        );
    }

    #[test]
    fn initial_chain_that_does_not_apply_is_rejected() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();

        let err = api
            .create_controller(
                "u1",
                new_controller(
                    app.id,
                    "shared",
                    vec![NewPatch {
                        content: patch::diff("shared", "not empty\n", "x\n"),
                    }],
                ),
            )
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST_ERROR");
    }

    #[test]
    fn corrupt_chain_reads_as_internal_error() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();
        let screen = api.create_screen("u1", new_screen(app.id, "home")).unwrap();

        let bad = crate::chain::Revision {
            expected_len: 0,
            patch: Patch {
                author: "u1".into(),
                content: patch::diff("home", "something else\n", "x\n"),
                created_at: storage::now(),
            },
        };
        storage
            .write(|uow| uow.append_patch(screen.controller, &bad))
            .unwrap();

        let err = api.controller_by_id("u1", screen.controller).unwrap_err();
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
        let err = api.revise_controller("u1", screen.controller, "y").unwrap_err();
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn update_changes_description_only() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();
        let screen = api.create_screen("u1", new_screen(app.id, "home")).unwrap();
        api.revise_controller("u1", screen.controller, "a").unwrap();

        let updated = api
            .update_controller(
                "u1",
                screen.controller,
                ControllerUpdate {
                    description: Some("Landing logic".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.description, "Landing logic");
        assert_eq!(updated.patched, "a");

        let denied = Api::new(&storage, &DenyAll).update_controller(
            "u1",
            screen.controller,
            ControllerUpdate {
                description: Some("nope".into()),
            },
        );
        assert!(denied.is_err());
        assert_eq!(
            api.controller_by_id("u1", screen.controller).unwrap().description,
            "Landing logic"
        );
    }

    #[test]
    fn removed_controllers_disappear_from_listings() {
        let (_dir, storage) = test_storage();
        let policy = owner_policy();
        let api = Api::new(&storage, &policy);
        let app = api.create_app("u1", new_app("crm")).unwrap();
        let a = api.create_screen("u1", new_screen(app.id, "first")).unwrap();
        let b = api.create_screen("u1", new_screen(app.id, "second")).unwrap();

        api.remove_controller("u1", a.controller).unwrap();

        let page = api.list_controllers("u1", app.id, Paging::default()).unwrap();
        assert_eq!(page.total_records, 1);
        assert_eq!(page.records[0].id, b.controller);
        assert!(api.controllers_by_ids("u1", &[a.controller]).is_err());
    }
}
