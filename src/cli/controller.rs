//! `appforge controller` commands.

use std::path::PathBuf;

use clap::Subcommand;
use uuid::Uuid;

use crate::model::Language;
use crate::patch;
use crate::service::{ControllerUpdate, NewController, NewPatch};

use super::format::{format_controller, format_patch, parse_language, print_page};
use super::{Context, PageArgs, api_error, print_json, read_file};

#[derive(Debug, Subcommand)]
pub enum ControllerCommand {
    /// Create a controller that is not tied to a screen.
    New {
        /// App the controller belongs to.
        #[arg(long)]
        app: String,

        /// Controller name, unique within the app.
        name: String,

        /// `javascript` or `typescript`.
        #[arg(long, value_parser = parse_language, default_value = "javascript")]
        language: Language,

        #[arg(long, default_value = "")]
        description: String,

        /// Initial source. Without it the controller starts empty.
        #[arg(long)]
        source: Option<PathBuf>,
    },

    /// List an app's controllers.
    List {
        #[arg(long)]
        app: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show controllers as JSON, patches and current source included: one
    /// object for one id, an array for several.
    Show {
        #[arg(required = true)]
        ids: Vec<Uuid>,

        /// Print only the current source.
        #[arg(long)]
        source_only: bool,
    },

    /// Record a new revision of a controller's source.
    ///
    /// The file's contents become the controller's source; the change is
    /// stored as a patch attributed to the acting identity.
    Revise {
        id: Uuid,

        #[arg(long)]
        source: PathBuf,
    },

    /// List a controller's patches, oldest first.
    History { id: Uuid },

    /// Change a controller's description.
    Update {
        id: Uuid,

        #[arg(long)]
        description: Option<String>,
    },

    /// Remove a controller. Its patches are kept.
    Remove { id: Uuid },
}

pub(super) fn run(ctx: &Context<'_>, command: ControllerCommand) -> Result<(), String> {
    match command {
        ControllerCommand::New {
            app,
            name,
            language,
            description,
            source,
        } => {
            let app = ctx.app(&app)?;
            let patches = match source {
                Some(path) => vec![NewPatch {
                    content: patch::diff(&name, "", &read_file(&path)?),
                }],
                None => Vec::new(),
            };
            let controller = ctx
                .api
                .create_controller(
                    &ctx.user,
                    NewController {
                        app: app.id,
                        name,
                        description,
                        language,
                        patches,
                    },
                )
                .map_err(api_error)?;
            println!("Created controller {} ({})", controller.name, controller.id);
            Ok(())
        }
        ControllerCommand::List { app, page } => {
            let app = ctx.app(&app)?;
            let page = ctx
                .api
                .list_controllers(&ctx.user, app.id, page.paging()?)
                .map_err(api_error)?;
            print_page(&page, format_controller);
            Ok(())
        }
        ControllerCommand::Show { ids, source_only } => cmd_show(ctx, &ids, source_only),
        ControllerCommand::Revise { id, source } => cmd_revise(ctx, id, &read_file(&source)?),
        ControllerCommand::History { id } => {
            let controller = ctx.api.controller_by_id(&ctx.user, id).map_err(api_error)?;
            if controller.patches.is_empty() {
                println!("(no patches)");
            }
            for (index, entry) in controller.patches.iter().enumerate() {
                println!("{}", format_patch(index, entry));
            }
            Ok(())
        }
        ControllerCommand::Update { id, description } => {
            let controller = ctx
                .api
                .update_controller(&ctx.user, id, ControllerUpdate { description })
                .map_err(api_error)?;
            println!("Updated controller {} ({})", controller.name, controller.id);
            Ok(())
        }
        ControllerCommand::Remove { id } => {
            ctx.api.remove_controller(&ctx.user, id).map_err(api_error)?;
            println!("Removed controller {id}");
            Ok(())
        }
    }
}

fn cmd_show(ctx: &Context<'_>, ids: &[Uuid], source_only: bool) -> Result<(), String> {
    let controllers = match ids {
        [id] => vec![ctx.api.controller_by_id(&ctx.user, *id).map_err(api_error)?],
        ids => ctx
            .api
            .controllers_by_ids(&ctx.user, ids)
            .map_err(api_error)?,
    };
    match (source_only, controllers.as_slice()) {
        (true, controllers) => {
            for controller in controllers {
                print!("{}", controller.patched);
            }
            Ok(())
        }
        (false, [controller]) => print_json(controller),
        (false, controllers) => print_json(&controllers),
    }
}

fn cmd_revise(ctx: &Context<'_>, id: Uuid, source: &str) -> Result<(), String> {
    let controller = ctx
        .api
        .revise_controller(&ctx.user, id, source)
        .map_err(api_error)?;
    println!(
        "Revised controller {} ({} patches, sha256 {})",
        controller.name,
        controller.patches.len(),
        controller.digest
    );
    Ok(())
}
