//! `appforge screen` commands.

use std::path::PathBuf;

use clap::Subcommand;
use uuid::Uuid;

use crate::service::{NewScreen, ScreenUpdate};

use super::format::{format_screen, print_page};
use super::{Context, PageArgs, api_error, print_json, read_file};

#[derive(Debug, Subcommand)]
pub enum ScreenCommand {
    /// Create a screen and its controller.
    ///
    /// The controller gets the screen's name and starts with empty source.
    New {
        /// App the screen belongs to.
        #[arg(long)]
        app: String,

        /// Screen name, unique within the app.
        name: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        slug: String,

        #[arg(long, default_value = "")]
        description: String,

        /// File holding the screen's layout document.
        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// List an app's screens.
    List {
        #[arg(long)]
        app: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show screens as JSON: one object for one id, an array for several.
    Show {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },

    /// Change a screen's fields. Unset flags keep their current value.
    Update {
        id: Uuid,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// File holding the new layout document.
        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// Remove a screen.
    Remove { id: Uuid },
}

pub(super) fn run(ctx: &Context<'_>, command: ScreenCommand) -> Result<(), String> {
    match command {
        ScreenCommand::New {
            app,
            name,
            title,
            slug,
            description,
            content,
        } => {
            let app = ctx.app(&app)?;
            let new = NewScreen {
                app: app.id,
                name,
                title,
                description,
                slug,
                content: content.as_deref().map(read_file).transpose()?.unwrap_or_default(),
            };
            cmd_new(ctx, new)
        }
        ScreenCommand::List { app, page } => {
            let app = ctx.app(&app)?;
            let page = ctx
                .api
                .list_screens(&ctx.user, app.id, page.paging()?)
                .map_err(api_error)?;
            print_page(&page, format_screen);
            Ok(())
        }
        ScreenCommand::Show { ids } => match ids.as_slice() {
            [id] => print_json(&ctx.api.screen_by_id(&ctx.user, *id).map_err(api_error)?),
            ids => print_json(&ctx.api.screens_by_ids(&ctx.user, ids).map_err(api_error)?),
        },
        ScreenCommand::Update {
            id,
            title,
            slug,
            description,
            content,
        } => {
            let update = ScreenUpdate {
                title,
                description,
                slug,
                content: content.as_deref().map(read_file).transpose()?,
            };
            let screen = ctx
                .api
                .update_screen(&ctx.user, id, update)
                .map_err(api_error)?;
            println!("Updated screen {} ({})", screen.name, screen.id);
            Ok(())
        }
        ScreenCommand::Remove { id } => {
            ctx.api.remove_screen(&ctx.user, id).map_err(api_error)?;
            println!("Removed screen {id}");
            Ok(())
        }
    }
}

fn cmd_new(ctx: &Context<'_>, new: NewScreen) -> Result<(), String> {
    let screen = ctx.api.create_screen(&ctx.user, new).map_err(api_error)?;
    println!("Created screen {} ({})", screen.name, screen.id);
    println!("  controller: {}", screen.controller);
    Ok(())
}
