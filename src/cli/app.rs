//! `appforge app` commands.

use clap::Subcommand;
use uuid::Uuid;

use crate::service::{AppUpdate, NewApp};

use super::format::{format_app, print_page};
use super::{Context, PageArgs, api_error, print_json};

#[derive(Debug, Subcommand)]
pub enum AppCommand {
    /// Create an app.
    New {
        /// Unique app name.
        name: String,

        #[arg(long)]
        title: String,

        /// URL slug: lowercase letters, digits and dashes.
        #[arg(long)]
        slug: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Group to share the app with, by name. Repeatable.
        #[arg(long = "group")]
        groups: Vec<String>,
    },

    /// List apps, most recently modified first.
    List {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show an app as JSON.
    Show { name: String },

    /// Change an app's fields. Unset flags keep their current value.
    Update {
        name: String,

        #[arg(long)]
        rename: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Replace the app's groups. Repeatable; pass none of them to keep
        /// the current groups.
        #[arg(long = "group")]
        groups: Option<Vec<String>>,
    },

    /// Remove an app. Its screens, controllers and queries stay untouched.
    Remove { name: String },
}

pub(super) fn run(ctx: &Context<'_>, command: AppCommand) -> Result<(), String> {
    match command {
        AppCommand::New {
            name,
            title,
            slug,
            description,
            groups,
        } => cmd_new(ctx, name, title, slug, description, &groups),
        AppCommand::List { page } => cmd_list(ctx, page),
        AppCommand::Show { name } => print_json(&ctx.app(&name)?),
        AppCommand::Update {
            name,
            rename,
            title,
            slug,
            description,
            groups,
        } => {
            let groups = groups.map(|names| group_ids(ctx, &names)).transpose()?;
            let update = AppUpdate {
                name: rename,
                title,
                slug,
                description,
                groups,
            };
            cmd_update(ctx, &name, update)
        }
        AppCommand::Remove { name } => cmd_remove(ctx, &name),
    }
}

fn cmd_new(
    ctx: &Context<'_>,
    name: String,
    title: String,
    slug: String,
    description: String,
    groups: &[String],
) -> Result<(), String> {
    let groups = group_ids(ctx, groups)?;
    let app = ctx
        .api
        .create_app(
            &ctx.user,
            NewApp {
                name,
                title,
                slug,
                description,
                groups,
            },
        )
        .map_err(api_error)?;
    println!("Created app {} ({})", app.name, app.id);
    Ok(())
}

fn cmd_list(ctx: &Context<'_>, page: PageArgs) -> Result<(), String> {
    let page = ctx
        .api
        .list_apps(&ctx.user, page.paging()?)
        .map_err(api_error)?;
    print_page(&page, format_app);
    Ok(())
}

fn cmd_update(ctx: &Context<'_>, name: &str, update: AppUpdate) -> Result<(), String> {
    let app = ctx.app(name)?;
    let app = ctx
        .api
        .update_app(&ctx.user, app.id, update)
        .map_err(api_error)?;
    println!("Updated app {} ({})", app.name, app.id);
    Ok(())
}

fn cmd_remove(ctx: &Context<'_>, name: &str) -> Result<(), String> {
    let app = ctx.app(name)?;
    ctx.api.remove_app(&ctx.user, app.id).map_err(api_error)?;
    println!("Removed app {name}");
    Ok(())
}

fn group_ids(ctx: &Context<'_>, names: &[String]) -> Result<Vec<Uuid>, String> {
    names
        .iter()
        .map(|name| {
            ctx.api
                .group_by_name(&ctx.user, name)
                .map(|group| group.id)
                .map_err(api_error)
        })
        .collect()
}
