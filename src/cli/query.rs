//! `appforge query` commands.

use std::path::PathBuf;

use clap::Subcommand;
use uuid::Uuid;

use crate::model::Lifecycle;
use crate::service::{NewQueryTemplate, QueryTemplateUpdate};

use super::format::{format_query_template, print_page};
use super::{Context, PageArgs, api_error, print_json, read_file};

#[derive(Debug, Subcommand)]
pub enum QueryCommand {
    /// Author a query template. Templates made here are dynamic: `prune`
    /// leaves them alone.
    New {
        #[arg(long)]
        app: String,

        /// Template name, unique within the app.
        name: String,

        /// Resource the query runs against, by name.
        #[arg(long)]
        resource: String,

        /// File holding the query text.
        #[arg(long)]
        content: PathBuf,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List an app's query templates.
    List {
        #[arg(long)]
        app: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show query templates as JSON: one object for one id, an array for
    /// several.
    Show {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },

    /// Change a query template. Unset flags keep their current value.
    Update {
        id: Uuid,

        #[arg(long)]
        rename: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// Remove a query template.
    Remove { id: Uuid },

    /// Remove every static (deployed) query template of an app.
    Prune {
        #[arg(long)]
        app: String,
    },
}

pub(super) fn run(ctx: &Context<'_>, command: QueryCommand) -> Result<(), String> {
    match command {
        QueryCommand::New {
            app,
            name,
            resource,
            content,
            description,
        } => {
            let app = ctx.app(&app)?;
            let resource = ctx
                .api
                .resource_by_name(&ctx.user, &resource)
                .map_err(api_error)?;
            let template = ctx
                .api
                .create_query_template(
                    &ctx.user,
                    NewQueryTemplate {
                        app: app.id,
                        resource: resource.id,
                        name,
                        description,
                        content: read_file(&content)?,
                        lifecycle: Lifecycle::Dynamic,
                    },
                )
                .map_err(api_error)?;
            println!("Created query template {} ({})", template.name, template.id);
            Ok(())
        }
        QueryCommand::List { app, page } => {
            let app = ctx.app(&app)?;
            let page = ctx
                .api
                .list_query_templates(&ctx.user, app.id, page.paging()?)
                .map_err(api_error)?;
            print_page(&page, format_query_template);
            Ok(())
        }
        QueryCommand::Show { ids } => match ids.as_slice() {
            [id] => print_json(
                &ctx.api
                    .query_template_by_id(&ctx.user, *id)
                    .map_err(api_error)?,
            ),
            ids => print_json(
                &ctx.api
                    .query_templates_by_ids(&ctx.user, ids)
                    .map_err(api_error)?,
            ),
        },
        QueryCommand::Update {
            id,
            rename,
            description,
            content,
        } => {
            let update = QueryTemplateUpdate {
                name: rename,
                description,
                content: content.as_deref().map(read_file).transpose()?,
            };
            let template = ctx
                .api
                .update_query_template(&ctx.user, id, update)
                .map_err(api_error)?;
            println!("Updated query template {} ({})", template.name, template.id);
            Ok(())
        }
        QueryCommand::Remove { id } => {
            ctx.api
                .remove_query_template(&ctx.user, id)
                .map_err(api_error)?;
            println!("Removed query template {id}");
            Ok(())
        }
        QueryCommand::Prune { app } => {
            let app = ctx.app(&app)?;
            let removed = ctx
                .api
                .remove_static_query_templates(&ctx.user, app.id)
                .map_err(api_error)?;
            println!("Removed {removed} static query templates from {}", app.name);
            Ok(())
        }
    }
}
