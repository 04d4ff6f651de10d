//! `appforge resource` commands.

use clap::Subcommand;

use crate::model::ResourceKind;
use crate::service::NewResource;

use super::format::{format_resource, parse_resource_kind, print_page};
use super::{Context, PageArgs, api_error, print_json};

#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// Register a resource.
    New {
        /// Unique resource name.
        name: String,

        /// `mysql`, `postgres`, `mongodb` or `bigquery`.
        #[arg(long = "type", value_parser = parse_resource_kind)]
        kind: ResourceKind,

        /// Connection settings as a JSON object.
        #[arg(long, default_value = "{}")]
        connection: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List resources.
    List {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show a resource as JSON.
    Show { name: String },
}

pub(super) fn run(ctx: &Context<'_>, command: ResourceCommand) -> Result<(), String> {
    match command {
        ResourceCommand::New {
            name,
            kind,
            connection,
            description,
        } => {
            let connection = serde_json::from_str(&connection)
                .map_err(|e| format!("invalid --connection JSON: {e}"))?;
            let resource = ctx
                .api
                .create_resource(
                    &ctx.user,
                    NewResource {
                        name,
                        description,
                        kind,
                        connection,
                    },
                )
                .map_err(api_error)?;
            println!("Created resource {} ({})", resource.name, resource.id);
            Ok(())
        }
        ResourceCommand::List { page } => {
            let page = ctx
                .api
                .list_resources(&ctx.user, page.paging()?)
                .map_err(api_error)?;
            print_page(&page, format_resource);
            Ok(())
        }
        ResourceCommand::Show { name } => print_json(
            &ctx.api
                .resource_by_name(&ctx.user, &name)
                .map_err(api_error)?,
        ),
    }
}
