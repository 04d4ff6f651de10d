//! `appforge group` commands.

use clap::Subcommand;

use crate::service::NewGroup;

use super::format::{format_group, print_page};
use super::{Context, PageArgs, api_error};

#[derive(Debug, Subcommand)]
pub enum GroupCommand {
    /// Create a group.
    New {
        name: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List groups.
    List {
        #[command(flatten)]
        page: PageArgs,
    },
}

pub(super) fn run(ctx: &Context<'_>, command: GroupCommand) -> Result<(), String> {
    match command {
        GroupCommand::New { name, description } => {
            let group = ctx
                .api
                .create_group(&ctx.user, NewGroup { name, description })
                .map_err(api_error)?;
            println!("Created group {} ({})", group.name, group.id);
            Ok(())
        }
        GroupCommand::List { page } => {
            let page = ctx
                .api
                .list_groups(&ctx.user, page.paging()?)
                .map_err(api_error)?;
            print_page(&page, format_group);
            Ok(())
        }
    }
}
