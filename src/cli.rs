//! CLI interface for appforge.
//!
//! Each subcommand is non-interactive: arguments in, output out. Listings
//! print one line per document; `show` commands print the document as JSON.
//!
//! Commands that name an app take its name; screens, controllers and query
//! templates are addressed by id.

mod app;
mod controller;
mod deploy;
mod format;
mod group;
mod query;
mod resource;
mod screen;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::config::Config;
use crate::identity::resolve_identity;
use crate::model::{App, Paging};
use crate::permission::OwnerPolicy;
use crate::service::{Api, ApiError};
use crate::storage::Storage;

use app::AppCommand;
use controller::ControllerCommand;
use group::GroupCommand;
use query::QueryCommand;
use resource::ResourceCommand;
use screen::ScreenCommand;

/// appforge: build apps from screens, controllers and queries.
#[derive(Debug, Parser)]
#[command(name = "appforge", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Act as this identity. Falls back to `APPFORGE_IDENTITY`, then the
    /// configured default identity.
    #[arg(long = "as", global = true)]
    identity: Option<String>,

    /// Store file to use instead of the configured one.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: building a screen
  1. appforge app new crm --title "Customers" --slug customers
  2. appforge screen new --app crm home --title "Home" --slug home
     → prints the screen and controller IDs
  3. appforge controller revise <controller-id> --source home.js
  4. appforge controller show <controller-id> --source-only

Deploying a manifest:
  appforge deploy crm.toml
  appforge deploy manifests/ --timeout-ms 5000"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage apps.
    App {
        #[command(subcommand)]
        command: AppCommand,
    },

    /// Manage the groups apps are shared with.
    Group {
        #[command(subcommand)]
        command: GroupCommand,
    },

    /// Manage screens. Each screen comes with its own controller.
    Screen {
        #[command(subcommand)]
        command: ScreenCommand,
    },

    /// Manage controllers and revise their source.
    Controller {
        #[command(subcommand)]
        command: ControllerCommand,
    },

    /// Manage query templates.
    Query {
        #[command(subcommand)]
        command: QueryCommand,
    },

    /// Manage resources (data sources).
    Resource {
        #[command(subcommand)]
        command: ResourceCommand,
    },

    /// Make the store match a manifest file or directory.
    ///
    /// Creates what is missing, updates what differs, leaves the rest.
    /// Prints one line per entity with what happened to it.
    Deploy {
        /// Manifest file, or directory of manifest documents.
        path: PathBuf,

        /// Deadline per call, in milliseconds. Defaults to the configured
        /// `deploy-timeout-ms`.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

/// Page selection shared by every listing.
#[derive(Debug, Clone, Copy, Args)]
pub struct PageArgs {
    /// Zero-based page number.
    #[arg(long, default_value_t = 0)]
    page: u32,

    /// Records per page (20 to 250).
    #[arg(long, default_value_t = 20)]
    limit: u32,
}

impl PageArgs {
    fn paging(self) -> Result<Paging, String> {
        Paging::new(self.page, self.limit)
    }
}

/// Everything a command needs: the API and who is acting.
pub(crate) struct Context<'a> {
    api: Api<'a>,
    user: String,
    config: &'a Config,
}

impl Context<'_> {
    fn app(&self, name: &str) -> Result<App, String> {
        self.api.app_by_name(&self.user, name).map_err(api_error)
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();

    let path = cli
        .store
        .or_else(|| config.store.clone())
        .or_else(Storage::default_path)
        .ok_or("could not determine home directory")?;
    let storage = Storage::new(path).map_err(|e| format!("failed to open store: {e}"))?;
    let policy = OwnerPolicy::new(config.admins.iter().cloned());
    let ctx = Context {
        api: Api::new(&storage, &policy),
        user: resolve_identity(cli.identity.as_deref(), config)?,
        config,
    };

    match cli.command {
        Command::App { command } => app::run(&ctx, command),
        Command::Group { command } => group::run(&ctx, command),
        Command::Screen { command } => screen::run(&ctx, command),
        Command::Controller { command } => controller::run(&ctx, command),
        Command::Query { command } => query::run(&ctx, command),
        Command::Resource { command } => resource::run(&ctx, command),
        Command::Deploy { path, timeout_ms } => deploy::run(&ctx, &path, timeout_ms),
    }
}

/// Formats an API error with its code, e.g. `app not found: crm [NOT_FOUND_ERROR]`.
fn api_error(e: ApiError) -> String {
    format!("{e} [{}]", e.code())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| format!("failed to encode output: {e}"))?;
    println!("{json}");
    Ok(())
}

fn read_file(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}
