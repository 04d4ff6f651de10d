//! Identity resolution for appforge commands.
//!
//! Every document records who created it, and every patch who authored it,
//! so each command needs to know who is acting. Identity is resolved through
//! a chain:
//!
//! 1. `--as <identity>`: explicit per-command override
//! 2. `APPFORGE_IDENTITY` env var: process/session level
//! 3. `default-identity` in `~/.appforge/config.toml`

use std::env;

use crate::config::Config;

/// Error message shown when identity cannot be resolved.
pub const IDENTITY_REQUIRED: &str = "identity required: pass --as <identity>, \
    set APPFORGE_IDENTITY, or add `default-identity = \"...\"` to ~/.appforge/config.toml";

/// Resolve the acting identity from the tiered resolution chain.
pub fn resolve_identity(explicit: Option<&str>, config: &Config) -> Result<String, String> {
    let from_env = env::var("APPFORGE_IDENTITY").ok();
    pick_identity(explicit, from_env.as_deref(), config.default_identity.as_deref())
}

/// First non-empty identity in resolution order.
fn pick_identity(
    explicit: Option<&str>,
    from_env: Option<&str>,
    from_config: Option<&str>,
) -> Result<String, String> {
    [explicit, from_env, from_config]
        .into_iter()
        .flatten()
        .find(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IDENTITY_REQUIRED.to_string())
}
