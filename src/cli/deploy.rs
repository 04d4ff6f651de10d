//! `appforge deploy`.

use std::path::Path;
use std::time::Duration;

use crate::deploy::{Deadline, LocalRemote, Manifest, Outcome, sync_manifest};

use super::Context;
use super::format::format_report_entry;

pub(super) fn run(ctx: &Context<'_>, path: &Path, timeout_ms: Option<u64>) -> Result<(), String> {
    let manifest = Manifest::load(path).map_err(|e| format!("failed to load manifest: {e}"))?;
    let limit = timeout_ms.map_or_else(|| ctx.config.deploy_timeout(), Duration::from_millis);
    let remote = Deadline::new(LocalRemote::new(ctx.api, ctx.user.as_str()), limit);

    let report = sync_manifest(&remote, &manifest).map_err(|e| {
        if e.is_retryable() {
            format!("deploy failed: {e} (transient; running the deploy again is safe)")
        } else {
            format!("deploy failed: {e}")
        }
    })?;
    for entry in &report.entries {
        println!("{}", format_report_entry(entry));
    }
    println!(
        "{} created, {} updated, {} unchanged",
        report.count(Outcome::Created),
        report.count(Outcome::Updated),
        report.count(Outcome::Unchanged)
    );
    Ok(())
}
