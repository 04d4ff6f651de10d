//! Output formatting for CLI display.

use jiff::Timestamp;

use crate::deploy::ReportEntry;
use crate::model::{
    App, ExternalController, Group, Language, Page, Patch, QueryTemplate, Resource, ResourceKind,
    Screen,
};

use super::short_id;

pub(super) fn format_app(app: &App) -> String {
    format!(
        "{}  {}  {} (/{})  [{} screens]",
        short_id(app.id),
        app.name,
        app.title,
        app.slug,
        app.screens.len()
    )
}

pub(super) fn format_group(group: &Group) -> String {
    format!("{}  {}  {}", short_id(group.id), group.name, group.description)
}

pub(super) fn format_screen(screen: &Screen) -> String {
    format!(
        "{}  {}  {} (/{})  controller {}",
        short_id(screen.id),
        screen.name,
        screen.title,
        screen.slug,
        short_id(screen.controller)
    )
}

pub(super) fn format_controller(controller: &ExternalController) -> String {
    format!(
        "{}  {}  {}  {} patches  {}",
        short_id(controller.id),
        controller.name,
        controller.language.as_str(),
        controller.patches.len(),
        &controller.digest[..12.min(controller.digest.len())]
    )
}

/// `#index  author  time  +added -removed`.
pub(super) fn format_patch(index: usize, patch: &Patch) -> String {
    // The first two lines are the `---`/`+++` header.
    let body = patch.content.lines().skip(2);
    let (added, removed) = body.fold((0, 0), |(added, removed), line| match line.as_bytes().first() {
        Some(b'+') => (added + 1, removed),
        Some(b'-') => (added, removed + 1),
        _ => (added, removed),
    });
    format!(
        "#{index}  {}  {}  +{added} -{removed}",
        patch.author,
        format_time(patch.created_at)
    )
}

pub(super) fn format_query_template(template: &QueryTemplate) -> String {
    format!(
        "{}  {}  {}  resource {}",
        short_id(template.id),
        template.name,
        template.lifecycle.as_str(),
        short_id(template.resource)
    )
}

pub(super) fn format_resource(resource: &Resource) -> String {
    format!(
        "{}  {}  {}",
        short_id(resource.id),
        resource.name,
        resource.kind.as_str()
    )
}

pub(super) fn format_report_entry(entry: &ReportEntry) -> String {
    format!(
        "{:<9} {} {:?} ({})",
        entry.outcome.to_string(),
        entry.kind,
        entry.name,
        short_id(entry.id)
    )
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub(super) fn format_time(at: Timestamp) -> String {
    at.strftime("%Y-%m-%d %H:%M:%S").to_string()
}

/// Prints every record, then a footer when there are more pages.
pub(super) fn print_page<T>(page: &Page<T>, format: impl Fn(&T) -> String) {
    if page.records.is_empty() {
        println!("(none)");
        return;
    }
    for record in &page.records {
        println!("{}", format(record));
    }
    if page.has_next_page {
        println!(
            "({} of {} records; next page: --page {})",
            page.records.len(),
            page.total_records,
            page.next_page
        );
    }
}

pub(super) fn parse_language(value: &str) -> Result<Language, String> {
    Language::parse(value).ok_or_else(|| format!("unknown language {value:?} (javascript, typescript)"))
}

pub(super) fn parse_resource_kind(value: &str) -> Result<ResourceKind, String> {
    ResourceKind::parse(value)
        .ok_or_else(|| format!("unknown resource type {value:?} (mysql, postgres, mongodb, bigquery)"))
}
