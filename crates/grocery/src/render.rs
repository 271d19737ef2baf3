use chrono::{DateTime, Utc};
use shared::domain::{GroceryEntry, GroceryList};

use crate::grouping::group;

pub const EMPTY_MESSAGE: &str = "You have no groceries - add one with `!gro`!";
pub const BANNER: &str = "Here's your grocery list:";

/// Renders the groceries as chat text and hands back any orphaned entries
/// found along the way, so the caller can forward them for cleanup.
pub fn render(
    lists: &[GroceryList],
    entries: &[GroceryEntry],
    single_list_mode: bool,
) -> (String, Vec<GroceryEntry>) {
    render_at(lists, entries, single_list_mode, Utc::now())
}

/// [`render`] with an explicit clock for the "last updated" line.
pub fn render_at(
    lists: &[GroceryList],
    entries: &[GroceryEntry],
    single_list_mode: bool,
    now: DateTime<Utc>,
) -> (String, Vec<GroceryEntry>) {
    if lists.is_empty() && entries.is_empty() {
        return (EMPTY_MESSAGE.to_string(), Vec::new());
    }

    let grouping = group(lists, entries);
    let mut sections: Vec<String> = Vec::new();

    let mut head = String::new();
    if !single_list_mode {
        head.push_str(BANNER);
    }
    for (idx, entry) in grouping.listless.iter().enumerate() {
        push_line(&mut head, &format!("{}: {}", idx + 1, entry.description));
    }
    if !head.is_empty() {
        sections.push(head);
    }

    for list in lists {
        let mut section = match &list.display_name {
            Some(name) => format!("**{name} ({})**", list.label),
            None => format!("**{}**", list.label),
        };
        let bucket = grouping.entries_for(list.id);
        if bucket.is_empty() {
            push_line(&mut section, &format!("*No groceries in {}.*", list.label));
        }
        for (idx, entry) in bucket.iter().enumerate() {
            push_line(&mut section, &format!("{}: {}", idx + 1, entry.description));
        }
        sections.push(section);
    }

    if let Some(latest) = most_recent(entries) {
        sections.push(format!(
            "*Last updated by {}, {}.*",
            latest.updated_by,
            relative_time(latest.updated_at, now)
        ));
    }

    (sections.join("\n\n"), grouping.orphaned)
}

fn push_line(buf: &mut String, line: &str) {
    if !buf.is_empty() {
        buf.push('\n');
    }
    buf.push_str(line);
}

/// Latest `updated_at` wins; the first one seen wins a tie.
///
/// Runs over every entry handed to the renderer, orphans included, so the
/// footer can name an edit whose item is not shown.
fn most_recent(entries: &[GroceryEntry]) -> Option<&GroceryEntry> {
    entries.iter().fold(None, |best, entry| match best {
        Some(current) if current.updated_at >= entry.updated_at => Some(current),
        _ => Some(entry),
    })
}

pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 10 {
        return "just now".to_string();
    }

    let (amount, unit) = match secs {
        s if s < 60 => (s, "second"),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s => (s / 86_400, "day"),
    };
    let plural = if amount == 1 { "" } else { "s" };
    format!("{amount} {unit}{plural} ago")
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
