use chrono::{DateTime, Local};

use super::log_entry::LogEntry;
use crate::capture::listener::Buffers;
use crate::models::config::{ManagerConfig, SeparateLogs};
use crate::models::record::ErrorRecord;

/// One log entry and the file (relative to the working directory) it goes to.
#[derive(Debug, Clone)]
pub struct Route {
    pub filename: String,
    pub entry: LogEntry,
}

/// Category a dedicated entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Errors,
    Exceptions,
}

/// Groups the records into log entries, one per target.
///
/// A category with a dedicated file gets its own entry there, even when the
/// file is also the default log. Records of categories without one share a
/// single combined entry appended to the default log, after the dedicated
/// entries. The default log is only written when something falls back to it.
/// Within an entry records keep their occurrence order, errors first.
pub fn route(buffers: &Buffers, config: &ManagerConfig, timestamp: DateTime<Local>) -> Vec<Route> {
    let mut dedicated: Vec<(Category, Route)> = Vec::new();
    let mut combined: Option<LogEntry> = None;
    let new_entry = || LogEntry::at(timestamp, &config.date_format);

    for error in &buffers.errors {
        match error_target(error, &config.separate) {
            Some(filename) => entry_for(&mut dedicated, Category::Errors, filename, new_entry).add_error(error),
            None => combined.get_or_insert_with(new_entry).add_error(error),
        }
    }

    for exception in &buffers.exceptions {
        match config.separate.exceptions.as_deref() {
            Some(filename) => {
                entry_for(&mut dedicated, Category::Exceptions, filename, new_entry).add_exception(exception)
            }
            None => combined.get_or_insert_with(new_entry).add_exception(exception),
        }
    }

    let mut routes: Vec<Route> = dedicated.into_iter().map(|(_, route)| route).collect();
    if let Some(entry) = combined {
        routes.push(Route {
            filename: config.filelog.clone(),
            entry,
        });
    }
    routes
}

/// Dedicated file for an error, if its category has one.
fn error_target<'a>(error: &ErrorRecord, separate: &'a SeparateLogs) -> Option<&'a str> {
    let finer = if error.severity().is_user() {
        separate.user_errors.as_deref()
    } else {
        separate.php_errors.as_deref()
    };
    finer.or(separate.errors.as_deref())
}

fn entry_for<'r>(
    routes: &'r mut Vec<(Category, Route)>,
    category: Category,
    filename: &str,
    new_entry: impl FnOnce() -> LogEntry,
) -> &'r mut LogEntry {
    let index = match routes
        .iter()
        .position(|(c, r)| *c == category && r.filename == filename)
    {
        Some(index) => index,
        None => {
            routes.push((
                category,
                Route {
                    filename: filename.to_string(),
                    entry: new_entry(),
                },
            ));
            routes.len() - 1
        }
    };
    &mut routes[index].1.entry
}
