use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::models::config::DEFAULT_DATE_FORMAT;
use crate::models::record::{ErrorRecord, ExceptionRecord, StackFrame};

const ERROR_RULE: &str = "--------------------------------------------------------";
const EXCEPTION_RULE: &str = "-------------------------------------------------------";
const FOOTER: &str = "#######################################################################################";

/// One delimited block of records, appended to a log file in a single write.
///
/// ```text
/// ################# Log entry DATE: <date>  TIMESTAMP: <epoch> #####################
/// <one stanza per record>
/// #######################################################################################
/// ```
///
/// Only the header depends on the timestamp; the stanzas are a pure function
/// of the records.
#[derive(Debug, Clone)]
pub struct LogEntry {
    timestamp: DateTime<Local>,
    date_format: String,
    body: String,
    stanzas: usize,
}

impl LogEntry {
    pub fn new(date_format: &str) -> Self {
        Self::at(Local::now(), date_format)
    }

    pub fn at(timestamp: DateTime<Local>, date_format: &str) -> Self {
        Self {
            timestamp,
            date_format: date_format.to_string(),
            body: String::new(),
            stanzas: 0,
        }
    }

    pub fn add_error(&mut self, error: &ErrorRecord) {
        let body = &mut self.body;
        let _ = writeln!(body, "{}", ERROR_RULE);
        let _ = writeln!(body, "Level: {} Message: {}", error.severity(), error.message());
        let _ = writeln!(body, "\t at file: {}  on line: {}", error.file(), error.line());
        let _ = writeln!(body, "{}", ERROR_RULE);
        self.stanzas += 1;
    }

    pub fn add_errors<'a>(&mut self, errors: impl IntoIterator<Item = &'a ErrorRecord>) {
        for error in errors {
            self.add_error(error);
        }
    }

    pub fn add_exception(&mut self, exception: &ExceptionRecord) {
        let body = &mut self.body;
        let _ = writeln!(body, "{}", EXCEPTION_RULE);
        let _ = writeln!(
            body,
            "Uncaught exception [{}] Message: {}",
            exception.type_name(),
            exception.message()
        );
        let _ = writeln!(
            body,
            "\t with code: '{}' at file: {}  on line: {}",
            exception.code(),
            exception.file(),
            exception.line()
        );
        let _ = writeln!(body, "\t Trace:");
        for (index, frame) in exception.frames().iter().enumerate() {
            let _ = writeln!(body, "#{} {}", index, trace_line(frame));
        }
        let _ = writeln!(body, "#{} {{main}}", exception.frames().len());
        let _ = writeln!(body, "{}", EXCEPTION_RULE);
        self.stanzas += 1;
    }

    pub fn add_exceptions<'a>(&mut self, exceptions: impl IntoIterator<Item = &'a ExceptionRecord>) {
        for exception in exceptions {
            self.add_exception(exception);
        }
    }

    /// Number of records added so far.
    pub fn len(&self) -> usize {
        self.stanzas
    }

    pub fn is_empty(&self) -> bool {
        self.stanzas == 0
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn header(&self) -> String {
        let mut date = String::new();
        // A malformed user format must not abort the finalize pass.
        if write!(date, "{}", self.timestamp.format(&self.date_format)).is_err() {
            date.clear();
            let _ = write!(date, "{}", self.timestamp.format(DEFAULT_DATE_FORMAT));
        }
        format!(
            "################# Log entry DATE: {}  TIMESTAMP: {} #####################",
            date,
            self.timestamp.timestamp()
        )
    }

    /// Stanzas and footer, without the timestamped header.
    pub fn body(&self) -> String {
        format!("{}{}", self.body, FOOTER)
    }

    pub fn render(&self) -> String {
        format!("{}\n{}", self.header(), self.body())
    }
}

fn trace_line(frame: &StackFrame) -> String {
    let location = if frame.file.is_empty() {
        "[internal function]".to_string()
    } else {
        format!("{}({})", frame.file, frame.line)
    };
    let function = frame.function.as_deref().unwrap_or("{unknown}");
    let callee = match frame.type_name.as_deref() {
        Some(type_name) => format!("{}::{}", type_name, function),
        None => function.to_string(),
    };
    format!("{}: {}({})", location, callee, frame.args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::severity::Severity;
    use chrono::TimeZone;

    fn at(epoch: i64) -> DateTime<Local> {
        Local.timestamp_opt(epoch, 0).single().unwrap()
    }

    fn sample_exception() -> ExceptionRecord {
        ExceptionRecord::new("app::LoadError", "config missing", 2, "src/main.rs", 10).with_frames(vec![
            StackFrame {
                file: "src/config.rs".into(),
                line: 12,
                type_name: Some("app::config::Loader".into()),
                function: Some("read".into()),
                args: vec!["\"app.toml\"".into()],
            },
            StackFrame {
                function: Some("main".into()),
                ..StackFrame::default()
            },
        ])
    }

    #[test]
    fn header_carries_date_and_epoch() {
        let entry = LogEntry::at(at(1_700_000_000), "%Y");
        let header = entry.header();
        assert!(header.starts_with("################# Log entry DATE: 2023  TIMESTAMP: 1700000000"));
    }

    #[test]
    fn error_stanza_layout() {
        let mut entry = LogEntry::at(at(0), DEFAULT_DATE_FORMAT);
        entry.add_error(&ErrorRecord::new(Severity::Warning, "disk almost full", "src/disk.rs", 42));

        let expected = format!(
            "{rule}\nLevel: WARNING Message: disk almost full\n\t at file: src/disk.rs  on line: 42\n{rule}\n{footer}",
            rule = ERROR_RULE,
            footer = FOOTER
        );
        assert_eq!(entry.body(), expected);
        assert_eq!(entry.len(), 1);
    }

    #[test]
    fn exception_stanza_has_numbered_trace() {
        let mut entry = LogEntry::at(at(0), DEFAULT_DATE_FORMAT);
        entry.add_exception(&sample_exception());
        let body = entry.body();

        assert!(body.contains("Uncaught exception [app::LoadError] Message: config missing\n"));
        assert!(body.contains("\t with code: '2' at file: src/main.rs  on line: 10\n"));
        assert!(body.contains("#0 src/config.rs(12): app::config::Loader::read(\"app.toml\")\n"));
        assert!(body.contains("#1 [internal function]: main()\n"));
        assert!(body.contains("#2 {main}\n"));
    }

    #[test]
    fn bodies_do_not_depend_on_timestamp() {
        let errors = vec![
            ErrorRecord::new(Severity::Notice, "a", "a.rs", 1),
            ErrorRecord::new(Severity::Deprecated, "b", "b.rs", 2),
        ];
        let exceptions = vec![sample_exception()];

        let mut first = LogEntry::at(at(1_000), DEFAULT_DATE_FORMAT);
        first.add_errors(&errors);
        first.add_exceptions(&exceptions);
        let mut second = LogEntry::at(at(2_000_000), DEFAULT_DATE_FORMAT);
        second.add_errors(&errors);
        second.add_exceptions(&exceptions);

        assert_eq!(first.body(), second.body());
        assert_ne!(first.header(), second.header());
        assert_eq!(first.render().lines().skip(1).collect::<Vec<_>>(), second.render().lines().skip(1).collect::<Vec<_>>());
    }

    #[test]
    fn malformed_date_format_falls_back() {
        let entry = LogEntry::at(at(0), "%Q");
        assert!(entry.header().contains("TIMESTAMP: 0 "));
    }
}
