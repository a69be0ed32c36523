use std::io::Write;

use owo_colors::OwoColorize;
use serde_json::Value;

use crate::models::config::CliViewOptions;
use crate::models::error::{ExPageError, Result};
use crate::models::record::{ErrorRecord, ExceptionRecord, StackFrame};
use crate::traits::view::View;

const BANNER: &str = " Your application run into problem ";

/// Containers longer than this are summarised instead of printed.
const MAX_INLINE_ELEMENTS: usize = 7;

/// ANSI report for an interactive session.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalView {
    options: CliViewOptions,
}

impl TerminalView {
    pub fn new(options: CliViewOptions) -> Self {
        Self { options }
    }

    fn write_report(
        &self,
        errors: &[ErrorRecord],
        exceptions: &[ExceptionRecord],
        out: &mut dyn Write,
    ) -> std::io::Result<()> {
        writeln!(out, "{}", BANNER.white().on_red().bold())?;
        for error in errors {
            self.write_error(error, out)?;
        }
        for exception in exceptions {
            self.write_exception(exception, out)?;
        }
        out.flush()
    }

    fn write_error(&self, error: &ErrorRecord, out: &mut dyn Write) -> std::io::Result<()> {
        let opts = &self.options.error;

        write!(out, "{}", format!(" Level [{}]", error.severity()).red().bold())?;
        write!(out, " {} ", error.message())?;
        if opts.show_file {
            write!(out, " in file: {} ", display_path(error.file()))?;
        }
        if opts.show_line {
            write!(out, " at line: {} ", error.line())?;
        }
        writeln!(out, " ")?;

        if opts.show_scope {
            if let Some(scope) = error.scope() {
                for (name, value) in scope.iter() {
                    writeln!(
                        out,
                        "\t {} : {}",
                        format!(" {}", name).bright_black().bold(),
                        display_scope_value(value)
                    )?;
                }
            }
        }

        writeln!(out)
    }

    fn write_exception(&self, exception: &ExceptionRecord, out: &mut dyn Write) -> std::io::Result<()> {
        let opts = &self.options.exception;

        write!(
            out,
            "{} '{}' ",
            format!(" {}: ", exception.type_name()).white().on_magenta().bold(),
            exception.message()
        )?;
        write!(out, " with code: {} ", exception.code())?;
        if opts.show_file {
            write!(out, " in file: '{}' ", display_path(exception.file()))?;
        }
        if opts.show_line {
            write!(out, "at line: '{}' ", exception.line())?;
        }
        writeln!(out)?;

        if opts.show_trace {
            writeln!(out, "Trace: ")?;
            for (index, frame) in exception.frames().iter().enumerate() {
                write_frame(index, frame, out)?;
            }
        }

        Ok(())
    }
}

impl View for TerminalView {
    fn render(
        &self,
        errors: &[ErrorRecord],
        exceptions: &[ExceptionRecord],
        out: &mut dyn Write,
    ) -> Result<()> {
        self.write_report(errors, exceptions, out)
            .map_err(|e| ExPageError::Render(format!("terminal output failed: {}", e)))
    }
}

fn write_frame(index: usize, frame: &StackFrame, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        out,
        "\t#{} in file: {} at line: {} ",
        index,
        display_path(&frame.file),
        frame.line
    )?;
    writeln!(
        out,
        "\t   at class: '{}' in function: '{}'",
        frame.type_name.as_deref().unwrap_or_default(),
        frame.function.as_deref().unwrap_or_default()
    )?;
    writeln!(out, "\t   args: {}", compact_args(&frame.args))
}

/// Shortens long paths to their tail: `"..." + path[30..]`.
pub fn display_path(path: &str) -> String {
    if path.len() <= 20 {
        return path.to_string();
    }
    let mut start = 30.min(path.len());
    while !path.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &path[start..])
}

/// One-line rendering of a captured scope variable.
pub fn display_scope_value(value: &Value) -> String {
    match value {
        Value::Array(items) if items.len() > MAX_INLINE_ELEMENTS => "array(...)".to_string(),
        Value::Object(map) if map.len() > MAX_INLINE_ELEMENTS => "array(...)".to_string(),
        Value::Object(_) => strip_whitespace(&value.to_string()),
        other => without_line_breaks(other).to_string(),
    }
}

/// Copy of `value` whose strings carry no line breaks.
fn without_line_breaks(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace(['\n', '\r'], "")),
        Value::Array(items) => Value::Array(items.iter().map(without_line_breaks).collect()),
        other => other.clone(),
    }
}

fn compact_args(args: &[String]) -> String {
    strip_whitespace(&format!("[{}]", args.join(",")))
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{ErrorViewOptions, ExceptionViewOptions};
    use crate::models::record::Scope;
    use crate::models::severity::Severity;
    use crate::test_support::strip_ansi;
    use serde_json::json;

    fn render(view: &TerminalView, errors: &[ErrorRecord], exceptions: &[ExceptionRecord]) -> String {
        let mut out = Vec::new();
        view.render(errors, exceptions, &mut out).unwrap();
        strip_ansi(&String::from_utf8(out).unwrap())
    }

    fn frame(file: &str, line: u32, function: &str) -> StackFrame {
        StackFrame {
            file: file.into(),
            line,
            type_name: Some("app::Worker".into()),
            function: Some(function.into()),
            args: vec!["1".into(), "\"a b\"".into()],
        }
    }

    #[test]
    fn long_paths_keep_tail_from_offset_30() {
        let path = "/home/deploy/releases/2024/app/src/handler.rs";
        assert_eq!(path.len(), 45);
        assert_eq!(display_path(path), format!("...{}", &path[30..]));
        assert_eq!(display_path(path), ".../src/handler.rs");
    }

    #[test]
    fn short_paths_untouched() {
        assert_eq!(display_path("src/main.rs"), "src/main.rs");
        assert_eq!(display_path("exactly/twenty/chars"), "exactly/twenty/chars");
        assert_eq!(display_path("twenty-five/chars/long.rs"), "...");
    }

    #[test]
    fn scope_values() {
        assert_eq!(display_scope_value(&json!([1, 2, 3, 4, 5, 6, 7, 8])), "array(...)");
        assert_eq!(display_scope_value(&json!([1, 2, 3])), "[1,2,3]");
        assert_eq!(display_scope_value(&json!({"user": "bob smith", "id": 7})), "{\"id\":7,\"user\":\"bobsmith\"}");
        assert_eq!(display_scope_value(&json!("line\nbreak")), "\"linebreak\"");
        assert_eq!(display_scope_value(&json!("first line\r\nsecond line")), "\"first linesecond line\"");
        assert_eq!(display_scope_value(&json!(["a\nb", 2])), "[\"ab\",2]");
        assert_eq!(display_scope_value(&json!(4.5)), "4.5");
        assert_eq!(display_scope_value(&json!(null)), "null");
    }

    #[test]
    fn renders_errors_with_toggles() {
        let error = ErrorRecord::new(Severity::Warning, "disk almost full", "src/disk.rs", 42)
            .with_scope(Scope::new().with("free_mb", 12));

        let full = render(&TerminalView::default(), &[error.clone()], &[]);
        assert!(full.starts_with(BANNER));
        assert!(full.contains(" Level [WARNING] disk almost full "));
        assert!(full.contains(" in file: src/disk.rs "));
        assert!(full.contains(" at line: 42 "));
        assert!(full.contains("\t  free_mb : 12\n"));

        let bare = TerminalView::new(CliViewOptions {
            error: ErrorViewOptions {
                show_file: false,
                show_line: false,
                show_scope: false,
            },
            ..CliViewOptions::default()
        });
        let out = render(&bare, &[error], &[]);
        assert!(!out.contains("in file"));
        assert!(!out.contains("at line"));
        assert!(!out.contains("free_mb"));
    }

    #[test]
    fn trace_frames_are_numbered_from_zero() {
        let exception = ExceptionRecord::new("panic", "boom", 0, "src/main.rs", 3).with_frames(vec![
            frame("src/a.rs", 1, "first"),
            frame("src/b.rs", 2, "second"),
            frame("src/c.rs", 3, "third"),
        ]);
        let out = render(&TerminalView::default(), &[], &[exception]);

        let indices: Vec<&str> = out
            .lines()
            .filter_map(|l| l.strip_prefix("\t#"))
            .map(|l| l.split(' ').next().unwrap())
            .collect();
        assert_eq!(indices, vec!["0", "1", "2"]);

        let a = out.find("function: 'first'").unwrap();
        let b = out.find("function: 'second'").unwrap();
        let c = out.find("function: 'third'").unwrap();
        assert!(a < b && b < c);
        assert!(out.contains("\t   at class: 'app::Worker' in function: 'first'"));
        assert!(out.contains("\t   args: [1,\"ab\"]"));
    }

    #[test]
    fn exception_toggles() {
        let exception = ExceptionRecord::new("panic", "boom", 0, "src/main.rs", 3)
            .with_frames(vec![frame("src/a.rs", 1, "first")]);
        let view = TerminalView::new(CliViewOptions {
            exception: ExceptionViewOptions {
                show_file: false,
                show_line: true,
                show_trace: false,
            },
            ..CliViewOptions::default()
        });
        let out = render(&view, &[], &[exception]);

        assert!(out.contains(" panic:  'boom'  with code: 0 "));
        assert!(!out.contains("in file: 'src/main.rs'"));
        assert!(out.contains("at line: '3'"));
        assert!(!out.contains("Trace:"));
    }
}
