use std::backtrace::Backtrace;

use crate::models::record::StackFrame;

/// Symbols of the unwinding and capture machinery at the top of a trace.
const MACHINERY_PREFIXES: [&str; 8] = [
    "std::",
    "core::",
    "<std::",
    "<core::",
    "<alloc::",
    "rust_begin_unwind",
    "__rust",
    "expage_core::capture",
];

/// Frames below `main` belong to the runtime.
const RUNTIME_PREFIXES: [&str; 3] = [
    "std::rt::lang_start",
    "std::sys::backtrace::__rust_begin_short_backtrace",
    "std::sys_common::backtrace::__rust_begin_short_backtrace",
];

/// Captures the current stack, ignoring `RUST_BACKTRACE`.
pub fn capture() -> Vec<StackFrame> {
    parse(&Backtrace::force_capture().to_string())
}

/// Parses the textual form of a `std::backtrace::Backtrace`.
///
/// Frame 0 of the result is the first frame outside the panic and capture
/// machinery; the runtime frames below `main` are cut off.
pub fn parse(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<(String, StackFrame)> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some((_, frame)) = frames.last_mut() {
                if frame.file.is_empty() {
                    let (file, line_no) = split_location(location);
                    frame.file = file;
                    frame.line = line_no;
                }
            }
            continue;
        }

        let Some((index, symbol)) = line.split_once(": ") else {
            continue;
        };
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        let symbol = symbol.trim().to_string();
        let (type_name, function) = split_symbol(&symbol);
        frames.push((
            symbol,
            StackFrame {
                type_name,
                function: Some(function),
                ..StackFrame::default()
            },
        ));
    }

    let start = frames
        .iter()
        .position(|(symbol, _)| !MACHINERY_PREFIXES.iter().any(|p| symbol.starts_with(p)))
        .unwrap_or(frames.len());
    let end = frames
        .iter()
        .skip(start)
        .position(|(symbol, _)| RUNTIME_PREFIXES.iter().any(|p| symbol.starts_with(p)))
        .map_or(frames.len(), |offset| start + offset);

    frames.drain(start..end).map(|(_, frame)| frame).collect()
}

/// `path/to/file.rs:12:5` → (`path/to/file.rs`, 12)
fn split_location(location: &str) -> (String, u32) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next().unwrap_or_default();
    let middle = parts.next();
    let rest = parts.next();

    match (rest, middle) {
        (Some(file), Some(line)) if line.parse::<u32>().is_ok() => {
            (file.to_string(), line.parse().unwrap_or(0))
        }
        (_, Some(file)) => {
            let file = match rest {
                Some(head) => format!("{}:{}", head, file),
                None => file.to_string(),
            };
            (file, last.parse().unwrap_or(0))
        }
        _ => (location.to_string(), 0),
    }
}

/// `app::config::Loader::read::h0123456789abcdef` → (`app::config::Loader`, `read`)
fn split_symbol(symbol: &str) -> (Option<String>, String) {
    let mut symbol = symbol;
    if let Some((head, hash)) = symbol.rsplit_once("::h") {
        if hash.len() == 16 && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            symbol = head;
        }
    }
    while let Some(head) = symbol.strip_suffix("::{{closure}}") {
        symbol = head;
    }

    match rsplit_path(symbol) {
        Some((path, function)) => (Some(path.to_string()), function.to_string()),
        None => (None, symbol.to_string()),
    }
}

/// Splits at the last `::` that is not nested inside `<...>`.
fn rsplit_path(symbol: &str) -> Option<(&str, &str)> {
    let bytes = symbol.as_bytes();
    let mut depth = 0i32;
    let mut i = bytes.len();
    while i > 1 {
        i -= 1;
        match bytes[i] {
            b'>' => depth += 1,
            b'<' => depth -= 1,
            b':' if depth == 0 && bytes[i - 1] == b':' => {
                return Some((&symbol[..i - 1], &symbol[i + 1..]));
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: std::backtrace::Backtrace::create
             at /rustc/abc/library/std/src/backtrace.rs:331:13
   2: expage_core::capture::backtrace::capture
             at ./expage-core/src/capture/backtrace.rs:30:11
   3: app::config::Loader::read::h0123456789abcdef
             at ./src/config.rs:12:9
   4: app::run::{{closure}}
             at ./src/main.rs:40:5
   5: <T as core::ops::function::Fn<()>>::call
   6: app::main
             at ./src/main.rs:8:5
   7: std::rt::lang_start::{{closure}}
             at /rustc/abc/library/std/src/rt.rs:159:18
   8: main
   9: __libc_start_main
";

    #[test]
    fn drops_machinery_and_runtime_frames() {
        let frames = parse(SAMPLE);
        let functions: Vec<_> = frames.iter().map(|f| f.function.as_deref().unwrap()).collect();
        assert_eq!(functions, vec!["read", "run", "call", "main"]);
    }

    #[test]
    fn splits_symbols_and_locations() {
        let frames = parse(SAMPLE);

        assert_eq!(frames[0].type_name.as_deref(), Some("app::config::Loader"));
        assert_eq!(frames[0].file, "./src/config.rs");
        assert_eq!(frames[0].line, 12);

        assert_eq!(frames[1].type_name.as_deref(), Some("app"));
        assert_eq!(frames[1].line, 40);

        assert_eq!(frames[2].type_name.as_deref(), Some("<T as core::ops::function::Fn<()>>"));
        assert_eq!(frames[2].file, "");
        assert_eq!(frames[2].line, 0);
        assert!(frames[2].args.is_empty());
    }

    #[test]
    fn location_without_column() {
        assert_eq!(split_location("src/lib.rs:7"), ("src/lib.rs".to_string(), 7));
        assert_eq!(split_location("C:\\app\\src\\lib.rs:7:3"), ("C:\\app\\src\\lib.rs".to_string(), 7));
    }

    #[test]
    fn disabled_backtrace_has_no_frames() {
        assert!(parse("disabled backtrace").is_empty());
        assert!(parse("unsupported backtrace").is_empty());
    }

    #[test]
    fn bare_symbol_has_no_type() {
        assert_eq!(split_symbol("main"), (None, "main".to_string()));
    }
}
