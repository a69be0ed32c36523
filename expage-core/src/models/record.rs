use std::error::Error as StdError;
use std::panic::{Location, PanicHookInfo};

use serde::Serialize;
use serde_json::Value;

use super::severity::Severity;

/// Variables captured around an error, in the order they were recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Scope(Vec<(String, Value)>);

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One runtime error raised while the process was running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    severity: Severity,
    message: String,
    file: String,
    line: u32,
    scope: Option<Scope>,
}

impl ErrorRecord {
    pub fn new(severity: Severity, message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            severity,
            message: message.into(),
            file: file.into(),
            line,
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }
}

/// One frame of a captured stack trace. Unknown locations are empty / zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
    pub type_name: Option<String>,
    pub function: Option<String>,
    pub args: Vec<String>,
}

/// An uncaught failure: a panic, or an error the host gave up on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionRecord {
    type_name: String,
    message: String,
    code: i64,
    file: String,
    line: u32,
    frames: Vec<StackFrame>,
}

impl ExceptionRecord {
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
        code: i64,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            code,
            file: file.into(),
            line,
            frames: Vec::new(),
        }
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn from_panic(info: &PanicHookInfo<'_>, frames: Vec<StackFrame>) -> Self {
        let payload = info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        let (file, line) = info
            .location()
            .map(|loc| (loc.file().to_string(), loc.line()))
            .unwrap_or_default();

        Self::new("panic", message, 0, file, line).with_frames(frames)
    }

    pub fn from_error<E>(error: &E, location: &Location<'_>, frames: Vec<StackFrame>) -> Self
    where
        E: StdError + 'static,
    {
        let mut message = error.to_string();
        let mut code = 0;
        let mut current: Option<&(dyn StdError + 'static)> = Some(error);
        while let Some(err) = current {
            if code == 0 {
                if let Some(os) = err.downcast_ref::<std::io::Error>().and_then(|e| e.raw_os_error()) {
                    code = i64::from(os);
                }
            }
            current = err.source();
            if let Some(source) = current {
                message.push_str(": ");
                message.push_str(&source.to_string());
            }
        }

        Self::new(std::any::type_name::<E>(), message, code, location.file(), location.line())
            .with_frames(frames)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }
}
