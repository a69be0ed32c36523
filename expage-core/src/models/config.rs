use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::LevelFilter;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::context::ExecutionContext;
use super::error::{ExPageError, Result};

pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Visibility mode: `dev` always shows the report, `prod` hides it unless
/// an authorization predicate unlocks it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Dev,
    Prod,
}

impl FromStr for Mode {
    type Err = ExPageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(ExPageError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        })
    }
}

/// Which template the hosted page is rendered from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum TemplateSpec {
    /// No page is shown in the hosted context.
    #[default]
    None,
    /// The built-in template shipped under `resources/views`.
    Default,
    Path(PathBuf),
    PerMode { dev: PathBuf, prod: PathBuf },
}

impl TemplateSpec {
    /// Accepts `null`, `"default"`, any other string as a path, or a
    /// `{ "dev": .., "prod": .. }` object.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::None),
            Value::String(s) if s == "default" => Ok(Self::Default),
            Value::String(s) => Ok(Self::Path(PathBuf::from(s))),
            Value::Object(map) => match (map.get("dev"), map.get("prod")) {
                (Some(Value::String(dev)), Some(Value::String(prod))) => Ok(Self::PerMode {
                    dev: PathBuf::from(dev),
                    prod: PathBuf::from(prod),
                }),
                _ => Err(invalid_template("object form needs string 'dev' and 'prod' paths")),
            },
            _ => Err(invalid_template("expected null, 'default', a path or {dev, prod}")),
        }
    }
}

fn invalid_template(reason: &str) -> ExPageError {
    ExPageError::InvalidParameter {
        name: "template",
        reason: reason.to_string(),
    }
}

impl<'de> Deserialize<'de> for TemplateSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Per-category log files. Unset categories fall back to the default log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparateLogs {
    pub errors: Option<String>,
    pub exceptions: Option<String>,
    pub user_errors: Option<String>,
    pub php_errors: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorViewOptions {
    pub show_file: bool,
    pub show_line: bool,
    pub show_scope: bool,
}

impl Default for ErrorViewOptions {
    fn default() -> Self {
        Self {
            show_file: true,
            show_line: true,
            show_scope: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptionViewOptions {
    pub show_file: bool,
    pub show_line: bool,
    pub show_trace: bool,
}

impl Default for ExceptionViewOptions {
    fn default() -> Self {
        Self {
            show_file: true,
            show_line: true,
            show_trace: true,
        }
    }
}

/// Toggles for the terminal report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliViewOptions {
    pub error: ErrorViewOptions,
    pub exception: ExceptionViewOptions,
}

/// Configuration of a [`crate::Manager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Directory that receives every log file. Must already exist.
    pub dirname: PathBuf,

    /// Log file used for every category without a dedicated file.
    pub filelog: String,

    #[serde(default)]
    pub template: TemplateSpec,

    #[serde(default)]
    pub separate: SeparateLogs,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub cli_view: CliViewOptions,

    /// Skip persistence and rendering entirely.
    #[serde(default)]
    pub disabled: bool,

    /// Most verbose `log` level recorded as an error (default: `Warn`).
    #[serde(default = "default_capture_level")]
    pub capture_level: LevelFilter,

    /// chrono format string for the log entry header.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Force a rendering context instead of detecting it.
    #[serde(default)]
    pub context: Option<ExecutionContext>,
}

fn default_capture_level() -> LevelFilter {
    LevelFilter::Warn
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl ManagerConfig {
    pub fn new(dirname: impl Into<PathBuf>, filelog: impl Into<String>) -> Self {
        Self {
            dirname: dirname.into(),
            filelog: filelog.into(),
            template: TemplateSpec::None,
            separate: SeparateLogs::default(),
            mode: Mode::Dev,
            cli_view: CliViewOptions::default(),
            disabled: false,
            capture_level: default_capture_level(),
            date_format: default_date_format(),
            context: None,
        }
    }

    pub fn with_template(mut self, template: TemplateSpec) -> Self {
        self.template = template;
        self
    }

    pub fn with_separate(mut self, separate: SeparateLogs) -> Self {
        self.separate = separate;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cli_view(mut self, cli_view: CliViewOptions) -> Self {
        self.cli_view = cli_view;
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Parses the loosely-typed configuration map.
    ///
    /// Each fatal case names the parameter at fault; unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| ExPageError::Config("configuration must be an object".into()))?;

        let dirname = match map.get("dirname") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(ExPageError::MissingParameter("dirname"))
            }
            Some(_) => {
                return Err(ExPageError::InvalidParameter {
                    name: "dirname",
                    reason: "expected a string".into(),
                })
            }
        };

        let filelog = match map.get("filelog") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(ExPageError::MissingParameter("filelog"))
            }
            Some(_) => {
                return Err(ExPageError::InvalidParameter {
                    name: "filelog",
                    reason: "expected a string".into(),
                })
            }
        };

        let mut config = Self::new(dirname, filelog);

        if let Some(template) = map.get("template") {
            config.template = TemplateSpec::from_value(template)?;
        }

        if let Some(mode) = map.get("mode") {
            config.mode = match mode {
                Value::String(s) => s.parse()?,
                other => return Err(ExPageError::InvalidMode(other.to_string())),
            };
        }

        if let Some(separate) = map.get("separate") {
            config.separate = parse_section(separate, "separate")?;
        }

        if let Some(cli_view) = map.get("cli_view") {
            config.cli_view = parse_section(cli_view, "cli_view")?;
        }

        if let Some(disabled) = map.get("disabled") {
            config.disabled = parse_section(disabled, "disabled")?;
        }

        if let Some(level) = map.get("capture_level") {
            config.capture_level = parse_section(level, "capture_level")?;
        }

        if let Some(Value::String(format)) = map.get("date_format") {
            config.date_format = format.clone();
        }

        if let Some(context) = map.get("context") {
            config.context = parse_section(context, "context")?;
        }

        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ExPageError::Config(format!("failed to parse configuration: {}", e)))?;
        Self::from_json(&value)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dirname.as_os_str().is_empty() {
            return Err(ExPageError::MissingParameter("dirname"));
        }
        if !self.dirname.is_dir() {
            return Err(ExPageError::DirectoryNotFound(self.dirname.clone()));
        }
        if self.filelog.trim().is_empty() {
            return Err(ExPageError::MissingParameter("filelog"));
        }
        Ok(())
    }

    /// Full path of a log file inside the working directory.
    pub fn log_path(&self, filename: &str) -> PathBuf {
        self.dirname.join(filename)
    }

    pub fn default_log_path(&self) -> PathBuf {
        self.log_path(&self.filelog)
    }

    pub fn dirname(&self) -> &Path {
        &self.dirname
    }
}

fn parse_section<T: for<'de> Deserialize<'de>>(value: &Value, name: &'static str) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| ExPageError::InvalidParameter {
        name,
        reason: e.to_string(),
    })
}
