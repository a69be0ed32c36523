use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::placeholder::PlaceholderEngine;
use crate::models::config::{Mode, TemplateSpec};
use crate::models::error::{ExPageError, Result};
use crate::models::record::{ErrorRecord, ExceptionRecord};
use crate::traits::template_engine::{Bindings, TemplateEngine};
use crate::traits::view::View;

/// Directory holding the built-in templates.
pub const RESOURCE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/resources/views");

/// File name of the built-in template inside [`RESOURCE_DIR`].
pub const DEFAULT_TEMPLATE: &str = "default.html";

/// Error page for a hosted (request/response) context.
///
/// The template sees the records as `errors` and `exceptions`, the current
/// `mode`, the record counts, and every value assigned through [`set`](Self::set).
pub struct HostedPageView {
    template: TemplateSpec,
    mode: Mode,
    resource_dir: PathBuf,
    bindings: Bindings,
    engine: Box<dyn TemplateEngine>,
}

impl HostedPageView {
    pub fn new(template: TemplateSpec, mode: Mode) -> Self {
        Self {
            template,
            mode,
            resource_dir: PathBuf::from(RESOURCE_DIR),
            bindings: Bindings::new(),
            engine: Box::new(PlaceholderEngine),
        }
    }

    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = dir.into();
        self
    }

    pub fn with_engine(mut self, engine: Box<dyn TemplateEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// Picks the template file for the configured template and mode.
    pub fn resolve_template(&self) -> Result<PathBuf> {
        let path = match &self.template {
            TemplateSpec::None => {
                return Err(ExPageError::InvalidParameter {
                    name: "template",
                    reason: "no template configured".into(),
                })
            }
            TemplateSpec::Default => self.resource_dir.join(DEFAULT_TEMPLATE),
            TemplateSpec::PerMode { dev, prod } => match self.mode {
                Mode::Dev => dev.clone(),
                Mode::Prod => prod.clone(),
            },
            TemplateSpec::Path(path) => path.clone(),
        };

        if !path.is_file() {
            return Err(ExPageError::TemplateNotFound(path));
        }
        Ok(path)
    }

    fn bindings_for(&self, errors: &[ErrorRecord], exceptions: &[ExceptionRecord]) -> Result<Bindings> {
        let mut bindings = self.bindings.clone();
        bindings.insert("errors".into(), to_value(errors)?);
        bindings.insert("exceptions".into(), to_value(exceptions)?);
        bindings.insert("error_count".into(), Value::from(errors.len()));
        bindings.insert("exception_count".into(), Value::from(exceptions.len()));
        bindings.insert("mode".into(), Value::from(self.mode.to_string()));
        Ok(bindings)
    }
}

fn to_value<T: serde::Serialize>(records: &[T]) -> Result<Value> {
    serde_json::to_value(records).map_err(|e| ExPageError::Render(format!("failed to bind records: {}", e)))
}

impl View for HostedPageView {
    fn render(
        &self,
        errors: &[ErrorRecord],
        exceptions: &[ExceptionRecord],
        out: &mut dyn Write,
    ) -> Result<()> {
        let path = self.resolve_template()?;
        let source = fs::read_to_string(&path)
            .map_err(|e| ExPageError::Render(format!("failed to read '{}': {}", path.display(), e)))?;
        let bindings = self.bindings_for(errors, exceptions)?;

        log::debug!("rendering error page from {}", path.display());
        self.engine.execute(&source, &bindings, out)
    }
}
