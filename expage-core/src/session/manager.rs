use std::io::{self, Write};

use chrono::Local;
use serde_json::Value;

use crate::capture::listener::{Buffers, ErrorCapture};
use crate::models::config::{ManagerConfig, Mode, TemplateSpec};
use crate::models::context::ExecutionContext;
use crate::models::error::{ExPageError, Result};
use crate::models::state::{FinalizeReport, FinalizeState, RenderOutcome};
use crate::storage::file_sink::FileSink;
use crate::storage::routing;
use crate::traits::template_engine::{Bindings, TemplateEngine};
use crate::traits::view::View;
use crate::view::hosted::HostedPageView;
use crate::view::terminal::TerminalView;

/// Host-supplied check that unlocks the report in `prod` mode.
pub struct Authorization {
    predicate: Box<dyn FnOnce() -> bool + Send>,
    allow_in_prod: bool,
}

impl Authorization {
    pub fn new(predicate: impl FnOnce() -> bool + Send + 'static, allow_in_prod: bool) -> Self {
        Self {
            predicate: Box::new(predicate),
            allow_in_prod,
        }
    }
}

/// Whether the human-facing report is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Suppressed,
}

impl Visibility {
    /// `dev` always shows. `prod` shows only when the predicate grants it
    /// and the host allowed showing in `prod`. The predicate runs once at most.
    pub fn evaluate(mode: Mode, authorization: Option<Authorization>) -> Self {
        match (mode, authorization) {
            (Mode::Dev, _) => Self::Shown,
            (Mode::Prod, None) => Self::Suppressed,
            (Mode::Prod, Some(auth)) => {
                let granted = (auth.predicate)();
                if granted && auth.allow_in_prod {
                    Self::Shown
                } else {
                    Self::Suppressed
                }
            }
        }
    }

    pub fn is_shown(&self) -> bool {
        matches!(self, Self::Shown)
    }
}

/// Owns the capture for the lifetime of the process and turns what it
/// collected into log entries and a report.
///
/// Keep the manager alive in `main`: dropping it runs [`finalize`](Self::finalize)
/// if nobody did, including while a panic unwinds `main`.
///
/// ```text
/// idle → finalizing → done
///          │
///          ├─ take buffers (capture sealed, hooks inactive)
///          ├─ route + append log entries
///          ├─ pick view from execution context
///          └─ visibility policy → render
/// ```
pub struct Manager {
    config: ManagerConfig,
    capture: ErrorCapture,
    state: FinalizeState,
    authorization: Option<Authorization>,
    assigned: Bindings,
    output: Box<dyn Write + Send>,
    engine: Option<Box<dyn TemplateEngine>>,
}

impl Manager {
    /// Validates the configuration and installs the capture.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        config.validate()?;

        let capture = ErrorCapture::new();
        let status = capture.install(config.capture_level);
        if !status.log_bridge {
            log::warn!("another logger owns the log facade; log records will not be captured");
        }
        log::debug!(
            "capture installed: dir={} log={} mode={}",
            config.dirname.display(),
            config.filelog,
            config.mode
        );

        Ok(Self {
            config,
            capture,
            state: FinalizeState::Idle,
            authorization: None,
            assigned: Bindings::new(),
            output: Box::new(io::stdout()),
            engine: None,
        })
    }

    /// The capture, for recording errors explicitly.
    pub fn capture(&self) -> &ErrorCapture {
        &self.capture
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn state(&self) -> FinalizeState {
        self.state
    }

    pub fn set_authorization(&mut self, predicate: impl FnOnce() -> bool + Send + 'static, allow_in_prod: bool) {
        self.authorization = Some(Authorization::new(predicate, allow_in_prod));
    }

    /// Binds an extra named value into the hosted page.
    pub fn assign(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.assigned.insert(name.into(), value.into());
    }

    pub fn set_output(&mut self, output: Box<dyn Write + Send>) {
        self.output = output;
    }

    pub fn set_template_engine(&mut self, engine: Box<dyn TemplateEngine>) {
        self.engine = Some(engine);
    }

    /// Persists and presents everything captured. Runs once.
    pub fn finalize(&mut self) -> Result<FinalizeReport> {
        if !self.state.is_idle() {
            return Err(ExPageError::AlreadyFinalized);
        }
        self.state = FinalizeState::Finalizing;

        let result = self.run_finalize();
        self.state = FinalizeState::Done;
        result
    }

    fn run_finalize(&mut self) -> Result<FinalizeReport> {
        self.capture.uninstall();

        if self.config.disabled {
            let _ = self.capture.take_buffers();
            return Ok(FinalizeReport::empty(RenderOutcome::Disabled));
        }

        let buffers = self.capture.take_buffers();
        if buffers.is_empty() {
            return Ok(FinalizeReport::empty(RenderOutcome::NothingCaptured));
        }

        let mut report = self.persist(&buffers);

        let context = self.config.context.unwrap_or_else(ExecutionContext::detect);
        report.context = Some(context);

        if context.is_hosted() && self.config.template == TemplateSpec::None {
            report.outcome = RenderOutcome::NoTemplate;
            return Ok(report);
        }

        if !Visibility::evaluate(self.config.mode, self.authorization.take()).is_shown() {
            report.outcome = RenderOutcome::Suppressed;
            return Ok(report);
        }

        let view = self.build_view(context);
        view.render(&buffers.errors, &buffers.exceptions, &mut *self.output)?;
        report.outcome = RenderOutcome::Rendered;
        Ok(report)
    }

    fn persist(&self, buffers: &Buffers) -> FinalizeReport {
        let mut report = FinalizeReport::empty(RenderOutcome::Rendered);

        for route in routing::route(buffers, &self.config, Local::now()) {
            let sink = FileSink::new(self.config.log_path(&route.filename));
            match sink.append(&route.entry.render()) {
                Ok(bytes) => {
                    log::debug!("appended {} bytes to {}", bytes, sink.path().display());
                    report.written.push(sink.path().to_path_buf());
                }
                Err(e) => {
                    log::error!("failed to write log entry: {}", e);
                    report.sink_failures.push((sink.path().to_path_buf(), e.to_string()));
                }
            }
        }

        report
    }

    fn build_view(&mut self, context: ExecutionContext) -> Box<dyn View> {
        match context {
            ExecutionContext::Interactive => Box::new(TerminalView::new(self.config.cli_view)),
            ExecutionContext::Hosted => {
                let mut view = HostedPageView::new(self.config.template.clone(), self.config.mode);
                if let Some(engine) = self.engine.take() {
                    view = view.with_engine(engine);
                }
                for (name, value) in std::mem::take(&mut self.assigned) {
                    view.set(name, value);
                }
                Box::new(view)
            }
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        if !self.state.is_idle() {
            return;
        }
        if let Err(e) = self.finalize() {
            log::error!("finalize on drop failed: {}", e);
        }
    }
}
