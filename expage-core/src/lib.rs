//! # expage-core
//!
//! Process-scoped error capture and reporting.
//!
//! An [`ErrorCapture`] collects runtime errors (from the `log` facade or
//! explicit calls) and uncaught failures (panics, unhandled error values)
//! while the program runs. When the [`Manager`] guard held by `main` is
//! finalized, the collected records are appended to text log files and
//! shown as an ANSI report in a terminal or as a page rendered from a
//! template when serving a request.
//!
//! ## Architecture
//!
//! ```text
//! expage-core (this crate)
//! ├── traits/       ← View, TemplateEngine
//! ├── models/       ← ExPageError, Severity, ErrorRecord, ExceptionRecord, ManagerConfig, FinalizeState
//! ├── capture/      ← ErrorCapture, process-wide hooks, backtrace parsing
//! ├── storage/      ← LogEntry, FileSink, sink routing
//! ├── view/         ← TerminalView, HostedPageView, PlaceholderEngine
//! └── session/      ← Manager (finalize state machine, visibility policy)
//! ```

pub mod capture;
pub mod models;
pub mod session;
pub mod storage;
pub mod traits;
pub mod view;

// Re-export key types at crate root for convenience.
pub use capture::hook::{set_forward_logger, HookStatus};
pub use capture::listener::{Buffers, ErrorCapture};
pub use models::config::{CliViewOptions, ErrorViewOptions, ExceptionViewOptions, ManagerConfig, Mode, SeparateLogs, TemplateSpec};
pub use models::context::ExecutionContext;
pub use models::error::ExPageError;
pub use models::record::{ErrorRecord, ExceptionRecord, Scope, StackFrame};
pub use models::severity::Severity;
pub use models::state::{FinalizeReport, FinalizeState, RenderOutcome};
pub use session::manager::{Authorization, Manager, Visibility};
pub use storage::file_sink::FileSink;
pub use storage::log_entry::LogEntry;
pub use traits::template_engine::{Bindings, TemplateEngine};
pub use traits::view::View;
pub use view::hosted::HostedPageView;
pub use view::placeholder::PlaceholderEngine;
pub use view::terminal::TerminalView;
