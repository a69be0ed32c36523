use std::path::PathBuf;

use super::context::ExecutionContext;

/// Finalize state machine.
///
/// ```text
/// idle → finalizing → done
/// ```
/// The transition out of `Idle` happens at most once per manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeState {
    Idle,
    Finalizing,
    Done,
}

impl FinalizeState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// What the presentation step ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Disabled,
    NothingCaptured,
    /// Prod mode without a granting authorization.
    Suppressed,
    /// Hosted context with no template configured.
    NoTemplate,
    Rendered,
}

/// Result of one finalize pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Log files that received an entry, in write order.
    pub written: Vec<PathBuf>,
    /// Log files that could not be written, with the reason.
    pub sink_failures: Vec<(PathBuf, String)>,
    pub context: Option<ExecutionContext>,
    pub outcome: RenderOutcome,
}

impl FinalizeReport {
    pub(crate) fn empty(outcome: RenderOutcome) -> Self {
        Self {
            written: Vec::new(),
            sink_failures: Vec::new(),
            context: None,
            outcome,
        }
    }
}
