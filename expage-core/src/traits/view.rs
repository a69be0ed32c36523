use std::io::Write;

use crate::models::error::ExPageError;
use crate::models::record::{ErrorRecord, ExceptionRecord};

/// Presentation of the captured records.
///
/// Implemented by:
/// - `TerminalView` (interactive context, ANSI text)
/// - `HostedPageView` (hosted context, template page)
///
/// Views only read the records; their single effect is the bytes written to `out`.
pub trait View {
    fn render(
        &self,
        errors: &[ErrorRecord],
        exceptions: &[ExceptionRecord],
        out: &mut dyn Write,
    ) -> Result<(), ExPageError>;
}
