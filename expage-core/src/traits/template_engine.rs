use std::collections::BTreeMap;
use std::io::Write;

use serde_json::Value;

use crate::models::error::ExPageError;

/// Values a template can read, by name.
pub type Bindings = BTreeMap<String, Value>;

/// Executes a hosted-page template against its bindings.
///
/// The template source is whatever the resolved file contains; the engine
/// reads names only from `bindings`.
pub trait TemplateEngine: Send {
    fn execute(&self, template: &str, bindings: &Bindings, out: &mut dyn Write) -> Result<(), ExPageError>;
}
