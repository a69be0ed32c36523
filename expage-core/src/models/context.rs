use std::env;

use serde::{Deserialize, Serialize};

/// Where the report is going to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContext {
    /// Attached to a terminal session: ANSI report on the output stream.
    Interactive,
    /// Serving a request: the report is a page rendered from a template.
    Hosted,
}

/// Environment variables a CGI-style host sets for every request.
const REQUEST_ENV: [&str; 2] = ["GATEWAY_INTERFACE", "REQUEST_METHOD"];

impl ExecutionContext {
    pub fn detect() -> Self {
        Self::detect_with(|name| env::var_os(name).is_some())
    }

    /// Detection against an arbitrary environment lookup.
    pub fn detect_with(has_var: impl Fn(&str) -> bool) -> Self {
        if REQUEST_ENV.iter().any(|name| has_var(name)) {
            Self::Hosted
        } else {
            Self::Interactive
        }
    }

    pub fn is_hosted(&self) -> bool {
        matches!(self, Self::Hosted)
    }
}
