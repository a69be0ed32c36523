use std::io::Write;

use serde_json::Value;

use crate::models::error::{ExPageError, Result};
use crate::traits::template_engine::{Bindings, TemplateEngine};

/// Substitutes `{{ name }}` and `{{ name.key.0 }}` placeholders.
///
/// Strings are inserted HTML-escaped, other values as escaped pretty JSON,
/// unknown names and `null` as nothing. An unterminated `{{` is copied as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderEngine;

impl TemplateEngine for PlaceholderEngine {
    fn execute(&self, template: &str, bindings: &Bindings, out: &mut dyn Write) -> Result<()> {
        let page = expand(template, bindings);
        out.write_all(page.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| ExPageError::Render(format!("page output failed: {}", e)))
    }
}

fn expand(template: &str, bindings: &Bindings) -> String {
    let mut page = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        page.push_str(&rest[..open]);
        let name = rest[open + 2..open + 2 + close].trim();
        if let Some(value) = lookup(bindings, name) {
            page.push_str(&escape_html(&value_text(value)));
        }
        rest = &rest[open + 2 + close + 2..];
    }

    page.push_str(rest);
    page
}

fn lookup<'a>(bindings: &'a Bindings, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = bindings.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        _ => serde_json::to_string_pretty(value).unwrap_or_default(),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bindings() -> Bindings {
        let mut b = Bindings::new();
        b.insert("name".into(), json!("Ada & co"));
        b.insert("count".into(), json!(3));
        b.insert("items".into(), json!([{"id": 1}, {"id": 2}]));
        b.insert("nothing".into(), Value::Null);
        b
    }

    #[test]
    fn substitutes_and_escapes() {
        assert_eq!(expand("Hi {{name}}, {{ count }}!", &bindings()), "Hi Ada &amp; co, 3!");
    }

    #[test]
    fn dotted_paths() {
        assert_eq!(expand("{{ items.1.id }}", &bindings()), "2");
        assert_eq!(expand("[{{ items.9.id }}]", &bindings()), "[]");
        assert_eq!(expand("[{{ count.x }}]", &bindings()), "[]");
    }

    #[test]
    fn unknown_and_null_are_empty() {
        assert_eq!(expand("a{{ missing }}b{{nothing}}c", &bindings()), "abc");
    }

    #[test]
    fn containers_render_as_escaped_json() {
        let out = expand("{{ items }}", &bindings());
        assert!(out.starts_with('['));
        assert!(out.contains("&quot;id&quot;: 1"));
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(expand("a {{ name", &bindings()), "a {{ name");
    }

    #[test]
    fn engine_writes_page() {
        let mut out = Vec::new();
        PlaceholderEngine.execute("<p>{{ count }}</p>", &bindings(), &mut out).unwrap();
        assert_eq!(out, b"<p>3</p>");
    }
}
