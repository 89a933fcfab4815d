//! Strict template parsing and rendering.
//!
//! Templates use Go-style actions over a [`VariableSet`]:
//!
//! - `{{ .name }}` and `{{ .name.field }}` substitute a value
//! - `{{- ` and ` -}}` trim whitespace before/after the action
//! - `{{/* ... */}}` is a comment
//!
//! A template is parsed completely before anything is rendered, and a field
//! missing from the variables is always an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::vars::VariableSet;

static FIELD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\.([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)$")
        .expect("field pattern is valid")
});

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const COMMENT_START: &str = "/*";
const COMMENT_END: &str = "*/";

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Field { path: Vec<String> },
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse `source`; `name` is only used in error messages.
    pub fn parse(name: impl Into<String>, source: &str) -> TemplateResult<Self> {
        let name = name.into();
        let mut nodes: Vec<Node> = Vec::new();
        let mut trim_next = false;
        let mut pos = 0;

        while let Some(offset) = source[pos..].find(OPEN) {
            let start = pos + offset;
            push_text(&mut nodes, &source[pos..start], trim_next);

            let inner_start = start + OPEN.len();
            // A comment may contain "}}"; its action only ends after "*/".
            let search_from = match comment_body(&source[inner_start..]) {
                Some(body) => {
                    let body_start = inner_start + body;
                    source[body_start..]
                        .find(COMMENT_END)
                        .map(|i| body_start + i + COMMENT_END.len())
                        .ok_or_else(|| parse_error(&name, source, start, "unclosed comment"))?
                }
                None => inner_start,
            };
            let close = source[search_from..]
                .find(CLOSE)
                .map(|i| search_from + i)
                .ok_or_else(|| parse_error(&name, source, start, "unclosed action"))?;

            let mut inner = &source[inner_start..close];

            if let Some(rest) = strip_trim_marker_left(inner) {
                inner = rest;
                if let Some(Node::Text(text)) = nodes.last_mut() {
                    let trimmed_len = text.trim_end_matches(is_space).len();
                    text.truncate(trimmed_len);
                }
            }

            trim_next = false;
            if let Some(rest) = strip_trim_marker_right(inner) {
                inner = rest;
                trim_next = true;
            }

            let action = inner.trim_matches(is_space);
            if action.starts_with(COMMENT_START)
                && action.ends_with(COMMENT_END)
                && action.len() >= COMMENT_START.len() + COMMENT_END.len()
            {
                // comment
            } else if action.is_empty() {
                return Err(parse_error(&name, source, start, "missing value for command"));
            } else if let Some(caps) = FIELD_PATTERN.captures(action) {
                let path = caps[1].split('.').map(String::from).collect();
                nodes.push(Node::Field { path });
            } else {
                return Err(parse_error(
                    &name,
                    source,
                    start,
                    &format!("unsupported action {:?}", action),
                ));
            }

            pos = close + CLOSE.len();
        }

        push_text(&mut nodes, &source[pos..], trim_next);

        debug!("Parsed template {} into {} nodes", name, nodes.len());
        Ok(Self { name, nodes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted names of every field the template references, in order.
    pub fn fields(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Field { path } => Some(path.join(".")),
                Node::Text(_) => None,
            })
            .collect()
    }

    /// Render against `vars`. Fails on the first field that does not resolve.
    pub fn render(&self, vars: &VariableSet) -> TemplateResult<String> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Field { path } => {
                    let value = vars
                        .lookup(path.as_slice())
                        .ok_or_else(|| TemplateError::MissingVariable(path.join(".")))?;
                    write_value(&mut out, value);
                }
            }
        }
        Ok(out)
    }
}

/// Parse and render in one step.
pub fn render(name: &str, source: &str, vars: &VariableSet) -> TemplateResult<String> {
    Template::parse(name, source)?.render(vars)
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Null => {}
        other => out.push_str(&other.to_string()),
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str, trim_leading: bool) {
    let text = if trim_leading {
        text.trim_start_matches(is_space)
    } else {
        text
    };
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn strip_trim_marker_left(inner: &str) -> Option<&str> {
    let rest = inner.strip_prefix('-')?;
    rest.starts_with(is_space).then_some(rest)
}

/// Offset of the text after `/*` when the action is a comment.
fn comment_body(after_open: &str) -> Option<usize> {
    let rest = strip_trim_marker_left(after_open).unwrap_or(after_open);
    let rest = rest.trim_start_matches(is_space);
    rest.starts_with(COMMENT_START)
        .then(|| after_open.len() - rest.len() + COMMENT_START.len())
}

fn strip_trim_marker_right(inner: &str) -> Option<&str> {
    let rest = inner.strip_suffix('-')?;
    rest.ends_with(is_space).then_some(rest)
}

fn parse_error(name: &str, source: &str, offset: usize, message: &str) -> TemplateError {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map(|nl| before[nl + 1..].chars().count())
        .unwrap_or_else(|| before.chars().count())
        + 1;

    TemplateError::Parse {
        template: name.to_string(),
        line,
        column,
        message: message.to_string(),
    }
}
