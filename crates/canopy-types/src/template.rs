//! Template rendering.
//!
//! Templates are named text bodies with `{{ placeholder }}` slots. Rendering
//! is a pure, synchronous substitution of resolved property values; it is
//! deliberately not an expression language.

use crate::entity::Properties;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors produced while rendering a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A placeholder was not satisfied by the resolved properties
    #[error("template `{template}`: no value for placeholder `{placeholder}`")]
    MissingPlaceholder {
        /// Name of the template being rendered
        template: String,
        /// Placeholder that had no matching property
        placeholder: String,
    },

    /// A `{{` was never closed
    #[error("template `{template}`: unterminated placeholder")]
    UnterminatedPlaceholder {
        /// Name of the template being rendered
        template: String,
    },
}

/// A named text body with placeholder slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Name used in render error messages
    pub name: String,

    /// Raw template body
    content: String,
}

impl Template {
    /// Create a new template
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Raw template body
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Substitute all placeholders with resolved property values.
    ///
    /// String values are inserted verbatim, everything else is inserted as
    /// its JSON encoding.
    pub fn render(&self, properties: &Properties) -> Result<String, RenderError> {
        substitute(&self.content, properties, &self.name)
    }
}

/// Placeholder substitution shared by templates and compound parameters.
pub(crate) fn substitute(
    input: &str,
    properties: &Properties,
    template_name: &str,
) -> Result<String, RenderError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open
            .find("}}")
            .ok_or_else(|| RenderError::UnterminatedPlaceholder {
                template: template_name.to_string(),
            })?;
        let key = after_open[..end].trim();

        let value = properties
            .get(key)
            .ok_or_else(|| RenderError::MissingPlaceholder {
                template: template_name.to_string(),
                placeholder: key.to_string(),
            })?;
        output.push_str(&render_value(value));

        rest = &after_open[end + 2..];
    }
    output.push_str(rest);

    Ok(output)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
