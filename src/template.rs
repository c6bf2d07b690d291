//! HTML fragment loading and placeholder substitution.
//!
//! Templates are plain HTML files carrying `{{token}}` placeholders. They are
//! read fresh from disk for every page composition; nothing is cached. The
//! substitution contract is strict in both directions: every key handed to
//! [`populate`] must occur in the template, and no `{{...}}` token may
//! survive substitution. Either violation means the template and the
//! composer have drifted apart, which must stop the run.

use std::{fs, path::Path};

use anyhow::Context;
use thiserror::Error;

/// Errors raised during template substitution.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A substitution key does not occur in the template text.
    #[error("Key {0} not found in template")]
    KeyNotFound(String),
    /// `{{...}}` tokens survived after all substitutions were applied.
    #[error("Unmatched variables found in template: {0:?}")]
    UnmatchedVariables(Vec<String>),
}

/// Reads a template file from the templates directory.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_template(templates_dir: &Path, name: &str) -> anyhow::Result<String> {
    let path = templates_dir.join(name);
    fs::read_to_string(&path).with_context(|| format!("Failed to read template {}", path.display()))
}

/// Substitutes placeholder keys in a template.
///
/// Each key must occur in the (progressively substituted) template text. A
/// `None` value is rendered as the literal text `Undefined`. After all
/// substitutions the result must contain no `{{...}}` tokens.
///
/// # Errors
///
/// Returns [`TemplateError::KeyNotFound`] for a key absent from the template
/// and [`TemplateError::UnmatchedVariables`] listing any leftover tokens.
pub fn populate(template: &str, values: &[(&str, Option<&str>)]) -> Result<String, TemplateError> {
    let mut result = template.to_string();
    for (key, value) in values {
        if !result.contains(key) {
            return Err(TemplateError::KeyNotFound((*key).to_string()));
        }
        result = result.replace(key, value.unwrap_or("Undefined"));
    }

    let unmatched = find_unmatched_tokens(&result);
    if !unmatched.is_empty() {
        return Err(TemplateError::UnmatchedVariables(unmatched));
    }

    Ok(result)
}

/// Finds all `{{...}}` tokens left in a text, shortest match first.
fn find_unmatched_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start + 2..].find("}}") else {
            break;
        };
        let token_end = start + 2 + end + 2;
        tokens.push(rest[start..token_end].to_string());
        rest = &rest[token_end..];
    }
    tokens
}
