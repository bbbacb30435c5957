//! Prompt template rendering.
//!
//! Templates are plain strings with `{name}` placeholders. Use `{{` to insert
//! a literal `{` and `}}` to insert a literal `}`. Rendering is a pure
//! function of the template and the variable context; a placeholder with no
//! matching variable is an error, not a silent pass-through, because it means
//! the column mapping and the templates disagree.

use std::collections::HashMap;

use crate::error::TemplateError;

/// Substitute every `{name}` placeholder in `template` with `variables[name]`.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use promptsheet::prompt::render;
///
/// let mut vars = HashMap::new();
/// vars.insert("name".to_string(), "Alice".to_string());
/// let result = render("Hello {name}, schema: {{\"key\": 1}}", &vars).unwrap();
/// assert_eq!(result, r#"Hello Alice, schema: {"key": 1}"#);
/// ```
///
/// # Errors
///
/// [`TemplateError::MissingVariable`] when a placeholder names a variable
/// absent from `variables`; [`TemplateError::UnbalancedBrace`] when a brace
/// has no partner and is not escaped.
pub fn render(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(TemplateError::UnbalancedBrace { position }),
                        _ => name.push(inner),
                    }
                }
                if !closed {
                    return Err(TemplateError::UnbalancedBrace { position });
                }
                match variables.get(&name) {
                    Some(value) => out.push_str(value),
                    None => return Err(TemplateError::MissingVariable { name }),
                }
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(TemplateError::UnbalancedBrace { position });
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// The system and user prompt templates for a run.
///
/// Both templates draw placeholders from the same per-row variable context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    /// System prompt template.
    pub system: String,
    /// User prompt template.
    pub user: String,
}

impl PromptPair {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Render both templates against the same variable context.
    pub fn render(
        &self,
        variables: &HashMap<String, String>,
    ) -> Result<RenderedPrompts, TemplateError> {
        Ok(RenderedPrompts {
            system: render(&self.system, variables)?,
            user: render(&self.user, variables)?,
        })
    }
}

/// A [`PromptPair`] rendered for one row.
#[derive(Debug, Clone)]
pub struct RenderedPrompts {
    pub system: String,
    pub user: String,
}
