use thiserror::Error;

/// Errors produced while rendering a prompt template.
///
/// These indicate a configuration defect: a malformed template, or a
/// template that references a variable the column mapping never supplies.
/// The same template fails the same way on every row, so callers must not
/// retry them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template references a placeholder with no value in the variable context.
    #[error("template references unknown variable '{{{name}}}'")]
    MissingVariable { name: String },

    /// A `{` or `}` with no matching partner (and not escaped as `{{` / `}}`).
    #[error("unbalanced brace at byte {position} of template")]
    UnbalancedBrace { position: usize },
}

/// Errors produced by the batch pipeline and its components.
#[derive(Error, Debug)]
pub enum Error {
    /// A prompt template could not be rendered. Configuration defect, never retried.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Reading or writing a delimited tabular file failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem I/O failed (dataset read, checkpoint write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration detected before processing starts.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
