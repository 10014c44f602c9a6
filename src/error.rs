//! Error types for rendering, submission and batch runs.

use thiserror::Error;

/// Errors raised while rendering a job script template.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    /// A token is present in the token map but has no value.
    #[error("Can't perform keyword substitution in script template: uninitialised token {0}")]
    MissingToken(String),

    /// The template references a placeholder the token map doesn't contain.
    #[error("Template placeholder {0} has no entry in the token map")]
    UnboundPlaceholder(String),

    /// The template itself couldn't be compiled.
    #[error("Invalid script template: {0}")]
    Parse(String),

    /// Substitution failed for any other reason.
    #[error("Rendering failed: {0}")]
    Render(String),
}

/// Errors raised by the submission client.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The resource manager rejected the job.
    #[error("{code}: {message}")]
    SubmissionFailed { code: i32, message: String },

    /// More attributes were pushed than the list was sized for.
    #[error("Attribute list overflow: capacity {capacity}")]
    AttributeOverflow { capacity: usize },

    /// The working directory couldn't be resolved.
    #[error("Can't resolve working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),
}

/// Errors that end a single job. The run carries on with the next input.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Writing the temporary job script failed.
    #[error("Can't write job script: {0}")]
    Script(#[from] std::io::Error),
}

/// Errors that abort the whole run before anything is submitted.
#[derive(Error, Debug)]
pub enum RunError {
    /// Bad user input: missing directory, unknown channel, too many stacks for an id.
    #[error("{0}")]
    InvalidArgument(String),

    /// The input directory couldn't be read.
    #[error("Can't read input directory: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SubmitError::SubmissionFailed {
            code: 15007,
            message: "Unauthorized Request".to_string(),
        };
        assert_eq!(err.to_string(), "15007: Unauthorized Request");

        let err = TemplateError::UnboundPlaceholder("STACK_IN".to_string());
        assert_eq!(
            err.to_string(),
            "Template placeholder STACK_IN has no entry in the token map"
        );

        let err: JobError = TemplateError::MissingToken("HEAP".to_string()).into();
        assert!(err.to_string().ends_with("uninitialised token HEAP"));
    }
}
