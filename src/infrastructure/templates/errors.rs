//! Error types for the template engine

use thiserror::Error;

/// Errors that can occur in template operations
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template not found in any search location
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Template source does not parse
    #[error("Template syntax error{}: {message}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Syntax { message: String, line: Option<usize> },

    /// Template parsed but failed while rendering
    #[error("Render error: {0}")]
    Render(String),

    /// IO error during template operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// Create a new template not found error with path
    pub fn not_found<S: Into<String>>(path: S) -> Self {
        Self::TemplateNotFound(path.into())
    }

    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render(message.into())
    }
}

/// Flatten an error and its sources into one line.
///
/// Tera keeps the useful detail (parser position, missing variable) in the
/// source chain rather than in the top-level message.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_display_with_line() {
        let error = TemplateError::Syntax {
            message: "unexpected token".to_string(),
            line: Some(3),
        };
        assert_eq!(error.to_string(), "Template syntax error at line 3: unexpected token");

        let error = TemplateError::Syntax {
            message: "unexpected token".to_string(),
            line: None,
        };
        assert_eq!(error.to_string(), "Template syntax error: unexpected token");
    }

    #[test]
    fn test_error_chain_includes_tera_source() {
        let mut tera = tera::Tera::default();
        let err = tera
            .add_raw_template("broken", "{{ name ")
            .expect_err("template should not parse");
        let message = error_chain(&err);
        assert!(message.contains("broken"));
        assert!(message.contains("-->"));
    }
}
