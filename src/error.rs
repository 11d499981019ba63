use thiserror::Error;

pub type Result<T> = std::result::Result<T, CssValueError>;

#[derive(Debug, Error)]
pub enum CssValueError {
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: u32,
        column: u32,
        message: String,
    },
    #[error("value does not match the expected grammar: {0}")]
    Mismatch(String),
    #[error("stylesheet could not be parsed: {0}")]
    Stylesheet(String),
    #[error("stylesheet could not be printed: {0}")]
    Print(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CssValueError {
    pub(crate) fn mismatch(expected: &str, text: &str) -> Self {
        CssValueError::Mismatch(format!("expected {expected}, found `{}`", text.trim()))
    }
}
