use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors produced while reading scene text. Every variant carries the 1-based source line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: unexpected character `{ch}`")]
    UnexpectedChar { line: usize, ch: char },

    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },

    #[error("line {line}: invalid number `{text}`")]
    InvalidNumber { line: usize, text: String },

    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("line {line}: unknown variable `@{name}`")]
    UnknownVariable { line: usize, name: String },

    #[error("line {line}: block `[{open}]` closed by `[/{close}]`")]
    MismatchedClose {
        line: usize,
        open: String,
        close: String,
    },

    #[error("line {line}: unknown record field `{field}`")]
    UnknownRecordField { line: usize, field: String },

    #[error("line {line}: duplicate field `{field}`")]
    DuplicateField { line: usize, field: String },

    #[error("line {line}: invalid value for `{field}`: {reason}")]
    InvalidValue {
        line: usize,
        field: String,
        reason: String,
    },
}
