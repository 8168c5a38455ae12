use crate::span::Pos;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed pattern arm, unbalanced parentheses, or an otherwise
    /// unparseable construct. Fatal for the current `match`.
    #[error("parse error at {pos}: {message}")]
    Parse { pos: Pos, message: String },

    /// Every inference strategy was exhausted for a constructor call.
    /// Never downgraded to an untyped container.
    #[error("cannot infer type for `{expr}` at {pos}; add an explicit type annotation")]
    TypeInference { pos: Pos, expr: String },

    /// A sum type matched without a wildcard is missing variants.
    #[error("non-exhaustive match at {pos}: missing variants {}", .missing.join(", "))]
    Exhaustiveness { pos: Pos, missing: Vec<String> },

    /// Generated text failed to re-parse after import insertion.
    #[error("import injection produced invalid code: {0}")]
    ImportInjection(String),

    #[error("{0}")]
    Generic(String),
}

impl Error {
    pub fn parse(pos: Pos, message: impl Into<String>) -> Error {
        Error::Parse {
            pos,
            message: message.into(),
        }
    }

    pub fn generic(message: impl Into<String>) -> Error {
        Error::Generic(message.into())
    }
}

pub type Result<T> = result::Result<T, Error>;

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

// Convert from std::io::Error to our Error type
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Generic(e.to_string())
    }
}
impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exhaustiveness_lists_missing_variants() {
        let err = Error::Exhaustiveness {
            pos: Pos::new(4, 5),
            missing: vec!["Err(_)".to_string(), "Ok(_)".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "non-exhaustive match at 4:5: missing variants Err(_), Ok(_)"
        );
    }

    #[test]
    fn inference_error_suggests_annotation() {
        let err = Error::TypeInference {
            pos: Pos::new(2, 9),
            expr: "Ok(42)".to_string(),
        };
        assert!(err.to_string().contains("explicit type annotation"));
    }
}
