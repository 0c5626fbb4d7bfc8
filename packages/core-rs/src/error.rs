use thiserror::Error;

/// Canonical error codes emitted by the core. The codes are stable so that
/// host adapters can map them onto their own error conventions.
pub mod codes {
    /// Shapes, ranks, or inner dimensions do not line up.
    pub const SHAPE_MISMATCH: &str = "E_SHAPE_MISMATCH";
    /// A reduction was asked for over zero elements.
    pub const EMPTY_INPUT: &str = "E_EMPTY_INPUT";
    /// A scalar parameter (fold count, condition number, length) is out of range.
    pub const INVALID_ARGUMENT: &str = "E_INVALID_ARGUMENT";
    /// Numeric invariants were broken (intermediate overflow).
    pub const NUMERIC_ISSUE: &str = "E_NUMERIC_ISSUE";
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AccuError {
    #[error("{op}: {detail}")]
    ShapeMismatch { op: &'static str, detail: String },
    #[error("{op}: expected at least one element along the reduction axis")]
    EmptyInput { op: &'static str },
    #[error("{op}: {detail}")]
    InvalidArgument { op: &'static str, detail: String },
    #[error("{op}: {detail}")]
    NumericIssue { op: &'static str, detail: String },
}

impl AccuError {
    pub fn code(&self) -> &'static str {
        match self {
            AccuError::ShapeMismatch { .. } => codes::SHAPE_MISMATCH,
            AccuError::EmptyInput { .. } => codes::EMPTY_INPUT,
            AccuError::InvalidArgument { .. } => codes::INVALID_ARGUMENT,
            AccuError::NumericIssue { .. } => codes::NUMERIC_ISSUE,
        }
    }

    /// Message prefixed with the error code. Foreign-language bindings can
    /// show it directly or split on the first colon to recover the code.
    pub fn coded_message(&self) -> String {
        format(self.code(), self.to_string())
    }
}

/// Helper that formats a code/message pair into a single string.
pub fn format(code: &str, message: impl AsRef<str>) -> String {
    format!("{code}: {}", message.as_ref())
}

/// Convenience constructor for shape mismatch style errors.
pub fn shape_mismatch(op: &'static str, detail: impl Into<String>) -> AccuError {
    AccuError::ShapeMismatch {
        op,
        detail: detail.into(),
    }
}

pub fn empty_input(op: &'static str) -> AccuError {
    AccuError::EmptyInput { op }
}

pub fn invalid_argument(op: &'static str, detail: impl Into<String>) -> AccuError {
    AccuError::InvalidArgument {
        op,
        detail: detail.into(),
    }
}

/// Convenience constructor for numeric issues such as intermediate overflow.
pub fn numeric_issue(op: &'static str, detail: impl Into<String>) -> AccuError {
    AccuError::NumericIssue {
        op,
        detail: detail.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coded_message_splits_on_first_colon() {
        let err = shape_mismatch("dot_kfold", "inner dimensions do not match (3 vs 4)");
        let message = err.coded_message();
        let (code, rest) = message.split_once(':').unwrap();
        assert_eq!(code, codes::SHAPE_MISMATCH);
        assert_eq!(rest.trim(), "dot_kfold: inner dimensions do not match (3 vs 4)");
    }

    #[test]
    fn every_variant_has_a_distinct_code() {
        let errs = [
            shape_mismatch("a", "b"),
            empty_input("a"),
            invalid_argument("a", "b"),
            numeric_issue("a", "b"),
        ];
        let mut seen: Vec<&str> = errs.iter().map(AccuError::code).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), errs.len());
    }
}
