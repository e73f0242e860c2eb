use thiserror::Error;

/// Reasons the code generator refuses a tree.
///
/// Unknown identifiers and unknown call names are not errors: they compile
/// to the constant `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A recognised intrinsic called with the wrong number of arguments.
    #[error("compile error: '{name}' takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
}

impl CompileError {
    pub fn arity(name: &str, expected: usize, found: usize) -> Self {
        CompileError::Arity {
            name: name.to_string(),
            expected,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message() {
        let e = CompileError::arity("lerp", 3, 2);
        assert_eq!(
            e.to_string(),
            "compile error: 'lerp' takes 3 argument(s), got 2"
        );
    }
}
