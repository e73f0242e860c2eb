//! Text front end: source to [`Expr`].

pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod token;
pub mod token_dumper;

use thiserror::Error;

use crate::lang::expr::Expr;
use lexer::{Lexer, LexerError};
use parser::Parser;
use parser_error::ParserError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("lexer error: {0}")]
    Lex(#[from] LexerError),

    #[error("parse error: {0}")]
    Parse(#[from] ParserError),
}

/// Lexes and parses a whole program.
pub fn parse_source(source: &str) -> Result<Expr, SourceError> {
    let tokens = Lexer::new(source).tokenize_clean()?;
    Ok(Parser::new(tokens).parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_skips_comments_and_newlines() {
        let program = parse_source("// setup\nx = 1; /* inline */ y = x;\n").unwrap();
        assert_eq!(
            program,
            Expr::block(vec![
                Expr::assign("x", Expr::num(1.0)),
                Expr::assign("y", Expr::ident("x")),
            ])
        );
    }

    #[test]
    fn test_parse_source_reports_lexer_errors() {
        assert!(matches!(parse_source("x = 1 @ 2;"), Err(SourceError::Lex(_))));
    }
}
