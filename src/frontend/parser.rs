use crate::frontend::lexer::{Span, Spanned};
use crate::frontend::parser_error::ParserError;
use crate::frontend::token::Token;
use crate::lang::expr::{ArithOp, CmpOp, Expr};

/// Recursive-descent parser for Glint.
///
/// Consumes lexed `Spanned` tokens and produces the whole program as one
/// `Expr::Block`.
///
/// Precedence, loosest first: `||`, `&&`, comparisons (non-associative),
/// `+ -`, `* / %`, unary `-`. Unary minus folds into numeric literals and
/// otherwise becomes `-1 * x`.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token.
    last_span: Option<Span>,
}

impl Parser {
    /// Creates a new parser from lexer output.
    ///
    /// Comments and newlines are filtered out here.
    pub fn new(tokens: Vec<Spanned>) -> Self {
        let tokens: Vec<Spanned> = tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Comment(_) | Token::Newline))
            .collect();
        Parser {
            tokens,
            pos: 0,
            last_span: None,
        }
    }

    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let spanned = self.tokens.get(self.pos)?;
        self.last_span = Some(spanned.span.clone());
        self.pos += 1;
        Some(spanned.token.clone())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    /// Constructs a `ParserError` at the most relevant location: the current
    /// token, else the last consumed one, else 1:1.
    fn error(&self, message: &str) -> ParserError {
        let (line, col) = match (self.current(), &self.last_span) {
            (Some(spanned), _) => (spanned.span.line, spanned.span.col),
            (None, Some(span)) => (span.line, span.col),
            (None, None) => (1, 1),
        };
        ParserError {
            message: message.to_string(),
            line,
            col,
        }
    }

    fn unexpected(&self, expected: &str) -> ParserError {
        match self.peek() {
            Some(Token::Eof) | None => {
                self.error(&format!("expected {}, found end of input", expected))
            }
            Some(token) => self.error(&format!("expected {}, found '{}'", expected, token)),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParserError> {
        if self.at(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", token)))
        }
    }

    /// Parses a complete program. Stops at `Token::Eof`.
    pub fn parse(&mut self) -> Result<Expr, ParserError> {
        let mut statements = Vec::new();

        while let Some(token) = self.peek() {
            if matches!(token, Token::Eof) {
                break;
            }
            if let Some(statement) = self.parse_statement()? {
                statements.push(statement);
            }
        }

        Ok(Expr::Block(statements))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Returns `None` for an empty statement (a stray `;`).
    fn parse_statement(&mut self) -> Result<Option<Expr>, ParserError> {
        let statement = match self.peek() {
            Some(Token::Semicolon) => {
                self.advance();
                return Ok(None);
            }
            Some(Token::If) => self.parse_if()?,
            Some(Token::LBrace) => self.parse_block()?,
            Some(Token::Ident(_)) if self.peek_next() == Some(&Token::Assign) => {
                let name = match self.advance() {
                    Some(Token::Ident(name)) => name,
                    _ => return Err(self.error("expected identifier")),
                };
                self.advance(); // '='
                let value = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                Expr::assign(&name, value)
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                expr
            }
        };

        Ok(Some(statement))
    }

    fn parse_if(&mut self) -> Result<Expr, ParserError> {
        self.advance(); // 'if'
        self.expect(Token::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(Token::RParen)?;

        if !self.at(&Token::LBrace) {
            return Err(self.unexpected("'{' after if condition"));
        }
        let body = self.parse_block()?;

        Ok(Expr::when(condition, body))
    }

    fn parse_block(&mut self) -> Result<Expr, ParserError> {
        self.expect(Token::LBrace)?;

        let mut statements = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(Expr::Block(statements));
                }
                Some(Token::Eof) | None => return Err(self.unexpected("'}'")),
                _ => {
                    if let Some(statement) = self.parse_statement()? {
                        statements.push(statement);
                    }
                }
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_and()?;
        while self.at(&Token::OrOr) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::or(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_comparison()?;
        while self.at(&Token::AndAnd) {
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = Expr::and(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParserError> {
        let lhs = self.parse_sum()?;

        let op = match self.peek() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::NotEq,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::LtEq) => CmpOp::LtEq,
            Some(Token::GtEq) => CmpOp::GtEq,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_sum()?;

        if self.peek().is_some_and(Token::is_comparison) {
            return Err(self.error("comparisons cannot be chained; use && or ||"));
        }

        Ok(Expr::compare(op, lhs, rhs))
    }

    fn parse_sum(&mut self) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_product()?;
            lhs = Expr::arith(op, lhs, rhs);
        }
    }

    fn parse_product(&mut self) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                Some(Token::Percent) => ArithOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::arith(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParserError> {
        if !self.at(&Token::Minus) {
            return self.parse_primary();
        }
        self.advance();

        let operand = self.parse_unary()?;
        Ok(match operand {
            Expr::Literal(n) => Expr::Literal(-n),
            other => Expr::arith(ArithOp::Mul, Expr::num(-1.0), other),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.advance();
                Ok(Expr::Literal(n))
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                if self.at(&Token::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParserError> {
        self.expect(Token::LParen)?;

        let mut args = Vec::new();
        if self.at(&Token::RParen) {
            self.advance();
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr()?);
            match self.peek() {
                Some(Token::Comma) => {
                    self.advance();
                }
                Some(Token::RParen) => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    fn parse(source: &str) -> Expr {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn parse_err(source: &str) -> ParserError {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap_err()
    }

    fn statements(source: &str) -> Vec<Expr> {
        match parse(source) {
            Expr::Block(statements) => statements,
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(parse(""), Expr::Block(vec![]));
        assert_eq!(parse("// nothing\n;;"), Expr::Block(vec![]));
    }

    #[test]
    fn test_assignment() {
        assert_eq!(
            statements("x = 1;"),
            vec![Expr::assign("x", Expr::num(1.0))]
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("x = 1 + 2 * 3 - 4;").to_string(),
            "{ x = ((1 + (2 * 3)) - 4); }"
        );
        assert_eq!(
            parse("x = (1 + 2) % 3;").to_string(),
            "{ x = ((1 + 2) % 3); }"
        );
    }

    #[test]
    fn test_logic_precedence() {
        assert_eq!(
            parse("if (a == 1 || b < 2 && c >= 3) { }").to_string(),
            "{ if (((a == 1) || ((b < 2) && (c >= 3)))) { } }"
        );
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(
            statements("x = -2;"),
            vec![Expr::assign("x", Expr::num(-2.0))]
        );
        assert_eq!(
            statements("x = -y;"),
            vec![Expr::assign(
                "x",
                Expr::arith(ArithOp::Mul, Expr::num(-1.0), Expr::ident("y"))
            )]
        );
        assert_eq!(
            statements("x = --2;"),
            vec![Expr::assign("x", Expr::num(2.0))]
        );
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            statements("v = lerp(0, 10, t);"),
            vec![Expr::assign(
                "v",
                Expr::call(
                    "lerp",
                    vec![Expr::num(0.0), Expr::num(10.0), Expr::ident("t")]
                )
            )]
        );
        assert_eq!(
            statements("f();"),
            vec![Expr::call("f", vec![])]
        );
    }

    #[test]
    fn test_nested_if_and_blocks() {
        let s = statements("if (a) { if (b == 1) { c = 2; } { d = 3; } }");
        assert_eq!(s.len(), 1);
        match &s[0] {
            Expr::Conditional { condition, body } => {
                assert_eq!(**condition, Expr::ident("a"));
                match &**body {
                    Expr::Block(inner) => {
                        assert!(matches!(inner[0], Expr::Conditional { .. }));
                        assert!(matches!(inner[1], Expr::Block(_)));
                    }
                    other => panic!("expected block body, got {:?}", other),
                }
            }
            other => panic!("expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_dotted_field() {
        assert_eq!(
            statements("position.x = position.x + 1;"),
            vec![Expr::assign(
                "position.x",
                Expr::arith(ArithOp::Add, Expr::ident("position.x"), Expr::num(1.0))
            )]
        );
    }

    #[test]
    fn test_expression_statement() {
        assert_eq!(
            statements("sin(1);"),
            vec![Expr::call("sin", vec![Expr::num(1.0)])]
        );
    }

    #[test]
    fn test_missing_semicolon() {
        let e = parse_err("x = 1\ny = 2;");
        assert_eq!((e.line, e.col), (2, 1));
        assert!(e.message.contains("expected ';'"), "{}", e.message);
    }

    #[test]
    fn test_missing_close_brace_at_eof() {
        let e = parse_err("if (a) {\n  x = 1;\n");
        assert!(e.message.contains("'}'"), "{}", e.message);
        assert!(e.message.contains("end of input"), "{}", e.message);
        assert!(e.line >= 2);
    }

    #[test]
    fn test_if_requires_braces() {
        let e = parse_err("if (a) x = 1;");
        assert!(e.message.contains("'{'"), "{}", e.message);
    }

    #[test]
    fn test_chained_comparison_rejected() {
        let e = parse_err("x = 1 < 2 < 3;");
        assert!(e.message.contains("chained"));
    }

    #[test]
    fn test_bad_argument_list() {
        let e = parse_err("x = clamp(1 2);");
        assert_eq!(e.to_string(), "1:13: expected ',' or ')', found '2'");
    }

    #[test]
    fn test_error_column_is_not_zero() {
        let e = parse_err(")");
        assert_eq!((e.line, e.col), (1, 1));
    }
}
