use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints source text instead of Debug
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        for s in tokens {
            println!("{}", self.line(s));
        }
    }

    fn line(&self, s: &Spanned) -> String {
        let kind = kind(&s.token);
        let colr = if self.color { color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let text = if self.show_debug_repr {
            format!("{:?}", s.token)
        } else {
            match &s.token {
                Token::Comment(c) => format!("COMMENT: {}", c),
                Token::Newline => "NEWLINE".to_string(),
                other => other.to_string(),
            }
        };

        format!(
            "[{:02}:{:02}] {}{:<8} {}{}",
            s.span.line, s.span.col, colr, kind, text, reset
        )
    }
}

fn kind(t: &Token) -> &'static str {
    use Token::*;
    match t {
        Newline => "NEWLINE",
        Comment(_) => "COMMENT",
        Eof => "EOF",
        Number(_) => "NUMBER",
        Ident(_) => "IDENT",
        If => "KEYWORD",
        LParen | RParen | LBrace | RBrace | Comma | Semicolon => "PUNCT",
        Plus | Minus | Star | Slash | Percent | Assign => "OP",
        Eq | NotEq | Lt | LtEq | Gt | GtEq => "CMP",
        AndAnd | OrOr => "LOGIC",
    }
}

fn color(t: &Token) -> &'static str {
    use Token::*;
    match t {
        Newline | Comment(_) | Eof => TokenDumper::DIM,
        Number(_) => TokenDumper::CYN,
        Ident(_) => TokenDumper::YEL,
        If => TokenDumper::BLU,
        Plus | Minus | Star | Slash | Percent | Assign => TokenDumper::MAG,
        Eq | NotEq | Lt | LtEq | Gt | GtEq | AndAnd | OrOr => TokenDumper::MAG,
        _ => TokenDumper::RESET,
    }
}
