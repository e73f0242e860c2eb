/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

/// Comparison operator of a `Comparison` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::LtEq => "<=",
            CmpOp::GtEq => ">=",
        }
    }

    /// The operator testing the opposite outcome.
    pub fn negated(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::NotEq,
            CmpOp::NotEq => CmpOp::Eq,
            CmpOp::Lt => CmpOp::GtEq,
            CmpOp::Gt => CmpOp::LtEq,
            CmpOp::LtEq => CmpOp::Gt,
            CmpOp::GtEq => CmpOp::Lt,
        }
    }

    /// Evaluates the comparison on two scalars.
    pub fn holds(self, lhs: f32, rhs: f32) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::NotEq => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::LtEq => lhs <= rhs,
            CmpOp::GtEq => lhs >= rhs,
        }
    }
}

/// Expression node of a Glint program.
///
/// The set of variants is closed: the compiler matches on it exhaustively,
/// so adding a variant is a compile error until code generation handles it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // ───────────────────────────── Structure ─────────────────────────────
    /// Sequence of statements.
    ///
    /// Stack effect: `( -- )`
    Block(Vec<Expr>),

    /// `if (condition) { body }`. There is no else branch.
    ///
    /// Stack effect: `( -- )`
    Conditional {
        condition: Box<Expr>,
        body: Box<Expr>,
    },

    // ───────────────────────────── Values ────────────────────────────────
    /// Numeric literal.
    ///
    /// Stack effect: `( -- x )`
    Literal(f32),

    /// Read of a named field.
    ///
    /// Stack effect: `( -- x )`
    Ident(String),

    /// `name = value`. Declares the field on first write.
    ///
    /// Stack effect: `( -- )`
    Assign { name: String, value: Box<Expr> },

    /// `lhs op rhs`.
    ///
    /// Stack effect: `( -- x )`
    Arithmetic {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Intrinsic call such as `sin(x)` or `lerp(a, b, t)`.
    ///
    /// Stack effect: `( -- x )`
    Call { name: String, args: Vec<Expr> },

    // ───────────────────────────── Boolean ───────────────────────────────
    /// `lhs op rhs` for the six comparison operators.
    Comparison {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Short-circuit `lhs || rhs`.
    Or(Box<Expr>, Box<Expr>),

    /// Short-circuit `lhs && rhs`.
    And(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn num(value: f32) -> Expr {
        Expr::Literal(value)
    }

    pub fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    pub fn block(statements: Vec<Expr>) -> Expr {
        Expr::Block(statements)
    }

    pub fn assign(name: &str, value: Expr) -> Expr {
        Expr::Assign {
            name: name.to_string(),
            value: Box::new(value),
        }
    }

    pub fn arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Arithmetic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            name: name.to_string(),
            args,
        }
    }

    pub fn compare(op: CmpOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Comparison {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn when(condition: Expr, body: Expr) -> Expr {
        Expr::Conditional {
            condition: Box::new(condition),
            body: Box::new(body),
        }
    }
}

impl std::fmt::Display for Expr {
    /// Format the tree back into Glint surface syntax.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Block(statements) => {
                write!(f, "{{ ")?;
                for statement in statements {
                    write!(f, "{}", statement)?;
                    if !matches!(statement, Expr::Block(_) | Expr::Conditional { .. }) {
                        write!(f, ";")?;
                    }
                    write!(f, " ")?;
                }
                write!(f, "}}")
            }
            Expr::Conditional { condition, body } => write!(f, "if ({}) {}", condition, body),
            Expr::Literal(n) => write!(f, "{}", n),
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Assign { name, value } => write!(f, "{} = {}", name, value),
            Expr::Arithmetic { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Comparison { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Or(lhs, rhs) => write!(f, "({} || {})", lhs, rhs),
            Expr::And(lhs, rhs) => write!(f, "({} && {})", lhs, rhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmp_holds() {
        assert!(CmpOp::Lt.holds(1.0, 2.0));
        assert!(!CmpOp::Gt.holds(1.0, 2.0));
        assert!(CmpOp::LtEq.holds(2.0, 2.0));
        assert!(CmpOp::GtEq.holds(2.0, 2.0));
        assert!(CmpOp::NotEq.holds(2.0, 3.0));
        assert!(!CmpOp::Eq.holds(f32::NAN, f32::NAN));
    }

    #[test]
    fn test_display_round_trips_shape() {
        let program = Expr::block(vec![
            Expr::assign("x", Expr::arith(ArithOp::Add, Expr::num(1.0), Expr::num(2.0))),
            Expr::when(
                Expr::and(
                    Expr::compare(CmpOp::Eq, Expr::ident("x"), Expr::num(3.0)),
                    Expr::compare(CmpOp::Lt, Expr::ident("y"), Expr::num(1.0)),
                ),
                Expr::block(vec![Expr::assign("y", Expr::num(2.0))]),
            ),
        ]);

        assert_eq!(
            program.to_string(),
            "{ x = (1 + 2); if (((x == 3) && (y < 1))) { y = 2; } }"
        );
    }
}
