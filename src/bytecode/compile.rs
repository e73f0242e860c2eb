use tracing::{debug, warn};

use crate::{
    bytecode::{Function, Label, Opcode, compile_error::CompileError},
    lang::expr::{ArithOp, CmpOp, Expr},
};

/// Translates one expression tree into one [`Function`].
///
/// Fields are resolved by exact name against the function's locals table.
/// Writes declare new slots; reads of unknown names compile to `0.0`.
///
/// Conditions are compiled as jumping code in two passes. The emission
/// pass writes every comparison as a conditional jump with a placeholder
/// target and returns a [`JumpPlan`] recording where those jumps sit. Once
/// the body of the conditional has been emitted and its start and end are
/// known, the resolution pass walks the plan with a [`JumpContext`] and
/// patches each placeholder.
pub struct Compiler {
    function: Function,

    /// Jumps emitted with a placeholder target and not patched yet.
    unresolved: usize,
}

/// Whether a comparison sits under an AND or an OR.
///
/// Under AND a comparison jumps away when it fails and falls through when
/// it holds; under OR it jumps away when it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Conjunctive,
    Disjunctive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Logic {
    And,
    Or,
}

impl Logic {
    fn polarity(self) -> Polarity {
        match self {
            Logic::And => Polarity::Conjunctive,
            Logic::Or => Polarity::Disjunctive,
        }
    }
}

/// Placeholder jumps emitted for one boolean sub-tree, shaped like the tree.
#[derive(Debug)]
enum JumpPlan {
    /// A single comparison-jump.
    Test { jump: Label, polarity: Polarity },

    /// An AND/OR node: both operands, the label where the right operand's
    /// code starts, and the unconditional jump emitted after both.
    Branch {
        logic: Logic,
        left: Box<JumpPlan>,
        right_start: Label,
        right: Box<JumpPlan>,
        exit: Label,
    },
}

/// Continuations threaded top-down through the resolution pass.
#[derive(Debug, Clone, Copy)]
struct JumpContext {
    on_true: Label,
    on_false: Label,
    polarity: Polarity,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_function(Function::new())
    }

    /// Compiles into an existing function, keeping its locals.
    ///
    /// Used to pre-seed field values before compilation.
    pub fn with_function(function: Function) -> Self {
        Self {
            function,
            unresolved: 0,
        }
    }

    /// Compiles `root` as a statement and terminates the code with `return`.
    pub fn compile(mut self, root: &Expr) -> Result<Function, CompileError> {
        self.compile_statement(root)?;
        self.function.ret();

        debug_assert_eq!(self.unresolved, 0, "placeholder jumps left unpatched");
        debug!(
            size = self.function.size(),
            locals = self.function.locals_len(),
            "compiled function"
        );

        Ok(self.function)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn compile_statement(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Block(statements) => {
                for statement in statements {
                    self.compile_statement(statement)?;
                }
            }

            Expr::Conditional { condition, body } => {
                self.compile_conditional(condition, body)?;
            }

            Expr::Assign { name, value } => {
                self.compile_value(value)?;
                let local = self.function.declare_or_find_local(name);
                self.function.store_field(local);
            }

            // Everything else produces a value nobody reads
            _ => {
                self.compile_value(expr)?;
                self.function.emit(Opcode::Discard);
            }
        }

        Ok(())
    }

    /// ```text
    ///   <condition jumping code>      ; true -> body, false -> end
    /// body:
    ///   <body>
    ///   JMP end
    /// end:
    /// ```
    fn compile_conditional(&mut self, condition: &Expr, body: &Expr) -> Result<(), CompileError> {
        let pending = self.unresolved;

        let plan = self.emit_condition(condition, Polarity::Conjunctive)?;

        let body_start = self.function.current_label();
        self.compile_statement(body)?;

        let skip = self.placeholder_jump(Opcode::Jump);
        let end = self.function.current_label();
        self.patch(skip, end);

        self.resolve(
            plan,
            JumpContext {
                on_true: body_start,
                on_false: end,
                polarity: Polarity::Conjunctive,
            },
        );

        debug_assert_eq!(
            self.unresolved, pending,
            "conditional left jumps unresolved"
        );
        debug!(body_start, end, "compiled conditional");

        Ok(())
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Emits code leaving exactly one value on the stack.
    fn compile_value(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Literal(value) => {
                self.function.push(*value);
            }

            Expr::Ident(name) => match self.function.find_local(name) {
                Some(local) => {
                    self.function.load_field(local);
                }
                None => {
                    warn!(name = name.as_str(), "read of undeclared field, using 0");
                    self.function.push(0.0);
                }
            },

            Expr::Arithmetic { op, lhs, rhs } => {
                self.compile_value(lhs)?;
                self.compile_value(rhs)?;
                self.function.emit(arith_opcode(*op));
            }

            Expr::Call { name, args } => self.compile_call(name, args)?,

            Expr::Comparison { .. } | Expr::Or(..) | Expr::And(..) => {
                self.compile_boolean_value(expr)?;
            }

            Expr::Assign { name, .. } => {
                self.compile_statement(expr)?;
                let local = self.function.declare_or_find_local(name);
                self.function.load_field(local);
            }

            Expr::Block(_) | Expr::Conditional { .. } => {
                self.compile_statement(expr)?;
                self.function.push(0.0);
            }
        }

        Ok(())
    }

    fn compile_call(&mut self, name: &str, args: &[Expr]) -> Result<(), CompileError> {
        let Some((opcode, arity)) = intrinsic(name) else {
            warn!(name, "unknown function, using 0");
            self.function.push(0.0);
            return Ok(());
        };

        if args.len() != arity {
            return Err(CompileError::arity(name, arity, args.len()));
        }

        for arg in args {
            self.compile_value(arg)?;
        }
        self.function.emit(opcode);

        Ok(())
    }

    /// Turns a boolean tree into `1.0` or `0.0` on the stack.
    ///
    /// ```text
    ///   <jumping code>    ; true -> t, false -> f
    /// t: PUSH 1
    ///   JMP end
    /// f: PUSH 0
    /// end:
    /// ```
    fn compile_boolean_value(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let plan = self.emit_condition(expr, Polarity::Conjunctive)?;

        let on_true = self.function.push(1.0);
        let skip = self.placeholder_jump(Opcode::Jump);
        let on_false = self.function.push(0.0);
        let end = self.function.current_label();
        self.patch(skip, end);

        self.resolve(
            plan,
            JumpContext {
                on_true,
                on_false,
                polarity: Polarity::Conjunctive,
            },
        );

        Ok(())
    }

    // =========================================================================
    // Jumping code: emission pass
    // =========================================================================

    fn emit_condition(&mut self, expr: &Expr, polarity: Polarity) -> Result<JumpPlan, CompileError> {
        match expr {
            Expr::Comparison { op, lhs, rhs } => self.emit_test(*op, lhs, rhs, polarity),
            Expr::Or(lhs, rhs) => self.emit_branch(Logic::Or, lhs, rhs),
            Expr::And(lhs, rhs) => self.emit_branch(Logic::And, lhs, rhs),

            // Plain values are tested against zero
            value => self.emit_test(CmpOp::NotEq, value, &Expr::Literal(0.0), polarity),
        }
    }

    fn emit_test(
        &mut self,
        op: CmpOp,
        lhs: &Expr,
        rhs: &Expr,
        polarity: Polarity,
    ) -> Result<JumpPlan, CompileError> {
        self.compile_value(lhs)?;
        self.compile_value(rhs)?;

        let jump_when = polarity == Polarity::Disjunctive;
        let jump = self.placeholder_jump(branch_opcode(op, jump_when));

        Ok(JumpPlan::Test { jump, polarity })
    }

    fn emit_branch(&mut self, logic: Logic, lhs: &Expr, rhs: &Expr) -> Result<JumpPlan, CompileError> {
        let polarity = logic.polarity();

        let left = self.emit_condition(lhs, polarity)?;
        let right_start = self.function.current_label();
        let right = self.emit_condition(rhs, polarity)?;
        let exit = self.placeholder_jump(Opcode::Jump);

        Ok(JumpPlan::Branch {
            logic,
            left: Box::new(left),
            right_start,
            right: Box::new(right),
            exit,
        })
    }

    // =========================================================================
    // Jumping code: resolution pass
    // =========================================================================

    fn resolve(&mut self, plan: JumpPlan, ctx: JumpContext) {
        match plan {
            JumpPlan::Test { jump, polarity } => {
                debug_assert_eq!(polarity, ctx.polarity);
                let target = match ctx.polarity {
                    Polarity::Conjunctive => ctx.on_false,
                    Polarity::Disjunctive => ctx.on_true,
                };
                self.patch(jump, target);
            }

            JumpPlan::Branch {
                logic: Logic::Or,
                left,
                right_start,
                right,
                exit,
            } => {
                // left true: whole OR is true; left false: try the right side
                self.resolve(
                    *left,
                    JumpContext {
                        on_true: ctx.on_true,
                        on_false: right_start,
                        polarity: Polarity::Disjunctive,
                    },
                );
                self.resolve(
                    *right,
                    JumpContext {
                        polarity: Polarity::Disjunctive,
                        ..ctx
                    },
                );
                // falling out of the right side means nothing held
                self.patch(exit, ctx.on_false);
            }

            JumpPlan::Branch {
                logic: Logic::And,
                left,
                right_start,
                right,
                exit,
            } => {
                self.resolve(
                    *left,
                    JumpContext {
                        on_true: right_start,
                        on_false: ctx.on_false,
                        polarity: Polarity::Conjunctive,
                    },
                );
                self.resolve(
                    *right,
                    JumpContext {
                        polarity: Polarity::Conjunctive,
                        ..ctx
                    },
                );
                self.patch(exit, ctx.on_true);
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn placeholder_jump(&mut self, opcode: Opcode) -> Label {
        self.unresolved += 1;
        self.function.jump(opcode, 0)
    }

    fn patch(&mut self, jump: Label, target: Label) {
        debug_assert!(self.unresolved > 0);
        self.unresolved -= 1;
        self.function.patch_jump_target(jump, target);
    }
}

/// Compiles `root` into a fresh function.
pub fn compile(root: &Expr) -> Result<Function, CompileError> {
    Compiler::new().compile(root)
}

fn arith_opcode(op: ArithOp) -> Opcode {
    match op {
        ArithOp::Add => Opcode::Add,
        ArithOp::Sub => Opcode::Sub,
        ArithOp::Mul => Opcode::Mul,
        ArithOp::Div => Opcode::Div,
        ArithOp::Mod => Opcode::Mod,
    }
}

/// The comparison-jump that branches when `lhs op rhs` evaluates to `when`.
///
/// Equality jumps are symmetric. The ordering jumps test the top of the
/// stack against the value beneath it, and `rhs` is the top, so source `<`
/// is encoded as `JGT` and so on.
fn branch_opcode(op: CmpOp, when: bool) -> Opcode {
    let op = if when { op } else { op.negated() };
    match op {
        CmpOp::Eq => Opcode::Eq,
        CmpOp::NotEq => Opcode::Neq,
        CmpOp::Lt => Opcode::Gt,
        CmpOp::Gt => Opcode::Lt,
        CmpOp::LtEq => Opcode::Egt,
        CmpOp::GtEq => Opcode::Elt,
    }
}

/// Intrinsic functions: opcode and fixed arity.
pub fn intrinsic(name: &str) -> Option<(Opcode, usize)> {
    let entry = match name {
        "sin" => (Opcode::Sin, 1),
        "cos" => (Opcode::Cos, 1),
        "tan" => (Opcode::Tan, 1),
        "sinh" => (Opcode::Sinh, 1),
        "cosh" => (Opcode::Cosh, 1),
        "tanh" => (Opcode::Tanh, 1),
        "asin" => (Opcode::Asin, 1),
        "acos" => (Opcode::Acos, 1),
        "atan" => (Opcode::Atan, 1),
        "sqrt" => (Opcode::Sqrt, 1),
        "abs" => (Opcode::Abs, 1),
        "sign" => (Opcode::Sign, 1),
        "radians" => (Opcode::Radians, 1),
        "degrees" => (Opcode::Degrees, 1),
        "ceil" => (Opcode::Ceil, 1),
        "floor" => (Opcode::Floor, 1),
        "round" => (Opcode::Round, 1),
        "lerp" => (Opcode::Lerp, 3),
        "clamp" => (Opcode::Clamp, 3),
        "smoothstep" => (Opcode::Smoothstep, 3),
        "rand" => (Opcode::Rand, 2),
        _ => return None,
    };
    Some(entry)
}
