use tracing::{debug, trace};

use crate::bytecode::{
    Function, Label, Opcode, Operand,
    op::decode_at,
    verify::{VerifyError, verify},
};
use crate::runtime::rng::Lcg;

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Seed of the generator behind `rand`.
    pub seed: u64,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig { seed: 0x5eed }
    }
}

/// Stack machine executing one [`Function`] at a time.
///
/// The VM trusts its input. Bad opcodes, truncated operands, out-of-range
/// field indices and stack underflow all panic; code from the compiler
/// never triggers them, and code from anywhere else should go through
/// [`Vm::run_checked`].
pub struct Vm {
    stack: Vec<f32>,
    rng: Lcg,

    // Offset of the instruction being executed, for panic messages
    at: Label,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Vec::new(),
            rng: Lcg::new(config.seed),
            at: 0,
        }
    }

    /// Operand stack left over by the last run.
    pub fn stack(&self) -> &[f32] {
        &self.stack
    }

    /// Verifies `function` and runs it.
    pub fn run_checked(&mut self, function: &mut Function) -> Result<(), VerifyError> {
        verify(function)?;
        self.run(function);
        Ok(())
    }

    /// Executes from offset 0 until `return`.
    ///
    /// The operand stack starts empty. Results are left in the function's
    /// locals.
    pub fn run(&mut self, function: &mut Function) {
        self.stack.clear();
        let (code, locals) = function.code_and_locals_mut();

        debug!(size = code.len(), locals = locals.len(), "run start");

        let mut ip: usize = 0;
        loop {
            if ip >= code.len() {
                panic!("execution ran off the end of the code at {}", ip);
            }
            self.at = ip as Label;

            let (opcode, operand) = match decode_at(code, ip) {
                Ok(decoded) => decoded,
                Err(e) => panic!("malformed bytecode: {}", e),
            };
            // advance before any jump overrides the pointer
            ip += opcode.encoded_len();

            match opcode {
                Opcode::Return => {
                    trace!(at = self.at, op = "RET", depth = self.stack.len());
                    break;
                }

                // =============================================================
                // Stack and fields
                // =============================================================
                Opcode::Push => {
                    let value = self.float_operand(operand);
                    self.push(value);
                }
                Opcode::Discard => {
                    self.pop();
                }
                Opcode::LoadField => {
                    let index = self.offset_operand(operand);
                    let value = match locals.get(index) {
                        Some(value) => *value,
                        None => panic!("field {} out of range at {}", index, self.at),
                    };
                    self.push(value);
                }
                Opcode::StoreField => {
                    let index = self.offset_operand(operand);
                    let value = self.pop();
                    match locals.get_mut(index) {
                        Some(slot) => *slot = value,
                        None => panic!("field {} out of range at {}", index, self.at),
                    }
                }

                // =============================================================
                // Arithmetic
                // =============================================================
                Opcode::Add => {
                    let (a, b) = self.pop_pair();
                    self.push(a + b);
                }
                Opcode::Mul => {
                    let (a, b) = self.pop_pair();
                    self.push(a * b);
                }
                Opcode::Sub => {
                    let (a, b) = self.pop_swapped();
                    self.push(a - b);
                }
                Opcode::Div => {
                    let (a, b) = self.pop_pair();
                    self.push(a / b);
                }
                Opcode::Mod => {
                    let (a, b) = self.pop_pair();
                    self.push(a % b);
                }

                // =============================================================
                // Jumps
                // =============================================================
                Opcode::Jump => {
                    ip = self.offset_operand(operand);
                }
                Opcode::Eq | Opcode::Neq => {
                    let target = self.offset_operand(operand);
                    let (a, b) = self.pop_pair();
                    if (a == b) == (opcode == Opcode::Eq) {
                        ip = target;
                    }
                }
                Opcode::Lt | Opcode::Gt | Opcode::Elt | Opcode::Egt => {
                    let target = self.offset_operand(operand);
                    let (a, b) = self.pop_swapped();
                    let holds = match opcode {
                        Opcode::Lt => a < b,
                        Opcode::Gt => a > b,
                        Opcode::Elt => a <= b,
                        _ => a >= b,
                    };
                    if holds {
                        ip = target;
                    }
                }

                // =============================================================
                // Math
                // =============================================================
                Opcode::Clamp => {
                    let (a, b, c) = self.pop_triple();
                    self.push(clamp(a, b, c));
                }
                Opcode::Lerp => {
                    let (a, b, c) = self.pop_triple();
                    let t = clamp(0.0, 1.0, c);
                    self.push(a + (b - a) * t);
                }
                Opcode::Smoothstep => {
                    let (a, b, c) = self.pop_triple();
                    let t = clamp(0.0, 1.0, (c - a) / (b - a));
                    self.push(t * t * (3.0 - 2.0 * t));
                }
                Opcode::Rand => {
                    let (lo, hi) = self.pop_pair();
                    let value = self.rng.range(lo, hi);
                    self.push(value);
                }
                Opcode::Sin
                | Opcode::Cos
                | Opcode::Tan
                | Opcode::Sinh
                | Opcode::Cosh
                | Opcode::Tanh
                | Opcode::Asin
                | Opcode::Acos
                | Opcode::Atan
                | Opcode::Sqrt
                | Opcode::Abs
                | Opcode::Sign
                | Opcode::Radians
                | Opcode::Degrees
                | Opcode::Ceil
                | Opcode::Floor
                | Opcode::Round => {
                    let a = self.pop();
                    self.push(apply_unary(opcode, a));
                }
            }

            trace!(
                at = self.at,
                op = opcode.mnemonic(),
                operand = ?operand,
                depth = self.stack.len(),
                top = ?self.stack.last()
            );
        }

        debug!(depth = self.stack.len(), "run end");
    }

    // =========================================================================
    // Stack helpers
    // =========================================================================

    fn push(&mut self, value: f32) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> f32 {
        match self.stack.pop() {
            Some(value) => value,
            None => panic!("operand stack underflow at {}", self.at),
        }
    }

    /// Pops two values as `(below, top)`: the first pushed comes first.
    fn pop_pair(&mut self) -> (f32, f32) {
        let top = self.pop();
        let below = self.pop();
        (below, top)
    }

    /// Pops two values as `(top, below)`.
    ///
    /// `sub` and the ordering jumps read their operands in this order, so
    /// `5 - 2` evaluates to `-3` and `JLT` jumps when the top is less than
    /// the value beneath it. Compiled programs depend on it.
    fn pop_swapped(&mut self) -> (f32, f32) {
        let top = self.pop();
        let below = self.pop();
        (top, below)
    }

    /// Pops three values in push order.
    fn pop_triple(&mut self) -> (f32, f32, f32) {
        let c = self.pop();
        let (a, b) = self.pop_pair();
        (a, b, c)
    }

    fn float_operand(&self, operand: Option<Operand>) -> f32 {
        match operand {
            Some(Operand::Float(value)) => value,
            other => panic!("expected float operand at {}, got {:?}", self.at, other),
        }
    }

    fn offset_operand(&self, operand: Option<Operand>) -> usize {
        match operand {
            Some(Operand::Offset(offset)) => offset as usize,
            other => panic!("expected offset operand at {}, got {:?}", self.at, other),
        }
    }
}

/// Runs `function` on a fresh VM with the default configuration.
pub fn run(function: &mut Function) {
    Vm::new().run(function);
}

/// `x` limited to `[lo, hi]`.
fn clamp(lo: f32, hi: f32, x: f32) -> f32 {
    if x > hi {
        hi
    } else if x < lo {
        lo
    } else {
        x
    }
}

fn apply_unary(opcode: Opcode, a: f32) -> f32 {
    match opcode {
        Opcode::Tan => a.tan(),
        Opcode::Sin => a.sin(),
        Opcode::Cos => a.cos(),
        Opcode::Tanh => a.tanh(),
        Opcode::Sinh => a.sinh(),
        Opcode::Cosh => a.cosh(),
        Opcode::Atan => a.atan(),
        Opcode::Asin => a.asin(),
        Opcode::Acos => a.acos(),
        Opcode::Sqrt => a.sqrt(),
        Opcode::Abs => a.abs(),
        Opcode::Sign => {
            if a < 0.0 {
                -1.0
            } else {
                1.0
            }
        }
        Opcode::Radians => a.to_radians(),
        Opcode::Degrees => a.to_degrees(),
        Opcode::Ceil => a.ceil(),
        Opcode::Floor => a.floor(),
        // f32::round rounds half away from zero
        Opcode::Round => a.round(),
        other => unreachable!("{:?} is not a unary math opcode", other),
    }
}
