use thiserror::Error;

// =============================================================================
// OPCODE - Instruction vocabulary
// =============================================================================
//
// Every instruction is one opcode byte, optionally followed by a 4-byte
// little-endian operand. The encoder (`Function::append`) and the dispatch in
// `runtime::vm` both key off the discriminants below; they must change
// together.

/// Size in bytes of every operand.
pub const OPERAND_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // control
    Return = 0,
    // stack / data
    Push = 1,
    Discard = 2,
    // arithmetic
    Add = 3,
    Sub = 4,
    Mul = 5,
    Div = 6,
    Mod = 7,

    // ==========================================================================
    // Jumps: operand is an absolute byte offset into the code buffer
    // ==========================================================================
    Jump = 8,
    Eq = 9,
    Lt = 10,
    Gt = 11,
    Elt = 12,
    Egt = 13,
    Neq = 14,

    // fields
    LoadField = 15,
    StoreField = 16,

    // unary math
    Tan = 17,
    Sin = 18,
    Cos = 19,
    Tanh = 20,
    Sinh = 21,
    Cosh = 22,
    Atan = 23,
    Asin = 24,
    Acos = 25,

    // ternary math
    Clamp = 26,
    Lerp = 27,
    Smoothstep = 28,

    // unary math (continued)
    Sqrt = 29,
    Abs = 30,
    Sign = 31,
    Radians = 32,
    Degrees = 33,
    Ceil = 34,
    Floor = 35,
    Round = 36,

    /// `( a b -- x )` with `x` uniform in `[a, b)`.
    Rand = 37,
}

/// What follows the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    None,
    /// IEEE-754 single precision immediate.
    Float,
    /// Absolute jump target.
    Target,
    /// Index into the locals table.
    Field,
}

/// Decoded operand value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Float(f32),
    Offset(u32),
}

impl Operand {
    pub fn to_le_bytes(self) -> [u8; OPERAND_SIZE] {
        match self {
            Operand::Float(v) => v.to_le_bytes(),
            Operand::Offset(v) => v.to_le_bytes(),
        }
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Float(v) => write!(f, "{:?}", v),
            Operand::Offset(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{byte:02x} at offset {offset}")]
    UnknownOpcode { byte: u8, offset: usize },

    #[error("truncated operand for {opcode:?} at offset {offset}")]
    TruncatedOperand { opcode: Opcode, offset: usize },

    #[error("offset {offset} is past the end of the code")]
    OutOfRange { offset: usize },
}

impl Opcode {
    /// Every opcode in discriminant order.
    pub const ALL: [Opcode; 38] = [
        Opcode::Return,
        Opcode::Push,
        Opcode::Discard,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Jump,
        Opcode::Eq,
        Opcode::Lt,
        Opcode::Gt,
        Opcode::Elt,
        Opcode::Egt,
        Opcode::Neq,
        Opcode::LoadField,
        Opcode::StoreField,
        Opcode::Tan,
        Opcode::Sin,
        Opcode::Cos,
        Opcode::Tanh,
        Opcode::Sinh,
        Opcode::Cosh,
        Opcode::Atan,
        Opcode::Asin,
        Opcode::Acos,
        Opcode::Clamp,
        Opcode::Lerp,
        Opcode::Smoothstep,
        Opcode::Sqrt,
        Opcode::Abs,
        Opcode::Sign,
        Opcode::Radians,
        Opcode::Degrees,
        Opcode::Ceil,
        Opcode::Floor,
        Opcode::Round,
        Opcode::Rand,
    ];

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Opcode::ALL.get(byte as usize).copied()
    }

    pub fn operand_kind(self) -> OperandKind {
        use Opcode::*;
        match self {
            Push => OperandKind::Float,
            Jump | Eq | Neq | Lt | Gt | Elt | Egt => OperandKind::Target,
            LoadField | StoreField => OperandKind::Field,
            _ => OperandKind::None,
        }
    }

    /// Encoded size in bytes, opcode byte included.
    pub fn encoded_len(self) -> usize {
        match self.operand_kind() {
            OperandKind::None => 1,
            _ => 1 + OPERAND_SIZE,
        }
    }

    /// True for `jump` and the six comparison-jumps.
    pub fn is_jump(self) -> bool {
        self.operand_kind() == OperandKind::Target
    }

    /// Comparison-jumps fall through when the test fails.
    pub fn is_conditional_jump(self) -> bool {
        self.is_jump() && self != Opcode::Jump
    }

    /// Returns (pops, pushes).
    pub fn stack_effect(self) -> (usize, usize) {
        use Opcode::*;
        match self {
            Return | Jump => (0, 0),
            Push | LoadField => (0, 1),
            Discard | StoreField => (1, 0),

            Add | Sub | Mul | Div | Mod => (2, 1),

            Eq | Neq | Lt | Gt | Elt | Egt => (2, 0),

            Tan | Sin | Cos | Tanh | Sinh | Cosh | Atan | Asin | Acos => (1, 1),
            Sqrt | Abs | Sign | Radians | Degrees | Ceil | Floor | Round => (1, 1),

            Clamp | Lerp | Smoothstep => (3, 1),
            Rand => (2, 1),
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Return => "RET",
            Push => "PUSH",
            Discard => "DISCARD",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            Jump => "JMP",
            Eq => "JEQ",
            Lt => "JLT",
            Gt => "JGT",
            Elt => "JLE",
            Egt => "JGE",
            Neq => "JNE",
            LoadField => "LDFLD",
            StoreField => "STFLD",
            Tan => "TAN",
            Sin => "SIN",
            Cos => "COS",
            Tanh => "TANH",
            Sinh => "SINH",
            Cosh => "COSH",
            Atan => "ATAN",
            Asin => "ASIN",
            Acos => "ACOS",
            Clamp => "CLAMP",
            Lerp => "LERP",
            Smoothstep => "SMOOTHSTEP",
            Sqrt => "SQRT",
            Abs => "ABS",
            Sign => "SIGN",
            Radians => "RADIANS",
            Degrees => "DEGREES",
            Ceil => "CEIL",
            Floor => "FLOOR",
            Round => "ROUND",
            Rand => "RAND",
        }
    }
}

/// Decodes the instruction starting at `offset`.
///
/// Returns the opcode and its operand, if the opcode carries one.
pub fn decode_at(code: &[u8], offset: usize) -> Result<(Opcode, Option<Operand>), DecodeError> {
    let byte = code
        .get(offset)
        .copied()
        .ok_or(DecodeError::OutOfRange { offset })?;
    let opcode = Opcode::from_byte(byte).ok_or(DecodeError::UnknownOpcode { byte, offset })?;

    let start = offset + 1;
    let raw = match opcode.operand_kind() {
        OperandKind::None => return Ok((opcode, None)),
        _ => code
            .get(start..start + OPERAND_SIZE)
            .ok_or(DecodeError::TruncatedOperand { opcode, offset })?,
    };
    let bytes = [raw[0], raw[1], raw[2], raw[3]];

    let operand = match opcode.operand_kind() {
        OperandKind::Float => Operand::Float(f32::from_le_bytes(bytes)),
        _ => Operand::Offset(u32::from_le_bytes(bytes)),
    };

    Ok((opcode, Some(operand)))
}
