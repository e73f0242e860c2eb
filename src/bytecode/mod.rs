pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod function;
pub mod op;
pub mod verify;

pub use compile::{Compiler, compile};
pub use compile_error::CompileError;
pub use function::{BytecodeIoError, Function, Instruction, Label, Local, POSITION_LOCAL};
pub use op::{DecodeError, Opcode, Operand, OperandKind};
pub use verify::{VerifyError, verify};
