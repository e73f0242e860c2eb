use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::op::{DecodeError, OPERAND_SIZE, Opcode, Operand, OperandKind, decode_at};

/// Byte offset into a function's code buffer.
pub type Label = u32;

/// Index into a function's locals table.
pub type Local = u32;

/// Name of the local every function is created with (slot 0, value 0.0).
pub const POSITION_LOCAL: &str = "position.x";

#[derive(Debug, Error)]
pub enum BytecodeIoError {
    #[error("bytecode (de)serialisation failed: {0}")]
    Postcard(#[from] postcard::Error),

    #[error("artifact has {values} local values but {names} local names")]
    LocalsMismatch { values: usize, names: usize },
}

/// A compiled Glint program: an encoded instruction buffer plus the table
/// of named scalar locals ("fields") the instructions address by index.
///
/// The code buffer only grows while compiling. Already emitted bytes change
/// only through [`Function::patch_jump_target`], which rewrites a jump
/// operand in place, so every recorded label stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    code: Vec<u8>,
    locals: Vec<f32>,
    local_names: Vec<String>,
}

/// One decoded instruction and where it starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub offset: Label,
    pub opcode: Opcode,
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Offset of the instruction that follows this one.
    pub fn next(&self) -> Label {
        self.offset + self.opcode.encoded_len() as Label
    }

    /// Jump target, for jump-class instructions.
    pub fn target(&self) -> Option<Label> {
        match (self.opcode.is_jump(), self.operand) {
            (true, Some(Operand::Offset(target))) => Some(target),
            _ => None,
        }
    }
}

impl Default for Function {
    fn default() -> Self {
        Self::new()
    }
}

impl Function {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            locals: vec![0.0],
            local_names: vec![POSITION_LOCAL.to_string()],
        }
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Appends one instruction and returns the label it starts at.
    ///
    /// The operand must match the opcode's operand kind; a missing operand
    /// for an opcode that takes one is encoded as zero (a placeholder to be
    /// patched later).
    pub fn append(&mut self, opcode: Opcode, operand: Option<Operand>) -> Label {
        let label = self.current_label();
        self.code.push(opcode as u8);

        match (opcode.operand_kind(), operand) {
            (OperandKind::None, None) => {}
            (OperandKind::None, Some(operand)) => {
                debug_assert!(false, "{:?} takes no operand, got {:?}", opcode, operand);
            }
            (OperandKind::Float, Some(operand @ Operand::Float(_)))
            | (OperandKind::Target | OperandKind::Field, Some(operand @ Operand::Offset(_))) => {
                self.code.extend_from_slice(&operand.to_le_bytes());
            }
            (kind, operand) => {
                debug_assert!(
                    operand.is_none(),
                    "{:?} expects a {:?} operand, got {:?}",
                    opcode,
                    kind,
                    operand
                );
                self.code.extend_from_slice(&[0; OPERAND_SIZE]);
            }
        }

        label
    }

    /// Appends an instruction without operand.
    pub fn emit(&mut self, opcode: Opcode) -> Label {
        self.append(opcode, None)
    }

    pub fn push(&mut self, value: f32) -> Label {
        self.append(Opcode::Push, Some(Operand::Float(value)))
    }

    pub fn load_field(&mut self, local: Local) -> Label {
        self.append(Opcode::LoadField, Some(Operand::Offset(local)))
    }

    pub fn store_field(&mut self, local: Local) -> Label {
        self.append(Opcode::StoreField, Some(Operand::Offset(local)))
    }

    /// Appends a jump-class instruction targeting `target`.
    pub fn jump(&mut self, opcode: Opcode, target: Label) -> Label {
        debug_assert!(opcode.is_jump(), "{:?} is not a jump", opcode);
        self.append(opcode, Some(Operand::Offset(target)))
    }

    pub fn ret(&mut self) -> Label {
        self.emit(Opcode::Return)
    }

    /// Offset the next appended instruction will start at.
    pub fn current_label(&self) -> Label {
        self.code.len() as Label
    }

    /// Rewrites the target of the jump instruction starting at `label`.
    ///
    /// Only the four operand bytes after the opcode are touched.
    pub fn patch_jump_target(&mut self, label: Label, target: Label) {
        let at = label as usize;
        debug_assert!(
            Opcode::from_byte(self.code[at]).is_some_and(Opcode::is_jump),
            "label {} does not start a jump instruction",
            label
        );
        self.code[at + 1..at + 1 + OPERAND_SIZE].copy_from_slice(&target.to_le_bytes());
    }

    // =========================================================================
    // Locals
    // =========================================================================

    /// Returns the slot of `name`, declaring a new zero-initialised slot if
    /// the name is not known yet.
    pub fn declare_or_find_local(&mut self, name: &str) -> Local {
        if let Some(local) = self.find_local(name) {
            return local;
        }

        self.local_names.push(name.to_string());
        self.locals.push(0.0);
        (self.locals.len() - 1) as Local
    }

    /// Exact-name lookup without declaring.
    pub fn find_local(&self, name: &str) -> Option<Local> {
        self.local_names
            .iter()
            .position(|n| n == name)
            .map(|i| i as Local)
    }

    pub fn local_value(&self, local: Local) -> Option<f32> {
        self.locals.get(local as usize).copied()
    }

    /// Value of the local called `name`.
    pub fn local(&self, name: &str) -> Option<f32> {
        self.find_local(name).and_then(|l| self.local_value(l))
    }

    /// Overwrites a slot's value. Returns false if the slot does not exist.
    pub fn set_local(&mut self, local: Local, value: f32) -> bool {
        match self.locals.get_mut(local as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_code(code: Vec<u8>) -> Self {
        Self {
            code,
            ..Self::new()
        }
    }

    /// The code buffer alongside writable local values, for the VM.
    pub(crate) fn code_and_locals_mut(&mut self) -> (&[u8], &mut [f32]) {
        (&self.code, &mut self.locals)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Compiled size in bytes.
    pub fn size(&self) -> usize {
        self.code.len()
    }

    pub fn locals_len(&self) -> usize {
        self.locals.len()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// `(name, value)` for every local, in slot order.
    pub fn locals(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.local_names
            .iter()
            .map(String::as_str)
            .zip(self.locals.iter().copied())
    }

    /// Decodes the instruction starting at `offset`.
    pub fn instruction_at(&self, offset: Label) -> Result<Instruction, DecodeError> {
        let (opcode, operand) = decode_at(&self.code, offset as usize)?;
        Ok(Instruction {
            offset,
            opcode,
            operand,
        })
    }

    /// Linear decode of the whole buffer.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            function: self,
            offset: 0,
            failed: false,
        }
    }

    // =========================================================================
    // Serialisation
    // =========================================================================

    pub fn to_bytes(&self) -> Result<Vec<u8>, BytecodeIoError> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Restores a function written by [`Function::to_bytes`].
    ///
    /// The locals table must pair every value with a name. The code is not
    /// checked; run `bytecode::verify` before executing it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BytecodeIoError> {
        let function: Function = postcard::from_bytes(bytes)?;
        if function.locals.len() != function.local_names.len() {
            return Err(BytecodeIoError::LocalsMismatch {
                values: function.locals.len(),
                names: function.local_names.len(),
            });
        }
        Ok(function)
    }
}

/// Iterator returned by [`Function::instructions`]. Stops after the first
/// decode error.
pub struct Instructions<'a> {
    function: &'a Function,
    offset: Label,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset as usize >= self.function.size() {
            return None;
        }

        match self.function.instruction_at(self.offset) {
            Ok(instruction) => {
                self.offset = instruction.next();
                Some(Ok(instruction))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
