use std::collections::BTreeSet;
use std::fmt;

use crate::bytecode::{Function, Instruction, Label, Operand, OperandKind, op::DecodeError};

/// Print disassembly of a compiled function.
pub fn print_function(function: &Function) -> Result<(), DecodeError> {
    print!("{}", disassemble(function)?);
    Ok(())
}

/// Render a function as text: one line per instruction followed by the
/// locals table. Jump targets are marked with `►`.
pub fn disassemble(function: &Function) -> Result<String, DecodeError> {
    let instructions = function
        .instructions()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Listing {
        function,
        instructions,
    }
    .to_string())
}

/// Size figures and final local values, one `name = value` line per local.
pub fn summary(function: &Function) -> String {
    let locals_bytes = function.locals_len() * std::mem::size_of::<f32>();

    let mut lines = vec![
        format!("bytecode size: {}", function.size()),
        format!("locals size: {}", locals_bytes),
        format!("combined: {}", locals_bytes + function.size()),
    ];
    lines.extend(
        function
            .locals()
            .map(|(name, value)| format!("{} = {:.6}", name, value)),
    );

    lines.join("\n") + "\n"
}

struct Listing<'a> {
    function: &'a Function,
    instructions: Vec<Instruction>,
}

impl Listing<'_> {
    fn jump_targets(&self) -> BTreeSet<Label> {
        self.instructions.iter().filter_map(Instruction::target).collect()
    }

    fn local_name(&self, index: u32) -> Option<&str> {
        self.function
            .locals()
            .nth(index as usize)
            .map(|(name, _)| name)
    }

    fn fmt_instruction(&self, f: &mut fmt::Formatter<'_>, instr: &Instruction) -> fmt::Result {
        let mnemonic = instr.opcode.mnemonic();

        match (instr.opcode.operand_kind(), instr.operand) {
            (OperandKind::None, _) | (_, None) => writeln!(f, "{}", mnemonic),

            (OperandKind::Float, Some(operand)) => writeln!(f, "{:<11} {}", mnemonic, operand),

            (OperandKind::Target, Some(Operand::Offset(target))) => {
                let direction = if target <= instr.offset { "↑" } else { "↓" };
                writeln!(f, "{:<11} {} (→ {:04})", mnemonic, direction, target)
            }

            (OperandKind::Field, Some(Operand::Offset(index))) => match self.local_name(index) {
                Some(name) => writeln!(f, "{:<11} {:<4} ; {}", mnemonic, index, name),
                None => writeln!(f, "{:<11} {:<4} ; ???", mnemonic, index),
            },

            (_, Some(operand)) => writeln!(f, "{:<11} {}", mnemonic, operand),
        }
    }
}

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets = self.jump_targets();

        writeln!(f, "════════════════════════════════════════")?;
        writeln!(
            f,
            " function: {} bytes, {} instructions, {} locals",
            self.function.size(),
            self.instructions.len(),
            self.function.locals_len()
        )?;
        writeln!(f, "════════════════════════════════════════")?;

        for instr in &self.instructions {
            if targets.contains(&instr.offset) {
                writeln!(f, "      ┌──────────────────────────────────")?;
                write!(f, "{:04} ► ", instr.offset)?;
            } else {
                write!(f, "{:04}   ", instr.offset)?;
            }
            self.fmt_instruction(f, instr)?;
        }

        writeln!(f)?;
        writeln!(f, " locals:")?;
        for (i, (name, value)) in self.function.locals().enumerate() {
            writeln!(f, "  [{:>3}] {} = {:.6}", i, name, value)?;
        }

        Ok(())
    }
}
