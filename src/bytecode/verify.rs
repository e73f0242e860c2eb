use thiserror::Error;

use crate::bytecode::{Function, Instruction, Label, Opcode, Operand, OperandKind, op::DecodeError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("verify error: {0}")]
    Decode(#[from] DecodeError),

    #[error("verify error: jump at {at} targets {target}, which does not start an instruction")]
    BadTarget { at: Label, target: Label },

    #[error("verify error: {opcode:?} at {at} addresses field {index} of {locals}")]
    BadField {
        at: Label,
        opcode: Opcode,
        index: u32,
        locals: usize,
    },

    #[error("verify error: stack underflow at {at}: {opcode:?} pops {needed}, depth is {depth}")]
    Underflow {
        at: Label,
        opcode: Opcode,
        needed: usize,
        depth: usize,
    },

    #[error("verify error: stack depth at {at} is {first} on one path and {second} on another")]
    DepthMismatch {
        at: Label,
        first: usize,
        second: usize,
    },

    #[error("verify error: execution runs off the end of the code after {at}")]
    FallsOffEnd { at: Label },
}

/// Checks that `function` can be run without tripping any VM panic.
///
/// Decoding, jump targets and field indices are checked linearly. Stack
/// depth is then propagated along every control-flow edge from offset 0:
/// each instruction must see the same depth on every path reaching it, no
/// instruction may pop more than is there, and every path must end at a
/// `return`.
pub fn verify(function: &Function) -> Result<(), VerifyError> {
    let instructions = function
        .instructions()
        .collect::<Result<Vec<Instruction>, DecodeError>>()?;

    if instructions.is_empty() {
        return Err(VerifyError::FallsOffEnd { at: 0 });
    }

    // offset -> instruction index, for boundary checks
    let mut index_at = vec![None; function.size()];
    for (i, instr) in instructions.iter().enumerate() {
        index_at[instr.offset as usize] = Some(i);
    }

    for instr in &instructions {
        check_operand(function, &index_at, instr)?;
    }

    check_stack(&instructions, &index_at)
}

fn check_operand(
    function: &Function,
    index_at: &[Option<usize>],
    instr: &Instruction,
) -> Result<(), VerifyError> {
    match (instr.opcode.operand_kind(), instr.operand) {
        (OperandKind::Target, Some(Operand::Offset(target))) => {
            let boundary = index_at.get(target as usize).copied().flatten();
            if boundary.is_none() {
                return Err(VerifyError::BadTarget {
                    at: instr.offset,
                    target,
                });
            }
        }
        (OperandKind::Field, Some(Operand::Offset(index))) => {
            if index as usize >= function.locals_len() {
                return Err(VerifyError::BadField {
                    at: instr.offset,
                    opcode: instr.opcode,
                    index,
                    locals: function.locals_len(),
                });
            }
        }
        _ => {}
    }

    Ok(())
}

fn check_stack(instructions: &[Instruction], index_at: &[Option<usize>]) -> Result<(), VerifyError> {
    let mut depth_in: Vec<Option<usize>> = vec![None; instructions.len()];
    let mut worklist = vec![0usize];
    depth_in[0] = Some(0);

    while let Some(i) = worklist.pop() {
        let instr = &instructions[i];
        let depth = depth_in[i].unwrap_or_default();

        let (pops, pushes) = instr.opcode.stack_effect();
        if pops > depth {
            return Err(VerifyError::Underflow {
                at: instr.offset,
                opcode: instr.opcode,
                needed: pops,
                depth,
            });
        }
        let depth_out = depth - pops + pushes;

        let mut successors = Vec::with_capacity(2);
        if let Some(target) = instr.target() {
            // targets were checked against instruction boundaries already
            if let Some(t) = index_at[target as usize] {
                successors.push(t);
            }
        }
        let falls_through = match instr.opcode {
            Opcode::Return | Opcode::Jump => false,
            _ => true,
        };
        if falls_through {
            if i + 1 >= instructions.len() {
                return Err(VerifyError::FallsOffEnd { at: instr.offset });
            }
            successors.push(i + 1);
        }

        for s in successors {
            match depth_in[s] {
                None => {
                    depth_in[s] = Some(depth_out);
                    worklist.push(s);
                }
                Some(seen) if seen != depth_out => {
                    return Err(VerifyError::DepthMismatch {
                        at: instructions[s].offset,
                        first: seen,
                        second: depth_out,
                    });
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}
