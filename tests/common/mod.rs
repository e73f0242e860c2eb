//! Shared helpers for integration tests.
#![allow(dead_code)]

pub use glint::bytecode::{Compiler, Function, Opcode, verify};
pub use glint::frontend::parse_source;
pub use glint::lang::expr::{ArithOp, CmpOp, Expr};
pub use glint::runtime::{Vm, VmConfig};

/// Compiles `source` into a fresh function.
pub fn compile_str(source: &str) -> Function {
    let program = parse_source(source).unwrap();
    Compiler::new().compile(&program).unwrap()
}

/// Compiles with pre-seeded fields.
pub fn compile_with(program: &Expr, fields: &[(&str, f32)]) -> Function {
    let mut seeded = Function::new();
    for (name, value) in fields {
        let local = seeded.declare_or_find_local(name);
        seeded.set_local(local, *value);
    }
    Compiler::with_function(seeded).compile(program).unwrap()
}

/// Runs a compiled function, asserting it verifies and leaves the stack empty.
pub fn run(function: &mut Function) {
    run_seeded(function, VmConfig::default().seed);
}

pub fn run_seeded(function: &mut Function, seed: u64) {
    verify(function).unwrap();
    let mut vm = Vm::with_config(VmConfig { seed });
    vm.run(function);
    assert!(vm.stack().is_empty(), "stack left at {:?}", vm.stack());
}

/// Compiles and runs `source`.
pub fn run_str(source: &str) -> Function {
    let mut function = compile_str(source);
    run(&mut function);
    function
}

pub fn field(function: &Function, name: &str) -> f32 {
    function
        .local(name)
        .unwrap_or_else(|| panic!("no field named {}", name))
}
