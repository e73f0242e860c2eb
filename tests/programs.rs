//! End-to-end tests: source text through parser, compiler, verifier and VM.

mod common;

use common::*;
use glint::bytecode::disasm::{disassemble, summary};
use glint::bytecode::{CompileError, Instruction};
use glint::frontend::SourceError;

// =============================================================================
// Fields and arithmetic
// =============================================================================

#[test]
fn field_persistence() {
    let f = run_str("x = 1; x = x + 1;");
    assert_eq!(field(&f, "x"), 2.0);
    assert_eq!(f.locals_len(), 2);
}

#[test]
fn subtraction_keeps_vm_operand_order() {
    let f = run_str("d = 5 - 2;");
    assert_eq!(field(&f, "d"), -3.0);
}

#[test]
fn division_and_modulo_in_source_order() {
    let f = run_str("d = 6 / 3; m = 7 % 3;");
    assert_eq!(field(&f, "d"), 2.0);
    assert_eq!(field(&f, "m"), 1.0);
}

#[test]
fn add_and_mul_are_mathematical() {
    let f = run_str("s = 2 + 3; p = 2 * 3; q = (1 + 2) * 4;");
    assert_eq!(field(&f, "s"), 5.0);
    assert_eq!(field(&f, "p"), 6.0);
    assert_eq!(field(&f, "q"), 12.0);
}

#[test]
fn unary_minus() {
    let f = run_str("y = 3; a = -y; b = -2; c = -(1 + 1);");
    assert_eq!(field(&f, "a"), -3.0);
    assert_eq!(field(&f, "b"), -2.0);
    assert_eq!(field(&f, "c"), -2.0);
}

#[test]
fn position_field_is_preseeded() {
    let f = run_str("position.x = position.x + 4;");
    assert_eq!(field(&f, "position.x"), 4.0);
    assert_eq!(f.locals().next(), Some(("position.x", 4.0)));
}

#[test]
fn expression_statements_are_discarded() {
    // bare expressions must not leave values behind
    let f = run_str("1 + 2; sin(0); x = 1; 3;");
    assert_eq!(field(&f, "x"), 1.0);
}

// =============================================================================
// Intrinsics
// =============================================================================

#[test]
fn intrinsics() {
    let f = run_str(
        "s = sqrt(16); l = lerp(0, 10, 0.25); c = clamp(0, 1, 5); \
         r = round(2.5); n = round(-2.5); g = sign(-4); a = abs(-1.5); \
         fl = floor(1.7); ce = ceil(1.2); st = smoothstep(0, 1, 0.5);",
    );
    assert_eq!(field(&f, "s"), 4.0);
    assert_eq!(field(&f, "l"), 2.5);
    assert_eq!(field(&f, "c"), 1.0);
    assert_eq!(field(&f, "r"), 3.0);
    assert_eq!(field(&f, "n"), -3.0);
    assert_eq!(field(&f, "g"), -1.0);
    assert_eq!(field(&f, "a"), 1.5);
    assert_eq!(field(&f, "fl"), 1.0);
    assert_eq!(field(&f, "ce"), 2.0);
    assert_eq!(field(&f, "st"), 0.5);
}

#[test]
fn trigonometry() {
    let f = run_str("d = degrees(radians(90)); z = sin(0) + cos(0);");
    assert!((field(&f, "d") - 90.0).abs() < 1e-4);
    assert_eq!(field(&f, "z"), 1.0);
}

#[test]
fn unknown_names_read_as_zero() {
    let f = run_str("a = missing + 1; b = noise(1, 2, 3) + 2;");
    assert_eq!(field(&f, "a"), 1.0);
    assert_eq!(field(&f, "b"), 2.0);
    assert_eq!(f.find_local("missing"), None);
}

#[test]
fn arity_mismatch_is_a_compile_error() {
    let program = parse_source("x = lerp(1, 2);").unwrap();
    let err = Compiler::new().compile(&program).unwrap_err();
    assert_eq!(err, CompileError::arity("lerp", 3, 2));
}

#[test]
fn rand_is_seeded() {
    let source = "r1 = rand(0, 1); r2 = rand(10, 20);";

    let mut a = compile_str(source);
    run_seeded(&mut a, 3);
    let mut b = compile_str(source);
    run_seeded(&mut b, 3);

    assert_eq!(a, b);
    assert!((0.0..1.0).contains(&field(&a, "r1")));
    assert!((10.0..20.0).contains(&field(&a, "r2")));
}

// =============================================================================
// Conditionals
// =============================================================================

const AND_PROGRAM: &str = "c = 4; if (a == 1 && b == 2) { c = 9; }";
const OR_PROGRAM: &str = "c = 4; if (a == 1 || b == 2) { c = 9; }";

fn run_with(source: &str, fields: &[(&str, f32)]) -> Function {
    let program = parse_source(source).unwrap();
    let mut f = compile_with(&program, fields);
    run(&mut f);
    f
}

#[test]
fn and_short_circuit() {
    assert_eq!(field(&run_with(AND_PROGRAM, &[("a", 1.0), ("b", 2.0)]), "c"), 9.0);
    assert_eq!(field(&run_with(AND_PROGRAM, &[("a", 1.0), ("b", 3.0)]), "c"), 4.0);
    assert_eq!(field(&run_with(AND_PROGRAM, &[("a", 0.0), ("b", 2.0)]), "c"), 4.0);
}

#[test]
fn or_short_circuit() {
    assert_eq!(field(&run_with(OR_PROGRAM, &[("a", 5.0), ("b", 2.0)]), "c"), 9.0);
    assert_eq!(field(&run_with(OR_PROGRAM, &[("a", 1.0), ("b", 0.0)]), "c"), 9.0);
    assert_eq!(field(&run_with(OR_PROGRAM, &[("a", 5.0), ("b", 5.0)]), "c"), 4.0);
}

#[test]
fn execution_resumes_after_skipped_conditional() {
    let f = run_str("a = 1; b = 3; if (a == 1 && b == 2) { c = 9; } d = 7;");
    assert_eq!(field(&f, "c"), 0.0);
    assert_eq!(field(&f, "d"), 7.0);
}

#[test]
fn ordering_comparisons() {
    let f = run_str(
        "a = 1; b = 2; \
         if (a < b) { lt = 1; } \
         if (a > b) { gt = 1; } \
         if (b <= 2) { le = 1; } \
         if (a >= 2) { ge = 1; } \
         if (a != b) { ne = 1; }",
    );
    assert_eq!(field(&f, "lt"), 1.0);
    assert_eq!(field(&f, "gt"), 0.0);
    assert_eq!(field(&f, "le"), 1.0);
    assert_eq!(field(&f, "ge"), 0.0);
    assert_eq!(field(&f, "ne"), 1.0);
}

#[test]
fn mixed_and_or() {
    let source = "hit = 0; if ((a == 1 || a == 2) && (b > 5 || c < 0)) { hit = 1; }";
    let cases = [
        (1.0, 6.0, 0.0, 1.0),
        (2.0, 0.0, -1.0, 1.0),
        (3.0, 6.0, -1.0, 0.0),
        (1.0, 5.0, 0.0, 0.0),
    ];
    for (a, b, c, expected) in cases {
        let f = run_with(source, &[("a", a), ("b", b), ("c", c)]);
        assert_eq!(field(&f, "hit"), expected, "a={} b={} c={}", a, b, c);
    }
}

#[test]
fn nested_conditionals() {
    let f = run_str(
        "a = 1; b = 2; \
         if (a == 1) { x = 1; if (b == 3) { x = 2; } if (b == 2) { y = 5; } } \
         z = x + y;",
    );
    assert_eq!(field(&f, "x"), 1.0);
    assert_eq!(field(&f, "y"), 5.0);
    assert_eq!(field(&f, "z"), 6.0);
}

#[test]
fn value_conditions_test_against_zero() {
    let f = run_str("a = 2; if (a) { x = 1; } if (a - 2) { y = 1; }");
    assert_eq!(field(&f, "x"), 1.0);
    assert_eq!(field(&f, "y"), 0.0);
}

#[test]
fn booleans_in_value_position() {
    let f = run_str("t = 1 < 2; u = 1 > 2 || 3 == 3; v = 1 == 1 && 0 == 1;");
    assert_eq!(field(&f, "t"), 1.0);
    assert_eq!(field(&f, "u"), 1.0);
    assert_eq!(field(&f, "v"), 0.0);
}

#[test]
fn nested_blocks() {
    let f = run_str("{ a = 1; { b = a + 1; } } c = b;");
    assert_eq!(field(&f, "c"), 2.0);
}

// =============================================================================
// Compiled artifact
// =============================================================================

#[test]
fn and_layout_matches_expected_offsets() {
    let f = compile_str("a = 1; b = 2; if (a == 1 && b == 2) { c = 9; }");
    let jumps: Vec<(u32, Opcode, u32)> = f
        .instructions()
        .map(Result::unwrap)
        .filter_map(|i: Instruction| i.target().map(|t| (i.offset, i.opcode, t)))
        .collect();

    assert_eq!(
        jumps,
        vec![
            (30, Opcode::Neq, 70),
            (45, Opcode::Neq, 70),
            (50, Opcode::Jump, 55),
            (65, Opcode::Jump, 70),
        ]
    );
    assert_eq!(f.size(), 71);
}

#[test]
fn all_jumps_point_forward() {
    let f = compile_str(
        "if ((a == 1 || b == 2) && (c == 3 || (d == 4 && e == 5))) { if (a) { x = 1; } }",
    );
    for instr in f.instructions().map(Result::unwrap) {
        if let Some(target) = instr.target() {
            assert!(target > instr.offset, "jump at {} to {}", instr.offset, target);
        }
    }
}

#[test]
fn size_is_sum_of_instruction_sizes() {
    let f = compile_str("x = 1; if (x == 1 || x == 2) { y = sin(x) * 2; }");
    let total: usize = f
        .instructions()
        .map(|i| i.unwrap().opcode.encoded_len())
        .sum();
    assert_eq!(total, f.size());
}

#[test]
fn serialised_program_round_trips_and_runs() {
    let compiled = compile_str("c = 4; if (a == 0) { c = 9; }");
    let bytes = compiled.to_bytes().unwrap();

    let mut loaded = Function::from_bytes(&bytes).unwrap();
    assert_eq!(loaded, compiled);

    Vm::new().run_checked(&mut loaded).unwrap();
    assert_eq!(field(&loaded, "c"), 9.0);
}

#[test]
fn disassembly_marks_targets() {
    let f = compile_str("a = 1; if (a == 1) { b = 2; }");
    let text = disassemble(&f).unwrap();
    assert!(text.contains("JNE"));
    assert!(text.contains("► RET"));
    assert!(text.contains("[  2] b = 0.000000"));
}

#[test]
fn summary_lists_fields_in_slot_order() {
    let f = run_str("b = 2; a = 1;");
    let report = summary(&f);
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[1], "locals size: 12");
    assert_eq!(&lines[3..], ["position.x = 0.000000", "b = 2.000000", "a = 1.000000"]);
}

#[test]
fn front_end_errors_surface() {
    assert!(matches!(parse_source("x = ;"), Err(SourceError::Parse(_))));
    assert!(matches!(parse_source("x = 1 @ 2;"), Err(SourceError::Lex(_))));
}
