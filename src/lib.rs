//! Glint: a small expression language compiled to byte-encoded stack code.
//!
//! The pipeline is `frontend` (text to [`lang::expr::Expr`]), `bytecode`
//! (tree to [`bytecode::Function`]) and `runtime` (executes a function).

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;
