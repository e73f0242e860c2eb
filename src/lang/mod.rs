//! # Glint Abstract Syntax Tree
//!
//! This module defines the expression tree consumed by the bytecode
//! compiler. The tree is produced by a front end (see `crate::frontend`)
//! and is treated as read-only by everything downstream.
//!
//! ## Documentation conventions
//!
//! - Stack effects are written as `( before -- after )`.
//! - "Statement" means an expression compiled for its side effect only.

pub mod expr;
