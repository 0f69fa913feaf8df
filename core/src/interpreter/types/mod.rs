//! Type definitions for the interpreter
//!
//! - AST nodes (Stmt, Expr, Pattern)
//! - Runtime values (Val, Props)
//! - Control flow and runtime errors

pub mod ast;
pub mod control;
pub mod values;

pub use ast::{Expr, ExprKind, FunctionDef, Loc, Pattern, Program, Stmt, StmtKind};
pub use control::{Control, ExecResult, RuntimeError};
pub use values::{format_number, EnvId, ObjId, Props, Val};
