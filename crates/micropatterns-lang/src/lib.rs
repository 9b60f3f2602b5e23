pub mod error;
pub mod runtime;
pub mod syntax;
pub mod types;

pub use error::{Error, ErrorCode, RuntimeError, RuntimeErrorCode};
pub use runtime::eval::{Evaluator, VariableStore};
pub use runtime::interpreter::{DrawingState, ExecState, RunState, Runtime};
pub use runtime::interrupt::Interrupt;
pub use syntax::ast::{Command, CommandKind, Params, Script};
pub use syntax::parser::Parser;
pub use syntax::token::{Op, Value, VarRef};
pub use types::asset::{Asset, AssetTable};
pub use types::draw::{Color, DisplayListItem, DrawOp};

/// Fallback script used when a stored script is missing or fails to parse.
pub const DEFAULT_SCRIPT: &str = include_str!("default_script.mp");

// ─── Public API ───────────────────────────────────────────────────────────────

/// Parse source text into a script ready for a [`Runtime`]. Every error is
/// reported, not just the first.
pub fn compile(source: &str) -> Result<Script, Vec<Error>> {
    syntax::parser::parse_script(source)
}
