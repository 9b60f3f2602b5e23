use std::collections::BTreeMap;

use crate::syntax::token::{Value, tokens_to_string};
use crate::types::asset::AssetTable;
use crate::types::draw::DrawOp;

/// `KEY=VALUE` arguments. Keys are upper-cased.
pub type Params = BTreeMap<String, Value>;

// ─── Top level ───────────────────────────────────────────────────────────────

/// Everything a successful parse produces.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub commands: Vec<Command>,
    pub assets: AssetTable,
    /// Upper-cased names including the `$` prefix, in declaration order.
    pub declared_variables: Vec<String>,
}

/// A command with the source line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub line: usize,
    pub kind: CommandKind,
}

impl Command {
    pub fn new(line: usize, kind: CommandKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// `VAR $NAME [= expr]` — empty `init` means 0.
    Var { name: String, init: Vec<Value> },
    /// `LET $NAME = expr`
    Let { target: String, expr: Vec<Value> },

    Color(Params),
    Fill(Params),
    ResetTransforms,
    Translate(Params),
    Rotate(Params),
    Scale(Params),

    Draw { op: DrawOp, params: Params },

    /// `REPEAT COUNT=n [TIMES] … ENDREPEAT`
    Repeat { count: Value, body: Vec<Command> },
    /// `IF cond THEN … [ELSE …] ENDIF`
    If { condition: Vec<Value>, then_branch: Vec<Command>, else_branch: Vec<Command> },
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Var { .. } => "VAR",
            CommandKind::Let { .. } => "LET",
            CommandKind::Color(_) => "COLOR",
            CommandKind::Fill(_) => "FILL",
            CommandKind::ResetTransforms => "RESET_TRANSFORMS",
            CommandKind::Translate(_) => "TRANSLATE",
            CommandKind::Rotate(_) => "ROTATE",
            CommandKind::Scale(_) => "SCALE",
            CommandKind::Draw { op, .. } => op.name(),
            CommandKind::Repeat { .. } => "REPEAT",
            CommandKind::If { .. } => "IF",
        }
    }

    /// One-line source-like summary, used by tooling.
    pub fn summary(&self) -> String {
        match self {
            CommandKind::Var { name, init } if init.is_empty() => format!("VAR {name}"),
            CommandKind::Var { name, init } => format!("VAR {name} = {}", tokens_to_string(init)),
            CommandKind::Let { target, expr } => format!("LET {target} = {}", tokens_to_string(expr)),
            CommandKind::Color(p)
            | CommandKind::Fill(p)
            | CommandKind::Translate(p)
            | CommandKind::Rotate(p)
            | CommandKind::Scale(p)
            | CommandKind::Draw { params: p, .. } => {
                let args: Vec<String> = p.iter().map(|(k, v)| format!("{k}={v}")).collect();
                if args.is_empty() { self.name().to_string() }
                else { format!("{} {}", self.name(), args.join(" ")) }
            }
            CommandKind::ResetTransforms => "RESET_TRANSFORMS".to_string(),
            CommandKind::Repeat { count, .. } => format!("REPEAT COUNT={count} TIMES"),
            CommandKind::If { condition, .. } => format!("IF {} THEN", tokens_to_string(condition)),
        }
    }
}
