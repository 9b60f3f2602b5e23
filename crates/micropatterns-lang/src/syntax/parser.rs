//! Line-oriented parser. Builds the command tree, the pattern asset table and
//! the list of declared variables. Errors are collected, never fatal: every
//! line is visited and `parse` reports success only when none were recorded.
//!
//! Blocks are built bottom-up: an open `REPEAT`/`IF` lives on a stack and owns
//! the commands parsed into it; when its terminator arrives the finished
//! command is popped and pushed into its parent list in one step.

use log::warn;

use crate::error::{Error, ErrorCode};
use crate::syntax::ast::{Command, CommandKind, Params, Script};
use crate::syntax::lexer::{self, is_valid_var_name};
use crate::syntax::token::{Value, is_env_variable};
use crate::types::asset::{Asset, AssetTable, MAX_ASSETS, RECOMMENDED_MAX_DIM};
use crate::types::draw::DrawOp;

/// Upper bound on `WIDTH * HEIGHT` for a single pattern.
pub const MAX_PATTERN_CELLS: usize = 64 * 1024;

enum OpenBlock {
    Repeat { line: usize, count: Value, body: Vec<Command> },
    If {
        line: usize,
        condition: Vec<Value>,
        then_branch: Vec<Command>,
        else_branch: Option<Vec<Command>>,
    },
}

impl OpenBlock {
    fn line(&self) -> usize {
        match self { OpenBlock::Repeat { line, .. } | OpenBlock::If { line, .. } => *line }
    }

    fn name(&self) -> &'static str {
        match self { OpenBlock::Repeat { .. } => "REPEAT", OpenBlock::If { .. } => "IF" }
    }

    /// The list new commands are appended to.
    fn active(&mut self) -> &mut Vec<Command> {
        match self {
            OpenBlock::Repeat { body, .. } => body,
            OpenBlock::If { else_branch: Some(e), .. } => e,
            OpenBlock::If { then_branch, .. } => then_branch,
        }
    }

    fn close(self) -> Command {
        match self {
            OpenBlock::Repeat { line, count, body } => {
                Command::new(line, CommandKind::Repeat { count, body })
            }
            OpenBlock::If { line, condition, then_branch, else_branch } => Command::new(line, CommandKind::If {
                condition,
                then_branch,
                else_branch: else_branch.unwrap_or_default(),
            }),
        }
    }
}

// ─── Parser ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Parser {
    commands: Vec<Command>,
    blocks: Vec<OpenBlock>,
    assets: AssetTable,
    declared: Vec<String>,
    errors: Vec<Error>,
}

impl Parser {
    pub fn new() -> Self { Self::default() }

    /// Parse a whole script, replacing any previous result. Returns true iff
    /// no errors were recorded.
    pub fn parse(&mut self, source: &str) -> bool {
        self.reset();

        for (i, raw) in source.split('\n').enumerate() {
            let line = i + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') { continue; }
            if let Err(e) = self.parse_line(text, line) {
                self.errors.push(e);
            }
        }

        while let Some(block) = self.blocks.pop() {
            let (name, start) = (block.name(), block.line());
            self.errors.push(Error::new(ErrorCode::P012, start,
                format!("Unclosed {name} block started on line {start}. Expected END{name}.")));
        }

        self.errors.is_empty()
    }

    pub fn commands(&self) -> &[Command] { &self.commands }
    pub fn assets(&self) -> &AssetTable { &self.assets }
    pub fn errors(&self) -> &[Error] { &self.errors }
    /// Upper-cased names with their `$` prefix.
    pub fn declared_variables(&self) -> &[String] { &self.declared }

    pub fn into_script(self) -> Script {
        Script { commands: self.commands, assets: self.assets, declared_variables: self.declared }
    }

    fn reset(&mut self) {
        self.commands.clear();
        self.blocks.clear();
        self.assets.clear();
        self.declared.clear();
        self.errors.clear();
    }

    // ─── Lines ───────────────────────────────────────────────────────────────

    fn parse_line(&mut self, text: &str, line: usize) -> Result<(), Error> {
        let (name, args) = lexer::split_command(text);

        let kind = match name.as_str() {
            "DEFINE" => return self.parse_define(args, line),
            "REPEAT" => {
                // A malformed header still opens the block so its ENDREPEAT pairs up.
                let count = self.parse_repeat(args, line).unwrap_or_else(|e| {
                    self.errors.push(e);
                    Value::Int(0)
                });
                self.blocks.push(OpenBlock::Repeat { line, count, body: Vec::new() });
                return Ok(());
            }
            "IF" => {
                let condition = self.parse_if(args, line).unwrap_or_else(|e| {
                    self.errors.push(e);
                    Vec::new()
                });
                self.blocks.push(OpenBlock::If {
                    line, condition, then_branch: Vec::new(), else_branch: None,
                });
                return Ok(());
            }
            "ELSE" => {
                ignore_args(&name, args, line);
                return self.open_else(line);
            }
            "ENDIF" => {
                ignore_args(&name, args, line);
                return self.close_block("IF", line);
            }
            "ENDREPEAT" => {
                ignore_args(&name, args, line);
                return self.close_block("REPEAT", line);
            }

            "VAR" => self.parse_var(args, line)?,
            "LET" => self.parse_let(args, line)?,
            "COLOR" => CommandKind::Color(self.params(args, line)?),
            "FILL" => CommandKind::Fill(self.params(args, line)?),
            "TRANSLATE" => CommandKind::Translate(self.params(args, line)?),
            "ROTATE" => CommandKind::Rotate(self.params(args, line)?),
            "SCALE" => CommandKind::Scale(self.params(args, line)?),
            "RESET_TRANSFORMS" => {
                ignore_args(&name, args, line);
                CommandKind::ResetTransforms
            }
            other => match DrawOp::from_name(other) {
                Some(op) => CommandKind::Draw { op, params: self.params(args, line)? },
                None => {
                    return Err(Error::new(ErrorCode::P001, line, format!("Unknown command: {other}")));
                }
            },
        };

        self.push(Command::new(line, kind));
        Ok(())
    }

    fn push(&mut self, cmd: Command) {
        match self.blocks.last_mut() {
            Some(block) => block.active().push(cmd),
            None => self.commands.push(cmd),
        }
    }

    fn open_else(&mut self, line: usize) -> Result<(), Error> {
        let message = match self.blocks.last_mut() {
            Some(OpenBlock::If { else_branch: else_branch @ None, .. }) => {
                *else_branch = Some(Vec::new());
                return Ok(());
            }
            Some(OpenBlock::If { line: start, .. }) => {
                format!("Duplicate ELSE for IF block started on line {start}.")
            }
            Some(block) => format!(
                "ELSE found inside {} block started on line {}; expected END{} first.",
                block.name(), block.line(), block.name()),
            None => "Unexpected ELSE without matching IF.".to_string(),
        };
        Err(Error::new(ErrorCode::P011, line, message))
    }

    fn close_block(&mut self, expected: &'static str, line: usize) -> Result<(), Error> {
        let message = match self.blocks.pop() {
            Some(block) if block.name() == expected => {
                let cmd = block.close();
                self.push(cmd);
                return Ok(());
            }
            Some(block) => {
                let message = format!("END{expected} found but {} block started on line {} is still open.",
                    block.name(), block.line());
                self.blocks.push(block);
                message
            }
            None => format!("Unexpected END{expected} without matching {expected}."),
        };
        Err(Error::new(ErrorCode::P011, line, message))
    }

    // ─── Commands with their own syntax ──────────────────────────────────────

    fn parse_var(&mut self, args: &str, line: usize) -> Result<CommandKind, Error> {
        let Some(rest) = args.strip_prefix('$') else {
            return Err(Error::new(ErrorCode::P008, line, "VAR requires a variable name starting with '$'."));
        };
        let (name_part, init_part) = match rest.split_once('=') {
            Some((n, e)) => (n.trim(), Some(e.trim())),
            None => (rest.trim(), None),
        };
        if name_part.contains(|c: char| c.is_ascii_whitespace()) {
            return Err(Error::new(ErrorCode::P002, line,
                "Invalid VAR syntax. Use 'VAR $name' or 'VAR $name = expression'."));
        }
        if !is_valid_var_name(name_part) {
            return Err(Error::new(ErrorCode::P008, line, format!("Invalid variable name: '${name_part}'")));
        }

        let name = format!("${}", name_part.to_uppercase());
        if is_env_variable(&name) {
            return Err(Error::new(ErrorCode::P007, line,
                format!("Cannot declare variable with the same name as an environment variable: {name}")));
        }
        if self.declared.contains(&name) {
            return Err(Error::new(ErrorCode::P006, line, format!("Variable '{name}' already declared.")));
        }

        // The initializer is checked before the name is visible, so it cannot
        // refer to itself. The name is declared even when the initializer is bad.
        let init = match init_part {
            None => Ok(Vec::new()),
            Some("") => Err(Error::new(ErrorCode::P009, line, "Missing expression after '=' in VAR declaration.")),
            Some(src) => self.expression(src, line),
        };
        self.declared.push(name.clone());
        Ok(CommandKind::Var { name, init: init? })
    }

    fn parse_let(&mut self, args: &str, line: usize) -> Result<CommandKind, Error> {
        let Some((target, expr)) = args.split_once('=') else {
            return Err(Error::new(ErrorCode::P002, line, "LET statement requires '=' for assignment."));
        };
        let (target, expr) = (target.trim(), expr.trim());

        let Some(bare) = target.strip_prefix('$') else {
            return Err(Error::new(ErrorCode::P008, line, "LET target variable must start with '$'."));
        };
        if !is_valid_var_name(bare) {
            return Err(Error::new(ErrorCode::P008, line, format!("Invalid variable name: '{target}'")));
        }
        let name = format!("${}", bare.to_uppercase());
        if is_env_variable(&name) {
            return Err(Error::new(ErrorCode::P007, line, format!("Cannot assign to environment variable: {name}")));
        }
        if !self.declared.contains(&name) {
            return Err(Error::new(ErrorCode::P005, line, format!("Cannot assign to undeclared variable: {name}")));
        }
        if expr.is_empty() {
            return Err(Error::new(ErrorCode::P009, line, "LET statement requires an expression after '='."));
        }

        Ok(CommandKind::Let { target: name, expr: self.expression(expr, line)? })
    }

    /// `COUNT=<int|$var> [TIMES]`
    fn parse_repeat(&self, args: &str, line: usize) -> Result<Value, Error> {
        let missing = || Error::new(ErrorCode::P003, line, "REPEAT requires COUNT= parameter.");

        let rest = match args.get(..5) {
            Some(p) if p.eq_ignore_ascii_case("COUNT") => args[5..].trim_start(),
            _ => return Err(missing()),
        };
        let Some(rest) = rest.strip_prefix('=') else { return Err(missing()) };

        let mut parts = rest.split_whitespace();
        let Some(value) = parts.next() else {
            return Err(Error::new(ErrorCode::P003, line, "Missing value for REPEAT COUNT."));
        };
        let trailing: Vec<&str> = parts.collect();
        match trailing.as_slice() {
            [] => {}
            [kw] if kw.eq_ignore_ascii_case("TIMES") => {}
            _ => {
                return Err(Error::new(ErrorCode::P002, line, format!(
                    "Unexpected characters after COUNT value in REPEAT command: '{}'", trailing.join(" "))));
            }
        }

        let count = lexer::parse_value(value, line)?;
        match count {
            Value::Int(_) | Value::Variable(_) => {
                self.check_declared(&count, line)?;
                Ok(count)
            }
            _ => Err(Error::new(ErrorCode::P003, line, format!(
                "REPEAT COUNT value must be an integer or a variable ($var). Got: {value}"))),
        }
    }

    /// `<condition> THEN`
    fn parse_if(&self, args: &str, line: usize) -> Result<Vec<Value>, Error> {
        let trimmed = args.trim_end();
        let split = trimmed.len().checked_sub(4)
            .filter(|&i| trimmed.get(i..).is_some_and(|kw| kw.eq_ignore_ascii_case("THEN")))
            .filter(|&i| i == 0 || trimmed[..i].ends_with(|c: char| c.is_ascii_whitespace()));
        let Some(split) = split else {
            return Err(Error::new(ErrorCode::P010, line, "IF requires THEN after the condition."));
        };

        let tokens = lexer::tokenize_condition(&trimmed[..split], line)?;
        for tok in &tokens { self.check_declared(tok, line)?; }
        Ok(tokens)
    }

    /// `DEFINE PATTERN NAME="n" WIDTH=w HEIGHT=h DATA="bits"`
    fn parse_define(&mut self, args: &str, line: usize) -> Result<(), Error> {
        let rest = match args.get(..7) {
            Some(p) if p.eq_ignore_ascii_case("PATTERN")
                && args[7..].chars().next().is_none_or(|c| c.is_ascii_whitespace()) => &args[7..],
            _ => return Err(Error::new(ErrorCode::P001, line, "DEFINE command must be followed by 'PATTERN'.")),
        };
        let params = lexer::parse_params(rest, line)?;

        let name = match params.get("NAME") {
            Some(Value::Str(s)) if !s.is_empty() => s.clone(),
            _ => return Err(Error::new(ErrorCode::P003, line, "DEFINE PATTERN requires NAME=\"...\" parameter.")),
        };
        let dim = |key: &str| match params.get(key) {
            Some(Value::Int(n)) => Ok(*n),
            _ => Err(Error::new(ErrorCode::P003, line, format!("DEFINE PATTERN requires {key}=... parameter."))),
        };
        let (width, height) = (dim("WIDTH")?, dim("HEIGHT")?);
        let data = match params.get("DATA") {
            Some(Value::Str(s)) => s.as_str(),
            _ => return Err(Error::new(ErrorCode::P003, line, "DEFINE PATTERN requires DATA=\"...\" parameter.")),
        };

        if width <= 0 || height <= 0 {
            return Err(Error::new(ErrorCode::P013, line, "Pattern WIDTH and HEIGHT must be positive."));
        }
        let (width, height) = (width as usize, height as usize);
        let cells = width.saturating_mul(height);
        if cells > MAX_PATTERN_CELLS {
            return Err(Error::new(ErrorCode::P013, line,
                format!("Pattern '{name}' is too large ({width}x{height}).")));
        }
        if width > RECOMMENDED_MAX_DIM || height > RECOMMENDED_MAX_DIM {
            warn!("Line {line}: pattern '{name}' is {width}x{height}, larger than the recommended \
                   {RECOMMENDED_MAX_DIM}x{RECOMMENDED_MAX_DIM}");
        }
        if !data.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(Error::new(ErrorCode::P013, line, "DATA string must contain only '0' or '1'."));
        }
        if self.assets.contains(&name) {
            return Err(Error::new(ErrorCode::P013, line, format!("Pattern '{name}' already defined.")));
        }
        if self.assets.len() >= MAX_ASSETS {
            return Err(Error::new(ErrorCode::P013, line,
                format!("Too many patterns defined (maximum {MAX_ASSETS}).")));
        }

        let mut bits: Vec<u8> = data.bytes().map(|b| b - b'0').collect();
        if bits.len() < cells {
            warn!("Line {line}: DATA for pattern '{name}' has {} cells, padding to {cells} with 0", bits.len());
            bits.resize(cells, 0);
        } else if bits.len() > cells {
            warn!("Line {line}: DATA for pattern '{name}' has {} cells, truncating to {cells}", bits.len());
            bits.truncate(cells);
        }

        self.assets.insert(Asset::new(name, width, height, bits));
        Ok(())
    }

    // ─── Shared checks ───────────────────────────────────────────────────────

    fn params(&self, args: &str, line: usize) -> Result<Params, Error> {
        let params = lexer::parse_params(args, line)?;
        for value in params.values() { self.check_declared(value, line)?; }
        Ok(params)
    }

    fn expression(&self, src: &str, line: usize) -> Result<Vec<Value>, Error> {
        let tokens = lexer::tokenize_expression(src, line)?;
        for tok in &tokens { self.check_declared(tok, line)?; }
        Ok(tokens)
    }

    fn check_declared(&self, value: &Value, line: usize) -> Result<(), Error> {
        match value {
            Value::Variable(v) if !is_env_variable(&v.name) && !self.declared.contains(&v.name) => {
                Err(Error::new(ErrorCode::P005, line, format!("Undefined variable: {}", v.name)))
            }
            _ => Ok(()),
        }
    }
}

fn ignore_args(name: &str, args: &str, line: usize) {
    if !args.is_empty() {
        warn!("Line {line}: ignoring unexpected arguments after {name}: '{args}'");
    }
}

/// Parse `source` into a [`Script`], or every error found.
pub fn parse_script(source: &str) -> Result<Script, Vec<Error>> {
    let mut parser = Parser::new();
    if parser.parse(source) {
        Ok(parser.into_script())
    } else {
        Err(parser.errors)
    }
}
