//! Tree-walking display-list generator. Walks the command tree with the
//! current drawing state and variable store, emitting one resolved
//! `DisplayListItem` per drawing command. No pixels are touched here.

use std::sync::Arc;

use log::{debug, warn};

use crate::error::{RuntimeError, RuntimeErrorCode};
use crate::runtime::eval::{Evaluator, VariableStore};
use crate::runtime::interrupt::Interrupt;
use crate::syntax::ast::{Command, CommandKind, Params, Script};
use crate::syntax::token::Value;
use crate::types::affine::{self, Affine};
use crate::types::asset::Asset;
use crate::types::draw::{Color, DisplayListItem, DrawOp};

/// Loop iterations between cooperative yields.
pub const LOOP_YIELD_INTERVAL: i32 = 20;
/// Top-level commands between cooperative yields.
pub const TOP_LEVEL_YIELD_INTERVAL: usize = 50;

/// Host-provided inputs, reported back after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecState {
    pub counter: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Generating,
    Complete,
    Interrupted,
}

// ─── Drawing state ────────────────────────────────────────────────────────────

/// Matrix and inverse are kept consistent after every transform command.
#[derive(Debug, Clone)]
pub struct DrawingState {
    pub matrix: Affine,
    pub inverse: Affine,
    pub scale: f64,
    pub color: Color,
    /// `None` = solid.
    pub fill: Option<Arc<Asset>>,
}

impl Default for DrawingState {
    fn default() -> Self {
        Self {
            matrix: affine::identity(),
            inverse: affine::identity(),
            scale: 1.0,
            color: Color::Black,
            fill: None,
        }
    }
}

impl DrawingState {
    fn reset_transforms(&mut self) {
        self.matrix = affine::identity();
        self.inverse = affine::identity();
        self.scale = 1.0;
    }

    /// `M' = M · T`
    fn post_multiply(&mut self, t: &Affine, line: usize) {
        let m = affine::mul(&self.matrix, t);
        match affine::invert(&m) {
            Some(inv) => {
                self.matrix = m;
                self.inverse = inv;
            }
            None => warn!("Line {line}: transform would make the matrix singular, ignored"),
        }
    }
}

// ─── Runtime ──────────────────────────────────────────────────────────────────

/// Lifecycle: `Runtime::new(script, w, h)` → `set_counter` / `set_time` →
/// `generate_display_list()` → `display_list()`. A runtime can be reused for
/// many generations; each one starts from a clean drawing state.
pub struct Runtime<'s> {
    script: &'s Script,
    width: i32,
    height: i32,
    exec: ExecState,
    vars: VariableStore,
    drawing: DrawingState,
    display_list: Vec<DisplayListItem>,
    errors: Vec<RuntimeError>,
    interrupt: Interrupt,
    run_state: RunState,
    yield_hook: Option<Box<dyn FnMut() + 's>>,
}

impl<'s> Runtime<'s> {
    pub fn new(script: &'s Script, width: i32, height: i32) -> Self {
        Self {
            script,
            width,
            height,
            exec: ExecState::default(),
            vars: VariableStore::new(),
            drawing: DrawingState::default(),
            display_list: Vec::new(),
            errors: Vec::new(),
            interrupt: Interrupt::new(),
            run_state: RunState::Idle,
            yield_hook: None,
        }
    }

    /// Replace the commands, assets and declared variables.
    pub fn set_script(&mut self, script: &'s Script) {
        self.script = script;
        self.run_state = RunState::Idle;
    }

    pub fn set_counter(&mut self, counter: i32) { self.exec.counter = counter; }

    pub fn set_time(&mut self, hour: i32, minute: i32, second: i32) {
        self.exec.hour = hour;
        self.exec.minute = minute;
        self.exec.second = second;
    }

    pub fn set_exec_state(&mut self, state: ExecState) { self.exec = state; }

    pub fn counter(&self) -> i32 { self.exec.counter }
    pub fn time(&self) -> (i32, i32, i32) { (self.exec.hour, self.exec.minute, self.exec.second) }
    pub fn exec_state(&self) -> ExecState { self.exec }

    pub fn run_state(&self) -> RunState { self.run_state }
    pub fn drawing_state(&self) -> &DrawingState { &self.drawing }
    pub fn errors(&self) -> &[RuntimeError] { &self.errors }

    pub fn display_list(&self) -> &[DisplayListItem] { &self.display_list }
    pub fn take_display_list(&mut self) -> Vec<DisplayListItem> { std::mem::take(&mut self.display_list) }

    /// Current value of a variable, `$` prefix optional, case-insensitive.
    pub fn variable(&self, name: &str) -> Option<i32> {
        let name = name.to_uppercase();
        if name.starts_with('$') { self.vars.get(&name) } else { self.vars.get(&format!("${name}")) }
    }

    // ─── Interruption ────────────────────────────────────────────────────────

    pub fn request_interrupt(&self) { self.interrupt.request(); }
    pub fn is_interrupted(&self) -> bool { self.interrupt.is_requested() }
    pub fn clear_interrupt(&self) { self.interrupt.clear(); }

    /// A handle sharing this runtime's interrupt flag.
    pub fn interrupt_handle(&self) -> Interrupt { self.interrupt.clone() }

    /// Share an externally owned flag, e.g. one the renderer also polls.
    pub fn set_interrupt(&mut self, interrupt: Interrupt) { self.interrupt = interrupt; }

    /// Called at every cooperative yield point.
    pub fn set_yield_hook(&mut self, hook: impl FnMut() + 's) {
        self.yield_hook = Some(Box::new(hook));
    }

    fn cooperative_yield(&mut self) {
        if let Some(hook) = self.yield_hook.as_mut() { hook(); }
    }

    // ─── Generation ──────────────────────────────────────────────────────────

    /// Build the display list from scratch. Returns true when the walk
    /// completed, false when it was interrupted; the partial list stays
    /// available either way. The interrupt flag is not cleared here.
    pub fn generate_display_list(&mut self) -> bool {
        self.run_state = RunState::Generating;
        self.display_list.clear();
        self.errors.clear();
        self.drawing = DrawingState::default();

        // User variables come into existence when their VAR runs.
        self.vars.clear_user();
        self.vars.set_env("$WIDTH", self.width);
        self.vars.set_env("$HEIGHT", self.height);
        self.vars.set_env("$HOUR", self.exec.hour);
        self.vars.set_env("$MINUTE", self.exec.minute);
        self.vars.set_env("$SECOND", self.exec.second);
        self.vars.set_env("$COUNTER", self.exec.counter);

        let script = self.script;
        for (n, cmd) in script.commands.iter().enumerate() {
            if self.interrupt.is_requested() { break; }
            self.execute(cmd, -1);
            if (n + 1) % TOP_LEVEL_YIELD_INTERVAL == 0 {
                self.cooperative_yield();
            }
        }

        let completed = !self.interrupt.is_requested();
        self.run_state = if completed { RunState::Complete } else { RunState::Interrupted };
        debug!(
            "display list: {} items, {} runtime errors, {}",
            self.display_list.len(),
            self.errors.len(),
            if completed { "complete" } else { "interrupted" },
        );
        completed
    }

    fn execute_block(&mut self, commands: &'s [Command], loop_index: i32) {
        for cmd in commands {
            if self.interrupt.is_requested() { return; }
            self.execute(cmd, loop_index);
        }
    }

    fn execute(&mut self, cmd: &'s Command, loop_index: i32) {
        let line = cmd.line;
        match &cmd.kind {
            CommandKind::Var { name, init } => {
                let value = if init.is_empty() { 0 } else {
                    self.evaluator().evaluate_expression(init, line, loop_index)
                };
                self.vars.set_user(name, value);
            }
            CommandKind::Let { target, expr } => {
                if !self.vars.has_user(target) {
                    self.report(RuntimeErrorCode::R006, line, format!("Cannot assign to undeclared variable: {target}"));
                    return;
                }
                let value = self.evaluator().evaluate_expression(expr, line, loop_index);
                self.vars.set_user(target, value);
            }

            CommandKind::Color(params) => {
                self.drawing.color = self.resolve_color(params, line);
            }
            CommandKind::Fill(params) => {
                self.drawing.fill = self.resolve_fill(params, line);
            }
            CommandKind::ResetTransforms => self.drawing.reset_transforms(),
            CommandKind::Translate(params) => {
                let dx = self.int_param(params, "DX", 0, line, loop_index);
                let dy = self.int_param(params, "DY", 0, line, loop_index);
                self.drawing.post_multiply(&affine::translation(dx as f64, dy as f64), line);
            }
            CommandKind::Rotate(params) => {
                let degrees = self.int_param(params, "DEGREES", 0, line, loop_index);
                self.drawing.post_multiply(&affine::rotation(degrees as f64), line);
            }
            CommandKind::Scale(params) => {
                let factor = self.int_param(params, "FACTOR", 1, line, loop_index);
                self.drawing.scale = factor.max(1) as f64;
            }

            CommandKind::Draw { op, params } => self.emit(*op, params, line, loop_index),

            CommandKind::Repeat { count, body } => {
                let count = self.evaluator().resolve_int(count, line, loop_index);
                if count < 0 {
                    self.report(RuntimeErrorCode::R009, line, format!("REPEAT COUNT must be non-negative, got {count}."));
                    return;
                }
                for i in 0..count {
                    if self.interrupt.is_requested() { break; }
                    self.execute_block(body, i);
                    if (i + 1) % LOOP_YIELD_INTERVAL == 0 {
                        self.cooperative_yield();
                    }
                }
            }
            CommandKind::If { condition, then_branch, else_branch } => {
                let taken = self.evaluator().evaluate_condition(condition, line, loop_index);
                let branch = if taken { then_branch } else { else_branch };
                self.execute_block(branch, loop_index);
            }
        }
    }

    fn emit(&mut self, op: DrawOp, params: &Params, line: usize, loop_index: i32) {
        let mut item = DisplayListItem::new(op, line);
        for key in op.int_params() {
            let value = self.int_param(params, key, 0, line, loop_index);
            item.int_params.insert(key.to_string(), value);
        }

        if op == DrawOp::Draw {
            let name = params.get("NAME").and_then(Value::as_str).unwrap_or_default();
            let Some(asset) = self.script.assets.get(name).cloned() else {
                self.report(RuntimeErrorCode::R008, line, format!("DRAW: unknown pattern '{name}', skipped."));
                return;
            };
            item.string_params.insert("NAME".to_string(), asset.name.clone());
            item.is_opaque = asset.is_fully_opaque();
            item.asset = Some(asset);
        }

        item.matrix = self.drawing.matrix;
        item.inverse = self.drawing.inverse;
        item.scale = self.drawing.scale;
        item.color = self.drawing.color;
        item.fill = self.drawing.fill.clone();
        self.display_list.push(item);
    }

    // ─── Parameters ──────────────────────────────────────────────────────────

    fn evaluator(&mut self) -> Evaluator<'_> {
        Evaluator::new(&self.vars, &mut self.errors)
    }

    fn report(&mut self, code: RuntimeErrorCode, line: usize, message: impl Into<String>) {
        let err = RuntimeError::new(code, line, message);
        warn!("{err}");
        self.errors.push(err);
    }

    fn int_param(&mut self, params: &Params, key: &str, default: i32, line: usize, loop_index: i32) -> i32 {
        match params.get(key) {
            Some(value) => self.evaluator().resolve_int(value, line, loop_index),
            None => default,
        }
    }

    fn resolve_color(&mut self, params: &Params, line: usize) -> Color {
        let Some(value) = params.get("NAME") else { return Color::Black };
        match value.as_str().and_then(Color::from_name) {
            Some(color) => color,
            None => {
                self.report(RuntimeErrorCode::R007, line,
                    format!("Invalid color {value}, expected BLACK or WHITE. Using BLACK."));
                Color::Black
            }
        }
    }

    fn resolve_fill(&mut self, params: &Params, line: usize) -> Option<Arc<Asset>> {
        let value = params.get("NAME")?;
        match value.as_str() {
            Some(name) if name.eq_ignore_ascii_case("SOLID") => None,
            Some(name) => {
                let asset = self.script.assets.get(name).cloned();
                if asset.is_none() {
                    self.report(RuntimeErrorCode::R008, line, format!("FILL: unknown pattern '{name}', using SOLID."));
                }
                asset
            }
            None => {
                self.report(RuntimeErrorCode::R008, line, format!("FILL: invalid pattern {value}, using SOLID."));
                None
            }
        }
    }
}
