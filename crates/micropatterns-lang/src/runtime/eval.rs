//! Integer expression and condition evaluation.
//!
//! Expressions are flat token lists evaluated in two passes: `* / %` fold
//! left to right first, then `+ -`. Arithmetic is signed 32-bit and wraps.
//! Errors degrade the offending sub-result to 0 and are recorded, evaluation
//! carries on.

use std::collections::BTreeMap;

use log::warn;

use crate::error::{RuntimeError, RuntimeErrorCode};
use crate::syntax::token::{INDEX_VARIABLE, Op, Value, VarRef};

// ─── Variable store ───────────────────────────────────────────────────────────

/// Environment values supplied by the host plus user variables. Names carry
/// their `$` prefix and are upper-cased.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    env: BTreeMap<String, i32>,
    user: BTreeMap<String, i32>,
}

impl VariableStore {
    pub fn new() -> Self { Self::default() }

    /// Environment first, then user variables.
    pub fn get(&self, name: &str) -> Option<i32> {
        self.env.get(name).or_else(|| self.user.get(name)).copied()
    }

    pub fn set_env(&mut self, name: &str, value: i32) {
        self.env.insert(name.to_string(), value);
    }

    pub fn set_user(&mut self, name: &str, value: i32) {
        self.user.insert(name.to_string(), value);
    }

    pub fn has_user(&self, name: &str) -> bool {
        self.user.contains_key(name)
    }

    pub fn clear_user(&mut self) { self.user.clear(); }

    pub fn user_variables(&self) -> impl Iterator<Item = (&str, i32)> {
        self.user.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

// ─── Evaluator ────────────────────────────────────────────────────────────────

/// Borrowed view over the variable store that records errors as it goes.
pub struct Evaluator<'a> {
    vars: &'a VariableStore,
    errors: &'a mut Vec<RuntimeError>,
}

impl<'a> Evaluator<'a> {
    pub fn new(vars: &'a VariableStore, errors: &'a mut Vec<RuntimeError>) -> Self {
        Self { vars, errors }
    }

    fn report(&mut self, code: RuntimeErrorCode, line: usize, message: impl Into<String>) {
        let err = RuntimeError::new(code, line, message);
        warn!("{err}");
        self.errors.push(err);
    }

    /// `loop_index` is the innermost REPEAT iteration, or negative outside loops.
    pub fn evaluate_expression(&mut self, tokens: &[Value], line: usize, loop_index: i32) -> i32 {
        if tokens.is_empty() {
            self.report(RuntimeErrorCode::R005, line, "Empty expression.");
            return 0;
        }

        let mut operands = Vec::with_capacity(tokens.len() / 2 + 1);
        let mut ops = Vec::with_capacity(tokens.len() / 2);
        for (i, tok) in tokens.iter().enumerate() {
            match (i % 2 == 0, tok) {
                (true, Value::Int(n)) => operands.push(*n),
                (true, Value::Variable(v)) => operands.push(self.resolve_var(v, line, loop_index)),
                (false, Value::Operator(op)) if op.is_arithmetic() => ops.push(*op),
                _ => {
                    self.report(RuntimeErrorCode::R005, line,
                        format!("Malformed expression near '{tok}'."));
                    return 0;
                }
            }
        }
        if ops.len() + 1 != operands.len() {
            self.report(RuntimeErrorCode::R005, line, "Expression cannot end with an operator.");
            return 0;
        }

        // Pass 1: * / %
        let mut sums = vec![operands[0]];
        let mut sum_ops = Vec::new();
        for (op, rhs) in ops.iter().zip(&operands[1..]) {
            if op.is_multiplicative() {
                if let Some(last) = sums.last_mut() {
                    *last = self.apply(*last, *op, *rhs, line);
                }
            } else {
                sums.push(*rhs);
                sum_ops.push(*op);
            }
        }

        // Pass 2: + -
        let mut acc = sums[0];
        for (op, rhs) in sum_ops.iter().zip(&sums[1..]) {
            acc = self.apply(acc, *op, *rhs, line);
        }
        acc
    }

    /// A condition holds exactly one comparison splitting two expressions.
    pub fn evaluate_condition(&mut self, tokens: &[Value], line: usize, loop_index: i32) -> bool {
        let positions: Vec<usize> = tokens.iter().enumerate()
            .filter(|(_, t)| t.as_op().is_some_and(Op::is_comparison))
            .map(|(i, _)| i)
            .collect();
        let [split] = positions.as_slice() else {
            self.report(RuntimeErrorCode::R005, line,
                format!("Condition must contain exactly one comparison operator, found {}.", positions.len()));
            return false;
        };
        let (split, op) = match tokens[*split].as_op() {
            Some(op) => (*split, op),
            None => return false,
        };

        let lhs = self.evaluate_expression(&tokens[..split], line, loop_index);
        let rhs = self.evaluate_expression(&tokens[split + 1..], line, loop_index);
        match op {
            Op::Eq => lhs == rhs,
            Op::NotEq => lhs != rhs,
            Op::Lt => lhs < rhs,
            Op::LtEq => lhs <= rhs,
            Op::Gt => lhs > rhs,
            Op::GtEq => lhs >= rhs,
            _ => false,
        }
    }

    /// Integer value of a parameter. Keywords are not integers and read as 0.
    pub fn resolve_int(&mut self, value: &Value, line: usize, loop_index: i32) -> i32 {
        match value {
            Value::Int(n) => *n,
            Value::Variable(v) => self.resolve_var(v, line, loop_index),
            other => {
                self.report(RuntimeErrorCode::R005, line, format!("Expected an integer, found {other}."));
                0
            }
        }
    }

    fn resolve_var(&mut self, var: &VarRef, line: usize, loop_index: i32) -> i32 {
        let value = if var.name == INDEX_VARIABLE {
            if loop_index < 0 {
                self.report(RuntimeErrorCode::R004, line, "$INDEX used outside of a REPEAT loop.");
                0
            } else {
                loop_index
            }
        } else {
            match self.vars.get(&var.name) {
                Some(v) => v,
                None => {
                    self.report(RuntimeErrorCode::R001, line, format!("Undefined variable: {}", var.name));
                    0
                }
            }
        };
        if var.negated { value.wrapping_neg() } else { value }
    }

    fn apply(&mut self, lhs: i32, op: Op, rhs: i32, line: usize) -> i32 {
        match op {
            Op::Add => lhs.wrapping_add(rhs),
            Op::Sub => lhs.wrapping_sub(rhs),
            Op::Mul => lhs.wrapping_mul(rhs),
            Op::Div if rhs == 0 => {
                self.report(RuntimeErrorCode::R002, line, "Division by zero.");
                0
            }
            Op::Div => lhs.wrapping_div(rhs),
            Op::Mod if rhs == 0 => {
                self.report(RuntimeErrorCode::R003, line, "Modulo by zero.");
                0
            }
            Op::Mod => lhs.wrapping_rem(rhs),
            _ => 0,
        }
    }
}
