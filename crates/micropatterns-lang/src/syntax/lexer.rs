//! Line-level scanning: command/argument split, `KEY=VALUE` parameters,
//! single values, expressions and conditions.

use crate::error::{Error, ErrorCode};
use crate::syntax::ast::Params;
use crate::syntax::token::{Op, Value, VarRef};

/// Split a trimmed line into its upper-cased command name and the trimmed rest.
pub fn split_command(line: &str) -> (String, &str) {
    match line.find(|c: char| c.is_ascii_whitespace()) {
        Some(i) => (line[..i].to_uppercase(), line[i..].trim()),
        None => (line.to_uppercase(), ""),
    }
}

/// `$` is followed by a letter, then letters, digits or underscores.
pub fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Parse `KEY=VALUE KEY2="VALUE 2" KEY3=$VAR`. Keys are case-insensitive and
/// stored upper-cased; quoted values keep their case and support `\"` and `\\`.
pub fn parse_params(args: &str, line: usize) -> Result<Params, Error> {
    let src = args.as_bytes();
    let mut pos = 0;
    let mut params = Params::new();
    let err = |msg: String| Error::new(ErrorCode::P002, line, msg);

    loop {
        while pos < src.len() && src[pos].is_ascii_whitespace() { pos += 1; }
        if pos >= src.len() { break; }

        let key_start = pos;
        while pos < src.len() && src[pos] != b'=' && !src[pos].is_ascii_whitespace() { pos += 1; }
        let key = args[key_start..pos].to_uppercase();
        if key.is_empty() {
            return Err(err(format!("Empty parameter name near '{}'.", &args[key_start..])));
        }

        while pos < src.len() && src[pos].is_ascii_whitespace() { pos += 1; }
        if pos >= src.len() || src[pos] != b'=' {
            return Err(err(format!("Missing '=' after parameter name '{key}'.")));
        }
        pos += 1;
        while pos < src.len() && src[pos].is_ascii_whitespace() { pos += 1; }
        if pos >= src.len() {
            return Err(err(format!("Missing value for parameter '{key}'.")));
        }

        let value = if src[pos] == b'"' {
            pos += 1;
            let mut buf = Vec::new();
            loop {
                match src.get(pos) {
                    None => return Err(err(format!("Unterminated string literal for parameter '{key}'."))),
                    Some(b'"') => { pos += 1; break; }
                    Some(b'\\') => match src.get(pos + 1) {
                        Some(&c) if c == b'"' || c == b'\\' => { buf.push(c); pos += 2; }
                        Some(_) => { buf.push(b'\\'); pos += 1; }
                        None => return Err(err(format!("Unterminated string literal for parameter '{key}'."))),
                    },
                    Some(&c) => { buf.push(c); pos += 1; }
                }
            }
            if pos < src.len() && !src[pos].is_ascii_whitespace() {
                return Err(err(format!("Expected whitespace after quoted value of '{key}'.")));
            }
            Value::Str(String::from_utf8_lossy(&buf).into_owned())
        } else {
            let value_start = pos;
            while pos < src.len() && !src[pos].is_ascii_whitespace() { pos += 1; }
            parse_value(&args[value_start..pos], line)?
        };

        if params.contains_key(&key) {
            return Err(err(format!("Duplicate parameter '{key}'.")));
        }
        params.insert(key, value);
    }

    Ok(params)
}

/// Classify one unquoted value: `$name` / `-$name` → variable, `[-]digits` →
/// integer, anything else → keyword string with case preserved.
pub fn parse_value(text: &str, line: usize) -> Result<Value, Error> {
    if let Some(name) = text.strip_prefix('$') {
        return var_ref(name, false, text, line).map(Value::Variable);
    }
    if let Some(name) = text.strip_prefix("-$") {
        return var_ref(name, true, text, line).map(Value::Variable);
    }

    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse::<i32>().map(Value::Int).map_err(|_| {
            Error::new(ErrorCode::P004, line, format!("Integer literal out of range: {text}"))
        });
    }

    Ok(Value::Str(text.to_string()))
}

fn var_ref(name: &str, negated: bool, text: &str, line: usize) -> Result<VarRef, Error> {
    if !is_valid_var_name(name) {
        return Err(Error::new(ErrorCode::P008, line, format!("Invalid variable name: '{text}'")));
    }
    Ok(VarRef { name: format!("${}", name.to_uppercase()), negated })
}

// ─── Expressions and conditions ──────────────────────────────────────────────

/// Tokenize an arithmetic expression. A blank source yields no tokens;
/// anything else must alternate operand / operator and end on an operand.
pub fn tokenize_expression(src: &str, line: usize) -> Result<Vec<Value>, Error> {
    let tokens = Scanner::new(src, line, false, ErrorCode::P009).scan()?;
    if !tokens.is_empty() {
        validate_arithmetic(&tokens, line, ErrorCode::P009)?;
    }
    Ok(tokens)
}

/// Tokenize a condition: exactly one comparison splitting two non-empty
/// arithmetic sides.
pub fn tokenize_condition(src: &str, line: usize) -> Result<Vec<Value>, Error> {
    let err = |msg: &str| Error::new(ErrorCode::P010, line, msg);
    let tokens = Scanner::new(src, line, true, ErrorCode::P010).scan()?;
    if tokens.is_empty() {
        return Err(err("Empty condition."));
    }

    let comparisons: Vec<usize> = tokens.iter().enumerate()
        .filter(|(_, t)| t.as_op().is_some_and(Op::is_comparison))
        .map(|(i, _)| i)
        .collect();
    let split = match comparisons.as_slice() {
        [] => return Err(err("Condition requires a comparison operator (==, !=, <, >, <=, >=).")),
        [i] => *i,
        _ => return Err(err("Condition may contain only one comparison operator.")),
    };

    let (lhs, rhs) = (&tokens[..split], &tokens[split + 1..]);
    if lhs.is_empty() || rhs.is_empty() {
        return Err(err("Comparison requires an expression on both sides."));
    }
    validate_arithmetic(lhs, line, ErrorCode::P010)?;
    validate_arithmetic(rhs, line, ErrorCode::P010)?;
    Ok(tokens)
}

fn validate_arithmetic(tokens: &[Value], line: usize, code: ErrorCode) -> Result<(), Error> {
    for (i, tok) in tokens.iter().enumerate() {
        let want_operand = i % 2 == 0;
        match tok {
            t if t.is_operand() && want_operand => {}
            Value::Operator(op) if !want_operand && op.is_arithmetic() => {}
            Value::Operator(op) if want_operand => {
                return Err(Error::new(code, line,
                    format!("Expected number or variable, found '{}'.", op.symbol())));
            }
            other => {
                return Err(Error::new(code, line,
                    format!("Expected operator (+ - * / %), found '{other}'.")));
            }
        }
    }
    if tokens.len() % 2 == 0 {
        return Err(Error::new(code, line, "Expression cannot end with an operator."));
    }
    Ok(())
}

struct Scanner<'a> {
    text: &'a str,
    src: &'a [u8],
    pos: usize,
    line: usize,
    comparisons: bool,
    code: ErrorCode,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, line: usize, comparisons: bool, code: ErrorCode) -> Self {
        Self { text, src: text.as_bytes(), pos: 0, line, comparisons, code }
    }

    fn scan(mut self) -> Result<Vec<Value>, Error> {
        let mut tokens: Vec<Value> = Vec::new();

        loop {
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() { self.pos += 1; }
            if self.pos >= self.src.len() { break; }

            // Unary minus is only valid where an operand is expected.
            let expect_operand = tokens.last().is_none_or(|t| matches!(t, Value::Operator(_)));
            let ch = self.src[self.pos];
            let next = self.src.get(self.pos + 1).copied().unwrap_or(0);

            let tok = match ch {
                b'0'..=b'9' => self.read_number()?,
                b'$' => self.read_variable(false)?,
                b'-' if expect_operand && next.is_ascii_digit() => self.read_number()?,
                b'-' if expect_operand && next == b'$' => { self.pos += 1; self.read_variable(true)? }
                b'+' => self.op(Op::Add, 1),
                b'-' => self.op(Op::Sub, 1),
                b'*' => self.op(Op::Mul, 1),
                b'/' => self.op(Op::Div, 1),
                b'%' => self.op(Op::Mod, 1),
                b'=' | b'!' | b'<' | b'>' if self.comparisons => self.read_comparison(ch, next)?,
                _ => {
                    let c = self.text[self.pos..].chars().next().unwrap_or('?');
                    return Err(Error::new(self.code, self.line,
                        format!("Invalid character in expression: '{c}'")));
                }
            };
            tokens.push(tok);
        }

        Ok(tokens)
    }

    fn op(&mut self, op: Op, width: usize) -> Value {
        self.pos += width;
        Value::Operator(op)
    }

    fn read_number(&mut self) -> Result<Value, Error> {
        let start = self.pos;
        if self.src[self.pos] == b'-' { self.pos += 1; }
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() { self.pos += 1; }
        let text = &self.text[start..self.pos];
        text.parse::<i32>().map(Value::Int).map_err(|_| {
            Error::new(ErrorCode::P004, self.line, format!("Integer literal out of range: {text}"))
        })
    }

    fn read_variable(&mut self, negated: bool) -> Result<Value, Error> {
        self.pos += 1; // $
        let start = self.pos;
        while self.pos < self.src.len()
            && (self.src[self.pos].is_ascii_alphanumeric() || self.src[self.pos] == b'_')
        {
            self.pos += 1;
        }
        let name = &self.text[start..self.pos];
        var_ref(name, negated, &format!("${name}"), self.line).map(Value::Variable)
    }

    fn read_comparison(&mut self, ch: u8, next: u8) -> Result<Value, Error> {
        let tok = match (ch, next) {
            (b'=', b'=') => self.op(Op::Eq, 2),
            (b'!', b'=') => self.op(Op::NotEq, 2),
            (b'<', b'=') => self.op(Op::LtEq, 2),
            (b'>', b'=') => self.op(Op::GtEq, 2),
            (b'<', _) => self.op(Op::Lt, 1),
            (b'>', _) => self.op(Op::Gt, 1),
            (b'=', _) => {
                return Err(Error::new(self.code, self.line, "Use '==' for comparison, found bare '='."));
            }
            _ => {
                return Err(Error::new(self.code, self.line, "Use '!=' for comparison, found bare '!'."));
            }
        };
        Ok(tok)
    }
}
