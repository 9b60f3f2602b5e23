use std::fmt;

/// Environment variables provided by the host or the runtime. Scripts can
/// read them but never declare or assign them.
pub const ENV_VARIABLES: [&str; 7] = [
    "$WIDTH", "$HEIGHT", "$HOUR", "$MINUTE", "$SECOND", "$COUNTER", "$INDEX",
];

pub const INDEX_VARIABLE: &str = "$INDEX";

pub fn is_env_variable(name: &str) -> bool {
    ENV_VARIABLES.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,   // +
    Sub,   // -
    Mul,   // *
    Div,   // /
    Mod,   // %
    Eq,    // ==
    NotEq, // !=
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Eq => "==",
            Op::NotEq => "!=",
            Op::Lt => "<",
            Op::LtEq => "<=",
            Op::Gt => ">",
            Op::GtEq => ">=",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod)
    }

    /// `*`, `/`, `%` — folded in the first evaluation pass.
    pub fn is_multiplicative(self) -> bool {
        matches!(self, Op::Mul | Op::Div | Op::Mod)
    }

    pub fn is_comparison(self) -> bool {
        !self.is_arithmetic()
    }
}

/// A `$name` reference. The name is stored upper-cased with its `$` prefix.
/// `negated` is set when the reference carried a unary minus (`-$X`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub name: String,
    pub negated: bool,
}

impl VarRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), negated: false }
    }
}

/// The token model shared by parameters, expressions and conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Variable(VarRef),
    /// Quoted string or bare keyword (`BLACK`, `SOLID`, `TIMES`), case preserved.
    Str(String),
    Operator(Op),
}

impl Value {
    pub fn var(name: impl Into<String>) -> Self {
        Value::Variable(VarRef::new(name))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_op(&self) -> Option<Op> {
        match self {
            Value::Operator(op) => Some(*op),
            _ => None,
        }
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Variable(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Variable(v) if v.negated => write!(f, "-{}", v.name),
            Value::Variable(v) => write!(f, "{}", v.name),
            Value::Str(s) if is_bare_word(s) => f.write_str(s),
            Value::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::Operator(op) => write!(f, "{}", op.symbol()),
        }
    }
}

/// Text that reads back as the same keyword when written without quotes.
fn is_bare_word(s: &str) -> bool {
    let Some(first) = s.chars().next() else { return false };
    first != '$' && first != '-' && !first.is_ascii_digit()
        && !s.contains(|c: char| c.is_whitespace() || matches!(c, '"' | '\\' | '='))
}

/// Join a token list back into readable source form.
pub fn tokens_to_string(tokens: &[Value]) -> String {
    tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" ")
}
